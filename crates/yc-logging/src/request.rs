// Copyright 2023-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

//! Logical write request shared by both transports.
//!
//! The builder maps plugin configuration to destination and resource, and each
//! buffered event to one [`LogRecordEntry`]. The validator checks the request
//! right before it is handed to a transport.

use chrono::{DateTime, Utc};
use serde::ser::SerializeStruct;
use serde::{Serialize, Serializer};

use crate::config::PluginConfig;
use crate::error::ValidationError;
use crate::event::{Event, Record};
use crate::normalizer::Normalizer;

pub const LEVEL_UNSPECIFIED: &str = "LEVEL_UNSPECIFIED";

/// Destination address resolved to a single id.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DestinationTarget<'a> {
    LogGroup(&'a str),
    Folder(&'a str),
}

/// Log group id or folder id. When both are set the log group wins: it names
/// a concrete group, the folder only selects its default group.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Destination {
    pub log_group_id: String,
    pub folder_id: String,
}

impl Destination {
    pub fn target(&self) -> Option<DestinationTarget<'_>> {
        if !self.log_group_id.is_empty() {
            Some(DestinationTarget::LogGroup(&self.log_group_id))
        } else if !self.folder_id.is_empty() {
            Some(DestinationTarget::Folder(&self.folder_id))
        } else {
            None
        }
    }
}

impl Serialize for Destination {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut state = serializer.serialize_struct("Destination", 1)?;
        match self.target() {
            Some(DestinationTarget::LogGroup(id)) => state.serialize_field("logGroupId", id)?,
            Some(DestinationTarget::Folder(id)) => state.serialize_field("folderId", id)?,
            None => {}
        }
        state.end()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize)]
pub struct Resource {
    pub id: String,
    #[serde(rename = "type")]
    pub resource_type: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LogRecordEntry {
    pub timestamp: Option<DateTime<Utc>>,
    pub level: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    pub json_payload: Record,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RequestModel {
    pub destination: Destination,
    pub resource: Resource,
    pub entries: Vec<LogRecordEntry>,
}

impl RequestModel {
    /// Fails fast on the first violation.
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.destination.target().is_none() {
            return Err(ValidationError::MissingDestination);
        }
        if self.resource.id.is_empty() {
            return Err(ValidationError::MissingResourceField("id"));
        }
        if self.resource.resource_type.is_empty() {
            return Err(ValidationError::MissingResourceField("type"));
        }
        if self.entries.is_empty() {
            return Err(ValidationError::NoEntries);
        }
        for (index, entry) in self.entries.iter().enumerate() {
            if entry.timestamp.is_none() {
                return Err(ValidationError::MissingTimestamp { index });
            }
            if entry.level.is_empty() {
                return Err(ValidationError::MissingLevel { index });
            }
        }
        Ok(())
    }
}

/// Builds a fresh [`RequestModel`] per flush.
#[derive(Debug, Clone)]
pub struct RequestBuilder {
    destination: Destination,
    resource: Resource,
    normalizer: Normalizer,
}

impl RequestBuilder {
    pub fn new(config: &PluginConfig) -> Self {
        let destination = if config.log_group_id.is_empty() {
            Destination {
                log_group_id: String::new(),
                folder_id: config.folder_id.clone(),
            }
        } else {
            Destination {
                log_group_id: config.log_group_id.clone(),
                folder_id: String::new(),
            }
        };
        Self {
            destination,
            resource: Resource {
                id: config.resource_id.clone(),
                resource_type: config.resource_type.clone(),
            },
            normalizer: Normalizer::new(&config.log_level_key, &config.message_key),
        }
    }

    /// Events are normalized from copies so a failed flush can retry the originals.
    pub fn build(&self, events: &[Event]) -> RequestModel {
        RequestModel {
            destination: self.destination.clone(),
            resource: self.resource.clone(),
            entries: self.normalizer.normalize_all(events),
        }
    }
}
