// Copyright 2023-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

use chrono::{DateTime, Utc};
use serde_json::{Map, Value};
use tracing::debug;

/// Field map of one record, keyed by canonical text.
pub type Record = Map<String, Value>;

/// A record key as the host hands it over.
#[derive(Debug, Clone, PartialEq)]
pub enum RecordKey {
    Text(String),
    Bytes(Vec<u8>),
    Int(i64),
    Other(String),
}

impl RecordKey {
    /// The textual form of the key, if it has one.
    pub fn into_text(self) -> Option<String> {
        match self {
            Self::Text(text) => Some(text),
            Self::Bytes(bytes) => String::from_utf8(bytes).ok(),
            Self::Int(_) | Self::Other(_) => None,
        }
    }
}

impl From<&str> for RecordKey {
    fn from(value: &str) -> Self {
        Self::Text(value.to_string())
    }
}

impl From<String> for RecordKey {
    fn from(value: String) -> Self {
        Self::Text(value)
    }
}

impl From<Vec<u8>> for RecordKey {
    fn from(value: Vec<u8>) -> Self {
        Self::Bytes(value)
    }
}

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum FieldError {
    #[error("failed to find key {0} in log record")]
    Absent(String),

    #[error("value of key {0} is not a string")]
    NotText(String),
}

/// One raw log record collected by the host.
#[derive(Debug, Clone, PartialEq)]
pub struct Event {
    pub timestamp: DateTime<Utc>,
    pub record: Record,
    pub tag: String,
}

impl Event {
    pub fn new(timestamp: DateTime<Utc>, record: Record, tag: impl Into<String>) -> Self {
        Self {
            timestamp,
            record,
            tag: tag.into(),
        }
    }

    /// Converts host keys to text once. Keys without a textual form are skipped.
    pub fn from_raw<I>(timestamp: DateTime<Utc>, fields: I, tag: impl Into<String>) -> Self
    where
        I: IntoIterator<Item = (RecordKey, Value)>,
    {
        let mut record = Record::new();
        for (key, value) in fields {
            match key.clone().into_text() {
                Some(text) => {
                    record.insert(text, value);
                }
                None => debug!("Unable to determine type of key {key:?}, skipping it"),
            }
        }
        Self::new(timestamp, record, tag)
    }

    /// Parses one JSON object per line. Non-object lines are kept under `message`.
    pub fn from_json_line(line: &str, tag: impl Into<String>) -> Self {
        let record = match serde_json::from_str::<Value>(line) {
            Ok(Value::Object(map)) => map,
            Ok(other) => Record::from_iter([("message".to_string(), other)]),
            Err(_) => Record::from_iter([(
                "message".to_string(),
                Value::String(line.to_string()),
            )]),
        };
        Self::new(Utc::now(), record, tag)
    }

    /// Looks up `field` without modifying the record.
    pub fn extract_field(&self, field: &str) -> Result<&str, FieldError> {
        match self.record.get(field) {
            None => Err(FieldError::Absent(field.to_string())),
            Some(Value::String(text)) => Ok(text),
            Some(_) => Err(FieldError::NotText(field.to_string())),
        }
    }

    /// Removes `field` from the record and returns its text value.
    /// A non-text value stays in the record.
    pub fn pop_field(&mut self, field: &str) -> Result<String, FieldError> {
        match self.record.get(field) {
            None => return Err(FieldError::Absent(field.to_string())),
            Some(Value::String(_)) => {}
            Some(_) => return Err(FieldError::NotText(field.to_string())),
        }
        match self.record.remove(field) {
            Some(Value::String(text)) => Ok(text),
            _ => Err(FieldError::Absent(field.to_string())),
        }
    }

    pub fn extract_level(&self, level_key: &str) -> Result<&str, FieldError> {
        self.extract_field(level_key)
    }

    pub fn pop_level(&mut self, level_key: &str) -> Result<String, FieldError> {
        self.pop_field(level_key)
    }

    pub fn pop_message(&mut self, message_key: &str) -> Result<String, FieldError> {
        self.pop_field(message_key)
    }
}
