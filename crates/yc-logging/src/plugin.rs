// Copyright 2023-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

//! Per-instance buffer and the flush pipeline.
//!
//! Events accumulate in memory until the host asks for a flush. A flush
//! normalizes copies of every buffered event, builds and validates one
//! request and sends it. The buffer is emptied only when the send succeeds,
//! so a failed flush is retried with the same events on the next call.
//!
//! A plugin is driven by one caller at a time: `add_event` and `flush` take
//! `&mut self`, and the registry hands instances out behind a mutex.

use std::sync::Arc;

use tracing::{debug, error, info};

use crate::config::PluginConfig;
use crate::error::{ConfigError, Result};
use crate::event::Event;
use crate::host::HostStatus;
use crate::registry::PluginId;
use crate::request::RequestBuilder;
use crate::transport::{self, Transport};

pub struct OutputPlugin {
    id: PluginId,
    builder: RequestBuilder,
    transport: Arc<dyn Transport>,
    events: Vec<Event>,
}

impl OutputPlugin {
    /// Creates the transport selected by `config`, with its own token cache.
    pub fn new(id: PluginId, config: &PluginConfig) -> std::result::Result<Self, ConfigError> {
        let tokens = transport::token_factory(config)
            .map_err(|e| ConfigError::Transport(e.to_string()))?;
        let transport = transport::from_config(config, Arc::new(tokens))
            .map_err(|e| ConfigError::Transport(e.to_string()))?;
        Ok(Self::with_transport(id, config, transport))
    }

    pub fn with_transport(id: PluginId, config: &PluginConfig, transport: Arc<dyn Transport>) -> Self {
        Self {
            id,
            builder: RequestBuilder::new(config),
            transport,
            events: Vec::new(),
        }
    }

    pub fn id(&self) -> PluginId {
        self.id
    }

    pub fn events(&self) -> &[Event] {
        &self.events
    }

    pub fn len(&self) -> usize {
        self.events.len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    pub fn add_event(&mut self, event: Event) -> HostStatus {
        self.events.push(event);
        HostStatus::Ok
    }

    pub async fn flush(&mut self) -> Result<()> {
        if self.events.is_empty() {
            debug!("[yandexcloud {}] nothing to flush", self.id);
            return Ok(());
        }
        let count = self.events.len();

        let request = self.builder.build(&self.events);
        if let Err(e) = request.validate() {
            error!("[yandexcloud {}] invalid request, keeping {count} events: {e}", self.id);
            return Err(e.into());
        }

        match self.transport.send(&request).await {
            Ok(()) => {
                self.events = Vec::new();
                info!("[yandexcloud {}] flushed {count} events", self.id);
                Ok(())
            }
            Err(e) => {
                error!("[yandexcloud {}] failed to flush, keeping {count} events: {e}", self.id);
                Err(e)
            }
        }
    }
}
