// Copyright 2023-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

//! Synchronous entry points for the host process.
//!
//! The host calls in from its own worker threads and expects a status code
//! back. [`PluginHost`] owns the async runtime and blocks on it per call.

use tokio::runtime::Runtime;
use tracing::{debug, error, info};

use crate::config::{ConfigSource, PluginConfig};
use crate::error::ConfigError;
use crate::event::Event;
use crate::plugin::OutputPlugin;
use crate::registry::{PluginId, PluginRegistry};

/// Return codes understood by the host.
#[repr(C)]
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum HostStatus {
    /// Unrecoverable, the host must not call this instance again
    Error = 0,
    Ok = 1,
    /// Data is kept, the host should call flush again later
    Retry = 2,
}

pub struct PluginHost {
    runtime: Runtime,
    registry: PluginRegistry,
}

impl PluginHost {
    pub fn new() -> std::io::Result<Self> {
        let runtime = tokio::runtime::Builder::new_multi_thread()
            .enable_all()
            .thread_name("yc-logging")
            .build()?;
        Ok(Self {
            runtime,
            registry: PluginRegistry::new(),
        })
    }

    pub fn registry(&self) -> &PluginRegistry {
        &self.registry
    }

    /// Reads and validates the configuration, then registers a new instance.
    pub fn init_instance<S: ConfigSource + ?Sized>(
        &self,
        source: &S,
    ) -> Result<PluginId, ConfigError> {
        let _guard = self.runtime.enter();
        self.registry.register(|id| {
            let config = PluginConfig::from_source(source, id.0)?;
            OutputPlugin::new(id, &config)
        })
    }

    pub fn init<S: ConfigSource + ?Sized>(&self, source: &S) -> (HostStatus, Option<PluginId>) {
        match self.init_instance(source) {
            Ok(id) => {
                info!("[yandexcloud {id}] plugin instance registered");
                (HostStatus::Ok, Some(id))
            }
            Err(e) => {
                error!("[yandexcloud] failed to create plugin instance: {e}");
                (HostStatus::Error, None)
            }
        }
    }

    /// Buffers `events` on instance `id` and flushes everything it holds.
    pub fn flush(&self, id: PluginId, events: Vec<Event>) -> HostStatus {
        let Some(plugin) = self.registry.get(id) else {
            error!("[yandexcloud {id}] unknown plugin instance");
            return HostStatus::Error;
        };
        if let Some(first) = events.first() {
            debug!("[yandexcloud {id}] Found logs with tag: {}", first.tag);
        }
        debug!("[yandexcloud {id}] Processed {} events", events.len());

        self.runtime.block_on(async move {
            let mut plugin = plugin.lock().await;
            for event in events {
                plugin.add_event(event);
            }
            match plugin.flush().await {
                Ok(()) => HostStatus::Ok,
                Err(e) => e.host_status(),
            }
        })
    }

    pub fn exit(&self) -> HostStatus {
        info!("[yandexcloud] exiting with {} plugin instances", self.registry.len());
        HostStatus::Ok
    }
}
