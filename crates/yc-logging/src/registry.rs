// Copyright 2023-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

use std::fmt;
use std::sync::{Arc, PoisonError, RwLock};

use tokio::sync::Mutex;

use crate::plugin::OutputPlugin;

/// Index of a plugin instance in the registry. Never reused.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct PluginId(pub usize);

impl fmt::Display for PluginId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Append-only arena of plugin instances shared by all host threads.
#[derive(Default)]
pub struct PluginRegistry {
    plugins: RwLock<Vec<Arc<Mutex<OutputPlugin>>>>,
}

impl PluginRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds a plugin for the next free id and stores it. The write lock is
    /// held while `build` runs, so concurrent registrations get distinct ids.
    pub fn register<E, F>(&self, build: F) -> Result<PluginId, E>
    where
        F: FnOnce(PluginId) -> Result<OutputPlugin, E>,
    {
        let mut plugins = self.plugins.write().unwrap_or_else(PoisonError::into_inner);
        let id = PluginId(plugins.len());
        let plugin = build(id)?;
        plugins.push(Arc::new(Mutex::new(plugin)));
        Ok(id)
    }

    pub fn get(&self, id: PluginId) -> Option<Arc<Mutex<OutputPlugin>>> {
        self.plugins
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(id.0)
            .cloned()
    }

    pub fn len(&self) -> usize {
        self.plugins.read().unwrap_or_else(PoisonError::into_inner).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
