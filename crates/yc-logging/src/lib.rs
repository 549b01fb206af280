// Copyright 2023-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

//! Buffered log shipping to the Yandex Cloud Logging ingestion API.
//!
//! A host registers one [`plugin::OutputPlugin`] per output block through
//! [`host::PluginHost`], hands it events and asks it to flush. Each flush
//! normalizes the buffered events, builds one write request and sends it over
//! HTTP or gRPC with a bearer token signed from a service account key.

#![deny(clippy::all)]
#![cfg_attr(not(test), deny(clippy::unwrap_used))]

pub mod config;
pub mod error;
pub mod event;
pub mod host;
pub mod http_client;
pub mod logger;
pub mod normalizer;
pub mod plugin;
pub mod proto;
pub mod registry;
pub mod request;
pub mod token;
pub mod transport;

pub use error::{Error, Result};
pub use host::{HostStatus, PluginHost};
pub use registry::PluginId;
