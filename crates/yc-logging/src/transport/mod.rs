// Copyright 2023-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

use std::sync::Arc;

use async_trait::async_trait;

use crate::config::{PluginConfig, TransportKind};
use crate::error::{Result, TransportError};
use crate::http_client;
use crate::request::RequestModel;
use crate::token::{SigningMethod, TokenFactory, TokenManager};

pub mod grpc;
pub mod http;

pub use grpc::GrpcTransport;
pub use http::HttpTransport;

/// Sends one validated request to the ingestion API.
#[async_trait]
pub trait Transport: Send + Sync {
    /// Translates `request` to the wire format and sends it with a bearer token.
    /// Any non-success outcome is an error, the caller keeps its data.
    async fn send(&self, request: &RequestModel) -> Result<()>;
}

/// Builds the token factory described by `config`.
/// An unusable proxy for the IAM exchange fails here, like it does for the HTTP backend.
pub fn token_factory(config: &PluginConfig) -> std::result::Result<TokenFactory, TransportError> {
    let manager = TokenManager::new(config, SigningMethod::default());
    let manager = if config.iam_token_exchange {
        let client =
            http_client::build_client(config.https_proxy.as_deref(), config.request_timeout)?;
        manager.with_exchange(client, config.iam_endpoint_url.clone())
    } else {
        manager
    };
    Ok(TokenFactory::new_from_manager(manager))
}

/// Selects the backend named by `config.transport`.
///
/// Must be called inside a tokio runtime: the gRPC channel spawns its worker on creation.
pub fn from_config(
    config: &PluginConfig,
    token_factory: Arc<TokenFactory>,
) -> std::result::Result<Arc<dyn Transport>, TransportError> {
    let transport: Arc<dyn Transport> = match config.transport {
        TransportKind::Http => Arc::new(HttpTransport::new(config, token_factory)?),
        TransportKind::Grpc => Arc::new(GrpcTransport::new(config, token_factory)?),
    };
    Ok(transport)
}
