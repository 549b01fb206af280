// Copyright 2023-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tonic::codec::ProstCodec;
use tonic::codegen::http::uri::PathAndQuery;
use tonic::metadata::MetadataValue;
use tonic::transport::{Channel, ClientTlsConfig, Endpoint};
use tracing::{debug, error, warn};

use crate::config::PluginConfig;
use crate::error::{Result, TransportError};
use crate::http_client::user_agent;
use crate::proto::{self, destination::Target, Level, WriteRequest, WriteResponse};
use crate::request::{DestinationTarget, RequestModel};
use crate::token::TokenFactory;
use crate::transport::Transport;

/// Endpoint without a scheme is dialed over TLS.
pub fn channel_uri(endpoint_url: &str) -> String {
    if endpoint_url.contains("://") {
        endpoint_url.to_string()
    } else {
        format!("https://{endpoint_url}")
    }
}

/// Converts the logical request to the ingestion message.
/// Entries whose payload cannot be converted are logged and left out.
pub fn write_request(request: &RequestModel) -> WriteRequest {
    let target = request.destination.target().map(|target| match target {
        DestinationTarget::LogGroup(id) => Target::LogGroupId(id.to_string()),
        DestinationTarget::Folder(id) => Target::FolderId(id.to_string()),
    });

    let entries = request
        .entries
        .iter()
        .enumerate()
        .filter_map(|(index, entry)| {
            let payload = match proto::to_struct(&entry.json_payload) {
                Ok(payload) => payload,
                Err(e) => {
                    error!("Cannot prepare payload of entry {index}, dropping it: {e}");
                    return None;
                }
            };
            Some(proto::IncomingLogEntry {
                timestamp: entry.timestamp.map(proto::timestamp),
                level: Level::from_name(&entry.level) as i32,
                message: entry.message.clone().unwrap_or_default(),
                json_payload: Some(payload),
            })
        })
        .collect();

    WriteRequest {
        destination: Some(proto::Destination { target }),
        resource: Some(proto::LogEntryResource {
            r#type: request.resource.resource_type.clone(),
            id: request.resource.id.clone(),
        }),
        entries,
    }
}

pub struct GrpcTransport {
    channel: Channel,
    timeout: Duration,
    token_factory: Arc<TokenFactory>,
}

impl GrpcTransport {
    /// The channel connects lazily on the first call, so this needs a runtime but no network.
    pub fn new(
        config: &PluginConfig,
        token_factory: Arc<TokenFactory>,
    ) -> std::result::Result<Self, TransportError> {
        let uri = channel_uri(&config.endpoint_url);
        let mut endpoint = Endpoint::from_shared(uri.clone())
            .map_err(|e| TransportError::Client(e.to_string()))?
            .timeout(config.request_timeout)
            .connect_timeout(config.request_timeout)
            .user_agent(user_agent())
            .map_err(|e| TransportError::Client(e.to_string()))?;
        if uri.starts_with("https://") {
            endpoint = endpoint
                .tls_config(ClientTlsConfig::new())
                .map_err(|e| TransportError::Client(e.to_string()))?;
        }

        Ok(Self {
            channel: endpoint.connect_lazy(),
            timeout: config.request_timeout,
            token_factory,
        })
    }

    async fn write(
        &self,
        request: tonic::Request<WriteRequest>,
    ) -> std::result::Result<WriteResponse, TransportError> {
        let mut client = tonic::client::Grpc::new(self.channel.clone());
        client
            .ready()
            .await
            .map_err(|e| TransportError::Connect(e.to_string()))?;
        let codec = ProstCodec::<WriteRequest, WriteResponse>::default();
        let path = PathAndQuery::from_static(proto::WRITE_PATH);

        match client.unary(request, path, codec).await {
            Ok(response) => Ok(response.into_inner()),
            Err(status) => Err(match status.code() {
                tonic::Code::DeadlineExceeded => TransportError::Timeout(self.timeout),
                tonic::Code::Unavailable => TransportError::Connect(status.message().to_string()),
                code => TransportError::Rpc {
                    code,
                    message: status.message().to_string(),
                },
            }),
        }
    }
}

#[async_trait]
impl Transport for GrpcTransport {
    async fn send(&self, request: &RequestModel) -> Result<()> {
        let message = write_request(request);
        if message.entries.is_empty() {
            warn!("No entries left to send after payload conversion");
            return Ok(());
        }
        let sent = message.entries.len();

        let token = self.token_factory.get_token().await?;
        let bearer: MetadataValue<_> = format!("Bearer {token}")
            .parse()
            .map_err(|e| TransportError::Client(format!("invalid token metadata: {e:?}")))?;
        let mut rpc_request = tonic::Request::new(message);
        rpc_request.metadata_mut().insert("authorization", bearer);

        let response = tokio::time::timeout(self.timeout, self.write(rpc_request))
            .await
            .map_err(|_| TransportError::Timeout(self.timeout))??;

        if !response.errors.is_empty() {
            for (index, status) in &response.errors {
                error!("Entry {index} rejected: {} ({})", status.message, status.code);
            }
            return Err(TransportError::PartialWrite {
                rejected: response.errors.len(),
            }
            .into());
        }
        debug!("Wrote {sent} entries");
        Ok(())
    }
}
