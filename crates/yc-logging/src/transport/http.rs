// Copyright 2023-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION, CONTENT_TYPE};
use reqwest::StatusCode;
use tracing::debug;

use crate::config::PluginConfig;
use crate::error::{Result, TransportError};
use crate::http_client;
use crate::request::RequestModel;
use crate::token::TokenFactory;
use crate::transport::Transport;

pub const WRITE_PATH: &str = "/logging/v1/write";

/// Turns a configured endpoint into the full write URL.
/// `host:port` becomes `https://host:port/logging/v1/write`.
pub fn write_url(endpoint_url: &str) -> String {
    let url = if endpoint_url.contains("://") {
        endpoint_url.to_string()
    } else {
        format!("https://{endpoint_url}")
    };
    let authority_end = url.find("://").map_or(0, |i| i + 3);
    if url[authority_end..].contains('/') {
        url
    } else {
        format!("{url}{WRITE_PATH}")
    }
}

pub struct HttpTransport {
    client: reqwest::Client,
    url: String,
    timeout: Duration,
    token_factory: Arc<TokenFactory>,
}

impl HttpTransport {
    pub fn new(
        config: &PluginConfig,
        token_factory: Arc<TokenFactory>,
    ) -> std::result::Result<Self, TransportError> {
        let client =
            http_client::build_client(config.https_proxy.as_deref(), config.request_timeout)?;
        Ok(Self {
            client,
            url: write_url(&config.endpoint_url),
            timeout: config.request_timeout,
            token_factory,
        })
    }

    fn headers(token: &str) -> std::result::Result<HeaderMap, TransportError> {
        let mut headers = HeaderMap::new();
        let bearer = HeaderValue::from_str(&format!("Bearer {token}"))
            .map_err(|e| TransportError::Client(format!("invalid token header: {e}")))?;
        headers.insert(AUTHORIZATION, bearer);
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        Ok(headers)
    }
}

#[async_trait]
impl Transport for HttpTransport {
    async fn send(&self, request: &RequestModel) -> Result<()> {
        let token = self.token_factory.get_token().await?;
        let body = serde_json::to_vec(request).map_err(TransportError::from)?;

        let response = self
            .client
            .post(&self.url)
            .headers(Self::headers(&token)?)
            .body(body)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    TransportError::Timeout(self.timeout)
                } else {
                    TransportError::Connect(e.to_string())
                }
            })?;

        let status = response.status();
        if status != StatusCode::OK {
            let body = response.text().await.unwrap_or_default();
            return Err(TransportError::Status { status, body }.into());
        }
        debug!("Sent {} entries to {}", request.entries.len(), self.url);
        Ok(())
    }
}
