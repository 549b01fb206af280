// Copyright 2023-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

use core::time::Duration;

use reqwest::ClientBuilder;

use crate::error::TransportError;

pub const USER_AGENT_PREFIX: &str = "yandexcloud-fluent-bit-plugin";

pub fn user_agent() -> String {
    format!("{USER_AGENT_PREFIX} ({})", std::env::consts::OS)
}

/// Creates a reqwest client builder using rustls.
pub fn create_reqwest_client_builder() -> ClientBuilder {
    reqwest::Client::builder()
        .use_rustls_tls()
        .user_agent(user_agent())
}

pub fn build_client(
    proxy_url: Option<&str>,
    timeout: Duration,
) -> Result<reqwest::Client, TransportError> {
    let mut builder = create_reqwest_client_builder().timeout(timeout);
    if let Some(proxy) = proxy_url {
        let proxy =
            reqwest::Proxy::https(proxy).map_err(|e| TransportError::Client(e.to_string()))?;
        builder = builder.proxy(proxy);
    }
    builder
        .build()
        .map_err(|e| TransportError::Client(e.to_string()))
}
