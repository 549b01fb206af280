// Copyright 2023-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

use std::collections::HashMap;
use std::env;
use std::path::PathBuf;
use std::time::Duration;

use tracing::info;

use crate::error::ConfigError;

pub const DEFAULT_ENDPOINT_URL: &str = "ingester.logging.yandexcloud.net:443";
pub const DEFAULT_IAM_ENDPOINT_URL: &str = "https://iam.api.cloud.yandex.net/iam/v1/tokens";
pub const DEFAULT_LOG_LEVEL_KEY: &str = "level";
pub const DEFAULT_MESSAGE_KEY: &str = "message";
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(5);
pub const DEFAULT_TOKEN_LIFETIME: Duration = Duration::from_secs(5 * 60);

/// Where plugin parameters come from. Empty values count as absent.
pub trait ConfigSource {
    fn get(&self, key: &str) -> Option<String>;
}

impl ConfigSource for HashMap<String, String> {
    fn get(&self, key: &str) -> Option<String> {
        HashMap::get(self, key).cloned()
    }
}

/// Reads `YC_<KEY>` environment variables, e.g. `YC_LOG_GROUP_ID`.
#[derive(Debug, Clone, Default)]
pub struct EnvConfigSource;

impl ConfigSource for EnvConfigSource {
    fn get(&self, key: &str) -> Option<String> {
        env::var(format!("YC_{}", key.to_uppercase())).ok()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TransportKind {
    #[default]
    Http,
    Grpc,
}

/// Validated parameters of one plugin instance. Read-only after construction.
#[derive(Debug, Clone, PartialEq)]
pub struct PluginConfig {
    pub endpoint_url: String,
    pub log_group_id: String,
    pub folder_id: String,
    pub resource_id: String,
    pub resource_type: String,
    pub key_id: String,
    pub service_account_id: String,
    pub private_key_file_path: PathBuf,
    pub log_level_key: String,
    pub message_key: String,
    pub transport: TransportKind,
    pub request_timeout: Duration,
    pub token_lifetime: Duration,
    pub iam_token_exchange: bool,
    pub iam_endpoint_url: String,
    pub https_proxy: Option<String>,
}

impl Default for PluginConfig {
    fn default() -> Self {
        Self {
            endpoint_url: DEFAULT_ENDPOINT_URL.to_string(),
            log_group_id: String::new(),
            folder_id: String::new(),
            resource_id: String::new(),
            resource_type: String::new(),
            key_id: String::new(),
            service_account_id: String::new(),
            private_key_file_path: PathBuf::new(),
            log_level_key: DEFAULT_LOG_LEVEL_KEY.to_string(),
            message_key: DEFAULT_MESSAGE_KEY.to_string(),
            transport: TransportKind::default(),
            request_timeout: DEFAULT_REQUEST_TIMEOUT,
            token_lifetime: DEFAULT_TOKEN_LIFETIME,
            iam_token_exchange: false,
            iam_endpoint_url: DEFAULT_IAM_ENDPOINT_URL.to_string(),
            https_proxy: None,
        }
    }
}

impl PluginConfig {
    /// Reads every parameter from `source`, logs it and validates the result.
    pub fn from_source<S: ConfigSource + ?Sized>(
        source: &S,
        plugin_id: usize,
    ) -> Result<Self, ConfigError> {
        let read = |key: &str| -> Option<String> {
            let value = source.get(key).filter(|v| !v.trim().is_empty());
            info!(
                "[yandexcloud {plugin_id}] plugin parameter {key} = `{}`",
                value.as_deref().unwrap_or_default()
            );
            value
        };

        let defaults = Self::default();
        let config = Self {
            endpoint_url: read("endpoint_url").unwrap_or(defaults.endpoint_url),
            log_group_id: read("log_group_id").unwrap_or_default(),
            folder_id: read("folder_id").unwrap_or_default(),
            resource_id: read("resource_id").unwrap_or_default(),
            resource_type: read("resource_type").unwrap_or_default(),
            key_id: read("key_id").unwrap_or_default(),
            service_account_id: read("service_account_id").unwrap_or_default(),
            private_key_file_path: read("private_key_file_path")
                .map(PathBuf::from)
                .unwrap_or_default(),
            log_level_key: read("log_level_key").unwrap_or(defaults.log_level_key),
            message_key: read("message_key").unwrap_or(defaults.message_key),
            transport: read("transport")
                .map(|v| parse_transport(&v))
                .transpose()?
                .unwrap_or_default(),
            request_timeout: read("request_timeout")
                .map(|v| parse_seconds("request_timeout", &v))
                .transpose()?
                .unwrap_or(defaults.request_timeout),
            token_lifetime: read("token_lifetime")
                .map(|v| parse_seconds("token_lifetime", &v))
                .transpose()?
                .unwrap_or(defaults.token_lifetime),
            iam_token_exchange: read("iam_token_exchange")
                .map(|v| parse_bool("iam_token_exchange", &v))
                .transpose()?
                .unwrap_or(false),
            iam_endpoint_url: read("iam_endpoint_url").unwrap_or(defaults.iam_endpoint_url),
            https_proxy: read("https_proxy"),
        };

        config.validate()?;
        Ok(config)
    }

    /// Checks the required fields in a fixed order and fails on the first violation.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.log_group_id.is_empty() && self.folder_id.is_empty() {
            return Err(ConfigError::OneOfFieldsRequired(
                "log_group_id",
                "folder_id",
            ));
        }

        let required = [
            ("resource_id", self.resource_id.is_empty()),
            ("resource_type", self.resource_type.is_empty()),
            ("key_id", self.key_id.is_empty()),
            ("service_account_id", self.service_account_id.is_empty()),
            (
                "private_key_file_path",
                self.private_key_file_path.as_os_str().is_empty(),
            ),
        ];
        if let Some((field, _)) = required.into_iter().find(|(_, missing)| *missing) {
            return Err(ConfigError::FieldRequired(field));
        }

        Ok(())
    }
}

fn parse_transport(value: &str) -> Result<TransportKind, ConfigError> {
    match value.trim().to_ascii_lowercase().as_str() {
        "http" => Ok(TransportKind::Http),
        "grpc" => Ok(TransportKind::Grpc),
        _ => Err(ConfigError::InvalidValue {
            key: "transport",
            value: value.to_string(),
        }),
    }
}

fn parse_seconds(key: &'static str, value: &str) -> Result<Duration, ConfigError> {
    match value.trim().parse::<u64>() {
        Ok(secs) if secs > 0 => Ok(Duration::from_secs(secs)),
        _ => Err(ConfigError::InvalidValue {
            key,
            value: value.to_string(),
        }),
    }
}

fn parse_bool(key: &'static str, value: &str) -> Result<bool, ConfigError> {
    match value.trim().to_ascii_lowercase().as_str() {
        "true" | "1" | "yes" | "on" => Ok(true),
        "false" | "0" | "no" | "off" => Ok(false),
        _ => Err(ConfigError::InvalidValue {
            key,
            value: value.to_string(),
        }),
    }
}
