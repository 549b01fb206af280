// Copyright 2023-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

use std::path::PathBuf;

use reqwest::StatusCode;

use crate::host::HostStatus;

pub type Result<T> = std::result::Result<T, Error>;

/// Missing or contradictory plugin parameters. Fatal: the instance is never created.
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("Field required: {0}")]
    FieldRequired(&'static str),

    #[error("One of the given fields are required: {0} or {1}")]
    OneOfFieldsRequired(&'static str, &'static str),

    #[error("Invalid value `{value}` for {key}")]
    InvalidValue { key: &'static str, value: String },

    #[error("Unable to create transport: {0}")]
    Transport(String),
}

/// Failures while producing a bearer token.
#[derive(Debug, thiserror::Error)]
pub enum CredentialError {
    #[error("unable to read private key file {path}: {source}")]
    KeyFile {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid private key: {0}")]
    InvalidKey(#[source] jsonwebtoken::errors::Error),

    #[error("unable to sign token: {0}")]
    Signing(#[source] jsonwebtoken::errors::Error),

    #[error("IAM token exchange failed: {0}")]
    Exchange(String),
}

impl CredentialError {
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::KeyFile { source, .. } if source.kind() == std::io::ErrorKind::NotFound)
    }
}

/// A malformed batch. Aborts the flush, the buffer is retained.
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum ValidationError {
    #[error("destination requires log_group_id or folder_id")]
    MissingDestination,

    #[error("resource field required: {0}")]
    MissingResourceField(&'static str),

    #[error("request has no entries")]
    NoEntries,

    #[error("entry {index} has no timestamp")]
    MissingTimestamp { index: usize },

    #[error("entry {index} has no level")]
    MissingLevel { index: usize },
}

/// Network or protocol failures of a single send.
#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    #[error("unable to build client: {0}")]
    Client(String),

    #[error("unable to marshal request model: {0}")]
    Serialize(#[from] serde_json::Error),

    #[error("an error occurred while sending logs to yandex cloud: status_code: {status}, body: {body}")]
    Status { status: StatusCode, body: String },

    #[error("request timed out after {0:?}")]
    Timeout(std::time::Duration),

    #[error("connection failed: {0}")]
    Connect(String),

    #[error("rpc failed: {code:?}: {message}")]
    Rpc { code: tonic::Code, message: String },

    #[error("ingestion rejected {rejected} entries")]
    PartialWrite { rejected: usize },
}

/// A single entry payload that cannot be converted to the wire format.
/// The entry is dropped, the batch proceeds.
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum MarshalError {
    #[error("payload nesting exceeds {0} levels")]
    DepthExceeded(usize),
}

/// Every error a flush can surface to the host.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error(transparent)]
    Credential(#[from] CredentialError),

    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error(transparent)]
    Transport(#[from] TransportError),
}

impl Error {
    /// Per-flush errors keep the data buffered, so the host is always asked to retry.
    pub fn host_status(&self) -> HostStatus {
        HostStatus::Retry
    }
}
