// Copyright 2023-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

use std::fmt::Debug;
use std::path::PathBuf;
use std::time::Duration;

use chrono::{DateTime, TimeDelta, Utc};
use jsonwebtoken::{Algorithm, EncodingKey, Header};
use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;
use tracing::debug;

use crate::config::{PluginConfig, DEFAULT_IAM_ENDPOINT_URL};
use crate::error::CredentialError;

/// Signing parameters for the service account assertion.
///
/// PS256 here is RSASSA-PSS with SHA-256 and a salt as long as the digest.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SigningMethod {
    pub algorithm: Algorithm,
    pub audience: String,
}

impl Default for SigningMethod {
    fn default() -> Self {
        Self {
            algorithm: Algorithm::PS256,
            audience: DEFAULT_IAM_ENDPOINT_URL.to_string(),
        }
    }
}

#[derive(Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct Claims {
    pub iss: String,
    pub iat: i64,
    pub exp: i64,
    pub aud: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthToken {
    pub token: String,
    pub expires_at: DateTime<Utc>,
}

impl AuthToken {
    fn is_expired(&self, now: DateTime<Utc>) -> bool {
        self.expires_at < now
    }
}

#[derive(Serialize)]
struct ExchangeRequest<'a> {
    jwt: &'a str,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct ExchangeResponse {
    iam_token: String,
    expires_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
struct IamExchange {
    client: reqwest::Client,
    url: String,
}

/// Creates and caches a short-lived bearer token from a service account key.
///
/// The cache is only touched by a successful creation: a failed refresh
/// leaves the previous token in place.
#[derive(Debug)]
pub struct TokenManager {
    key_id: String,
    service_account_id: String,
    private_key_file_path: PathBuf,
    token_lifetime: Duration,
    signing_method: SigningMethod,
    exchange: Option<IamExchange>,
    auth_token: Option<AuthToken>,
}

impl TokenManager {
    pub fn new(config: &PluginConfig, signing_method: SigningMethod) -> Self {
        Self {
            key_id: config.key_id.clone(),
            service_account_id: config.service_account_id.clone(),
            private_key_file_path: config.private_key_file_path.clone(),
            token_lifetime: config.token_lifetime,
            signing_method,
            exchange: None,
            auth_token: None,
        }
    }

    /// Trade each signed assertion for an IAM token at `url`.
    #[must_use]
    pub fn with_exchange(mut self, client: reqwest::Client, url: impl Into<String>) -> Self {
        self.exchange = Some(IamExchange {
            client,
            url: url.into(),
        });
        self
    }

    #[must_use]
    pub fn with_token_lifetime(mut self, token_lifetime: Duration) -> Self {
        self.token_lifetime = token_lifetime;
        self
    }

    pub fn cached(&self) -> Option<&AuthToken> {
        self.auth_token.as_ref()
    }

    /// Returns the cached token, or creates a new one once it has expired.
    pub async fn get_token(&mut self) -> Result<String, CredentialError> {
        if let Some(auth_token) = &self.auth_token {
            if !auth_token.is_expired(Utc::now()) {
                return Ok(auth_token.token.clone());
            }
        }
        let auth_token = self.create_token().await?;
        Ok(auth_token.token.clone())
    }

    async fn create_token(&mut self) -> Result<&AuthToken, CredentialError> {
        let issued_at = Utc::now();
        let lifetime = TimeDelta::from_std(self.token_lifetime).unwrap_or(TimeDelta::zero());
        let mut expires_at = issued_at + lifetime;
        let assertion = self.sign_assertion(issued_at, expires_at)?;

        let token = match &self.exchange {
            None => assertion,
            Some(exchange) => {
                let response = exchange.exchange(&assertion).await?;
                expires_at = expires_at.min(response.expires_at);
                response.iam_token
            }
        };
        debug!("Created auth token for service account {}, expires at {expires_at}", self.service_account_id);

        Ok(self.auth_token.insert(AuthToken { token, expires_at }))
    }

    fn sign_assertion(
        &self,
        issued_at: DateTime<Utc>,
        expires_at: DateTime<Utc>,
    ) -> Result<String, CredentialError> {
        let pem = std::fs::read(&self.private_key_file_path).map_err(|source| {
            CredentialError::KeyFile {
                path: self.private_key_file_path.clone(),
                source,
            }
        })?;
        let key = EncodingKey::from_rsa_pem(&pem).map_err(CredentialError::InvalidKey)?;

        let mut header = Header::new(self.signing_method.algorithm);
        header.kid = Some(self.key_id.clone());
        let claims = Claims {
            iss: self.service_account_id.clone(),
            iat: issued_at.timestamp(),
            exp: expires_at.timestamp(),
            aud: self.signing_method.audience.clone(),
        };

        jsonwebtoken::encode(&header, &claims, &key).map_err(CredentialError::Signing)
    }
}

impl IamExchange {
    async fn exchange(&self, assertion: &str) -> Result<ExchangeResponse, CredentialError> {
        let response = self
            .client
            .post(&self.url)
            .json(&ExchangeRequest { jwt: assertion })
            .send()
            .await
            .map_err(|e| CredentialError::Exchange(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(CredentialError::Exchange(format!(
                "status_code: {status}, body: {body}"
            )));
        }
        response
            .json::<ExchangeResponse>()
            .await
            .map_err(|e| CredentialError::Exchange(e.to_string()))
    }
}

/// Source of the bearer credential shared by both transports.
pub enum TokenFactory {
    Static(String),
    ServiceAccount(Mutex<TokenManager>),
}

impl TokenFactory {
    pub fn new_from_static_token(token: &str) -> Self {
        Self::Static(token.to_string())
    }

    pub fn new_from_manager(manager: TokenManager) -> Self {
        Self::ServiceAccount(Mutex::new(manager))
    }

    pub async fn get_token(&self) -> Result<String, CredentialError> {
        match self {
            Self::Static(token) => Ok(token.clone()),
            Self::ServiceAccount(manager) => manager.lock().await.get_token().await,
        }
    }
}

impl Debug for TokenFactory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "TokenFactory")
    }
}
