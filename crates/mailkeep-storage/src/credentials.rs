//! Credential providers for archive backends.
//!
//! A credential is produced for a single upload and then dropped. There is no
//! cache: the OAuth variant performs a fresh refresh-token exchange on every
//! call, and the Basic variant re-derives its value each time.

use std::fmt::{Debug, Formatter, Result as FmtResult};
use std::time::Duration;

use async_trait::async_trait;
use base64::Engine;
use serde::Deserialize;

use crate::traits::{status_reason, CredentialError};

/// Timeout for the refresh-token exchange
pub const TOKEN_REFRESH_TIMEOUT: Duration = Duration::from_secs(10);

/// Authorization value for one upload.
///
/// Deliberately not `Clone`: a credential belongs to exactly one invocation.
pub enum Credential {
    /// Short-lived OAuth access token
    Bearer(String),
    /// Base64 of `username:password`
    Basic(String),
}

impl Credential {
    /// Value for the `Authorization` header
    pub fn authorization(&self) -> String {
        match self {
            Credential::Bearer(token) => format!("Bearer {}", token),
            Credential::Basic(encoded) => format!("Basic {}", encoded),
        }
    }
}

impl Debug for Credential {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        match self {
            Credential::Bearer(_) => f.write_str("Credential::Bearer(..)"),
            Credential::Basic(_) => f.write_str("Credential::Basic(..)"),
        }
    }
}

/// Anything that can produce an `Authorization` value for a backend.
#[async_trait]
pub trait CredentialProvider: Send + Sync {
    async fn credential(&self) -> Result<Credential, CredentialError>;
}

/// Stored OAuth token material; only the refresh token is used.
#[derive(Deserialize)]
struct StoredToken {
    refresh_token: String,
}

#[derive(Deserialize)]
struct TokenResponse {
    #[serde(default)]
    access_token: Option<String>,
}

/// OAuth refresh-token exchange against a token endpoint.
#[derive(Clone)]
pub struct OAuthRefresher {
    http_client: reqwest::Client,
    client_id: String,
    client_secret: String,
    token_json: String,
    token_url: String,
    timeout: Duration,
}

impl Debug for OAuthRefresher {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        f.debug_struct("OAuthRefresher")
            .field("token_url", &self.token_url)
            .field("timeout", &self.timeout)
            .finish_non_exhaustive()
    }
}

impl OAuthRefresher {
    /// Create a refresher.
    ///
    /// # Arguments
    /// * `token_json` - JSON blob holding at least `refresh_token`; parsed on
    ///   every refresh so a bad value surfaces as a per-message error
    /// * `token_url` - OAuth token endpoint
    pub fn new(
        http_client: reqwest::Client,
        client_id: String,
        client_secret: String,
        token_json: String,
        token_url: String,
    ) -> Self {
        Self {
            http_client,
            client_id,
            client_secret,
            token_json,
            token_url,
            timeout: TOKEN_REFRESH_TIMEOUT,
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Exchange the stored refresh token for a fresh bearer token.
    pub async fn refresh(&self) -> Result<Credential, CredentialError> {
        let stored: StoredToken =
            serde_json::from_str(&self.token_json).map_err(CredentialError::InvalidTokenJson)?;
        if stored.refresh_token.trim().is_empty() {
            return Err(CredentialError::Config(
                "TOKEN_JSON has an empty refresh_token".to_string(),
            ));
        }

        let start = std::time::Instant::now();
        let response = self
            .http_client
            .post(&self.token_url)
            .timeout(self.timeout)
            .form(&[
                ("client_id", self.client_id.as_str()),
                ("client_secret", self.client_secret.as_str()),
                ("refresh_token", stored.refresh_token.as_str()),
                ("grant_type", "refresh_token"),
            ])
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            tracing::warn!(
                status = status.as_u16(),
                token_url = %self.token_url,
                duration_ms = start.elapsed().as_secs_f64() * 1000.0,
                "OAuth token refresh rejected"
            );
            return Err(CredentialError::Rejected {
                status: status.as_u16(),
                reason: status_reason(status),
            });
        }

        let body = response.text().await?;
        let parsed: TokenResponse = serde_json::from_str(&body)
            .map_err(|e| CredentialError::MalformedResponse(e.to_string()))?;
        let access_token = parsed
            .access_token
            .filter(|token| !token.is_empty())
            .ok_or_else(|| {
                CredentialError::MalformedResponse("missing access_token".to_string())
            })?;

        tracing::debug!(
            duration_ms = start.elapsed().as_secs_f64() * 1000.0,
            "OAuth token refreshed"
        );

        Ok(Credential::Bearer(access_token))
    }
}

#[async_trait]
impl CredentialProvider for OAuthRefresher {
    async fn credential(&self) -> Result<Credential, CredentialError> {
        self.refresh().await
    }
}

/// Static Basic-auth credentials.
#[derive(Clone)]
pub struct BasicCredentials {
    username: String,
    password: String,
}

impl Debug for BasicCredentials {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        f.debug_struct("BasicCredentials")
            .field("username", &self.username)
            .finish_non_exhaustive()
    }
}

impl BasicCredentials {
    pub fn new(username: String, password: String) -> Result<Self, CredentialError> {
        if username.is_empty() {
            return Err(CredentialError::Config("USERNAME not configured".to_string()));
        }
        Ok(Self { username, password })
    }

    pub fn username(&self) -> &str {
        &self.username
    }

    /// Derive the Basic credential; pure and synchronous.
    pub fn basic_auth(&self) -> Credential {
        let raw = format!("{}:{}", self.username, self.password);
        Credential::Basic(base64::engine::general_purpose::STANDARD.encode(raw))
    }
}

#[async_trait]
impl CredentialProvider for BasicCredentials {
    async fn credential(&self) -> Result<Credential, CredentialError> {
        Ok(self.basic_auth())
    }
}
