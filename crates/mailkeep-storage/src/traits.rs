//! Archive abstraction trait
//!
//! This module defines the Archive trait that all archive backends implement,
//! together with the errors an archive attempt can produce.

use crate::credentials::Credential;
use crate::filename::ArchiveFilename;
use crate::ArchiveBackend;
use async_trait::async_trait;
use bytes::Bytes;
use thiserror::Error;

/// Credential acquisition errors
#[derive(Debug, Error)]
pub enum CredentialError {
    #[error("Credential configuration error: {0}")]
    Config(String),

    #[error("Invalid TOKEN_JSON: {0}")]
    InvalidTokenJson(#[source] serde_json::Error),

    #[error("Token endpoint returned {status} {reason}")]
    Rejected { status: u16, reason: String },

    #[error("Token refresh timed out")]
    Timeout,

    #[error("Malformed token response: {0}")]
    MalformedResponse(String),

    #[error("Token request failed: {0}")]
    Network(#[source] reqwest::Error),
}

impl From<reqwest::Error> for CredentialError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_timeout() {
            CredentialError::Timeout
        } else {
            CredentialError::Network(e)
        }
    }
}

/// Backend write errors
#[derive(Debug, Error)]
pub enum UploadError {
    #[error("Backend returned {status} {reason}")]
    Rejected { status: u16, reason: String },

    #[error("Upload timed out")]
    Timeout,

    #[error("Backend acknowledged the upload without an object identifier")]
    MissingIdentifier,

    #[error("Upload request failed: {0}")]
    Network(#[source] reqwest::Error),

    #[error("Invalid upload target: {0}")]
    InvalidTarget(String),
}

impl From<reqwest::Error> for UploadError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_timeout() {
            UploadError::Timeout
        } else {
            UploadError::Network(e)
        }
    }
}

/// Any failure of the archiving sub-chain of a pipeline invocation
#[derive(Debug, Error)]
pub enum ArchiveError {
    #[error("Credential error: {0}")]
    Credential(#[from] CredentialError),

    #[error("Upload error: {0}")]
    Upload(#[from] UploadError),

    #[error("Failed to read message body: {0}")]
    Intake(#[from] std::io::Error),

    #[error("Archive configuration error: {0}")]
    Config(String),

    #[error("Archive task panicked: {0}")]
    Panicked(String),
}

/// Result type for archive operations
pub type ArchiveResult<T> = Result<T, ArchiveError>;

/// Backend acknowledgment of a successful write
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadReceipt {
    pub filename: ArchiveFilename,
    /// Object identifier assigned by the backend, when it returns one
    pub object_id: Option<String>,
    /// Where the object was written
    pub location: String,
}

/// Archive backend abstraction
///
/// A backend is chosen once at configuration time. For every message the
/// pipeline asks it for a fresh credential and then performs exactly one
/// upload with that credential. Implementations never retry internally.
#[async_trait]
pub trait Archive: Send + Sync {
    /// Obtain (or derive) the credential for one upload.
    async fn credential(&self) -> Result<Credential, CredentialError>;

    /// Write `raw_body` under `filename` using `credential`.
    async fn upload(
        &self,
        credential: &Credential,
        raw_body: Bytes,
        filename: &ArchiveFilename,
    ) -> Result<UploadReceipt, UploadError>;

    /// Get the archive backend type
    fn backend_type(&self) -> ArchiveBackend;
}

/// Reason string for an HTTP status, falling back to the numeric code.
pub(crate) fn status_reason(status: reqwest::StatusCode) -> String {
    status
        .canonical_reason()
        .map(String::from)
        .unwrap_or_else(|| status.as_str().to_string())
}
