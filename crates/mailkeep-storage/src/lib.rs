//! Mailkeep Storage Library
//!
//! This crate provides the archive abstraction and its backends: a Drive-style
//! object store reached with an OAuth refresh-token exchange, and a
//! WebDAV-style file share reached with Basic auth.
//!
//! # Archive filename format
//!
//! Every archived message is named `<unix-seconds>.M<microseconds>P<random>.<host-tag>`,
//! following the maildir unique-name convention. Generation lives in the
//! `filename` module so both backends name files identically.
//!
//! # Failure policy
//!
//! Each archive performs exactly one credential acquisition and one write per
//! message. Nothing here retries, caches, or queues.

pub mod credentials;
#[cfg(feature = "archive-drive")]
pub mod drive;
pub mod factory;
pub mod filename;
pub mod traits;
#[cfg(feature = "archive-webdav")]
pub mod webdav;

// Re-export commonly used types
pub use credentials::{BasicCredentials, Credential, CredentialProvider, OAuthRefresher};
#[cfg(feature = "archive-drive")]
pub use drive::DriveArchive;
pub use factory::create_archive;
pub use filename::ArchiveFilename;
pub use mailkeep_core::ArchiveBackend;
pub use traits::{
    Archive, ArchiveError, ArchiveResult, CredentialError, UploadError, UploadReceipt,
};
#[cfg(feature = "archive-webdav")]
pub use webdav::WebDavArchive;
