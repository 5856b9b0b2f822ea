//! Mailkeep Core Library
//!
//! This crate provides the configuration, the archive backend selector, and the
//! inbound message abstraction shared by all Mailkeep components.

pub mod backend_types;
pub mod config;
pub mod error;
pub mod message;

// Re-export commonly used types
pub use backend_types::ArchiveBackend;
pub use config::ArchiverConfig;
pub use error::ForwardError;
pub use message::{Headers, InboundEmail};
