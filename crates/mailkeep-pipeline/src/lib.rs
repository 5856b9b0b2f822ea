//! Mailkeep Pipeline
//!
//! The per-message entry point: read the inbound message, archive a copy on a
//! best-effort basis, then forward the original to the backup address.
//!
//! ```no_run
//! # async fn run(raw: Vec<u8>) -> anyhow::Result<()> {
//! use std::sync::Arc;
//! use mailkeep_core::ArchiverConfig;
//! use mailkeep_pipeline::{Pipeline, RelayedMessage, SmtpRelay};
//!
//! let config = ArchiverConfig::from_env()?;
//! let pipeline = Pipeline::from_config(&config)?;
//! let relay = Arc::new(SmtpRelay::from_config(&config)?);
//!
//! let message = RelayedMessage::new("a@x.com", "b@y.com", raw, relay);
//! pipeline.handle(&message).await?;
//! # Ok(())
//! # }
//! ```

pub mod orchestrator;
pub mod relay;

pub use orchestrator::{Pipeline, Stage};
pub use relay::{Relay, RelayedMessage, SmtpRelay};
