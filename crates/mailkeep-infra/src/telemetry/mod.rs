//! Tracing initialization
//!
//! Installs the global subscriber once per process: an `EnvFilter` from
//! `RUST_LOG` (falling back to [`DEFAULT_LOG_FILTER`]) and a fmt layer, JSON
//! formatted when configured or in production.

mod init_basic;

pub use init_basic::{init_telemetry, DEFAULT_LOG_FILTER};
