//! Mailkeep Infrastructure Library
//!
//! Cross-cutting setup used by whatever host runs the pipeline.

pub mod telemetry;

pub use telemetry::{init_telemetry, DEFAULT_LOG_FILTER};
