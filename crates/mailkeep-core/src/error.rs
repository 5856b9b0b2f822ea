//! Error types module
//!
//! Archiving errors live next to the backends in `mailkeep-storage`; the only
//! error that may escape a pipeline invocation is defined here, because the
//! event source that produces it is a core abstraction.

/// Failure of the event source's forward-to-address primitive.
///
/// This is the one fatal error class of an invocation: there is no fallback
/// delivery path, so it is surfaced to the host runtime as-is.
#[derive(Debug, thiserror::Error)]
pub enum ForwardError {
    #[error("Invalid forward address: {0}")]
    InvalidAddress(String),

    /// For event sources whose relay reports no underlying error value.
    #[error("Relay failed: {0}")]
    Relay(String),

    #[error("Relay failed: {message}")]
    RelayWithSource {
        message: String,
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },
}

impl ForwardError {
    pub fn relay<E>(message: impl Into<String>, source: E) -> Self
    where
        E: std::error::Error + Send + Sync + 'static,
    {
        ForwardError::RelayWithSource {
            message: message.into(),
            source: Box::new(source),
        }
    }
}
