//! SMTP-backed event source.
//!
//! [`RelayedMessage`] is an owned inbound message whose forward primitive
//! re-submits the original bytes, unmodified, to a relay with the backup
//! address as the sole envelope recipient.

use std::pin::Pin;
use std::sync::Arc;

use async_trait::async_trait;
use bytes::Bytes;
use lettre::address::Envelope;
use lettre::transport::smtp::authentication::Credentials;
use lettre::{Address, AsyncSmtpTransport, AsyncTransport, Tokio1Executor};
use tokio::io::AsyncRead;

use mailkeep_core::{ArchiverConfig, ForwardError, Headers, InboundEmail};

/// Delivers raw message bytes to a single address.
#[async_trait]
pub trait Relay: Send + Sync {
    async fn relay(&self, sender: &str, to: &str, raw: &[u8]) -> Result<(), ForwardError>;
}

/// Relay over SMTP
#[derive(Clone)]
pub struct SmtpRelay {
    mailer: Arc<AsyncSmtpTransport<Tokio1Executor>>,
}

impl SmtpRelay {
    /// Create the relay from config. Fails if `SMTP_HOST` is not set.
    pub fn from_config(config: &ArchiverConfig) -> Result<Self, anyhow::Error> {
        let host = config
            .smtp_host()
            .ok_or_else(|| anyhow::anyhow!("SMTP_HOST must be set to forward messages"))?;
        let port = config.smtp_port;

        let builder = if config.smtp_tls {
            AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(host)?.port(port)
        } else {
            AsyncSmtpTransport::<Tokio1Executor>::builder_dangerous(host).port(port)
        };
        let builder = if let (Some(u), Some(p)) = (config.smtp_user(), config.smtp_password()) {
            builder.credentials(Credentials::new(u.to_string(), p.to_string()))
        } else {
            builder
        };

        tracing::info!(
            host = %host,
            port = port,
            tls = config.smtp_tls,
            "SMTP relay initialized"
        );

        Ok(Self {
            mailer: Arc::new(builder.build()),
        })
    }
}

#[async_trait]
impl Relay for SmtpRelay {
    async fn relay(&self, sender: &str, to: &str, raw: &[u8]) -> Result<(), ForwardError> {
        let envelope = envelope(sender, to)?;
        self.mailer
            .send_raw(&envelope, raw)
            .await
            .map_err(|e| ForwardError::relay(format!("SMTP relay to {} failed", to), e))?;
        Ok(())
    }
}

/// Envelope with the original sender (null sender if unparseable or empty)
/// and `to` as the only recipient.
pub(crate) fn envelope(sender: &str, to: &str) -> Result<Envelope, ForwardError> {
    let to: Address = to
        .trim()
        .parse()
        .map_err(|_| ForwardError::InvalidAddress(to.to_string()))?;
    let from = sender.trim().parse::<Address>().ok();
    Envelope::new(from, vec![to]).map_err(|e| ForwardError::InvalidAddress(e.to_string()))
}

/// Inbound message held in memory and forwarded through a [`Relay`].
pub struct RelayedMessage {
    sender: String,
    recipient: String,
    headers: Headers,
    raw: Bytes,
    relay: Arc<dyn Relay>,
}

impl RelayedMessage {
    /// Wrap a received message; headers are read from the raw bytes.
    pub fn new(
        sender: impl Into<String>,
        recipient: impl Into<String>,
        raw: impl Into<Bytes>,
        relay: Arc<dyn Relay>,
    ) -> Self {
        let raw = raw.into();
        Self {
            sender: sender.into(),
            recipient: recipient.into(),
            headers: Headers::parse(&raw),
            raw,
            relay,
        }
    }
}

#[async_trait]
impl InboundEmail for RelayedMessage {
    fn sender(&self) -> &str {
        &self.sender
    }

    fn recipient(&self) -> &str {
        &self.recipient
    }

    fn headers(&self) -> &Headers {
        &self.headers
    }

    fn raw(&self) -> Pin<Box<dyn AsyncRead + Send + Unpin + '_>> {
        Box::pin(&self.raw[..])
    }

    async fn forward(&self, address: &str) -> Result<(), ForwardError> {
        self.relay.relay(&self.sender, address, &self.raw).await
    }
}
