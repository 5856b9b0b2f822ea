//! Per-message pipeline: intake, best-effort archive, forward.
//!
//! Stages only move forward: `Intake -> Archiving -> Forwarding -> Done`.
//! Every error raised while archiving, panics included, is logged and
//! swallowed. Forwarding always runs afterwards, exactly once, and its error
//! is the only one returned to the caller.

use std::fmt::{Display, Formatter, Result as FmtResult};
use std::panic::AssertUnwindSafe;
use std::sync::Arc;

use bytes::Bytes;
use futures::FutureExt;
use tokio::io::AsyncReadExt;
use tracing::{field, Instrument, Span};

use mailkeep_core::{ArchiverConfig, ForwardError, InboundEmail};
use mailkeep_storage::{create_archive, Archive, ArchiveError, ArchiveFilename, UploadReceipt};

// Archive panics are contained with `catch_unwind`, which needs unwinding.
#[cfg(not(panic = "unwind"))]
compile_error!("mailkeep-pipeline requires panic = \"unwind\" to contain archive panics");

/// Stage of one pipeline invocation
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Stage {
    Intake,
    Archiving,
    Forwarding,
    Done,
}

impl Stage {
    pub fn as_str(&self) -> &'static str {
        match self {
            Stage::Intake => "intake",
            Stage::Archiving => "archiving",
            Stage::Forwarding => "forwarding",
            Stage::Done => "done",
        }
    }
}

impl Display for Stage {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        f.write_str(self.as_str())
    }
}

/// Archive-then-forward handler shared by all invocations.
///
/// Holds only read-only state; each call to [`Pipeline::handle`] owns its own
/// body, filename, and credential.
#[derive(Clone)]
pub struct Pipeline {
    archive: Arc<dyn Archive>,
    backup_address: String,
}

impl Pipeline {
    pub fn new(archive: Arc<dyn Archive>, backup_address: impl Into<String>) -> Self {
        Self {
            archive,
            backup_address: backup_address.into(),
        }
    }

    /// Validate configuration and build the configured archive backend.
    pub fn from_config(config: &ArchiverConfig) -> Result<Self, anyhow::Error> {
        config.validate()?;
        let archive = create_archive(config)?;
        tracing::info!(
            backend = %archive.backend_type(),
            environment = %config.environment,
            "Pipeline initialized"
        );
        Ok(Self::new(archive, config.backup_email()))
    }

    pub fn backup_address(&self) -> &str {
        &self.backup_address
    }

    /// Process one inbound message.
    ///
    /// Returns an error only when forwarding fails.
    pub async fn handle<M>(&self, message: &M) -> Result<(), ForwardError>
    where
        M: InboundEmail + ?Sized,
    {
        let span = tracing::info_span!(
            "inbound_email",
            sender = %message.sender(),
            recipient = %message.recipient(),
            stage = field::Empty,
        );
        self.run(message).instrument(span).await
    }

    async fn run<M>(&self, message: &M) -> Result<(), ForwardError>
    where
        M: InboundEmail + ?Sized,
    {
        enter(Stage::Intake);
        let raw_body = read_body(message).await;
        tracing::info!(
            sender = %message.sender(),
            recipient = %message.recipient(),
            subject = %message.headers().get("subject").unwrap_or_default(),
            size_bytes = raw_body.as_ref().map(Bytes::len).unwrap_or_default(),
            "Received email"
        );

        enter(Stage::Archiving);
        let archived = AssertUnwindSafe(self.archive_message(raw_body))
            .catch_unwind()
            .await
            .unwrap_or_else(|panic| Err(ArchiveError::Panicked(panic_message(&*panic))));
        match archived {
            Ok(receipt) => tracing::info!(
                filename = %receipt.filename,
                object_id = receipt.object_id.as_deref().unwrap_or_default(),
                location = %receipt.location,
                backend = %self.archive.backend_type(),
                "uploaded as {}",
                receipt.filename
            ),
            Err(error) => tracing::error!(
                error = %error,
                chain = %error_chain(&error),
                backend = %self.archive.backend_type(),
                "Archive failed, forwarding anyway"
            ),
        }

        enter(Stage::Forwarding);
        if let Err(error) = message.forward(&self.backup_address).await {
            tracing::error!(
                error = %error,
                chain = %error_chain(&error),
                address = %self.backup_address,
                "Forward failed"
            );
            return Err(error);
        }
        tracing::info!(address = %self.backup_address, "Forwarded email");

        enter(Stage::Done);
        Ok(())
    }

    /// Filename, then credential, then one upload.
    async fn archive_message(
        &self,
        raw_body: std::io::Result<Bytes>,
    ) -> Result<UploadReceipt, ArchiveError> {
        let raw_body = raw_body?;
        let filename = ArchiveFilename::generate();
        let credential = self.archive.credential().await?;
        let receipt = self.archive.upload(&credential, raw_body, &filename).await?;
        Ok(receipt)
    }
}

fn enter(stage: Stage) {
    Span::current().record("stage", stage.as_str());
    tracing::debug!(stage = %stage, "Pipeline stage");
}

async fn read_body<M>(message: &M) -> std::io::Result<Bytes>
where
    M: InboundEmail + ?Sized,
{
    let mut reader = message.raw();
    let mut buf = Vec::new();
    reader.read_to_end(&mut buf).await?;
    Ok(Bytes::from(buf))
}

/// Display of an error followed by each of its sources.
pub(crate) fn error_chain(error: &(dyn std::error::Error + 'static)) -> String {
    let mut chain = error.to_string();
    let mut source = error.source();
    while let Some(cause) = source {
        chain.push_str(": ");
        chain.push_str(&cause.to_string());
        source = cause.source();
    }
    chain
}

fn panic_message(panic: &(dyn std::any::Any + Send)) -> String {
    panic
        .downcast_ref::<&str>()
        .map(|s| s.to_string())
        .or_else(|| panic.downcast_ref::<String>().cloned())
        .unwrap_or_else(|| "unknown panic".to_string())
}
