use std::fmt::{Display, Formatter, Result as FmtResult};
use std::str::FromStr;

/// Archive backend types
///
/// Selected once from configuration when the process starts; the pipeline
/// never branches on it afterwards.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ArchiveBackend {
    /// Drive-style object store (OAuth bearer token, multipart/related upload)
    Drive,
    /// WebDAV file share (Basic auth, PUT of the raw message)
    WebDav,
}

impl FromStr for ArchiveBackend {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "drive" | "gdrive" => Ok(ArchiveBackend::Drive),
            "webdav" | "nextcloud" => Ok(ArchiveBackend::WebDav),
            _ => Err(anyhow::anyhow!("Invalid archive backend: {}", s)),
        }
    }
}

impl Display for ArchiveBackend {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        match self {
            ArchiveBackend::Drive => write!(f, "drive"),
            ArchiveBackend::WebDav => write!(f, "webdav"),
        }
    }
}
