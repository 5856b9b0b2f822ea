use crate::credentials::{Credential, CredentialProvider, OAuthRefresher};
use crate::filename::ArchiveFilename;
use crate::traits::{status_reason, Archive, CredentialError, UploadError, UploadReceipt};
use crate::ArchiveBackend;
use async_trait::async_trait;
use bytes::{BufMut, Bytes, BytesMut};
use reqwest::header::{AUTHORIZATION, CONTENT_TYPE};
use serde::Deserialize;
use serde_json::json;
use std::time::Duration;

/// Boundary token separating the metadata and media parts
pub const MULTIPART_BOUNDARY: &str = "mailkeep_archive_boundary";

#[derive(Deserialize)]
struct DriveFile {
    #[serde(default)]
    id: Option<String>,
}

/// Drive-style archive: OAuth bearer token, multipart/related upload into a folder
#[derive(Clone, Debug)]
pub struct DriveArchive {
    http_client: reqwest::Client,
    credentials: OAuthRefresher,
    folder_id: String,
    upload_url: String,
    upload_timeout: Duration,
}

impl DriveArchive {
    /// Create a new DriveArchive
    ///
    /// # Arguments
    /// * `credentials` - refresh-token exchange used before every upload
    /// * `folder_id` - parent folder for archived messages
    /// * `upload_url` - multipart upload endpoint, including `uploadType=multipart`
    /// * `upload_timeout` - bound on the upload request
    pub fn new(
        http_client: reqwest::Client,
        credentials: OAuthRefresher,
        folder_id: String,
        upload_url: String,
        upload_timeout: Duration,
    ) -> Self {
        DriveArchive {
            http_client,
            credentials,
            folder_id,
            upload_url,
            upload_timeout,
        }
    }

    /// Content type announcing the fixed multipart boundary
    pub fn content_type() -> String {
        format!("multipart/related; boundary={}", MULTIPART_BOUNDARY)
    }

    /// Build the two-part body: JSON metadata, then the raw message.
    pub(crate) fn multipart_body(&self, filename: &ArchiveFilename, raw_body: &[u8]) -> Bytes {
        let metadata = json!({
            "name": filename.as_str(),
            "parents": [self.folder_id],
        });

        let mut body = BytesMut::with_capacity(raw_body.len() + 256);
        body.put_slice(format!("--{}\r\n", MULTIPART_BOUNDARY).as_bytes());
        body.put_slice(b"Content-Type: application/json\r\n\r\n");
        body.put_slice(metadata.to_string().as_bytes());
        body.put_slice(format!("\r\n--{}\r\n", MULTIPART_BOUNDARY).as_bytes());
        body.put_slice(b"Content-Type: application/octet-stream\r\n\r\n");
        body.put_slice(raw_body);
        body.put_slice(format!("\r\n--{}--\r\n", MULTIPART_BOUNDARY).as_bytes());
        body.freeze()
    }
}

#[async_trait]
impl Archive for DriveArchive {
    async fn credential(&self) -> Result<Credential, CredentialError> {
        self.credentials.credential().await
    }

    async fn upload(
        &self,
        credential: &Credential,
        raw_body: Bytes,
        filename: &ArchiveFilename,
    ) -> Result<UploadReceipt, UploadError> {
        let size = raw_body.len() as u64;
        let body = self.multipart_body(filename, &raw_body);
        let start = std::time::Instant::now();

        let response = self
            .http_client
            .post(&self.upload_url)
            .timeout(self.upload_timeout)
            .header(AUTHORIZATION, credential.authorization())
            .header(CONTENT_TYPE, Self::content_type())
            .body(body)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            tracing::warn!(
                status = status.as_u16(),
                folder_id = %self.folder_id,
                filename = %filename,
                size_bytes = size,
                duration_ms = start.elapsed().as_secs_f64() * 1000.0,
                "Drive upload rejected"
            );
            return Err(UploadError::Rejected {
                status: status.as_u16(),
                reason: status_reason(status),
            });
        }

        // A 2xx without an id is not an acknowledgment.
        let body = response.text().await?;
        let object_id = serde_json::from_str::<DriveFile>(&body)
            .ok()
            .and_then(|file| file.id)
            .filter(|id| !id.is_empty())
            .ok_or(UploadError::MissingIdentifier)?;

        tracing::debug!(
            folder_id = %self.folder_id,
            filename = %filename,
            object_id = %object_id,
            size_bytes = size,
            duration_ms = start.elapsed().as_secs_f64() * 1000.0,
            "Drive upload successful"
        );

        Ok(UploadReceipt {
            filename: filename.clone(),
            location: format!("{}/{}", self.folder_id, filename),
            object_id: Some(object_id),
        })
    }

    fn backend_type(&self) -> ArchiveBackend {
        ArchiveBackend::Drive
    }
}
