use crate::credentials::{BasicCredentials, Credential, CredentialProvider};
use crate::filename::ArchiveFilename;
use crate::traits::{status_reason, Archive, CredentialError, UploadError, UploadReceipt};
use crate::ArchiveBackend;
use async_trait::async_trait;
use bytes::Bytes;
use reqwest::header::{AUTHORIZATION, CONTENT_TYPE};
use std::time::Duration;

/// Content type of an archived message: the raw RFC 822 bytes
pub const MESSAGE_CONTENT_TYPE: &str = "message/rfc822";

/// WebDAV-style archive (Nextcloud layout): Basic auth, one PUT per message
/// into the `new/` directory of a maildir on the share.
#[derive(Clone, Debug)]
pub struct WebDavArchive {
    http_client: reqwest::Client,
    credentials: BasicCredentials,
    base_url: String,
    maildir_path: String,
    upload_timeout: Duration,
}

impl WebDavArchive {
    pub fn new(
        http_client: reqwest::Client,
        credentials: BasicCredentials,
        base_url: String,
        maildir_path: String,
        upload_timeout: Duration,
    ) -> Self {
        WebDavArchive {
            http_client,
            credentials,
            base_url,
            maildir_path,
            upload_timeout,
        }
    }

    /// Target URL: `<base>/remote.php/dav/files/<user>/<maildir>/new/<filename>`
    ///
    /// Trailing slashes on the base and surrounding slashes on the maildir path
    /// are dropped so the result never contains `//`. Path segments are
    /// percent-encoded; a `..` segment is rejected.
    pub fn target_url(&self, filename: &ArchiveFilename) -> Result<String, UploadError> {
        let base = self.base_url.trim_end_matches('/');
        let mut segments = vec![
            "remote.php".to_string(),
            "dav".to_string(),
            "files".to_string(),
            urlencoding::encode(self.credentials.username()).into_owned(),
        ];

        for segment in self.maildir_path.split('/').filter(|s| !s.is_empty()) {
            if segment == ".." || segment == "." {
                return Err(UploadError::InvalidTarget(format!(
                    "maildir path must not contain '{}' segments",
                    segment
                )));
            }
            segments.push(urlencoding::encode(segment).into_owned());
        }

        segments.push("new".to_string());
        segments.push(urlencoding::encode(filename.as_str()).into_owned());

        Ok(format!("{}/{}", base, segments.join("/")))
    }
}

#[async_trait]
impl Archive for WebDavArchive {
    async fn credential(&self) -> Result<Credential, CredentialError> {
        self.credentials.credential().await
    }

    async fn upload(
        &self,
        credential: &Credential,
        raw_body: Bytes,
        filename: &ArchiveFilename,
    ) -> Result<UploadReceipt, UploadError> {
        let url = self.target_url(filename)?;
        let size = raw_body.len() as u64;
        let start = std::time::Instant::now();

        let response = self
            .http_client
            .put(&url)
            .timeout(self.upload_timeout)
            .header(AUTHORIZATION, credential.authorization())
            .header(CONTENT_TYPE, MESSAGE_CONTENT_TYPE)
            .body(raw_body)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            tracing::warn!(
                status = status.as_u16(),
                url = %url,
                size_bytes = size,
                duration_ms = start.elapsed().as_secs_f64() * 1000.0,
                "WebDAV upload rejected"
            );
            return Err(UploadError::Rejected {
                status: status.as_u16(),
                reason: status_reason(status),
            });
        }

        tracing::debug!(
            url = %url,
            size_bytes = size,
            duration_ms = start.elapsed().as_secs_f64() * 1000.0,
            "WebDAV upload successful"
        );

        Ok(UploadReceipt {
            filename: filename.clone(),
            object_id: None,
            location: url,
        })
    }

    fn backend_type(&self) -> ArchiveBackend {
        ArchiveBackend::WebDav
    }
}
