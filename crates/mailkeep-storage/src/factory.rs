#[cfg(feature = "archive-drive")]
use crate::{DriveArchive, OAuthRefresher};
#[cfg(feature = "archive-webdav")]
use crate::{BasicCredentials, WebDavArchive};
use crate::{Archive, ArchiveBackend, ArchiveError, ArchiveResult};
use mailkeep_core::ArchiverConfig;
use std::sync::Arc;
use std::time::Duration;

/// Create the archive backend selected by configuration
pub fn create_archive(config: &ArchiverConfig) -> ArchiveResult<Arc<dyn Archive>> {
    let upload_timeout = Duration::from_secs(config.upload_timeout_secs);

    match config.archive_backend() {
        #[cfg(feature = "archive-drive")]
        ArchiveBackend::Drive => {
            let client_id = required(config.api_client_id(), "API_CLIENT_ID")?;
            let client_secret = required(config.api_client_secret(), "API_CLIENT_SECRET")?;
            let token_json = required(config.token_json(), "TOKEN_JSON")?;
            let folder_id = required(config.folder_id(), "FOLDER_ID")?;

            let http_client = http_client(upload_timeout)?;
            let credentials = OAuthRefresher::new(
                http_client.clone(),
                client_id,
                client_secret,
                token_json,
                config.oauth_token_url.clone(),
            );
            let archive = DriveArchive::new(
                http_client,
                credentials,
                folder_id,
                config.drive_upload_url.clone(),
                upload_timeout,
            );

            tracing::info!(
                folder_id = %config.folder_id().unwrap_or_default(),
                "Drive archive initialized"
            );
            Ok(Arc::new(archive))
        }

        #[cfg(not(feature = "archive-drive"))]
        ArchiveBackend::Drive => Err(ArchiveError::Config(
            "Drive archive backend not available (archive-drive feature not enabled)".to_string(),
        )),

        #[cfg(feature = "archive-webdav")]
        ArchiveBackend::WebDav => {
            let base_url = required(config.base_url(), "BASE_URL")?;
            let username = required(config.username(), "USERNAME")?;
            let password = required(config.password(), "PASSWORD")?;
            let maildir_path = required(config.maildir_path(), "MAILDIR_PATH")?;

            let credentials = BasicCredentials::new(username, password)?;
            let archive = WebDavArchive::new(
                http_client(upload_timeout)?,
                credentials,
                base_url,
                maildir_path,
                upload_timeout,
            );

            tracing::info!(
                base_url = %config.base_url().unwrap_or_default(),
                maildir_path = %config.maildir_path().unwrap_or_default(),
                "WebDAV archive initialized"
            );
            Ok(Arc::new(archive))
        }

        #[cfg(not(feature = "archive-webdav"))]
        ArchiveBackend::WebDav => Err(ArchiveError::Config(
            "WebDAV archive backend not available (archive-webdav feature not enabled)"
                .to_string(),
        )),
    }
}

fn required(value: Option<&str>, key: &str) -> ArchiveResult<String> {
    value
        .map(String::from)
        .ok_or_else(|| ArchiveError::Config(format!("{} not configured", key)))
}

fn http_client(timeout: Duration) -> ArchiveResult<reqwest::Client> {
    reqwest::Client::builder()
        .timeout(timeout)
        .build()
        .map_err(|e| ArchiveError::Config(format!("Failed to create HTTP client: {}", e)))
}
