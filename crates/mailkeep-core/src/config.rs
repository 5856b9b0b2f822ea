//! Configuration module
//!
//! Configuration is a flat mapping of named secrets and identifiers supplied
//! at process start. It is read once, validated, and then shared read-only by
//! every pipeline invocation.

use std::collections::HashMap;
use std::env;
use std::fmt::{Debug, Formatter, Result as FmtResult};

use crate::backend_types::ArchiveBackend;

pub const DEFAULT_OAUTH_TOKEN_URL: &str = "https://oauth2.googleapis.com/token";
pub const DEFAULT_DRIVE_UPLOAD_URL: &str =
    "https://www.googleapis.com/upload/drive/v3/files?uploadType=multipart";

const UPLOAD_TIMEOUT_SECS: u64 = 25;
const MIN_UPLOAD_TIMEOUT_SECS: u64 = 10;
const SMTP_PORT: u16 = 587;

/// Application configuration
#[derive(Clone)]
pub struct ArchiverConfig {
    pub environment: String,
    /// Emit JSON log lines (`LOG_FORMAT=json`)
    pub log_json: bool,
    pub backend: ArchiveBackend,
    pub backup_email: String,
    /// Upload request timeout, always within 10..=25 seconds
    pub upload_timeout_secs: u64,
    // Drive-style backend
    pub api_client_id: Option<String>,
    pub api_client_secret: Option<String>,
    pub token_json: Option<String>,
    pub folder_id: Option<String>,
    pub oauth_token_url: String,
    pub drive_upload_url: String,
    // WebDAV-style backend
    pub base_url: Option<String>,
    pub username: Option<String>,
    pub password: Option<String>,
    pub maildir_path: Option<String>,
    // SMTP relay used to forward messages
    pub smtp_host: Option<String>,
    pub smtp_port: u16,
    pub smtp_user: Option<String>,
    pub smtp_password: Option<String>,
    pub smtp_tls: bool,
}

impl Debug for ArchiverConfig {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        f.debug_struct("ArchiverConfig")
            .field("environment", &self.environment)
            .field("log_json", &self.log_json)
            .field("backend", &self.backend)
            .field("backup_email", &self.backup_email)
            .field("upload_timeout_secs", &self.upload_timeout_secs)
            .field("folder_id", &self.folder_id)
            .field("base_url", &self.base_url)
            .field("username", &self.username)
            .field("maildir_path", &self.maildir_path)
            .field("smtp_host", &self.smtp_host)
            .field("smtp_port", &self.smtp_port)
            .finish_non_exhaustive()
    }
}

impl ArchiverConfig {
    pub fn from_env() -> Result<Self, anyhow::Error> {
        dotenvy::dotenv().ok();
        Self::from_lookup(|key| env::var(key).ok())
    }

    pub fn from_map(values: &HashMap<String, String>) -> Result<Self, anyhow::Error> {
        Self::from_lookup(|key| values.get(key).cloned())
    }

    /// Build the configuration from any key lookup.
    ///
    /// Blank values count as unset. Backend-specific keys are only checked by
    /// [`ArchiverConfig::validate`].
    pub fn from_lookup<F>(lookup: F) -> Result<Self, anyhow::Error>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| {
            lookup(key)
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
        };

        let backend = match get("ARCHIVE_BACKEND") {
            Some(value) => value.parse()?,
            None => ArchiveBackend::Drive,
        };

        let backup_email = get("BACKUP_EMAIL")
            .ok_or_else(|| anyhow::anyhow!("BACKUP_EMAIL must be set for forwarding"))?;

        let upload_timeout_secs = get("ARCHIVE_UPLOAD_TIMEOUT_SECS")
            .map(|v| {
                v.parse::<u64>().map_err(|_| {
                    anyhow::anyhow!("ARCHIVE_UPLOAD_TIMEOUT_SECS must be a valid number")
                })
            })
            .transpose()?
            .unwrap_or(UPLOAD_TIMEOUT_SECS)
            .clamp(MIN_UPLOAD_TIMEOUT_SECS, UPLOAD_TIMEOUT_SECS);

        let smtp_port = get("SMTP_PORT")
            .map(|v| {
                v.parse::<u16>()
                    .map_err(|_| anyhow::anyhow!("SMTP_PORT must be a valid port number"))
            })
            .transpose()?
            .unwrap_or(SMTP_PORT);

        let smtp_tls = get("SMTP_TLS")
            .map(|v| {
                parse_flag(&v).ok_or_else(|| anyhow::anyhow!("SMTP_TLS must be a boolean"))
            })
            .transpose()?
            .unwrap_or(true);

        Ok(ArchiverConfig {
            environment: get("ENVIRONMENT").unwrap_or_else(|| "development".to_string()),
            log_json: get("LOG_FORMAT")
                .map(|v| v.eq_ignore_ascii_case("json"))
                .unwrap_or(false),
            backend,
            backup_email,
            upload_timeout_secs,
            api_client_id: get("API_CLIENT_ID"),
            api_client_secret: get("API_CLIENT_SECRET"),
            token_json: get("TOKEN_JSON"),
            folder_id: get("FOLDER_ID"),
            oauth_token_url: get("OAUTH_TOKEN_URL")
                .unwrap_or_else(|| DEFAULT_OAUTH_TOKEN_URL.to_string()),
            drive_upload_url: get("DRIVE_UPLOAD_URL")
                .unwrap_or_else(|| DEFAULT_DRIVE_UPLOAD_URL.to_string()),
            base_url: get("BASE_URL"),
            username: get("USERNAME"),
            password: get("PASSWORD"),
            maildir_path: get("MAILDIR_PATH"),
            smtp_host: get("SMTP_HOST"),
            smtp_port,
            smtp_user: get("SMTP_USER"),
            smtp_password: get("SMTP_PASSWORD"),
            smtp_tls,
        })
    }

    pub fn validate(&self) -> Result<(), anyhow::Error> {
        if !self.backup_email.contains('@') {
            return Err(anyhow::anyhow!(
                "BACKUP_EMAIL must be a valid email address"
            ));
        }

        match self.backend {
            ArchiveBackend::Drive => {
                for (key, value) in [
                    ("API_CLIENT_ID", &self.api_client_id),
                    ("API_CLIENT_SECRET", &self.api_client_secret),
                    ("TOKEN_JSON", &self.token_json),
                    ("FOLDER_ID", &self.folder_id),
                ] {
                    if value.is_none() {
                        return Err(anyhow::anyhow!(
                            "{} must be set when using drive archive backend",
                            key
                        ));
                    }
                }
            }
            ArchiveBackend::WebDav => {
                for (key, value) in [
                    ("BASE_URL", &self.base_url),
                    ("USERNAME", &self.username),
                    ("PASSWORD", &self.password),
                    ("MAILDIR_PATH", &self.maildir_path),
                ] {
                    if value.is_none() {
                        return Err(anyhow::anyhow!(
                            "{} must be set when using webdav archive backend",
                            key
                        ));
                    }
                }
                let base_url = self.base_url.as_deref().unwrap_or_default();
                if !base_url.starts_with("http://") && !base_url.starts_with("https://") {
                    return Err(anyhow::anyhow!("BASE_URL must be an http(s) URL"));
                }
            }
        }

        Ok(())
    }

    pub fn is_production(&self) -> bool {
        let environment = self.environment.to_lowercase();
        environment == "production" || environment == "prod"
    }

    pub fn backup_email(&self) -> &str {
        &self.backup_email
    }

    pub fn archive_backend(&self) -> ArchiveBackend {
        self.backend
    }

    pub fn api_client_id(&self) -> Option<&str> {
        self.api_client_id.as_deref()
    }

    pub fn api_client_secret(&self) -> Option<&str> {
        self.api_client_secret.as_deref()
    }

    pub fn token_json(&self) -> Option<&str> {
        self.token_json.as_deref()
    }

    pub fn folder_id(&self) -> Option<&str> {
        self.folder_id.as_deref()
    }

    pub fn base_url(&self) -> Option<&str> {
        self.base_url.as_deref()
    }

    pub fn username(&self) -> Option<&str> {
        self.username.as_deref()
    }

    pub fn password(&self) -> Option<&str> {
        self.password.as_deref()
    }

    pub fn maildir_path(&self) -> Option<&str> {
        self.maildir_path.as_deref()
    }

    pub fn smtp_host(&self) -> Option<&str> {
        self.smtp_host.as_deref()
    }

    pub fn smtp_user(&self) -> Option<&str> {
        self.smtp_user.as_deref()
    }

    pub fn smtp_password(&self) -> Option<&str> {
        self.smtp_password.as_deref()
    }
}

fn parse_flag(value: &str) -> Option<bool> {
    match value.to_lowercase().as_str() {
        "true" | "1" | "yes" | "on" => Some(true),
        "false" | "0" | "no" | "off" => Some(false),
        _ => None,
    }
}
