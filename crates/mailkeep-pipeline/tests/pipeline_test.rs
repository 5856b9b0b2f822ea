//! End-to-end pipeline tests against mock archive backends.
//!
//! Run with: `cargo test -p mailkeep-pipeline --test pipeline_test`

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use mailkeep_core::{ArchiverConfig, ForwardError};
use mailkeep_pipeline::{Pipeline, Relay, RelayedMessage};
use mockito::{Matcher, Server};

const RAW: &[u8] = b"From: a@x.com\r\nTo: b@y.com\r\nSubject: Test\r\n\r\nhello";
const BACKUP: &str = "backup@example.com";
const FILENAME_PATH: &str = r"^/remote\.php/dav/files/alice/Mail/new/\d+\.M\d+P\d{1,6}\.mailkeep-archiver$";

#[derive(Default)]
struct RecordingRelay {
    fail: bool,
    forwarded: Mutex<Vec<String>>,
}

#[async_trait]
impl Relay for RecordingRelay {
    async fn relay(&self, _sender: &str, to: &str, raw: &[u8]) -> Result<(), ForwardError> {
        assert_eq!(raw, RAW, "forward must carry the original bytes");
        self.forwarded.lock().unwrap().push(to.to_string());
        if self.fail {
            Err(ForwardError::Relay("simulated network error".to_string()))
        } else {
            Ok(())
        }
    }
}

impl RecordingRelay {
    fn failing() -> Self {
        Self {
            fail: true,
            ..Self::default()
        }
    }

    fn forwarded(&self) -> Vec<String> {
        self.forwarded.lock().unwrap().clone()
    }
}

fn config(pairs: Vec<(&str, String)>) -> ArchiverConfig {
    let mut values: HashMap<String, String> = pairs
        .into_iter()
        .map(|(k, v)| (k.to_string(), v))
        .collect();
    values.insert("BACKUP_EMAIL".to_string(), BACKUP.to_string());
    ArchiverConfig::from_map(&values).unwrap()
}

fn drive_config(server: &Server) -> ArchiverConfig {
    config(vec![
        ("ARCHIVE_BACKEND", "drive".to_string()),
        ("API_CLIENT_ID", "client-id".to_string()),
        ("API_CLIENT_SECRET", "client-secret".to_string()),
        ("TOKEN_JSON", r#"{"refresh_token":"refresh-me"}"#.to_string()),
        ("FOLDER_ID", "folder-1".to_string()),
        ("OAUTH_TOKEN_URL", format!("{}/token", server.url())),
        (
            "DRIVE_UPLOAD_URL",
            format!("{}/upload/drive/v3/files?uploadType=multipart", server.url()),
        ),
    ])
}

fn webdav_config(server: &Server) -> ArchiverConfig {
    config(vec![
        ("ARCHIVE_BACKEND", "webdav".to_string()),
        ("BASE_URL", format!("{}/", server.url())),
        ("USERNAME", "alice".to_string()),
        ("PASSWORD", "s3cret".to_string()),
        ("MAILDIR_PATH", "/Mail/".to_string()),
    ])
}

fn message(relay: Arc<RecordingRelay>) -> RelayedMessage {
    RelayedMessage::new("a@x.com", "b@y.com", RAW.to_vec(), relay)
}

#[tokio::test]
async fn test_drive_upload_then_forward() {
    let mut server = Server::new_async().await;
    let token = server
        .mock("POST", "/token")
        .match_body(Matcher::UrlEncoded(
            "grant_type".into(),
            "refresh_token".into(),
        ))
        .with_status(200)
        .with_body(r#"{"access_token":"abc"}"#)
        .create_async()
        .await;
    let upload = server
        .mock("POST", "/upload/drive/v3/files")
        .match_query(Matcher::UrlEncoded(
            "uploadType".into(),
            "multipart".into(),
        ))
        .match_header("authorization", "Bearer abc")
        .match_body(Matcher::Regex("hello".to_string()))
        .with_status(200)
        .with_body(r#"{"id":"123"}"#)
        .create_async()
        .await;

    let pipeline = Pipeline::from_config(&drive_config(&server)).unwrap();
    let relay = Arc::new(RecordingRelay::default());

    pipeline.handle(&message(relay.clone())).await.unwrap();

    token.assert_async().await;
    upload.assert_async().await;
    assert_eq!(relay.forwarded(), vec![BACKUP.to_string()]);
}

#[tokio::test]
async fn test_token_rejection_skips_upload_and_forwards() {
    let mut server = Server::new_async().await;
    let token = server
        .mock("POST", "/token")
        .with_status(401)
        .create_async()
        .await;
    let upload = server
        .mock("POST", "/upload/drive/v3/files")
        .match_query(Matcher::Any)
        .expect(0)
        .create_async()
        .await;

    let pipeline = Pipeline::from_config(&drive_config(&server)).unwrap();
    let relay = Arc::new(RecordingRelay::default());

    pipeline.handle(&message(relay.clone())).await.unwrap();

    token.assert_async().await;
    upload.assert_async().await;
    assert_eq!(relay.forwarded(), vec![BACKUP.to_string()]);
}

#[tokio::test]
async fn test_malformed_token_json_never_reaches_network() {
    let mut server = Server::new_async().await;
    let token = server
        .mock("POST", "/token")
        .expect(0)
        .create_async()
        .await;
    let upload = server
        .mock("POST", "/upload/drive/v3/files")
        .match_query(Matcher::Any)
        .expect(0)
        .create_async()
        .await;

    let mut config = drive_config(&server);
    config.token_json = Some("{\"refresh_token\":".to_string());
    let pipeline = Pipeline::from_config(&config).unwrap();
    let relay = Arc::new(RecordingRelay::default());

    pipeline.handle(&message(relay.clone())).await.unwrap();

    token.assert_async().await;
    upload.assert_async().await;
    assert_eq!(relay.forwarded().len(), 1);
}

#[tokio::test]
async fn test_drive_missing_id_still_forwards() {
    let mut server = Server::new_async().await;
    server
        .mock("POST", "/token")
        .with_status(200)
        .with_body(r#"{"access_token":"abc"}"#)
        .create_async()
        .await;
    let upload = server
        .mock("POST", "/upload/drive/v3/files")
        .match_query(Matcher::Any)
        .with_status(200)
        .with_body("{}")
        .create_async()
        .await;

    let pipeline = Pipeline::from_config(&drive_config(&server)).unwrap();
    let relay = Arc::new(RecordingRelay::default());

    pipeline.handle(&message(relay.clone())).await.unwrap();

    upload.assert_async().await;
    assert_eq!(relay.forwarded().len(), 1);
}

#[tokio::test]
async fn test_webdav_server_error_still_forwards() {
    let mut server = Server::new_async().await;
    let put = server
        .mock("PUT", Matcher::Regex(FILENAME_PATH.to_string()))
        .match_header("authorization", "Basic YWxpY2U6czNjcmV0")
        .match_header("content-type", "message/rfc822")
        .with_status(500)
        .create_async()
        .await;

    let pipeline = Pipeline::from_config(&webdav_config(&server)).unwrap();
    let relay = Arc::new(RecordingRelay::default());

    pipeline.handle(&message(relay.clone())).await.unwrap();

    put.assert_async().await;
    assert_eq!(relay.forwarded(), vec![BACKUP.to_string()]);
}

#[tokio::test]
async fn test_forward_failure_is_reported_after_archive() {
    let mut server = Server::new_async().await;
    let put = server
        .mock("PUT", Matcher::Regex(FILENAME_PATH.to_string()))
        .match_body(Matcher::Exact(String::from_utf8(RAW.to_vec()).unwrap()))
        .with_status(201)
        .create_async()
        .await;

    let pipeline = Pipeline::from_config(&webdav_config(&server)).unwrap();
    let relay = Arc::new(RecordingRelay::failing());

    let result = pipeline.handle(&message(relay.clone())).await;

    assert!(matches!(result, Err(ForwardError::Relay(_))));
    put.assert_async().await;
    assert_eq!(relay.forwarded().len(), 1);
}

#[tokio::test]
async fn test_concurrent_messages_refresh_independently() {
    let mut server = Server::new_async().await;
    let token = server
        .mock("POST", "/token")
        .with_status(200)
        .with_body(r#"{"access_token":"abc"}"#)
        .expect(2)
        .create_async()
        .await;
    let upload = server
        .mock("POST", "/upload/drive/v3/files")
        .match_query(Matcher::Any)
        .with_status(200)
        .with_body(r#"{"id":"123"}"#)
        .expect(2)
        .create_async()
        .await;

    let pipeline = Pipeline::from_config(&drive_config(&server)).unwrap();
    let relay = Arc::new(RecordingRelay::default());
    let first = message(relay.clone());
    let second = message(relay.clone());

    let (a, b) = tokio::join!(pipeline.handle(&first), pipeline.handle(&second));
    a.unwrap();
    b.unwrap();

    token.assert_async().await;
    upload.assert_async().await;
    assert_eq!(relay.forwarded().len(), 2);
}
