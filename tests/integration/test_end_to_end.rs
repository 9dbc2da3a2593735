use std::sync::Arc;
use std::time::Duration;

use crate::common::*;
use interface_actions::{
    config::{DownloadConfig, DriverConfig, PlatformConfig},
    download::{ArchiveDownloader, DownloadError},
    models::{ArchiveSource, FailureKind, TaskParams, TaskStatus, UploadParams},
    runner::{PlatformExecutor, TaskManager},
    session::{SessionResolver, SnapshotFile},
};
use serde_json::json;
use tokio_util::sync::CancellationToken;

fn download_config(max_bytes: u64) -> DownloadConfig {
    DownloadConfig {
        max_bytes,
        skip_url_checks: true,
        ..DownloadConfig::default()
    }
}

/// Sidecar and file host in one mock: archives under `/files/`, driver calls elsewhere.
fn spawn_sidecar() -> MockServer {
    spawn_mock_server(|request| {
        if request.request_line.starts_with("GET /files/missing.zip") {
            http_response("404 Not Found", "text/plain", "gone")
        } else if request.request_line.starts_with("GET /files/") {
            http_response("200 OK", "application/zip", "PK\u{3}\u{4}fake archive")
        } else {
            ndjson_response(&[
                json!({"event": "conversation_url", "url": CONVERSATION_URL}),
                json!({
                    "event": "result",
                    "success": true,
                    "conversation_url": CONVERSATION_URL,
                    "ai_response": "archive looks fine",
                    "storage_state": {"cookies": [{
                        "name": "session_id", "value": "refreshed", "domain": ".manus.im"
                    }]}
                }),
            ])
        }
    })
}

fn platform_manager(base_url: &str, dir: &std::path::Path) -> (TaskManager, Arc<SessionResolver>) {
    let sessions = Arc::new(SessionResolver::new(
        Vec::new(),
        Arc::new(SnapshotFile::new(dir.join("state.json"))),
    ));
    let driver = Arc::new(
        interface_actions::driver::RemoteDriver::new(
            &DriverConfig {
                url: base_url.to_string(),
                request_timeout: Duration::from_secs(5),
            },
            &PlatformConfig::default(),
        )
        .unwrap(),
    );
    let executor = PlatformExecutor::new(
        driver,
        sessions.clone(),
        ArchiveDownloader::new(&download_config(1024)).unwrap(),
        PlatformConfig::default(),
        "default".to_string(),
    );
    (TaskManager::new(5, Arc::new(executor)), sessions)
}

fn upload_params(zip_url: String, filename: &str) -> TaskParams {
    TaskParams::UploadZipFile(UploadParams {
        source: ArchiveSource::Url(zip_url),
        filename: filename.to_string(),
        message: "check the archive".to_string(),
        platform: "manus".to_string(),
        conversation_url: None,
        wait_for_response: true,
        timeout_seconds: 30,
    })
}

#[tokio::test]
async fn test_upload_task_downloads_then_drives_the_sidecar() {
    let server = spawn_sidecar();
    let dir = tempfile::tempdir().unwrap();
    let (manager, sessions) = platform_manager(&server.base_url, dir.path());

    let id = manager.create(upload_params(
        format!("{}/files/report.zip", server.base_url),
        "report.zip",
    ));
    manager.execute(id).await;

    let task = manager.store().get(&id).unwrap();
    assert_eq!(task.status, TaskStatus::Completed, "{:?}", task.error_message);
    let output = task.result.unwrap();
    assert_eq!(output.conversation_url.as_deref(), Some(CONVERSATION_URL));
    assert_eq!(output.filename.as_deref(), Some("report.zip"));
    assert_eq!(output.ai_response.as_deref(), Some("archive looks fine"));
    assert!(output.response_received);

    let captured = server.captured().await;
    let upload = captured
        .iter()
        .find(|r| r.request_line.starts_with("POST /upload-archive"))
        .unwrap();
    let body: serde_json::Value = serde_json::from_str(&upload.body).unwrap();
    assert_eq!(body["filename"], "report.zip");
    assert_eq!(body["message"], "check the archive");

    // the refreshed browser state can be persisted
    assert!(sessions.persist_latest().await.unwrap());
    let saved = sessions.snapshot().read().await.unwrap().unwrap();
    assert_eq!(saved.cookies[0].value, "refreshed");
}

#[tokio::test]
async fn test_send_task_through_the_sidecar() {
    let server = spawn_sidecar();
    let dir = tempfile::tempdir().unwrap();
    let (manager, _sessions) = platform_manager(&server.base_url, dir.path());

    let id = manager.create(send_params("hello"));
    manager.execute(id).await;

    let task = manager.store().get(&id).unwrap();
    assert_eq!(task.status, TaskStatus::Completed);
    assert_eq!(task.conversation_url.as_deref(), Some(CONVERSATION_URL));
    assert_eq!(
        task.result.unwrap().message_sent.as_deref(),
        Some("hello")
    );
}

#[tokio::test]
async fn test_upload_task_fails_on_missing_archive() {
    let server = spawn_sidecar();
    let dir = tempfile::tempdir().unwrap();
    let (manager, _sessions) = platform_manager(&server.base_url, dir.path());

    let id = manager.create(upload_params(
        format!("{}/files/missing.zip", server.base_url),
        "missing.zip",
    ));
    manager.execute(id).await;

    let task = manager.store().get(&id).unwrap();
    assert_eq!(task.status, TaskStatus::Failed);
    assert_eq!(task.failure_kind, Some(FailureKind::Execution));
    assert!(task.error_message.as_deref().unwrap().contains("404"));
    assert!(
        !server
            .captured()
            .await
            .iter()
            .any(|r| r.request_line.starts_with("POST /upload-archive"))
    );
}

#[tokio::test]
async fn test_downloader_enforces_size_limit() {
    let server = spawn_sidecar();
    let downloader = ArchiveDownloader::new(&download_config(4)).unwrap();

    let err = downloader
        .fetch(
            &format!("{}/files/big.zip", server.base_url),
            &CancellationToken::new(),
        )
        .await
        .unwrap_err();
    assert!(matches!(err, DownloadError::TooLarge { max: 4, .. }));

    let downloader = ArchiveDownloader::new(&download_config(1024)).unwrap();
    let archive = downloader
        .fetch(
            &format!("{}/files/big.zip", server.base_url),
            &CancellationToken::new(),
        )
        .await
        .unwrap();
    assert_eq!(archive.filename, "big.zip");
    assert_eq!(archive.size, "PK\u{3}\u{4}fake archive".len() as u64);
    assert_eq!(
        std::fs::read(archive.path()).unwrap(),
        b"PK\x03\x04fake archive"
    );
}

#[tokio::test]
async fn test_downloader_checks_every_redirect_hop() {
    let server = spawn_mock_server(|request| {
        let redirect = |location: &str| {
            format!(
                "HTTP/1.1 302 Found\r\nLocation: {}\r\nContent-Length: 0\r\nConnection: close\r\n\r\n",
                location
            )
        };
        if request.request_line.starts_with("GET /moved.zip") {
            redirect("/files/moved.zip")
        } else if request.request_line.starts_with("GET /escape.zip") {
            redirect("http://169.254.169.254/latest/meta-data/keys.zip")
        } else {
            http_response("200 OK", "application/zip", "PK\u{3}\u{4}moved")
        }
    });
    // reachable by name, while its loopback address stays blocked
    let base_url = server.base_url.replace("127.0.0.1", "localhost");
    let downloader = ArchiveDownloader::new(&DownloadConfig {
        skip_url_checks: false,
        blocked_hostnames: Vec::new(),
        ..DownloadConfig::default()
    })
    .unwrap();

    let archive = downloader
        .fetch(&format!("{}/moved.zip", base_url), &CancellationToken::new())
        .await
        .unwrap();
    assert_eq!(archive.filename, "moved.zip");
    assert_eq!(server.hit_count(), 2);

    let err = downloader
        .fetch(&format!("{}/escape.zip", base_url), &CancellationToken::new())
        .await
        .unwrap_err();
    match err {
        DownloadError::InvalidUrl(reason) => assert!(reason.contains("169.254.169.254")),
        other => panic!("unexpected error {:?}", other),
    }
    assert_eq!(server.hit_count(), 3);
}
