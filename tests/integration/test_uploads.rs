use crate::common::*;
use interface_actions::models::{ArchiveSource, TaskParams, TaskStatus};
use serde_json::json;

#[tokio::test]
async fn test_upload_sync_uses_url_file_name() {
    let app_state = setup_test_app();
    let app = test_service!(app_state.state);

    let req = actix_web::test::TestRequest::post()
        .uri("/upload-zip-url-sync")
        .set_json(json!({
            "zip_url": "https://files.example.com/exports/report.zip",
            "message": "summarize this"
        }))
        .to_request();
    let resp = actix_web::test::call_service(&app, req).await;
    assert_eq!(resp.status(), 200);

    let body: serde_json::Value = actix_web::test::read_body_json(resp).await;
    assert_eq!(body["status"], "completed");
    assert_eq!(body["filename"], "report.zip");
    assert_eq!(body["zip_url"], "https://files.example.com/exports/report.zip");
    assert_eq!(body["message_sent"], "summarize this");
    assert_eq!(body["conversation_url"], CONVERSATION_URL);

    let id: uuid::Uuid = body["task_id"].as_str().unwrap().parse().unwrap();
    let task = app_state.state.manager.store().get(&id).unwrap();
    match task.params {
        TaskParams::UploadZipFile(p) => {
            assert_eq!(
                p.source,
                ArchiveSource::Url("https://files.example.com/exports/report.zip".to_string())
            );
            assert_eq!(p.filename, "report.zip");
        }
        other => panic!("unexpected params {:?}", other),
    }
}

#[tokio::test]
async fn test_upload_background_falls_back_to_default_name() {
    let app_state = setup_test_app();
    let app = test_service!(app_state.state);

    let req = actix_web::test::TestRequest::post()
        .uri("/upload-zip-url")
        .set_json(json!({"zip_url": "https://files.example.com/download?id=42"}))
        .to_request();
    let resp = actix_web::test::call_service(&app, req).await;
    assert_eq!(resp.status(), 202);

    let body: serde_json::Value = actix_web::test::read_body_json(resp).await;
    assert_eq!(body["filename"], "downloaded_file.zip");
    assert_eq!(body["message_sent"], "Please analyze the attached archive.");

    let id: uuid::Uuid = body["task_id"].as_str().unwrap().parse().unwrap();
    let task = wait_for_status(&app_state.state.manager, id, TaskStatus::Completed).await;
    assert_eq!(
        task.result.unwrap().filename.as_deref(),
        Some("downloaded_file.zip")
    );
}

#[tokio::test]
async fn test_upload_failure_echoes_file_name() {
    let app_state = setup_test_app();
    let app = test_service!(app_state.state);

    let req = actix_web::test::TestRequest::post()
        .uri("/upload-zip-url-sync")
        .set_json(json!({
            "zip_url": "https://files.example.com/a/data.zip",
            "message": "boom"
        }))
        .to_request();
    let resp = actix_web::test::call_service(&app, req).await;
    assert_eq!(resp.status(), 500);

    let body: serde_json::Value = actix_web::test::read_body_json(resp).await;
    assert_eq!(body["status"], "failed");
    assert_eq!(body["filename"], "data.zip");
    assert_eq!(body["message_sent"], "boom");
    assert!(body["error_message"].as_str().unwrap().contains("boom"));
}

#[tokio::test]
async fn test_upload_rejects_bad_urls() {
    let app_state = setup_test_app();
    let app = test_service!(app_state.state);

    for zip_url in [
        "ftp://files.example.com/a.zip",
        "http://localhost/a.zip",
        "http://10.0.0.5/a.zip",
        "http://printer.local/a.zip",
        "definitely not a url",
    ] {
        let req = actix_web::test::TestRequest::post()
            .uri("/upload-zip-url")
            .set_json(json!({"zip_url": zip_url}))
            .to_request();
        let resp = actix_web::test::call_service(&app, req).await;
        assert_eq!(resp.status(), 400, "{} should be rejected", zip_url);

        let body: serde_json::Value = actix_web::test::read_body_json(resp).await;
        assert!(
            body["details"]
                .as_array()
                .unwrap()
                .iter()
                .any(|d| d.as_str().unwrap().starts_with("zip_url"))
        );
    }

    assert!(app_state.state.manager.list(None, 10).is_empty());
}

#[tokio::test]
async fn test_upload_queue_full_echoes_request() {
    let app_state = setup_stalled_test_app(1);
    app_state.state.queue.submit(uuid::Uuid::new_v4()).unwrap();
    let app = test_service!(app_state.state);

    let req = actix_web::test::TestRequest::post()
        .uri("/upload-zip-url")
        .set_json(json!({
            "zip_url": "https://files.example.com/exports/late.zip",
            "message": "too late"
        }))
        .to_request();
    let resp = actix_web::test::call_service(&app, req).await;
    assert_eq!(resp.status(), 429);

    let body: serde_json::Value = actix_web::test::read_body_json(resp).await;
    assert_eq!(body["status"], "failed");
    assert_eq!(body["filename"], "late.zip");
    assert_eq!(body["zip_url"], "https://files.example.com/exports/late.zip");
    assert_eq!(body["message_sent"], "too late");
    assert!(
        body["error_message"]
            .as_str()
            .unwrap()
            .contains("queue is full")
    );
}
