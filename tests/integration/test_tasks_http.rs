use crate::common::*;
use interface_actions::models::TaskStatus;

#[tokio::test]
async fn test_get_unknown_task_is_404() {
    let app_state = setup_test_app();
    let app = test_service!(app_state.state);

    let req = actix_web::test::TestRequest::get()
        .uri(&format!("/task/{}", uuid::Uuid::new_v4()))
        .to_request();
    let resp = actix_web::test::call_service(&app, req).await;
    assert_eq!(resp.status(), 404);

    let req = actix_web::test::TestRequest::get()
        .uri("/task/not-a-uuid")
        .to_request();
    let resp = actix_web::test::call_service(&app, req).await;
    assert_eq!(resp.status(), 404);
}

#[tokio::test]
async fn test_cancel_over_http() {
    let app_state = setup_test_app();
    let manager = app_state.state.manager.clone();
    let app = test_service!(app_state.state);

    let id = manager.create(send_params("stay pending"));

    let req = actix_web::test::TestRequest::delete()
        .uri(&format!("/task/{}?reason=no%20longer%20needed", id))
        .to_request();
    let resp = actix_web::test::call_service(&app, req).await;
    assert_eq!(resp.status(), 200);
    let body: serde_json::Value = actix_web::test::read_body_json(resp).await;
    assert_eq!(body["task"]["status"], "failed");
    assert_eq!(body["task"]["failure_kind"], "cancelled");
    assert_eq!(body["task"]["error_message"], "no longer needed");

    let req = actix_web::test::TestRequest::delete()
        .uri(&format!("/task/{}", id))
        .to_request();
    let resp = actix_web::test::call_service(&app, req).await;
    assert_eq!(resp.status(), 409);

    let req = actix_web::test::TestRequest::delete()
        .uri(&format!("/task/{}", uuid::Uuid::new_v4()))
        .to_request();
    let resp = actix_web::test::call_service(&app, req).await;
    assert_eq!(resp.status(), 404);
}

#[tokio::test]
async fn test_cancel_running_task_over_http() {
    let app_state = setup_test_app();
    let manager = app_state.state.manager.clone();
    let app = test_service!(app_state.state);

    let id = manager.create(send_params("hold it"));
    let handle = manager.spawn(id).unwrap();
    wait_for_status(&manager, id, TaskStatus::Running).await;

    let req = actix_web::test::TestRequest::delete()
        .uri(&format!("/task/{}", id))
        .to_request();
    let resp = actix_web::test::call_service(&app, req).await;
    assert_eq!(resp.status(), 200);

    handle.await.unwrap();
    let task = manager.store().get(&id).unwrap();
    assert_eq!(task.status, TaskStatus::Failed);
    assert_eq!(task.error_message.as_deref(), Some("cancelled by caller"));
}

#[tokio::test]
async fn test_list_tasks_filters_and_limits() {
    let app_state = setup_test_app();
    let manager = app_state.state.manager.clone();
    let app = test_service!(app_state.state);

    let ok = manager.create(send_params("fine"));
    let bad = manager.create(send_params("boom"));
    manager.create(send_params("pending"));
    manager.execute(ok).await;
    manager.execute(bad).await;

    let req = actix_web::test::TestRequest::get().uri("/tasks").to_request();
    let body: serde_json::Value = actix_web::test::call_and_read_body_json(&app, req).await;
    assert_eq!(body["total"], 3);
    assert_eq!(body["max_concurrent_tasks"], 5);

    let req = actix_web::test::TestRequest::get()
        .uri("/tasks?status=failed")
        .to_request();
    let body: serde_json::Value = actix_web::test::call_and_read_body_json(&app, req).await;
    assert_eq!(body["total"], 1);
    assert_eq!(body["tasks"][0]["task_id"], bad.to_string());

    let req = actix_web::test::TestRequest::get()
        .uri("/tasks?limit=1")
        .to_request();
    let body: serde_json::Value = actix_web::test::call_and_read_body_json(&app, req).await;
    assert_eq!(body["tasks"].as_array().unwrap().len(), 1);

    let req = actix_web::test::TestRequest::get()
        .uri("/tasks?status=url_ready")
        .to_request();
    let resp = actix_web::test::call_service(&app, req).await;
    assert_eq!(resp.status(), 400);
    let body: serde_json::Value = actix_web::test::read_body_json(resp).await;
    assert_eq!(body["status"], 400);
    assert!(body["error"].as_str().unwrap().contains("url_ready"));
    assert!(body.get("message_sent").is_none());
}
