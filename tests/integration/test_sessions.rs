use std::sync::Arc;
use std::time::Duration;

use crate::common::*;
use interface_actions::{
    config::{CredentialsConfig, FallbackSessionConfig},
    session::{
        BreakerState, Cookie, CredentialsClient, EnvSession, SessionOrigin, SessionResolver,
        SessionSource, SiteScope, SnapshotFile, StorageState,
    },
};
use serde_json::json;

fn scope() -> SiteScope {
    SiteScope::from_base_url("https://www.manus.im").unwrap()
}

fn credentials_config(base_url: &str, failure_threshold: u32) -> CredentialsConfig {
    CredentialsConfig {
        url: Some(base_url.to_string()),
        token: Some("secret-token".to_string()),
        timeout: Duration::from_secs(5),
        user_identifier: "alice".to_string(),
        failure_threshold,
        recovery_timeout: Duration::from_secs(60),
    }
}

fn credential_body() -> serde_json::Value {
    json!({
        "id": 7,
        "sessionData": {
            "cookies": {"session_id": "from-api", "theme": "dark"},
            "local_storage": {"lang": "en"}
        }
    })
}

fn local_state(value: &str) -> StorageState {
    StorageState {
        cookies: vec![Cookie {
            name: "session_id".to_string(),
            value: value.to_string(),
            domain: ".manus.im".to_string(),
            path: "/".to_string(),
            http_only: true,
            secure: true,
            same_site: "Lax".to_string(),
            expires: None,
        }],
        origins: Vec::new(),
    }
}

fn env_session(token: Option<&str>) -> Arc<EnvSession> {
    Arc::new(EnvSession::new(
        &FallbackSessionConfig {
            session_token: token.map(ToString::to_string),
            ..Default::default()
        },
        scope(),
    ))
}

#[tokio::test]
async fn test_credentials_client_request_and_mapping() {
    let server = spawn_fixed_server(json_response("200 OK", &credential_body()));
    let client = CredentialsClient::new(&credentials_config(&server.base_url, 3), scope()).unwrap();

    let state = client.load("manus", "alice").await.unwrap().unwrap();

    let session = state.cookies.iter().find(|c| c.name == "session_id").unwrap();
    assert_eq!(session.value, "from-api");
    assert_eq!(session.domain, ".manus.im");
    assert!(session.http_only);
    let theme = state.cookies.iter().find(|c| c.name == "theme").unwrap();
    assert!(!theme.http_only);
    assert_eq!(state.origins[0].origin, "https://www.manus.im");
    assert_eq!(state.origins[0].local_storage[0].name, "lang");

    let captured = server.captured().await;
    assert_eq!(captured.len(), 1);
    assert!(
        captured[0]
            .request_line
            .starts_with("GET /platform/manus/user/alice ")
    );
    assert_eq!(
        captured[0].headers.get("x-api-key").map(String::as_str),
        Some("secret-token")
    );
    assert_eq!(
        captured[0].headers.get("authorization").map(String::as_str),
        Some("Bearer secret-token")
    );
}

#[tokio::test]
async fn test_credentials_not_found_is_empty() {
    let server = spawn_fixed_server(json_response("404 Not Found", &json!({"detail": "none"})));
    let client = CredentialsClient::new(&credentials_config(&server.base_url, 3), scope()).unwrap();

    assert!(client.load("manus", "alice").await.unwrap().is_none());
    assert_eq!(client.breaker().state(), BreakerState::Closed);
}

#[tokio::test]
async fn test_credentials_breaker_opens_after_failures() {
    let server = spawn_fixed_server(json_response(
        "500 Internal Server Error",
        &json!({"error": "down"}),
    ));
    let client = CredentialsClient::new(&credentials_config(&server.base_url, 2), scope()).unwrap();

    assert!(client.load("manus", "alice").await.is_err());
    assert!(client.load("manus", "alice").await.is_err());
    assert_eq!(client.breaker().state(), BreakerState::Open);

    // skipped without a request while open
    assert!(client.load("manus", "alice").await.is_err());
    assert_eq!(server.hit_count(), 2);
}

#[tokio::test]
async fn test_resolution_priority() {
    let dir = tempfile::tempdir().unwrap();
    let snapshot = Arc::new(SnapshotFile::new(dir.path().join("state.json")));
    snapshot.write(&local_state("from-file")).await.unwrap();

    // credentials service first
    let server = spawn_fixed_server(json_response("200 OK", &credential_body()));
    let client = Arc::new(
        CredentialsClient::new(&credentials_config(&server.base_url, 3), scope()).unwrap(),
    );
    let resolver = SessionResolver::new(
        vec![
            client as Arc<dyn SessionSource>,
            env_session(Some("from-env")) as Arc<dyn SessionSource>,
        ],
        snapshot.clone(),
    );
    let resolved = resolver.resolve("manus", "alice").await;
    assert_eq!(resolved.origin, SessionOrigin::ApiCredentials);

    // environment when the service has nothing
    let empty = spawn_fixed_server(json_response("404 Not Found", &json!({})));
    let client = Arc::new(
        CredentialsClient::new(&credentials_config(&empty.base_url, 3), scope()).unwrap(),
    );
    let resolver = SessionResolver::new(
        vec![
            client as Arc<dyn SessionSource>,
            env_session(Some("from-env")) as Arc<dyn SessionSource>,
        ],
        snapshot.clone(),
    );
    let resolved = resolver.resolve("manus", "alice").await;
    assert_eq!(resolved.origin, SessionOrigin::Environment);
    let state = resolved.state.unwrap();
    assert_eq!(state.cookies[0].name, "session_token");
    assert_eq!(state.cookies[0].value, "from-env");

    // local file when the service fails and the environment is empty
    let broken = spawn_fixed_server(json_response("503 Service Unavailable", &json!({})));
    let client = Arc::new(
        CredentialsClient::new(&credentials_config(&broken.base_url, 3), scope()).unwrap(),
    );
    let resolver = SessionResolver::new(
        vec![
            client as Arc<dyn SessionSource>,
            env_session(None) as Arc<dyn SessionSource>,
        ],
        snapshot.clone(),
    );
    let resolved = resolver.resolve("manus", "alice").await;
    assert_eq!(resolved.origin, SessionOrigin::LocalFile);
    assert_eq!(resolved.state.unwrap().cookies[0].value, "from-file");

    // nothing anywhere
    let resolver = SessionResolver::new(
        vec![env_session(None) as Arc<dyn SessionSource>],
        Arc::new(SnapshotFile::new(dir.path().join("missing.json"))),
    );
    let resolved = resolver.resolve("manus", "alice").await;
    assert_eq!(resolved.origin, SessionOrigin::None);
    assert!(resolved.state.is_none());
}

#[tokio::test]
async fn test_session_endpoints() {
    let app_state = setup_test_app();
    let sessions = app_state.state.sessions.clone();
    let app = test_service!(app_state.state);

    let req = actix_web::test::TestRequest::get()
        .uri("/session-status")
        .to_request();
    let body: serde_json::Value = actix_web::test::call_and_read_body_json(&app, req).await;
    assert_eq!(body["session_exists"], false);
    assert_eq!(body["status"], "no_session");
    assert_eq!(body["source"], "none");

    // nothing remembered yet
    let req = actix_web::test::TestRequest::post()
        .uri("/session")
        .set_json(json!({}))
        .to_request();
    let resp = actix_web::test::call_service(&app, req).await;
    assert_eq!(resp.status(), 409);

    let req = actix_web::test::TestRequest::post()
        .uri("/session")
        .set_json(json!({"storage_state": {"cookies": [], "origins": []}}))
        .to_request();
    let resp = actix_web::test::call_service(&app, req).await;
    assert_eq!(resp.status(), 400);

    let req = actix_web::test::TestRequest::post()
        .uri("/session")
        .set_json(json!({"storage_state": local_state("posted")}))
        .to_request();
    let resp = actix_web::test::call_service(&app, req).await;
    assert_eq!(resp.status(), 200);
    let body: serde_json::Value = actix_web::test::read_body_json(resp).await;
    assert_eq!(body["saved"], true);
    assert_eq!(body["cookies_count"], 1);

    let req = actix_web::test::TestRequest::get()
        .uri("/session-status")
        .to_request();
    let body: serde_json::Value = actix_web::test::call_and_read_body_json(&app, req).await;
    assert_eq!(body["session_exists"], true);
    assert_eq!(body["status"], "valid");
    assert_eq!(body["source"], "local_file");
    assert_eq!(body["snapshot"]["expired"], false);

    // the last state reported by the driver is what an empty body saves
    sessions.remember(local_state("from-driver")).await;
    let req = actix_web::test::TestRequest::post()
        .uri("/session")
        .set_json(json!({}))
        .to_request();
    let resp = actix_web::test::call_service(&app, req).await;
    assert_eq!(resp.status(), 200);
    let saved = sessions.snapshot().read().await.unwrap().unwrap();
    assert_eq!(saved.cookies[0].value, "from-driver");
}
