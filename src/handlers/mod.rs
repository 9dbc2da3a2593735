//! HTTP handlers for the interface actions endpoints.
//!
//! This module contains all HTTP handler functions that can be used by both
//! the main application and integration tests.

mod health;
mod message;
pub mod response;
mod session;
mod task;
mod upload;

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Instant;

use actix_web::{HttpResponse, web};
use utoipa::OpenApi;

use crate::{
    config::Config, driver::ChatDriver, dtos, models::TaskStatus, runner::TaskManager,
    session::SessionResolver, workers::WorkQueue,
};

pub use health::{health_check, service_info};
pub use message::{send_message, send_message_quick, send_message_sync};
pub use session::{save_session, session_status};
pub use task::{cancel_task, get_task, list_tasks};
pub use upload::{upload_zip_url, upload_zip_url_sync};

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    pub manager: TaskManager,
    pub queue: WorkQueue,
    pub sessions: Arc<SessionResolver>,
    pub driver: Arc<dyn ChatDriver>,
    pub config: Arc<Config>,
    pub started_at: Instant,
}

/// Health check response showing service and driver status.
#[derive(serde::Serialize, serde::Deserialize, utoipa::ToSchema)]
pub struct HealthResponse {
    /// Overall service status: "ok" or "degraded"
    pub status: String,
    pub version: String,
    /// Whether the browser driver answered its health probe
    pub driver_ready: bool,
    pub uptime_seconds: f64,
    pub running_tasks: usize,
    pub max_concurrent_tasks: usize,
    /// Tasks accepted but not yet handed to the runner
    pub queued_tasks: usize,
    /// Tasks held in the registry, finished ones included
    pub tracked_tasks: usize,
    pub tasks_by_status: HashMap<TaskStatus, usize>,
}

// =============================================================================
// OpenAPI Documentation
// =============================================================================

#[derive(OpenApi)]
#[openapi(
    paths(
        health::service_info,
        health::health_check,
        message::send_message,
        message::send_message_sync,
        message::send_message_quick,
        upload::upload_zip_url,
        upload::upload_zip_url_sync,
        task::get_task,
        task::cancel_task,
        task::list_tasks,
        session::session_status,
        session::save_session,
    ),
    components(schemas(
        HealthResponse,
        dtos::MessageRequest,
        dtos::MessageResponse,
        dtos::QuickMessageResponse,
        dtos::UploadZipUrlRequest,
        dtos::UploadResponse,
        dtos::RejectedRequest,
        dtos::TaskSnapshot,
        dtos::TaskListResponse,
        dtos::CancelTaskResponse,
        dtos::SessionStatusResponse,
        dtos::SaveSessionRequest,
        dtos::SaveSessionResponse,
        crate::models::TaskStatus,
        crate::models::TaskKind,
        crate::models::FailureKind,
        crate::models::TaskOutput,
        crate::session::StorageState,
        crate::session::Cookie,
        crate::session::OriginStorage,
        crate::session::LocalStorageEntry,
        crate::session::SessionOrigin,
        crate::session::SnapshotInfo,
    )),
    tags(
        (name = "service", description = "Service information and health."),
        (name = "messages", description = "Send a message to the chat platform, in the background, synchronously, or returning as soon as the conversation URL is known."),
        (name = "uploads", description = "Download a .zip archive from a URL and attach it to a conversation."),
        (name = "tasks", description = "Inspect, list and cancel tasks. Every message and upload request is tracked as a task."),
        (name = "session", description = "Browser session resolution and snapshot persistence."),
    ),
    info(
        title = "Interface Actions API",
        version = "0.1.0",
        description = "Drives a web chat platform through a browser automation driver. Requests become tasks that run under a fixed concurrency cap; poll `GET /task/{task_id}` for their outcome.",
    )
)]
pub struct ApiDoc;

/// Serve the OpenAPI document
pub async fn openapi_json() -> HttpResponse {
    HttpResponse::Ok().json(ApiDoc::openapi())
}

// =============================================================================
// Route Configuration
// =============================================================================

/// Configure all routes for the application.
/// This can be used by both the main application and integration tests.
pub fn configure_routes(cfg: &mut web::ServiceConfig) {
    cfg.route("/", web::get().to(service_info))
        .route("/health", web::get().to(health_check))
        .route("/send-message", web::post().to(send_message))
        .route("/send-message-sync", web::post().to(send_message_sync))
        .route("/send-message-quick", web::post().to(send_message_quick))
        .route("/upload-zip-url", web::post().to(upload_zip_url))
        .route("/upload-zip-url-sync", web::post().to(upload_zip_url_sync))
        .route("/task/{task_id}", web::get().to(get_task))
        .route("/task/{task_id}", web::delete().to(cancel_task))
        .route("/tasks", web::get().to(list_tasks))
        .route("/session-status", web::get().to(session_status))
        .route("/session", web::post().to(save_session))
        .route("/api-docs/openapi.json", web::get().to(openapi_json));
}
