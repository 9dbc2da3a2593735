use actix_web::{HttpResponse, web};

use crate::{
    dtos::{self, SaveSessionRequest, SaveSessionResponse, SessionStatusResponse},
    error::{ApiError, TaskError},
    session::SessionOrigin,
};

use super::AppState;

#[utoipa::path(
    get,
    path = "/session-status",
    summary = "Session status",
    description = "Resolves the browser session the way a task would (credentials service, then environment, then local snapshot) and reports which source won. A local snapshot older than 30 days is reported as `expired`.",
    responses(
        (status = 200, description = "Session status", body = dtos::SessionStatusResponse),
    ),
    tag = "session"
)]
/// Report which session source currently resolves
pub async fn session_status(state: web::Data<AppState>) -> HttpResponse {
    let resolved = state
        .sessions
        .resolve(
            &state.config.platform.name,
            &state.config.credentials.user_identifier,
        )
        .await;
    let snapshot = match state.sessions.snapshot().info().await {
        Ok(info) => info,
        Err(e) => {
            log::warn!("Session status: cannot inspect snapshot: {}", e);
            None
        }
    };

    let expired = resolved.origin == SessionOrigin::LocalFile
        && snapshot.as_ref().is_some_and(|s| s.expired);
    let (status, message) = match (&resolved.state, expired) {
        (None, _) => ("no_session", "No session found, log in and save one with POST /session"),
        (Some(_), true) => ("expired", "Local session expired, log in again"),
        (Some(_), false) => ("valid", "Session available"),
    };

    HttpResponse::Ok().json(SessionStatusResponse {
        session_exists: resolved.state.is_some(),
        status: status.to_string(),
        source: resolved.origin,
        cookies_count: resolved.state.as_ref().map_or(0, |s| s.cookies.len()),
        origins_count: resolved.state.as_ref().map_or(0, |s| s.origins.len()),
        snapshot,
        credentials_breaker: state
            .sessions
            .credentials_breaker()
            .map(|b| b.as_str().to_string()),
        message: message.to_string(),
    })
}

#[utoipa::path(
    post,
    path = "/session",
    summary = "Save the session snapshot",
    description = "Writes a storage state to the local snapshot file. Without `storage_state` in the body, the last state reported by the browser driver is written. Answers 409 when there is nothing to save.",
    request_body = dtos::SaveSessionRequest,
    responses(
        (status = 200, description = "Snapshot written", body = dtos::SaveSessionResponse),
        (status = 400, description = "Empty storage state"),
        (status = 409, description = "No session known yet"),
    ),
    tag = "session"
)]
/// Persist a storage state snapshot
pub async fn save_session(
    state: web::Data<AppState>,
    body: web::Json<SaveSessionRequest>,
) -> actix_web::Result<HttpResponse> {
    let path = state.sessions.snapshot().path().display().to_string();

    let (cookies_count, origins_count) = match body.into_inner().storage_state {
        Some(storage) => {
            if storage.is_empty() {
                return Err(ApiError::BadRequest("storage_state is empty".to_string()).into());
            }
            let counts = (storage.cookies.len(), storage.origins.len());
            state
                .sessions
                .save(storage)
                .await
                .map_err(|e| ApiError::from(TaskError::from(e)))?;
            counts
        }
        None => {
            let written = state
                .sessions
                .persist_latest()
                .await
                .map_err(|e| ApiError::from(TaskError::from(e)))?;
            if !written {
                return Err(ApiError::Conflict("no session to save yet".to_string()).into());
            }
            match state.sessions.snapshot().read().await {
                Ok(Some(saved)) => (saved.cookies.len(), saved.origins.len()),
                _ => (0, 0),
            }
        }
    };

    Ok(HttpResponse::Ok().json(SaveSessionResponse {
        saved: true,
        path,
        cookies_count,
        origins_count,
    }))
}
