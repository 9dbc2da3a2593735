use actix_web::HttpResponse;
use uuid::Uuid;

use crate::{
    dtos::RejectedRequest,
    error::ApiError,
    models::{FailureKind, Task, TaskStatus},
    runner::failure_kind,
    validation::ValidationError,
};

use super::AppState;

/// Build a standardized 400 Bad Request response from validation errors,
/// echoing what the caller tried to send.
pub fn validation_error_response(
    errors: &[ValidationError],
    message_sent: &str,
    filename: Option<&str>,
) -> HttpResponse {
    HttpResponse::BadRequest().json(RejectedRequest {
        error: "Validation failed".to_string(),
        details: errors.iter().map(|e| e.to_string()).collect(),
        message_sent: message_sent.to_string(),
        filename: filename.map(ToString::to_string),
    })
}

/// Hand a freshly created task to the background queue.
///
/// When the queue refuses it, the task is failed so it does not linger as
/// pending, and `false` is returned so the handler can answer from the
/// failed task.
pub(crate) fn enqueue(state: &AppState, id: Uuid) -> bool {
    let Err(err) = state.queue.submit(id) else {
        return true;
    };
    log::warn!("Task {} not queued: {}", id, err);
    if let Err(e) = state
        .manager
        .store()
        .fail(&id, failure_kind(&err), err.to_string())
    {
        log::debug!("Task {} could not be marked as refused: {}", id, e);
    }
    false
}

/// Run a task for a foreground request.
///
/// The execution lives on its own tokio task, so a client that disconnects
/// does not take it down with the request.
pub(crate) async fn run_detached(state: &AppState, id: Uuid) {
    if let Some(handle) = state.manager.spawn(id)
        && let Err(e) = handle.await
    {
        log::error!("Task {} execution did not finish: {}", id, e);
    }
}

/// Copy of a task the handler just created.
pub(crate) fn created_task(state: &AppState, id: Uuid) -> Result<Task, ApiError> {
    state
        .manager
        .store()
        .get(&id)
        .ok_or_else(|| ApiError::NotFound(format!("Task {} not found", id)))
}

/// Status code of a foreground execution outcome.
pub(crate) fn sync_outcome(task: &Task) -> actix_web::HttpResponseBuilder {
    match (task.status, task.failure_kind) {
        (TaskStatus::Completed, _) => HttpResponse::Ok(),
        (_, Some(FailureKind::Capacity)) => HttpResponse::TooManyRequests(),
        _ => HttpResponse::InternalServerError(),
    }
}
