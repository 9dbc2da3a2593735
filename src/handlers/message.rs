use std::time::{Duration, Instant};

use actix_web::{HttpResponse, web};

use crate::{
    dtos::{self, MessageRequest, MessageResponse, QuickMessageResponse},
    models::{FailureKind, TaskParams, TaskStatus},
    validation::{self, QUICK_WAIT_SECS},
};

use super::AppState;
use super::response::{created_task, enqueue, run_detached, sync_outcome, validation_error_response};

const QUICK_POLL_INTERVAL: Duration = Duration::from_millis(200);

#[utoipa::path(
    post,
    path = "/send-message",
    summary = "Send a message in the background",
    description = "Validates the request, creates a `send_message` task and queues it. Returns 202 immediately with the task id; poll `GET /task/{task_id}` for the outcome.",
    request_body = dtos::MessageRequest,
    responses(
        (status = 202, description = "Task accepted", body = dtos::MessageResponse),
        (status = 400, description = "Validation failed, no task created", body = dtos::RejectedRequest),
        (status = 429, description = "Work queue full, the task was failed", body = dtos::MessageResponse),
    ),
    tag = "messages"
)]
/// Send a message without waiting for it
pub async fn send_message(
    state: web::Data<AppState>,
    body: web::Json<MessageRequest>,
) -> actix_web::Result<HttpResponse> {
    if let Err(errors) =
        validation::validate_message_fields(&body.fields(), &state.config.platform.name)
    {
        return Ok(validation_error_response(&errors, &body.message, None));
    }

    let id = state
        .manager
        .create(TaskParams::SendMessage(body.to_params()));
    let queued = enqueue(&state, id);

    let task = created_task(&state, id)?;
    let mut response = if queued {
        HttpResponse::Accepted()
    } else {
        sync_outcome(&task)
    };
    Ok(response.json(MessageResponse::from_task(&task, &body.message)))
}

#[utoipa::path(
    post,
    path = "/send-message-sync",
    summary = "Send a message and wait for the outcome",
    description = "Runs the task in the request. Returns 200 with the conversation URL and reply on success, 500 with the error and the echoed message on failure, 429 when the concurrency cap is reached.",
    request_body = dtos::MessageRequest,
    responses(
        (status = 200, description = "Message sent", body = dtos::MessageResponse),
        (status = 400, description = "Validation failed, no task created", body = dtos::RejectedRequest),
        (status = 429, description = "Concurrency cap reached", body = dtos::MessageResponse),
        (status = 500, description = "Execution failed", body = dtos::MessageResponse),
    ),
    tag = "messages"
)]
/// Send a message and wait for it
pub async fn send_message_sync(
    state: web::Data<AppState>,
    body: web::Json<MessageRequest>,
) -> actix_web::Result<HttpResponse> {
    if let Err(errors) =
        validation::validate_message_fields(&body.fields(), &state.config.platform.name)
    {
        return Ok(validation_error_response(&errors, &body.message, None));
    }

    let id = state
        .manager
        .create(TaskParams::SendMessage(body.to_params()));
    run_detached(&state, id).await;

    let task = created_task(&state, id)?;
    Ok(sync_outcome(&task).json(MessageResponse::from_task(&task, &body.message)))
}

#[utoipa::path(
    post,
    path = "/send-message-quick",
    summary = "Send a message and return the conversation URL",
    description = "Queues the task like `/send-message`, then waits up to 8 seconds for the conversation URL to become known. The task keeps running after the answer; `url_ready` tells whether the URL arrived in time.",
    request_body = dtos::MessageRequest,
    responses(
        (status = 200, description = "Task running or finished", body = dtos::QuickMessageResponse),
        (status = 400, description = "Validation failed, no task created", body = dtos::RejectedRequest),
        (status = 429, description = "Queue full or concurrency cap reached", body = dtos::QuickMessageResponse),
        (status = 500, description = "Task failed before the URL was known", body = dtos::QuickMessageResponse),
    ),
    tag = "messages"
)]
/// Send a message and return as soon as the conversation URL is known
pub async fn send_message_quick(
    state: web::Data<AppState>,
    body: web::Json<MessageRequest>,
) -> actix_web::Result<HttpResponse> {
    if let Err(errors) =
        validation::validate_message_fields(&body.fields(), &state.config.platform.name)
    {
        return Ok(validation_error_response(&errors, &body.message, None));
    }

    let id = state
        .manager
        .create(TaskParams::SendMessage(body.to_params()));
    // a refused task is already failed and ends the wait below
    enqueue(&state, id);

    let started = Instant::now();
    let deadline = started + Duration::from_secs(QUICK_WAIT_SECS);
    let task = loop {
        let task = created_task(&state, id)?;
        let known = task.conversation_url.is_some()
            || task
                .result
                .as_ref()
                .is_some_and(|r| r.conversation_url.is_some());
        if known || task.status.is_terminal() || Instant::now() >= deadline {
            break task;
        }
        tokio::time::sleep(QUICK_POLL_INTERVAL).await;
    };

    let echo = MessageResponse::from_task(&task, &body.message);
    let response = QuickMessageResponse {
        task_id: task.id,
        status: task.status,
        message_sent: echo.message_sent,
        url_ready: echo.conversation_url.is_some(),
        conversation_url: echo.conversation_url,
        waited_seconds: started.elapsed().as_secs_f64(),
        error_message: echo.error_message,
    };

    Ok(match (task.status, task.failure_kind) {
        (TaskStatus::Failed, Some(FailureKind::Capacity)) => {
            HttpResponse::TooManyRequests().json(response)
        }
        (TaskStatus::Failed, _) => HttpResponse::InternalServerError().json(response),
        _ => HttpResponse::Ok().json(response),
    })
}
