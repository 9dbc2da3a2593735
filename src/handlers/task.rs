use actix_web::{HttpResponse, web};
use uuid::Uuid;

use crate::{
    dtos::{self, CancelTaskResponse, TaskListResponse, TaskSnapshot},
    error::{ApiError, TaskError},
};

use super::AppState;

#[utoipa::path(
    get,
    path = "/task/{task_id}",
    summary = "Get task status",
    description = "Returns the current state of a task. While the task is `running`, `conversation_url` is filled as soon as the driver reports it.",
    params(("task_id" = Uuid, Path, description = "The UUID returned when the task was created")),
    responses(
        (status = 200, description = "Task snapshot", body = dtos::TaskSnapshot),
        (status = 404, description = "No task with this ID"),
    ),
    tag = "tasks"
)]
/// Get a task by ID
pub async fn get_task(
    state: web::Data<AppState>,
    task_id: web::Path<Uuid>,
) -> actix_web::Result<HttpResponse> {
    let snapshot = state
        .manager
        .get_status(&task_id)
        .ok_or_else(|| ApiError::from(TaskError::TaskNotFound(*task_id)))?;
    Ok(HttpResponse::Ok().json(snapshot))
}

#[utoipa::path(
    delete,
    path = "/task/{task_id}",
    summary = "Cancel a task",
    description = "Cancels a `pending` or `running` task; it becomes `failed` with the given reason. A running execution is interrupted at its next await point. Finished tasks are left untouched and answer 409.",
    params(
        ("task_id" = Uuid, Path, description = "The UUID of the task to cancel"),
        dtos::CancelQuery,
    ),
    responses(
        (status = 200, description = "Task cancelled", body = dtos::CancelTaskResponse),
        (status = 404, description = "No task with this ID"),
        (status = 409, description = "Task already finished"),
    ),
    tag = "tasks"
)]
/// Cancel a pending or running task
pub async fn cancel_task(
    state: web::Data<AppState>,
    task_id: web::Path<Uuid>,
    query: web::Query<dtos::CancelQuery>,
) -> actix_web::Result<HttpResponse> {
    let task = state
        .manager
        .cancel(&task_id, query.reason.as_deref())
        .map_err(ApiError::from)?;
    Ok(HttpResponse::Ok().json(CancelTaskResponse {
        message: format!("Task {} cancelled", task.task_id),
        task,
    }))
}

#[utoipa::path(
    get,
    path = "/tasks",
    summary = "List tasks",
    description = "Most recently created tasks first, optionally filtered by status. `limit` defaults to 50 and is clamped to 500.",
    params(dtos::TaskListQuery),
    responses(
        (status = 200, description = "Recent tasks", body = dtos::TaskListResponse),
        (status = 400, description = "Unknown status filter"),
    ),
    tag = "tasks"
)]
/// List recent tasks
pub async fn list_tasks(
    state: web::Data<AppState>,
    query: web::Query<dtos::TaskListQuery>,
) -> actix_web::Result<HttpResponse> {
    let (status, limit) = match query.resolve(&state.config.listing) {
        Ok(resolved) => resolved,
        Err(e) => return Err(ApiError::BadRequest(e.to_string()).into()),
    };

    let tasks: Vec<TaskSnapshot> = state
        .manager
        .list(status, limit)
        .into_iter()
        .map(TaskSnapshot::from)
        .collect();
    Ok(HttpResponse::Ok().json(TaskListResponse {
        total: tasks.len(),
        tasks,
        running_tasks: state.manager.running_count(),
        max_concurrent_tasks: state.manager.max_concurrent(),
    }))
}
