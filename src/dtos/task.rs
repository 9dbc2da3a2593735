use chrono::Utc;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::models::{FailureKind, Task, TaskKind, TaskOutput, TaskStatus};

/// Point-in-time view of a task, as returned by `GET /task/{task_id}`.
///
/// The `conversation_url`, `message_sent`, `ai_response` and `filename` fields
/// repeat what is in `result` so clients do not have to dig for them.
/// `conversation_url` is filled as soon as the driver knows it, while the
/// task is still `running`.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct TaskSnapshot {
    pub task_id: uuid::Uuid,
    pub task_type: TaskKind,
    pub status: TaskStatus,
    pub created_at: chrono::DateTime<Utc>,
    pub updated_at: chrono::DateTime<Utc>,
    pub execution_start_time: Option<chrono::DateTime<Utc>>,
    pub execution_end_time: Option<chrono::DateTime<Utc>>,
    pub execution_time_seconds: Option<f64>,
    pub result: Option<TaskOutput>,
    pub error_message: Option<String>,
    /// Why the task failed, when it did
    pub failure_kind: Option<FailureKind>,
    pub conversation_url: Option<String>,
    pub message_sent: Option<String>,
    pub ai_response: Option<String>,
    pub filename: Option<String>,
}

impl From<Task> for TaskSnapshot {
    fn from(task: Task) -> Self {
        let execution_time_seconds = task.execution_time_seconds();
        let result = task.result.as_ref();
        let conversation_url = result
            .and_then(|r| r.conversation_url.clone())
            .or_else(|| task.conversation_url.clone());
        let message_sent = result
            .and_then(|r| r.message_sent.clone())
            .or_else(|| Some(task.params.message().to_string()));
        let ai_response = result.and_then(|r| r.ai_response.clone());
        let filename = result
            .and_then(|r| r.filename.clone())
            .or_else(|| task.params.filename().map(ToString::to_string));

        Self {
            task_id: task.id,
            task_type: task.kind,
            status: task.status,
            created_at: task.created_at,
            updated_at: task.updated_at,
            execution_start_time: task.execution_start_time,
            execution_end_time: task.execution_end_time,
            execution_time_seconds,
            result: task.result,
            error_message: task.error_message,
            failure_kind: task.failure_kind,
            conversation_url,
            message_sent,
            ai_response,
            filename,
        }
    }
}

/// Answer of `GET /tasks`.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct TaskListResponse {
    /// Most recently created first
    pub tasks: Vec<TaskSnapshot>,
    /// Number of tasks in `tasks`
    pub total: usize,
    pub running_tasks: usize,
    pub max_concurrent_tasks: usize,
}

/// Answer of `DELETE /task/{task_id}`.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct CancelTaskResponse {
    pub message: String,
    pub task: TaskSnapshot,
}
