use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

use chrono::Utc;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// Lifecycle of a task.
///
/// `Pending -> Running -> {Completed | Failed}`, plus `Pending -> Failed` for
/// cancellation and capacity rejection. `Completed` and `Failed` are terminal.
#[derive(Debug, PartialEq, Eq, Hash, Clone, Copy, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum TaskStatus {
    Pending,
    Running,
    Completed,
    Failed,
}

impl TaskStatus {
    pub fn is_terminal(self) -> bool {
        matches!(self, TaskStatus::Completed | TaskStatus::Failed)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            TaskStatus::Pending => "pending",
            TaskStatus::Running => "running",
            TaskStatus::Completed => "completed",
            TaskStatus::Failed => "failed",
        }
    }
}

impl fmt::Display for TaskStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TaskStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "pending" => Ok(TaskStatus::Pending),
            "running" => Ok(TaskStatus::Running),
            "completed" => Ok(TaskStatus::Completed),
            "failed" => Ok(TaskStatus::Failed),
            other => Err(format!("unknown task status '{}'", other)),
        }
    }
}

/// Why a task ended up `Failed`.
#[derive(Debug, PartialEq, Eq, Clone, Copy, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum FailureKind {
    Execution,
    Capacity,
    Cancelled,
    Timeout,
}

/// Task type tag.
#[derive(Debug, PartialEq, Eq, Hash, Clone, Copy, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum TaskKind {
    SendMessage,
    UploadZipFile,
}

impl TaskKind {
    pub fn as_str(self) -> &'static str {
        match self {
            TaskKind::SendMessage => "send_message",
            TaskKind::UploadZipFile => "upload_zip_file",
        }
    }
}

impl fmt::Display for TaskKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TaskKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "send_message" => Ok(TaskKind::SendMessage),
            "upload_zip_file" => Ok(TaskKind::UploadZipFile),
            other => Err(format!("unsupported task type '{}'", other)),
        }
    }
}

/// Where the archive of an upload task comes from.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ArchiveSource {
    /// Downloaded when the task starts
    Url(String),
    /// Already on local disk
    Path(PathBuf),
}

/// Input of a `send_message` task.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SendMessageParams {
    pub message: String,
    pub platform: String,
    pub conversation_url: Option<String>,
    pub wait_for_response: bool,
    pub timeout_seconds: u64,
}

/// Input of an `upload_zip_file` task.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UploadParams {
    pub source: ArchiveSource,
    pub filename: String,
    pub message: String,
    pub platform: String,
    pub conversation_url: Option<String>,
    pub wait_for_response: bool,
    pub timeout_seconds: u64,
}

/// Typed task input, one variant per task type.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "task_type", rename_all = "snake_case")]
pub enum TaskParams {
    SendMessage(SendMessageParams),
    UploadZipFile(UploadParams),
}

impl TaskParams {
    pub fn kind(&self) -> TaskKind {
        match self {
            TaskParams::SendMessage(_) => TaskKind::SendMessage,
            TaskParams::UploadZipFile(_) => TaskKind::UploadZipFile,
        }
    }

    pub fn timeout_seconds(&self) -> u64 {
        match self {
            TaskParams::SendMessage(p) => p.timeout_seconds,
            TaskParams::UploadZipFile(p) => p.timeout_seconds,
        }
    }

    pub fn message(&self) -> &str {
        match self {
            TaskParams::SendMessage(p) => &p.message,
            TaskParams::UploadZipFile(p) => &p.message,
        }
    }

    pub fn filename(&self) -> Option<&str> {
        match self {
            TaskParams::SendMessage(_) => None,
            TaskParams::UploadZipFile(p) => Some(&p.filename),
        }
    }
}

/// Outcome of a successful task.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct TaskOutput {
    /// Conversation reference to resume the exchange
    pub conversation_url: Option<String>,
    /// Message as typed into the page
    pub message_sent: Option<String>,
    /// Scraped reply text
    pub ai_response: Option<String>,
    /// Uploaded archive name
    pub filename: Option<String>,
    /// Whether a reply was captured before returning
    pub response_received: bool,
}

/// One tracked unit of asynchronous work.
#[derive(Debug, Clone, Serialize)]
pub struct Task {
    pub id: uuid::Uuid,
    pub kind: TaskKind,
    pub params: TaskParams,
    pub status: TaskStatus,
    pub created_at: chrono::DateTime<Utc>,
    pub updated_at: chrono::DateTime<Utc>,
    pub result: Option<TaskOutput>,
    pub error_message: Option<String>,
    pub failure_kind: Option<FailureKind>,
    pub execution_start_time: Option<chrono::DateTime<Utc>>,
    pub execution_end_time: Option<chrono::DateTime<Utc>>,
    /// Conversation reference known before the task finished
    pub conversation_url: Option<String>,
}

impl Task {
    pub fn new(params: TaskParams) -> Self {
        let now = Utc::now();
        Self {
            id: uuid::Uuid::new_v4(),
            kind: params.kind(),
            params,
            status: TaskStatus::Pending,
            created_at: now,
            updated_at: now,
            result: None,
            error_message: None,
            failure_kind: None,
            execution_start_time: None,
            execution_end_time: None,
            conversation_url: None,
        }
    }

    pub fn execution_time_seconds(&self) -> Option<f64> {
        match (self.execution_start_time, self.execution_end_time) {
            (Some(start), Some(end)) => Some((end - start).num_milliseconds() as f64 / 1000.0),
            _ => None,
        }
    }

    /// Bump `updated_at`, never letting it fall behind `created_at`.
    pub(crate) fn touch(&mut self) {
        let now = Utc::now();
        self.updated_at = now.max(self.created_at).max(self.updated_at);
    }
}
