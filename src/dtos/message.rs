use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

use crate::{
    models::{ArchiveSource, SendMessageParams, Task, TaskStatus, UploadParams},
    validation::{DEFAULT_TIMEOUT_SECS, MessageFields},
};

fn default_platform() -> String {
    "manus".to_string()
}

fn default_wait() -> bool {
    true
}

fn default_timeout() -> u64 {
    DEFAULT_TIMEOUT_SECS
}

fn default_upload_message() -> String {
    "Please analyze the attached archive.".to_string()
}

/// Blank conversation references mean "start a new conversation".
fn non_blank(value: &Option<String>) -> Option<&str> {
    value.as_deref().map(str::trim).filter(|v| !v.is_empty())
}

/// Request body of the `/send-message*` endpoints.
///
/// ## Example
/// ```json
/// {
///   "message": "Summarize the last release notes",
///   "conversation_url": "https://www.manus.im/app/abc123",
///   "wait_for_response": true,
///   "timeout_seconds": 120
/// }
/// ```
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct MessageRequest {
    /// Text typed into the chat. Must be non-blank, at most 10000 characters.
    pub message: String,
    /// Target platform. Only the configured platform (default `manus`) is accepted.
    #[serde(default = "default_platform")]
    pub platform: String,
    /// Existing conversation to continue. Empty or absent starts a new conversation.
    #[serde(default)]
    pub conversation_url: Option<String>,
    /// Wait for the assistant reply before finishing the task. Defaults to true.
    #[serde(default = "default_wait")]
    pub wait_for_response: bool,
    /// Upper bound for the whole execution, between 10 and 300 seconds. Defaults to 60.
    #[serde(default = "default_timeout")]
    pub timeout_seconds: u64,
}

impl MessageRequest {
    pub fn fields(&self) -> MessageFields<'_> {
        MessageFields {
            message: &self.message,
            platform: &self.platform,
            conversation_url: non_blank(&self.conversation_url),
            timeout_seconds: self.timeout_seconds,
        }
    }

    pub fn to_params(&self) -> SendMessageParams {
        SendMessageParams {
            message: self.message.clone(),
            platform: self.platform.to_lowercase(),
            conversation_url: non_blank(&self.conversation_url).map(ToString::to_string),
            wait_for_response: self.wait_for_response,
            timeout_seconds: self.timeout_seconds,
        }
    }
}

/// Request body of the `/upload-zip-url*` endpoints.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct UploadZipUrlRequest {
    /// Public http(s) URL of the archive. Internal hosts are refused.
    pub zip_url: String,
    /// Message sent together with the archive.
    #[serde(default = "default_upload_message")]
    pub message: String,
    #[serde(default = "default_platform")]
    pub platform: String,
    /// Existing conversation to continue. Empty or absent starts a new conversation.
    #[serde(default)]
    pub conversation_url: Option<String>,
    #[serde(default = "default_wait")]
    pub wait_for_response: bool,
    /// Upper bound for download plus upload, between 10 and 300 seconds. Defaults to 60.
    #[serde(default = "default_timeout")]
    pub timeout_seconds: u64,
}

impl UploadZipUrlRequest {
    pub fn fields(&self) -> MessageFields<'_> {
        MessageFields {
            message: &self.message,
            platform: &self.platform,
            conversation_url: non_blank(&self.conversation_url),
            timeout_seconds: self.timeout_seconds,
        }
    }

    pub fn to_params(&self, filename: String) -> UploadParams {
        UploadParams {
            source: ArchiveSource::Url(self.zip_url.trim().to_string()),
            filename,
            message: self.message.clone(),
            platform: self.platform.to_lowercase(),
            conversation_url: non_blank(&self.conversation_url).map(ToString::to_string),
            wait_for_response: self.wait_for_response,
            timeout_seconds: self.timeout_seconds,
        }
    }
}

/// Outcome of a message request. Failures carry the message back with the error.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct MessageResponse {
    pub task_id: Uuid,
    pub status: TaskStatus,
    /// The message as submitted
    pub message_sent: String,
    /// Conversation to continue, once known
    pub conversation_url: Option<String>,
    pub ai_response: Option<String>,
    pub execution_time_seconds: Option<f64>,
    pub error_message: Option<String>,
}

impl MessageResponse {
    pub fn from_task(task: &Task, message: &str) -> Self {
        let result = task.result.as_ref();
        Self {
            task_id: task.id,
            status: task.status,
            message_sent: result
                .and_then(|r| r.message_sent.clone())
                .unwrap_or_else(|| message.to_string()),
            conversation_url: result
                .and_then(|r| r.conversation_url.clone())
                .or_else(|| task.conversation_url.clone()),
            ai_response: result.and_then(|r| r.ai_response.clone()),
            execution_time_seconds: task.execution_time_seconds(),
            error_message: task.error_message.clone(),
        }
    }
}

/// Answer of `/send-message-quick`: the task keeps running after this is sent.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct QuickMessageResponse {
    pub task_id: Uuid,
    pub status: TaskStatus,
    pub message_sent: String,
    pub conversation_url: Option<String>,
    /// Whether the conversation reference arrived before the wait ended
    pub url_ready: bool,
    /// Seconds spent waiting for the reference
    pub waited_seconds: f64,
    pub error_message: Option<String>,
}

/// Outcome of an archive upload request.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct UploadResponse {
    pub task_id: Uuid,
    pub status: TaskStatus,
    /// Archive name derived from the URL
    pub filename: String,
    pub zip_url: String,
    pub message_sent: String,
    pub conversation_url: Option<String>,
    pub ai_response: Option<String>,
    pub execution_time_seconds: Option<f64>,
    pub error_message: Option<String>,
}

impl UploadResponse {
    pub fn from_task(task: &Task, request: &UploadZipUrlRequest, filename: &str) -> Self {
        let echo = MessageResponse::from_task(task, &request.message);
        Self {
            task_id: echo.task_id,
            status: echo.status,
            filename: task
                .result
                .as_ref()
                .and_then(|r| r.filename.clone())
                .unwrap_or_else(|| filename.to_string()),
            zip_url: request.zip_url.clone(),
            message_sent: echo.message_sent,
            conversation_url: echo.conversation_url,
            ai_response: echo.ai_response,
            execution_time_seconds: echo.execution_time_seconds,
            error_message: echo.error_message,
        }
    }
}

/// Body of a request rejected before any task was created.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct RejectedRequest {
    pub error: String,
    pub details: Vec<String>,
    pub message_sent: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub filename: Option<String>,
}
