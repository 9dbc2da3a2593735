//! Browser capability used by the executor.
//!
//! The browser never runs in this process. A [`ChatDriver`] performs the page
//! interactions and reports back a [`DriverReply`]; [`RemoteDriver`] is the
//! implementation that forwards every call to an automation sidecar.

mod remote;

use std::path::PathBuf;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tokio_util::sync::CancellationToken;

use crate::session::StorageState;

pub use remote::RemoteDriver;

#[derive(Error, Debug)]
pub enum DriverError {
    #[error("driver unreachable: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("driver returned HTTP {status}: {body}")]
    Status { status: u16, body: String },

    #[error("invalid driver response: {0}")]
    Protocol(String),

    /// The driver ran but reported `success: false`
    #[error("{0}")]
    Rejected(String),

    #[error("driver call cancelled")]
    Cancelled,
}

/// Receives the conversation reference as soon as the driver knows it,
/// usually long before the reply has been scraped.
pub trait ConversationUrlSink: Send + Sync {
    fn conversation_url_ready(&self, url: &str);
}

/// Sink that drops every notification.
pub struct NoProgress;

impl ConversationUrlSink for NoProgress {
    fn conversation_url_ready(&self, _url: &str) {}
}

#[derive(Debug, Clone, Serialize)]
pub struct SendMessageRequest {
    pub message: String,
    pub conversation_url: Option<String>,
    pub wait_for_response: bool,
    pub timeout_seconds: u64,
    pub storage_state: Option<StorageState>,
}

#[derive(Debug, Clone, Serialize)]
pub struct UploadRequest {
    /// Archive on the local disk
    pub archive_path: PathBuf,
    pub filename: String,
    pub message: String,
    pub conversation_url: Option<String>,
    pub wait_for_response: bool,
    pub timeout_seconds: u64,
    pub storage_state: Option<StorageState>,
}

/// What the driver observed while performing an operation.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DriverReply {
    #[serde(default)]
    pub success: bool,
    pub conversation_url: Option<String>,
    pub message_sent: Option<String>,
    pub ai_response: Option<String>,
    pub error: Option<String>,
    /// Browser storage after the operation, when the driver exports it
    pub storage_state: Option<StorageState>,
}

impl DriverReply {
    /// Turn a reply with `success == false` into an error.
    pub fn into_result(self) -> Result<Self, DriverError> {
        if self.success {
            Ok(self)
        } else {
            Err(DriverError::Rejected(
                self.error
                    .filter(|e| !e.trim().is_empty())
                    .unwrap_or_else(|| "unknown driver error".to_string()),
            ))
        }
    }
}

#[async_trait]
pub trait ChatDriver: Send + Sync {
    /// Type `message` into a new or existing conversation.
    async fn send_message(
        &self,
        request: SendMessageRequest,
        progress: &dyn ConversationUrlSink,
        token: &CancellationToken,
    ) -> Result<DriverReply, DriverError>;

    /// Attach an archive to a new or existing conversation, then send `message`.
    async fn upload_archive(
        &self,
        request: UploadRequest,
        progress: &dyn ConversationUrlSink,
        token: &CancellationToken,
    ) -> Result<DriverReply, DriverError>;

    async fn is_ready(&self) -> bool;
}
