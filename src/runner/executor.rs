use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

use crate::{
    config::PlatformConfig,
    download::{ArchiveDownloader, DownloadError},
    driver::{ChatDriver, ConversationUrlSink, DriverReply, SendMessageRequest, UploadRequest},
    error::{TaskError, TaskResult},
    models::{ArchiveSource, SendMessageParams, TaskOutput, TaskParams, UploadParams},
    session::SessionResolver,
};

/// Everything an executor gets to run one task.
pub struct ExecutionContext {
    pub task_id: Uuid,
    pub params: TaskParams,
    /// Cancelled when the task is cancelled while running
    pub token: CancellationToken,
    pub progress: Arc<dyn ConversationUrlSink>,
}

/// Runs the work behind a task.
///
/// The returned error is stringified into the task's `error_message`.
#[async_trait]
pub trait Executor: Send + Sync {
    async fn run(&self, ctx: ExecutionContext) -> TaskResult<TaskOutput>;
}

/// Executor driving the chat platform through a [`ChatDriver`].
pub struct PlatformExecutor {
    driver: Arc<dyn ChatDriver>,
    sessions: Arc<SessionResolver>,
    downloader: ArchiveDownloader,
    platform: PlatformConfig,
    user: String,
}

impl PlatformExecutor {
    pub fn new(
        driver: Arc<dyn ChatDriver>,
        sessions: Arc<SessionResolver>,
        downloader: ArchiveDownloader,
        platform: PlatformConfig,
        user: String,
    ) -> Self {
        Self {
            driver,
            sessions,
            downloader,
            platform,
            user,
        }
    }

    async fn dispatch(&self, ctx: &ExecutionContext) -> TaskResult<TaskOutput> {
        let session = self.sessions.resolve(&self.platform.name, &self.user).await;
        log::debug!(
            "Task {}: using session from {}",
            ctx.task_id,
            session.origin.as_str()
        );

        match &ctx.params {
            TaskParams::SendMessage(p) => self.send_message(ctx, p, session.state).await,
            TaskParams::UploadZipFile(p) => self.upload(ctx, p, session.state).await,
        }
    }

    async fn send_message(
        &self,
        ctx: &ExecutionContext,
        params: &SendMessageParams,
        storage_state: Option<crate::session::StorageState>,
    ) -> TaskResult<TaskOutput> {
        let request = SendMessageRequest {
            message: params.message.clone(),
            conversation_url: params.conversation_url.clone(),
            wait_for_response: params.wait_for_response,
            timeout_seconds: params.timeout_seconds,
            storage_state,
        };
        let reply = self
            .driver
            .send_message(request, ctx.progress.as_ref(), &ctx.token)
            .await?
            .into_result()?;
        Ok(self.output(reply, &params.message, None).await)
    }

    async fn upload(
        &self,
        ctx: &ExecutionContext,
        params: &UploadParams,
        storage_state: Option<crate::session::StorageState>,
    ) -> TaskResult<TaskOutput> {
        // the downloaded file lives until the end of this function
        let downloaded;
        let (archive_path, filename) = match &params.source {
            ArchiveSource::Url(url) => {
                downloaded = self.downloader.fetch(url, &ctx.token).await?;
                (downloaded.path().to_path_buf(), downloaded.filename.clone())
            }
            ArchiveSource::Path(path) => {
                if !tokio::fs::try_exists(path).await.unwrap_or(false) {
                    return Err(DownloadError::MissingFile(path.display().to_string()).into());
                }
                (path.clone(), params.filename.clone())
            }
        };

        let request = UploadRequest {
            archive_path,
            filename: filename.clone(),
            message: params.message.clone(),
            conversation_url: params.conversation_url.clone(),
            wait_for_response: params.wait_for_response,
            timeout_seconds: params.timeout_seconds,
            storage_state,
        };
        let reply = self
            .driver
            .upload_archive(request, ctx.progress.as_ref(), &ctx.token)
            .await?
            .into_result()?;
        Ok(self.output(reply, &params.message, Some(filename)).await)
    }

    async fn output(&self, reply: DriverReply, message: &str, filename: Option<String>) -> TaskOutput {
        if let Some(state) = reply.storage_state {
            self.sessions.remember(state).await;
        }
        TaskOutput {
            conversation_url: reply.conversation_url,
            message_sent: Some(reply.message_sent.unwrap_or_else(|| message.to_string())),
            response_received: reply.ai_response.is_some(),
            ai_response: reply.ai_response,
            filename,
        }
    }
}

#[async_trait]
impl Executor for PlatformExecutor {
    async fn run(&self, ctx: ExecutionContext) -> TaskResult<TaskOutput> {
        let seconds = ctx.params.timeout_seconds();
        let token = ctx.token.clone();
        tokio::select! {
            _ = token.cancelled() => {
                Err(TaskError::Cancelled("interrupted while running".to_string()))
            }
            outcome = tokio::time::timeout(Duration::from_secs(seconds), self.dispatch(&ctx)) => {
                match outcome {
                    Ok(result) => result,
                    Err(_) => {
                        log::warn!("Task {} timed out after {}s", ctx.task_id, seconds);
                        Err(TaskError::Timeout(seconds))
                    }
                }
            }
        }
    }
}
