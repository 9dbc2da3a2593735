use std::time::Duration;

use async_trait::async_trait;
use futures_util::StreamExt;
use serde::{Deserialize, Serialize};
use tokio_util::sync::CancellationToken;

use crate::config::{DriverConfig, PlatformConfig};

use super::{
    ChatDriver, ConversationUrlSink, DriverError, DriverReply, SendMessageRequest, UploadRequest,
};

const HEALTH_TIMEOUT: Duration = Duration::from_secs(5);

/// Page settings forwarded with every call.
#[derive(Debug, Clone, Serialize)]
struct PlatformSettings {
    name: String,
    base_url: String,
    headless: bool,
    persistent_profile: bool,
    browser_timeout_ms: u64,
    page_timeout_ms: u64,
}

impl From<&PlatformConfig> for PlatformSettings {
    fn from(p: &PlatformConfig) -> Self {
        Self {
            name: p.name.clone(),
            base_url: p.base_url.clone(),
            headless: p.headless,
            persistent_profile: p.persistent_profile,
            browser_timeout_ms: p.browser_timeout.as_millis() as u64,
            page_timeout_ms: p.page_timeout.as_millis() as u64,
        }
    }
}

#[derive(Serialize)]
struct Envelope<'a, T: Serialize> {
    platform: &'a PlatformSettings,
    #[serde(flatten)]
    request: &'a T,
}

/// One line of the sidecar's newline-delimited JSON answer.
#[derive(Debug, Deserialize)]
#[serde(tag = "event", rename_all = "snake_case")]
enum DriverEvent {
    ConversationUrl { url: String },
    Result(DriverReply),
    #[serde(other)]
    Other,
}

/// Forwards driver calls to a browser automation sidecar over HTTP.
///
/// `POST {url}/send-message` and `POST {url}/upload-archive` answer with a
/// stream of events; a `conversation_url` event may arrive at any time and the
/// final `result` event carries the [`DriverReply`].
#[derive(Clone)]
pub struct RemoteDriver {
    client: reqwest::Client,
    base_url: String,
    platform: PlatformSettings,
}

impl RemoteDriver {
    pub fn new(driver: &DriverConfig, platform: &PlatformConfig) -> Result<Self, DriverError> {
        let client = reqwest::Client::builder()
            .timeout(driver.request_timeout)
            .build()?;
        Ok(Self {
            client,
            base_url: driver.url.trim_end_matches('/').to_string(),
            platform: platform.into(),
        })
    }

    async fn call<T: Serialize + Sync>(
        &self,
        path: &str,
        request: &T,
        progress: &dyn ConversationUrlSink,
        token: &CancellationToken,
    ) -> Result<DriverReply, DriverError> {
        let url = format!("{}/{}", self.base_url, path);
        tokio::select! {
            _ = token.cancelled() => {
                log::info!("Driver call to {} cancelled", url);
                Err(DriverError::Cancelled)
            }
            reply = self.exchange(&url, request, progress) => reply,
        }
    }

    async fn exchange<T: Serialize + Sync>(
        &self,
        url: &str,
        request: &T,
        progress: &dyn ConversationUrlSink,
    ) -> Result<DriverReply, DriverError> {
        let response = self
            .client
            .post(url)
            .json(&Envelope {
                platform: &self.platform,
                request,
            })
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            log::error!("Driver call {} failed with {}: {}", url, status, body);
            return Err(DriverError::Status {
                status: status.as_u16(),
                body,
            });
        }

        let mut stream = response.bytes_stream();
        let mut buffer: Vec<u8> = Vec::new();
        let mut reply = None;
        while let Some(chunk) = stream.next().await {
            buffer.extend_from_slice(&chunk?);
            while let Some(pos) = buffer.iter().position(|b| *b == b'\n') {
                let line: Vec<u8> = buffer.drain(..=pos).collect();
                if let Some(r) = handle_line(&line, progress)? {
                    reply = Some(r);
                }
            }
        }
        if let Some(r) = handle_line(&buffer, progress)? {
            reply = Some(r);
        }

        reply.ok_or_else(|| DriverError::Protocol("stream ended without a result event".into()))
    }
}

fn handle_line(
    line: &[u8],
    progress: &dyn ConversationUrlSink,
) -> Result<Option<DriverReply>, DriverError> {
    if line.iter().all(u8::is_ascii_whitespace) {
        return Ok(None);
    }
    let event: DriverEvent =
        serde_json::from_slice(line).map_err(|e| DriverError::Protocol(e.to_string()))?;
    match event {
        DriverEvent::ConversationUrl { url } => {
            progress.conversation_url_ready(&url);
            Ok(None)
        }
        DriverEvent::Result(reply) => Ok(Some(reply)),
        DriverEvent::Other => {
            log::debug!("Ignoring driver event: {}", String::from_utf8_lossy(line));
            Ok(None)
        }
    }
}

#[async_trait]
impl ChatDriver for RemoteDriver {
    async fn send_message(
        &self,
        request: SendMessageRequest,
        progress: &dyn ConversationUrlSink,
        token: &CancellationToken,
    ) -> Result<DriverReply, DriverError> {
        self.call("send-message", &request, progress, token).await
    }

    async fn upload_archive(
        &self,
        request: UploadRequest,
        progress: &dyn ConversationUrlSink,
        token: &CancellationToken,
    ) -> Result<DriverReply, DriverError> {
        self.call("upload-archive", &request, progress, token).await
    }

    async fn is_ready(&self) -> bool {
        match self
            .client
            .get(format!("{}/health", self.base_url))
            .timeout(HEALTH_TIMEOUT)
            .send()
            .await
        {
            Ok(response) => response.status().is_success(),
            Err(e) => {
                log::debug!("Driver health check failed: {}", e);
                false
            }
        }
    }
}
