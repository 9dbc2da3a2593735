//! Archive download for upload tasks.
//!
//! The archive is streamed into a named temp file that is removed when the
//! returned [`DownloadedArchive`] is dropped.

use std::error::Error as _;
use std::path::Path;

use futures_util::StreamExt;
use thiserror::Error;
use tokio::io::AsyncWriteExt;
use tokio_util::sync::CancellationToken;

use crate::{
    config::DownloadConfig,
    metrics,
    validation::{UrlPolicy, archive_filename, validate_archive_url},
};

const MAX_REDIRECTS: usize = 5;

#[derive(Error, Debug)]
pub enum DownloadError {
    #[error("invalid archive url: {0}")]
    InvalidUrl(String),

    #[error("archive download failed: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("archive download returned HTTP {status}: {url}")]
    Status { status: u16, url: String },

    #[error("archive too large: {size} bytes (max: {max})")]
    TooLarge { size: u64, max: u64 },

    #[error("archive not found: {0}")]
    MissingFile(String),

    #[error("archive download cancelled")]
    Cancelled,

    #[error("archive storage error: {0}")]
    Io(#[from] std::io::Error),
}

/// Every redirect hop gets the same host checks as the requested URL.
fn redirect_policy(policy: UrlPolicy) -> reqwest::redirect::Policy {
    reqwest::redirect::Policy::custom(move |attempt| {
        if attempt.previous().len() >= MAX_REDIRECTS {
            return attempt.error(format!("more than {} redirects", MAX_REDIRECTS));
        }
        match validate_archive_url(attempt.url().as_str(), &policy) {
            Ok(_) => attempt.follow(),
            Err(e) => attempt.error(format!("redirect refused: {}", e)),
        }
    })
}

/// A downloaded archive on local disk.
#[derive(Debug)]
pub struct DownloadedArchive {
    file: tempfile::NamedTempFile,
    pub filename: String,
    pub size: u64,
}

impl DownloadedArchive {
    pub fn path(&self) -> &Path {
        self.file.path()
    }
}

#[derive(Clone)]
pub struct ArchiveDownloader {
    client: reqwest::Client,
    policy: UrlPolicy,
    max_bytes: u64,
}

impl ArchiveDownloader {
    pub fn new(config: &DownloadConfig) -> Result<Self, DownloadError> {
        let policy = UrlPolicy::from(config);
        let client = reqwest::Client::builder()
            .timeout(config.timeout)
            .redirect(redirect_policy(policy.clone()))
            .user_agent(concat!("interface-actions/", env!("CARGO_PKG_VERSION")))
            .build()?;
        Ok(Self {
            client,
            policy,
            max_bytes: config.max_bytes,
        })
    }

    pub async fn fetch(
        &self,
        raw_url: &str,
        token: &CancellationToken,
    ) -> Result<DownloadedArchive, DownloadError> {
        tokio::select! {
            _ = token.cancelled() => Err(DownloadError::Cancelled),
            archive = self.download(raw_url) => archive,
        }
    }

    async fn download(&self, raw_url: &str) -> Result<DownloadedArchive, DownloadError> {
        let url = validate_archive_url(raw_url, &self.policy)
            .map_err(|e| DownloadError::InvalidUrl(e.to_string()))?;
        let filename = archive_filename(&url);
        log::info!("Downloading archive {} from {}", filename, url);

        let response = self
            .client
            .get(url.clone())
            .header(
                reqwest::header::ACCEPT,
                "application/zip, application/octet-stream, */*",
            )
            .send()
            .await
            .map_err(|e| {
                if e.is_redirect() {
                    let reason = e.source().map_or_else(|| e.to_string(), ToString::to_string);
                    DownloadError::InvalidUrl(reason)
                } else {
                    DownloadError::Transport(e)
                }
            })?;
        if !response.status().is_success() {
            return Err(DownloadError::Status {
                status: response.status().as_u16(),
                url: url.to_string(),
            });
        }

        if let Some(content_type) = response
            .headers()
            .get(reqwest::header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(str::to_lowercase)
            && !content_type.contains("zip")
            && !content_type.contains("octet-stream")
        {
            log::warn!("Archive {} served as '{}'", url, content_type);
        }

        if let Some(size) = response.content_length()
            && size > self.max_bytes
        {
            return Err(DownloadError::TooLarge {
                size,
                max: self.max_bytes,
            });
        }

        let file = tempfile::Builder::new()
            .prefix("downloaded_")
            .suffix(".zip")
            .tempfile()?;
        let mut writer = tokio::fs::File::from_std(file.reopen()?);
        let mut size: u64 = 0;
        let mut stream = response.bytes_stream();
        while let Some(chunk) = stream.next().await {
            let chunk = chunk?;
            size += chunk.len() as u64;
            if size > self.max_bytes {
                return Err(DownloadError::TooLarge {
                    size,
                    max: self.max_bytes,
                });
            }
            writer.write_all(&chunk).await?;
        }
        writer.flush().await?;

        log::info!("Archive {} downloaded ({} bytes)", filename, size);
        metrics::record_download_bytes(size);
        Ok(DownloadedArchive {
            file,
            filename,
            size,
        })
    }
}
