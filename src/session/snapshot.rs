use std::path::{Path, PathBuf};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::Serialize;
use utoipa::ToSchema;

use super::{SessionError, SessionOrigin, SessionSource, StorageState};

/// Snapshots older than this are reported as expired.
pub const SNAPSHOT_VALIDITY_DAYS: i64 = 30;

/// Age of the snapshot on disk.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct SnapshotInfo {
    pub last_updated: DateTime<Utc>,
    pub age_days: i64,
    pub expires_in_days: i64,
    pub expired: bool,
}

impl SnapshotInfo {
    fn at(last_updated: DateTime<Utc>, now: DateTime<Utc>) -> Self {
        let age_days = (now - last_updated).num_days();
        Self {
            last_updated,
            age_days,
            expires_in_days: (SNAPSHOT_VALIDITY_DAYS - age_days).max(0),
            expired: age_days >= SNAPSHOT_VALIDITY_DAYS,
        }
    }
}

/// Storage state persisted as a JSON file.
pub struct SnapshotFile {
    path: PathBuf,
}

impl SnapshotFile {
    pub fn new(path: PathBuf) -> Self {
        Self { path }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Contents of the file, `None` when it does not exist.
    pub async fn read(&self) -> Result<Option<StorageState>, SessionError> {
        let raw = match tokio::fs::read(&self.path).await {
            Ok(raw) => raw,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e.into()),
        };
        serde_json::from_slice(&raw)
            .map(Some)
            .map_err(|e| SessionError::Malformed(format!("{}: {}", self.path.display(), e)))
    }

    /// Replace the file atomically: write a sibling temp file, then rename.
    pub async fn write(&self, state: &StorageState) -> Result<(), SessionError> {
        let body = serde_json::to_vec_pretty(state)
            .map_err(|e| SessionError::Malformed(e.to_string()))?;
        let mut tmp = self.path.clone().into_os_string();
        tmp.push(".tmp");
        let tmp = PathBuf::from(tmp);
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(parent).await?;
        }
        tokio::fs::write(&tmp, body).await?;
        tokio::fs::rename(&tmp, &self.path).await?;
        log::info!(
            "Session snapshot saved to {} ({} cookies)",
            self.path.display(),
            state.cookies.len()
        );
        Ok(())
    }

    pub async fn info(&self) -> Result<Option<SnapshotInfo>, SessionError> {
        let metadata = match tokio::fs::metadata(&self.path).await {
            Ok(m) => m,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e.into()),
        };
        let modified: DateTime<Utc> = metadata.modified()?.into();
        Ok(Some(SnapshotInfo::at(modified, Utc::now())))
    }
}

#[async_trait]
impl SessionSource for SnapshotFile {
    fn origin(&self) -> SessionOrigin {
        SessionOrigin::LocalFile
    }

    async fn load(&self, _platform: &str, _user: &str) -> Result<Option<StorageState>, SessionError> {
        self.read().await
    }
}
