use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::session::{SessionOrigin, SnapshotInfo, StorageState};

/// Answer of `GET /session-status`.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct SessionStatusResponse {
    pub session_exists: bool,
    /// `valid`, `expired` or `no_session`
    pub status: String,
    /// Source that currently resolves
    pub source: SessionOrigin,
    pub cookies_count: usize,
    pub origins_count: usize,
    /// Age of the local snapshot, when there is one
    pub snapshot: Option<SnapshotInfo>,
    /// State of the credentials service breaker, when the service is configured
    pub credentials_breaker: Option<String>,
    pub message: String,
}

/// Body of `POST /session`.
///
/// Without `storage_state`, the last state reported by the browser driver is
/// written instead.
#[derive(Debug, Clone, Default, Serialize, Deserialize, ToSchema)]
pub struct SaveSessionRequest {
    pub storage_state: Option<StorageState>,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct SaveSessionResponse {
    pub saved: bool,
    pub path: String,
    pub cookies_count: usize,
    pub origins_count: usize,
}
