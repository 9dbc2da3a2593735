//! Browser storage state and where it comes from.
//!
//! Three sources are consulted in strict priority order, first hit wins and
//! nothing is merged:
//!
//! 1. the remote credentials service ([`CredentialsClient`]), when configured
//! 2. `MANUS_*` environment values ([`EnvSession`])
//! 3. the local snapshot file ([`SnapshotFile`])

mod breaker;
mod credentials;
mod env;
mod snapshot;

use std::collections::BTreeMap;
use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tokio::sync::RwLock;
use utoipa::ToSchema;

use crate::{config::Config, metrics};

pub use breaker::{Breaker, BreakerState};
pub use credentials::CredentialsClient;
pub use env::EnvSession;
pub use snapshot::{SnapshotFile, SnapshotInfo};

#[derive(Error, Debug)]
pub enum SessionError {
    #[error("credentials service unreachable: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("credentials service returned HTTP {status}: {body}")]
    Status { status: u16, body: String },

    #[error("credentials service skipped after repeated failures")]
    CircuitOpen,

    #[error("malformed session data: {0}")]
    Malformed(String),

    #[error("session file error: {0}")]
    Io(#[from] std::io::Error),
}

/// A browser cookie, in the JSON shape Playwright uses for storage state.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct Cookie {
    pub name: String,
    pub value: String,
    pub domain: String,
    #[serde(default = "default_path")]
    pub path: String,
    #[serde(rename = "httpOnly", default)]
    pub http_only: bool,
    #[serde(default)]
    pub secure: bool,
    #[serde(rename = "sameSite", default = "default_same_site")]
    pub same_site: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expires: Option<f64>,
}

fn default_path() -> String {
    "/".to_string()
}

fn default_same_site() -> String {
    "Lax".to_string()
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct LocalStorageEntry {
    pub name: String,
    pub value: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct OriginStorage {
    pub origin: String,
    #[serde(rename = "localStorage", default)]
    pub local_storage: Vec<LocalStorageEntry>,
}

/// Cookies plus per-origin local storage.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct StorageState {
    #[serde(default)]
    pub cookies: Vec<Cookie>,
    #[serde(default)]
    pub origins: Vec<OriginStorage>,
}

impl StorageState {
    pub fn is_empty(&self) -> bool {
        self.cookies.is_empty() && self.origins.is_empty()
    }

    /// Local storage flattened to `origin -> key -> value`.
    pub fn local_storage_by_origin(&self) -> BTreeMap<String, BTreeMap<String, String>> {
        let mut by_origin: BTreeMap<String, BTreeMap<String, String>> = BTreeMap::new();
        for origin in &self.origins {
            let entries = by_origin.entry(origin.origin.clone()).or_default();
            for item in &origin.local_storage {
                entries.insert(item.name.clone(), item.value.clone());
            }
        }
        by_origin
    }
}

/// Cookie domain and local storage origin of the automated site.
#[derive(Debug, Clone, PartialEq)]
pub struct SiteScope {
    pub cookie_domain: String,
    pub origin: String,
}

impl SiteScope {
    /// `https://www.manus.im` gives `.manus.im` and `https://www.manus.im`.
    pub fn from_base_url(base_url: &str) -> Result<Self, SessionError> {
        let url = url::Url::parse(base_url)
            .map_err(|e| SessionError::Malformed(format!("base url {}: {}", base_url, e)))?;
        let host = url
            .host_str()
            .ok_or_else(|| SessionError::Malformed(format!("base url {} has no host", base_url)))?;
        Ok(Self {
            cookie_domain: format!(".{}", host.strip_prefix("www.").unwrap_or(host)),
            origin: url.origin().ascii_serialization(),
        })
    }

    /// Build a storage state from flat cookie and local storage maps.
    pub(crate) fn storage_state<'a>(
        &self,
        cookies: impl IntoIterator<Item = (&'a str, &'a str)>,
        local_storage: impl IntoIterator<Item = (&'a str, &'a str)>,
    ) -> StorageState {
        let cookies = cookies
            .into_iter()
            .map(|(name, value)| Cookie {
                name: name.to_string(),
                value: value.to_string(),
                domain: self.cookie_domain.clone(),
                path: default_path(),
                http_only: is_http_only(name),
                secure: true,
                same_site: default_same_site(),
                expires: None,
            })
            .collect();
        let entries: Vec<LocalStorageEntry> = local_storage
            .into_iter()
            .map(|(name, value)| LocalStorageEntry {
                name: name.to_string(),
                value: value.to_string(),
            })
            .collect();
        let origins = if entries.is_empty() {
            Vec::new()
        } else {
            vec![OriginStorage {
                origin: self.origin.clone(),
                local_storage: entries,
            }]
        };
        StorageState { cookies, origins }
    }
}

fn is_http_only(name: &str) -> bool {
    matches!(name, "session_id" | "session_token" | "auth_token")
}

/// Which source produced a storage state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum SessionOrigin {
    ApiCredentials,
    Environment,
    LocalFile,
    None,
}

impl SessionOrigin {
    pub fn as_str(self) -> &'static str {
        match self {
            SessionOrigin::ApiCredentials => "api_credentials",
            SessionOrigin::Environment => "environment",
            SessionOrigin::LocalFile => "local_file",
            SessionOrigin::None => "none",
        }
    }
}

#[async_trait]
pub trait SessionSource: Send + Sync {
    fn origin(&self) -> SessionOrigin;

    /// `Ok(None)` means this source has nothing for the platform/user pair.
    async fn load(&self, platform: &str, user: &str) -> Result<Option<StorageState>, SessionError>;
}

#[derive(Debug, Clone)]
pub struct Resolved {
    pub origin: SessionOrigin,
    pub state: Option<StorageState>,
}

/// Walks the sources in order and remembers the freshest known state.
pub struct SessionResolver {
    sources: Vec<Arc<dyn SessionSource>>,
    snapshot: Arc<SnapshotFile>,
    credentials: Option<Arc<CredentialsClient>>,
    latest: RwLock<Option<StorageState>>,
}

impl SessionResolver {
    /// `sources` are consulted in order, before the snapshot file.
    pub fn new(sources: Vec<Arc<dyn SessionSource>>, snapshot: Arc<SnapshotFile>) -> Self {
        let mut sources = sources;
        sources.push(snapshot.clone());
        Self {
            sources,
            snapshot,
            credentials: None,
            latest: RwLock::new(None),
        }
    }

    pub fn from_config(config: &Config) -> Result<Self, SessionError> {
        let scope = SiteScope::from_base_url(&config.platform.base_url)?;
        let mut sources: Vec<Arc<dyn SessionSource>> = Vec::new();
        let credentials = if config.credentials_enabled() {
            let client = Arc::new(CredentialsClient::new(&config.credentials, scope.clone())?);
            sources.push(client.clone());
            Some(client)
        } else {
            log::info!("Credentials service not configured, using local session sources");
            None
        };
        sources.push(Arc::new(EnvSession::new(&config.fallback_session, scope)));
        let mut resolver = Self::new(
            sources,
            Arc::new(SnapshotFile::new(config.session_file.clone())),
        );
        resolver.credentials = credentials;
        Ok(resolver)
    }

    /// First non-empty state in priority order. Source errors are logged and
    /// the next source is tried.
    pub async fn resolve(&self, platform: &str, user: &str) -> Resolved {
        for source in &self.sources {
            let origin = source.origin();
            match source.load(platform, user).await {
                Ok(Some(state)) if !state.is_empty() => {
                    log::info!(
                        "Session resolved from {} ({} cookies, {} origins)",
                        origin.as_str(),
                        state.cookies.len(),
                        state.origins.len()
                    );
                    metrics::record_session_resolution(origin.as_str());
                    return Resolved {
                        origin,
                        state: Some(state),
                    };
                }
                Ok(_) => log::debug!("No session from {}", origin.as_str()),
                Err(e) => log::warn!("Session source {} failed: {}", origin.as_str(), e),
            }
        }
        log::warn!("No session found for {}/{}", platform, user);
        metrics::record_session_resolution(SessionOrigin::None.as_str());
        Resolved {
            origin: SessionOrigin::None,
            state: None,
        }
    }

    /// Keep `state` so it can be persisted later.
    pub async fn remember(&self, state: StorageState) {
        *self.latest.write().await = Some(state);
    }

    /// Write `state` to the snapshot file and remember it.
    pub async fn save(&self, state: StorageState) -> Result<(), SessionError> {
        self.snapshot.write(&state).await?;
        self.remember(state).await;
        Ok(())
    }

    /// Write the last remembered state, if any. Returns whether a file was written.
    pub async fn persist_latest(&self) -> Result<bool, SessionError> {
        let latest = self.latest.read().await.clone();
        match latest {
            Some(state) => {
                self.snapshot.write(&state).await?;
                Ok(true)
            }
            None => Ok(false),
        }
    }

    pub fn snapshot(&self) -> &SnapshotFile {
        &self.snapshot
    }

    /// State of the credentials service breaker, if the service is configured.
    pub fn credentials_breaker(&self) -> Option<BreakerState> {
        self.credentials.as_ref().map(|c| c.breaker().state())
    }
}
