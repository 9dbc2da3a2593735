use std::collections::BTreeMap;

use async_trait::async_trait;

use crate::config::FallbackSessionConfig;

use super::{SessionError, SessionOrigin, SessionSource, SiteScope, StorageState};

/// Storage state assembled from `MANUS_*` environment values.
///
/// `MANUS_COOKIES` and `MANUS_LOCAL_STORAGE` are flat JSON objects; the session
/// and auth tokens are added as cookies of their own. Malformed JSON is logged
/// and the value ignored.
pub struct EnvSession {
    state: StorageState,
}

impl EnvSession {
    pub fn new(config: &FallbackSessionConfig, scope: SiteScope) -> Self {
        let mut cookies = config
            .cookies
            .as_deref()
            .map(|raw| parse_map("MANUS_COOKIES", raw))
            .unwrap_or_default();
        if let Some(token) = &config.session_token {
            cookies.insert("session_token".to_string(), token.clone());
        }
        if let Some(token) = &config.auth_token {
            cookies.insert("auth_token".to_string(), token.clone());
        }
        let local_storage = config
            .local_storage
            .as_deref()
            .map(|raw| parse_map("MANUS_LOCAL_STORAGE", raw))
            .unwrap_or_default();

        let state = scope.storage_state(
            cookies.iter().map(|(k, v)| (k.as_str(), v.as_str())),
            local_storage.iter().map(|(k, v)| (k.as_str(), v.as_str())),
        );
        Self { state }
    }
}

/// Parse a JSON object into string values; non-string values are kept as JSON text.
fn parse_map(variable: &str, raw: &str) -> BTreeMap<String, String> {
    match serde_json::from_str::<BTreeMap<String, serde_json::Value>>(raw) {
        Ok(map) => map
            .into_iter()
            .map(|(k, v)| match v {
                serde_json::Value::String(s) => (k, s),
                other => (k, other.to_string()),
            })
            .collect(),
        Err(e) => {
            log::error!("Ignoring {}: invalid JSON object: {}", variable, e);
            BTreeMap::new()
        }
    }
}

#[async_trait]
impl SessionSource for EnvSession {
    fn origin(&self) -> SessionOrigin {
        SessionOrigin::Environment
    }

    async fn load(&self, _platform: &str, _user: &str) -> Result<Option<StorageState>, SessionError> {
        if self.state.is_empty() {
            Ok(None)
        } else {
            Ok(Some(self.state.clone()))
        }
    }
}
