use std::collections::BTreeMap;

use async_trait::async_trait;
use serde::Deserialize;

use crate::config::CredentialsConfig;

use super::{Breaker, SessionError, SessionOrigin, SessionSource, SiteScope, StorageState};

/// Client for the remote credentials service.
///
/// `GET {url}/platform/{platform}/user/{user}` returns the stored credential;
/// its `sessionData` cookies and local storage are turned into a
/// [`StorageState`] scoped to the automated site.
pub struct CredentialsClient {
    client: reqwest::Client,
    base_url: String,
    token: String,
    scope: SiteScope,
    breaker: Breaker,
}

#[derive(Debug, Deserialize)]
struct Credential {
    id: Option<serde_json::Value>,
    #[serde(rename = "sessionData", default)]
    session_data: Option<SessionData>,
}

#[derive(Debug, Default, Deserialize)]
struct SessionData {
    #[serde(default)]
    cookies: BTreeMap<String, String>,
    #[serde(default)]
    local_storage: BTreeMap<String, String>,
}

impl CredentialsClient {
    pub fn new(config: &CredentialsConfig, scope: SiteScope) -> Result<Self, SessionError> {
        let client = reqwest::Client::builder().timeout(config.timeout).build()?;
        Ok(Self {
            client,
            base_url: config
                .url
                .as_deref()
                .unwrap_or_default()
                .trim_end_matches('/')
                .to_string(),
            token: config.token.clone().unwrap_or_default(),
            scope,
            breaker: Breaker::new(config.failure_threshold, config.recovery_timeout),
        })
    }

    pub fn breaker(&self) -> &Breaker {
        &self.breaker
    }

    async fn fetch(&self, platform: &str, user: &str) -> Result<Option<Credential>, SessionError> {
        let url = format!("{}/platform/{}/user/{}", self.base_url, platform, user);
        let response = self
            .client
            .get(&url)
            .header("X-API-Key", &self.token)
            .bearer_auth(&self.token)
            .send()
            .await?;

        let status = response.status();
        if status == reqwest::StatusCode::NOT_FOUND {
            log::info!("No credential stored for {}/{}", platform, user);
            return Ok(None);
        }
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(SessionError::Status {
                status: status.as_u16(),
                body,
            });
        }
        let credential = response
            .json::<Credential>()
            .await
            .map_err(|e| SessionError::Malformed(e.to_string()))?;
        Ok(Some(credential))
    }

    fn to_storage_state(&self, credential: Credential) -> Option<StorageState> {
        let Some(data) = credential.session_data else {
            log::warn!("Credential {:?} has no sessionData", credential.id);
            return None;
        };
        Some(self.scope.storage_state(
            data.cookies.iter().map(|(k, v)| (k.as_str(), v.as_str())),
            data.local_storage.iter().map(|(k, v)| (k.as_str(), v.as_str())),
        ))
    }
}

#[async_trait]
impl SessionSource for CredentialsClient {
    fn origin(&self) -> SessionOrigin {
        SessionOrigin::ApiCredentials
    }

    async fn load(&self, platform: &str, user: &str) -> Result<Option<StorageState>, SessionError> {
        if !self.breaker.allow() {
            return Err(SessionError::CircuitOpen);
        }
        match self.fetch(platform, user).await {
            Ok(credential) => {
                self.breaker.record_success();
                Ok(credential.and_then(|c| self.to_storage_state(c)))
            }
            Err(e) => {
                self.breaker.record_failure();
                Err(e)
            }
        }
    }
}
