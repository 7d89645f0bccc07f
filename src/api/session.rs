//! Session credentials and the refresh-once-then-retry policy

use std::collections::BTreeMap;
use std::future::Future;

use async_trait::async_trait;
use serde::Deserialize;
use tokio::sync::RwLock;

use super::{BackendError, Result};
use crate::config::{DomainConfig, StorageTarget};

/// How a request proves its session
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Credentials {
    /// Cookies are attached by the transport
    Cookie,
    Header { name: String, value: String },
}

impl Credentials {
    pub(crate) fn apply(self, request: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        match self {
            Credentials::Cookie => request,
            Credentials::Header { name, value } => request.header(name, value),
        }
    }
}

#[async_trait]
pub trait SessionProvider: Send + Sync {
    /// Credentials for the next request
    async fn credentials(&self) -> Result<Credentials>;

    /// Obtain a fresh session after the backend reported expiry
    async fn refresh(&self) -> Result<()>;
}

/// Fixed credentials that can never be refreshed
#[derive(Debug, Clone)]
pub struct StaticSession(pub Credentials);

impl StaticSession {
    pub fn cookie() -> Self {
        Self(Credentials::Cookie)
    }
}

#[async_trait]
impl SessionProvider for StaticSession {
    async fn credentials(&self) -> Result<Credentials> {
        Ok(self.0.clone())
    }

    async fn refresh(&self) -> Result<()> {
        Err(BackendError::Session("static session cannot be refreshed".to_string()))
    }
}

// ============================================================================
// STORED TOKENS
// ============================================================================

/// Tokens kept in platform storage when cookies are unavailable
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SessionTokens {
    pub session_id: Option<String>,
    pub refresh_token: Option<String>,
    pub expires_at: Option<String>,
}

impl SessionTokens {
    /// Parse the pipe-delimited `key|value|key|value...` storage format
    pub fn from_stored(value: &str, session_key: &str, refresh_key: &str) -> Self {
        let parts: Vec<&str> = value.split('|').collect();
        let pairs: BTreeMap<&str, &str> = parts
            .chunks(2)
            .filter_map(|pair| match pair {
                [k, v] => Some((*k, *v)),
                _ => None,
            })
            .collect();

        Self {
            session_id: pairs.get(session_key).map(|s| s.to_string()),
            refresh_token: pairs.get(refresh_key).map(|s| s.to_string()),
            expires_at: pairs.get("exp").map(|s| s.to_string()),
        }
    }

    /// Inverse of [`SessionTokens::from_stored`]
    pub fn to_stored(&self, session_key: &str, refresh_key: &str) -> String {
        format!(
            "{}|{}|exp|{}|{}|{}",
            session_key,
            self.session_id.as_deref().unwrap_or_default(),
            self.expires_at.as_deref().unwrap_or_default(),
            refresh_key,
            self.refresh_token.as_deref().unwrap_or_default()
        )
    }
}

/// Body of `POST /session/refresh`
#[derive(Debug, Clone, Deserialize)]
struct RefreshResponse {
    new_session_id: String,
    #[serde(default)]
    session_expiration: Option<String>,
    refresh_token: String,
}

/// Session backed by `POST {tool_domain}/session/refresh`
pub struct RefreshingSession {
    client: reqwest::Client,
    refresh_url: String,
    storage_target: StorageTarget,
    session_key: String,
    refresh_key: String,
    tokens: RwLock<SessionTokens>,
}

impl RefreshingSession {
    pub fn new(config: &DomainConfig, client: reqwest::Client, tokens: SessionTokens) -> Self {
        Self {
            client,
            refresh_url: config.endpoint("/session/refresh"),
            storage_target: config.storage_target.clone(),
            session_key: config.session_storage_key.clone(),
            refresh_key: config.refresh_token_storage_key.clone(),
            tokens: RwLock::new(tokens),
        }
    }

    /// Current tokens in storage format, for writing back to platform storage
    pub async fn stored_value(&self) -> String {
        self.tokens
            .read()
            .await
            .to_stored(&self.session_key, &self.refresh_key)
    }
}

#[async_trait]
impl SessionProvider for RefreshingSession {
    async fn credentials(&self) -> Result<Credentials> {
        if self.storage_target.is_cookie() {
            return Ok(Credentials::Cookie);
        }
        let tokens = self.tokens.read().await;
        let value = tokens
            .session_id
            .clone()
            .ok_or_else(|| BackendError::Session("no session id in storage".to_string()))?;
        Ok(Credentials::Header {
            name: self.session_key.clone(),
            value,
        })
    }

    async fn refresh(&self) -> Result<()> {
        let mut request = self.client.post(&self.refresh_url);
        if !self.storage_target.is_cookie() {
            let tokens = self.tokens.read().await;
            if let Some(session_id) = &tokens.session_id {
                request = request.header(self.session_key.as_str(), session_id.as_str());
            }
            if let Some(refresh_token) = &tokens.refresh_token {
                request = request.header(self.refresh_key.as_str(), refresh_token.as_str());
            }
        }

        let response = request
            .send()
            .await
            .map_err(|e| BackendError::Session(format!("refresh request failed: {}", e)))?;
        let status = response.status();
        if !status.is_success() {
            return Err(BackendError::Session(format!("refresh rejected with {}", status)));
        }
        let refreshed: RefreshResponse = response
            .json()
            .await
            .map_err(|e| BackendError::Session(format!("bad refresh response: {}", e)))?;

        if !self.storage_target.is_cookie() {
            let mut tokens = self.tokens.write().await;
            tokens.session_id = Some(refreshed.new_session_id);
            tokens.refresh_token = Some(refreshed.refresh_token);
            tokens.expires_at = refreshed.session_expiration;
        }
        tracing::info!(storage = %self.storage_target, "session refreshed");
        Ok(())
    }
}

// ============================================================================
// RETRY POLICY
// ============================================================================

/// Run `send` with fresh credentials. On `SessionExpired`, refresh exactly
/// once and retry exactly once; a second expiry is returned to the caller.
pub async fn send_with_session<T, F, Fut>(session: &dyn SessionProvider, mut send: F) -> Result<T>
where
    F: FnMut(Credentials) -> Fut,
    Fut: Future<Output = Result<T>>,
{
    let credentials = session.credentials().await?;
    match send(credentials).await {
        Err(BackendError::SessionExpired { message }) => {
            tracing::warn!(%message, "session expired, refreshing once");
            session.refresh().await?;
            let credentials = session.credentials().await?;
            send(credentials).await
        }
        other => other,
    }
}
