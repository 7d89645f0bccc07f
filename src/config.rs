//! Launch context for the domain tool
//!
//! Mirrors the context the LMS launch hands to the authoring UI: where the
//! backend lives and where session tokens are stored.

use std::fmt;
use std::str::FromStr;
use std::time::Duration;

use thiserror::Error;
use url::Url;

const DEFAULT_TIMEOUT_SECS: u64 = 30;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("{0} environment variable not set")]
    Missing(&'static str),

    #[error("invalid {name}: {reason}")]
    Invalid { name: &'static str, reason: String },
}

/// Where session tokens live between requests
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum StorageTarget {
    /// Browser-managed cookies; credentials travel implicitly
    #[default]
    Cookie,
    /// Platform storage in the parent window
    Parent,
    /// Platform storage in a named frame
    Frame(String),
}

impl StorageTarget {
    pub fn is_cookie(&self) -> bool {
        matches!(self, StorageTarget::Cookie)
    }
}

impl FromStr for StorageTarget {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "" => Err(ConfigError::Invalid {
                name: "ASPIRE_STORAGE_TARGET",
                reason: "empty storage target".to_string(),
            }),
            "cookie" => Ok(StorageTarget::Cookie),
            "_parent" => Ok(StorageTarget::Parent),
            frame => Ok(StorageTarget::Frame(frame.to_string())),
        }
    }
}

impl fmt::Display for StorageTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StorageTarget::Cookie => f.write_str("cookie"),
            StorageTarget::Parent => f.write_str("_parent"),
            StorageTarget::Frame(name) => f.write_str(name),
        }
    }
}

#[derive(Debug, Clone)]
pub struct DomainConfig {
    /// Backend base URL, e.g. `https://tool.example.edu/api`
    pub tool_domain: Url,
    pub storage_target: StorageTarget,
    /// Header/storage key carrying the session id
    pub session_storage_key: String,
    /// Header/storage key carrying the refresh token
    pub refresh_token_storage_key: String,
    pub request_timeout: Duration,
}

impl DomainConfig {
    pub fn new(tool_domain: Url) -> Self {
        Self {
            tool_domain,
            storage_target: StorageTarget::Cookie,
            session_storage_key: "session_id".to_string(),
            refresh_token_storage_key: "refresh_token".to_string(),
            request_timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
        }
    }

    /// Load from `ASPIRE_*` environment variables, reading `.env` first if present
    ///
    /// * `ASPIRE_TOOL_DOMAIN` (required)
    /// * `ASPIRE_STORAGE_TARGET` (`cookie`, `_parent` or a frame name; default `cookie`)
    /// * `ASPIRE_SESSION_STORAGE_KEY`, `ASPIRE_REFRESH_TOKEN_STORAGE_KEY`
    /// * `ASPIRE_REQUEST_TIMEOUT_SECS` (default 30)
    pub fn from_env() -> Result<Self, ConfigError> {
        let _ = dotenvy::dotenv();
        Self::from_vars(|name| std::env::var(name).ok())
    }

    /// Same as [`DomainConfig::from_env`] with an injectable lookup
    pub fn from_vars<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let raw_domain = lookup("ASPIRE_TOOL_DOMAIN").ok_or(ConfigError::Missing("ASPIRE_TOOL_DOMAIN"))?;
        let tool_domain = Url::parse(raw_domain.trim()).map_err(|e| ConfigError::Invalid {
            name: "ASPIRE_TOOL_DOMAIN",
            reason: e.to_string(),
        })?;

        let mut config = Self::new(tool_domain);

        if let Some(target) = lookup("ASPIRE_STORAGE_TARGET") {
            config.storage_target = target.parse()?;
        }
        if let Some(key) = lookup("ASPIRE_SESSION_STORAGE_KEY") {
            config.session_storage_key = key;
        }
        if let Some(key) = lookup("ASPIRE_REFRESH_TOKEN_STORAGE_KEY") {
            config.refresh_token_storage_key = key;
        }
        if let Some(secs) = lookup("ASPIRE_REQUEST_TIMEOUT_SECS") {
            let secs: u64 = secs.trim().parse().map_err(|_| ConfigError::Invalid {
                name: "ASPIRE_REQUEST_TIMEOUT_SECS",
                reason: format!("not a number of seconds: {}", secs),
            })?;
            config.request_timeout = Duration::from_secs(secs);
        }

        Ok(config)
    }

    /// Absolute URL for a backend path such as `/domain/changes`
    pub fn endpoint(&self, path: &str) -> String {
        format!("{}{}", self.tool_domain.as_str().trim_end_matches('/'), path)
    }
}
