//! Layered client configuration.
//!
//! Defaults, then an optional TOML file, then `SCREENSHOTS_`-prefixed
//! environment variables (nested keys separated by `__`, e.g.
//! `SCREENSHOTS_WATCH__MAX_INTERVAL_MS`).

use std::path::Path;
use std::time::Duration;

use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::client::{
    ClientError, Credentials, DEFAULT_BASE_URL, DEFAULT_TIMEOUT, DEFAULT_USER_AGENT,
};
use crate::logging::LogConfig;

pub const ENV_PREFIX: &str = "SCREENSHOTS_";

#[derive(Debug, Error)]
#[error("Invalid configuration: {0}")]
pub struct ConfigError(#[from] Box<figment::Error>);

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClientConfig {
    pub base_url: String,
    pub username: String,
    pub access_key: String,
    pub timeout_secs: u64,
    pub user_agent: String,
    pub watch: WatchConfig,
    pub log: LogConfig,
}

/// Polling schedule for [`crate::watch::JobWatcher`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WatchConfig {
    pub initial_interval_ms: u64,
    pub max_interval_ms: u64,
    pub multiplier: f64,
    /// Give up after this long; unset means wait until cancelled.
    pub timeout_secs: Option<u64>,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            username: String::new(),
            access_key: String::new(),
            timeout_secs: DEFAULT_TIMEOUT.as_secs(),
            user_agent: DEFAULT_USER_AGENT.to_string(),
            watch: WatchConfig::default(),
            log: LogConfig::default(),
        }
    }
}

impl Default for WatchConfig {
    fn default() -> Self {
        Self {
            initial_interval_ms: 2_000,
            max_interval_ms: 30_000,
            multiplier: 2.0,
            timeout_secs: Some(600),
        }
    }
}

impl ClientConfig {
    /// Load configuration, reading `path` as TOML when given.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        Self::figment(path)
            .extract()
            .map_err(|e| ConfigError(Box::new(e)))
    }

    /// The provider stack behind [`load`](Self::load), for callers that
    /// want to merge further sources.
    pub fn figment(path: Option<&Path>) -> Figment {
        let mut figment = Figment::from(Serialized::defaults(ClientConfig::default()));
        if let Some(path) = path {
            figment = figment.merge(Toml::file(path));
        }
        figment.merge(Env::prefixed(ENV_PREFIX).split("__"))
    }

    pub fn credentials(&self) -> Result<Credentials, ClientError> {
        Credentials::new(self.username.clone(), self.access_key.clone())
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}
