//! Remote API configuration.
//!
//! Values are layered, later sources winning:
//!   built-in defaults
//!   ~/.config/icsync/config.toml
//!   ICSYNC_* environment variables (e.g. ICSYNC_CLIENT_ID)

use std::path::{Path, PathBuf};
use std::time::Duration;

use config::{Config, Environment, File};
use serde::{Deserialize, Serialize};

use crate::error::{RemoteError, RemoteResult};

pub const DEFAULT_SCOPE: &str = "https://www.googleapis.com/auth/calendar";
pub const DEFAULT_HTTP_TIMEOUT_SECS: u64 = 30;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RemoteConfig {
    pub client_id: String,
    #[serde(default)]
    pub client_secret: Option<String>,
    #[serde(default = "default_scope")]
    pub scope: String,
    /// Root of the OAuth endpoints (`{base_url}/device/code`, `{base_url}/token`).
    pub base_url: String,
    /// Root of the calendar API. Defaults to `base_url`.
    #[serde(default)]
    pub api_base_url: Option<String>,
    #[serde(default)]
    pub token_path: Option<PathBuf>,
    #[serde(default = "default_http_timeout_secs")]
    pub http_timeout_secs: u64,
}

fn default_scope() -> String {
    DEFAULT_SCOPE.to_string()
}

fn default_http_timeout_secs() -> u64 {
    DEFAULT_HTTP_TIMEOUT_SECS
}

/// Directory holding icsync's config and token files.
pub fn base_dir() -> RemoteResult<PathBuf> {
    Ok(dirs::config_dir()
        .ok_or_else(|| RemoteError::Config("Could not determine config directory".into()))?
        .join("icsync"))
}

pub fn config_file_path() -> RemoteResult<PathBuf> {
    Ok(base_dir()?.join("config.toml"))
}

impl RemoteConfig {
    pub fn new(client_id: impl Into<String>, base_url: impl Into<String>) -> Self {
        RemoteConfig {
            client_id: client_id.into(),
            client_secret: None,
            scope: default_scope(),
            base_url: base_url.into(),
            api_base_url: None,
            token_path: None,
            http_timeout_secs: DEFAULT_HTTP_TIMEOUT_SECS,
        }
    }

    /// Load from the default config file plus the environment.
    pub fn load() -> RemoteResult<Self> {
        Self::load_from(&config_file_path()?)
    }

    pub fn load_from(path: &Path) -> RemoteResult<Self> {
        let config: RemoteConfig = Config::builder()
            .set_default("scope", DEFAULT_SCOPE)
            .and_then(|b| b.set_default("http_timeout_secs", DEFAULT_HTTP_TIMEOUT_SECS))
            .map_err(|e| RemoteError::Config(e.to_string()))?
            .add_source(File::from(path).required(false))
            .add_source(Environment::with_prefix("ICSYNC"))
            .build()
            .map_err(|e| RemoteError::Config(e.to_string()))?
            .try_deserialize()
            .map_err(|e| RemoteError::Config(missing_hint(e, path)))?;

        if config.client_id.trim().is_empty() {
            return Err(RemoteError::Config(missing_hint("client_id is empty", path)));
        }
        if config.base_url.trim().is_empty() {
            return Err(RemoteError::Config(missing_hint("base_url is empty", path)));
        }

        Ok(config)
    }

    pub fn device_code_url(&self) -> String {
        format!("{}/device/code", trim_base(&self.base_url))
    }

    pub fn token_url(&self) -> String {
        format!("{}/token", trim_base(&self.base_url))
    }

    pub fn api_base(&self) -> &str {
        trim_base(self.api_base_url.as_deref().unwrap_or(&self.base_url))
    }

    pub fn http_timeout(&self) -> Duration {
        Duration::from_secs(self.http_timeout_secs)
    }

    /// Where the token is persisted; `~/.config/icsync/token.json` unless overridden.
    pub fn token_file(&self) -> RemoteResult<PathBuf> {
        match &self.token_path {
            Some(path) => Ok(path.clone()),
            None => Ok(base_dir()?.join("token.json")),
        }
    }
}

fn trim_base(url: &str) -> &str {
    url.trim_end_matches('/')
}

fn missing_hint(error: impl std::fmt::Display, path: &Path) -> String {
    format!(
        "{}\n\n\
        Set it in {} with:\n\n\
        client_id = \"your-client-id\"\n\
        base_url = \"https://auth.example.com\"\n\n\
        or through ICSYNC_CLIENT_ID / ICSYNC_BASE_URL.",
        error,
        path.display()
    )
}
