// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! Client configuration.
//!
//! Configuration is a TOML file, by default
//! `$XDG_CONFIG_HOME/prepsync/config.toml`. Every key is optional:
//! - `user`: associates the session cache with a user
//! - `[connection]`: push endpoint and reconnect/keepalive tuning
//! - `[api]`: session REST endpoint, bearer token and request timeout

use serde::{Deserialize, Serialize};
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::env;
use crate::error::{Error, Result};
use crate::sync::ConnectionConfig;

const CONFIG_DIR_NAME: &str = "prepsync";
const CONFIG_FILE_NAME: &str = "config.toml";

/// Top-level configuration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Config {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user: Option<String>,
    #[serde(default)]
    pub connection: ConnectionSettings,
    #[serde(default)]
    pub api: ApiConfig,
}

/// `[connection]` table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConnectionSettings {
    #[serde(default = "default_ws_url")]
    pub url: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub session_id: Option<String>,
    #[serde(default = "default_true")]
    pub auto_reconnect: bool,
    #[serde(default = "default_max_reconnect_attempts")]
    pub max_reconnect_attempts: u32,
    #[serde(default = "default_reconnect_interval_ms")]
    pub reconnect_interval_ms: u64,
    #[serde(default = "default_keepalive_interval_ms")]
    pub keepalive_interval_ms: u64,
}

/// `[api]` table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApiConfig {
    #[serde(default = "default_api_url")]
    pub base_url: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub token: Option<String>,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

fn default_ws_url() -> String {
    "ws://localhost:8000/websocket/ws".to_string()
}

fn default_api_url() -> String {
    "http://localhost:8000/api/sessions".to_string()
}

fn default_true() -> bool {
    true
}

fn default_max_reconnect_attempts() -> u32 {
    5
}

fn default_reconnect_interval_ms() -> u64 {
    3000
}

fn default_keepalive_interval_ms() -> u64 {
    30_000
}

fn default_timeout_secs() -> u64 {
    30
}

impl Default for ConnectionSettings {
    fn default() -> Self {
        ConnectionSettings {
            url: default_ws_url(),
            session_id: None,
            auto_reconnect: true,
            max_reconnect_attempts: default_max_reconnect_attempts(),
            reconnect_interval_ms: default_reconnect_interval_ms(),
            keepalive_interval_ms: default_keepalive_interval_ms(),
        }
    }
}

impl ConnectionSettings {
    /// Converts to the connection manager's configuration.
    pub fn to_connection_config(&self) -> ConnectionConfig {
        ConnectionConfig {
            url: self.url.clone(),
            session_id: self.session_id.clone(),
            auto_reconnect: self.auto_reconnect,
            max_reconnect_attempts: self.max_reconnect_attempts,
            reconnect_interval: Duration::from_millis(self.reconnect_interval_ms),
            keepalive_interval: Duration::from_millis(self.keepalive_interval_ms),
        }
    }
}

impl Default for ApiConfig {
    fn default() -> Self {
        ApiConfig {
            base_url: default_api_url(),
            token: None,
            timeout_secs: default_timeout_secs(),
        }
    }
}

impl ApiConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

impl Config {
    /// Parses and validates a TOML document.
    pub fn from_toml(content: &str) -> Result<Self> {
        let config: Config = toml::from_str(content)
            .map_err(|e| Error::Config(format!("failed to parse config: {}", e)))?;
        config.validate()?;
        Ok(config)
    }

    /// Loads configuration from `path`. A missing file is an error.
    pub fn load(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path).map_err(|e| match e.kind() {
            ErrorKind::NotFound => Error::ConfigNotFound(path.display().to_string()),
            _ => Error::Config(format!("failed to read {}: {}", path.display(), e)),
        })?;
        Self::from_toml(&content)
    }

    /// Resolves the configuration the CLI runs with.
    ///
    /// An explicit path (flag, then `PREPSYNC_CONFIG`) must exist; the
    /// default path is optional. `PREPSYNC_TOKEN` replaces the API token.
    pub fn resolve(explicit: Option<&Path>) -> Result<Self> {
        let required = explicit.map(Path::to_path_buf).or_else(env::config_path);
        let config = Self::load_or_default(required.as_deref(), default_config_path().as_deref())?;
        Ok(config.with_token(env::token()))
    }

    /// Loads `required` if given, else `fallback` if it exists, else defaults.
    pub fn load_or_default(required: Option<&Path>, fallback: Option<&Path>) -> Result<Self> {
        if let Some(path) = required {
            return Self::load(path);
        }
        match fallback {
            Some(path) if path.is_file() => Self::load(path),
            _ => Ok(Config::default()),
        }
    }

    /// Replaces the API token when `token` is set.
    pub fn with_token(mut self, token: Option<String>) -> Self {
        if token.is_some() {
            self.api.token = token;
        }
        self
    }

    /// Checks URL schemes and interval values.
    pub fn validate(&self) -> Result<()> {
        let url = self.connection.url.trim();
        if !(url.starts_with("ws://") || url.starts_with("wss://")) {
            return Err(Error::InvalidSetting {
                field: "connection.url",
                reason: format!("'{}' must start with ws:// or wss://", url),
            });
        }
        let base = self.api.base_url.trim();
        if !(base.starts_with("http://") || base.starts_with("https://")) {
            return Err(Error::InvalidSetting {
                field: "api.base_url",
                reason: format!("'{}' must start with http:// or https://", base),
            });
        }
        if self.connection.reconnect_interval_ms == 0 {
            return Err(Error::InvalidSetting {
                field: "connection.reconnect_interval_ms",
                reason: "must be greater than zero".to_string(),
            });
        }
        if self.connection.keepalive_interval_ms == 0 {
            return Err(Error::InvalidSetting {
                field: "connection.keepalive_interval_ms",
                reason: "must be greater than zero".to_string(),
            });
        }
        if self.api.timeout_secs == 0 {
            return Err(Error::InvalidSetting {
                field: "api.timeout_secs",
                reason: "must be greater than zero".to_string(),
            });
        }
        if self.user.as_deref().is_some_and(|u| u.trim().is_empty()) {
            return Err(Error::FieldEmpty { field: "user" });
        }
        Ok(())
    }

    /// Renders as TOML with the token masked.
    pub fn to_display_toml(&self) -> Result<String> {
        let mut shown = self.clone();
        if shown.api.token.is_some() {
            shown.api.token = Some("********".to_string());
        }
        toml::to_string_pretty(&shown)
            .map_err(|e| Error::Config(format!("failed to serialize config: {}", e)))
    }
}

/// `$XDG_CONFIG_HOME/prepsync/config.toml`, or the platform equivalent.
pub fn default_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|dir| dir.join(CONFIG_DIR_NAME).join(CONFIG_FILE_NAME))
}

#[cfg(test)]
#[path = "config_tests.rs"]
mod tests;
