//! Server configuration from the environment or a JSON file.

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tidy_chat::adapter::openai::{DEFAULT_API_KEY_ENV, DEFAULT_BASE_URL};

use crate::prompt::DEFAULT_BUSINESS_NAME;

/// Fixed lightweight model used for every completion.
pub const DEFAULT_MODEL: &str = "gpt-4o-mini";

/// Ceiling on one chat turn, in seconds.
pub const DEFAULT_MAX_TURN_SECS: u64 = 30;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("failed to read config file {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("failed to parse config file {path}: {source}")]
    Parse {
        path: PathBuf,
        source: serde_json::Error,
    },

    #[error("invalid value {value:?} for {key}")]
    InvalidValue { key: String, value: String },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct WidgetConfig {
    pub host: String,
    pub port: u16,
    /// Base URL of the OpenAI-compatible API, without `/chat/completions`.
    pub upstream_base_url: String,
    pub model: String,
    /// Name of the environment variable holding the provider secret.
    pub api_key_env: String,
    pub max_turn_secs: u64,
    pub business_name: String,
}

impl Default for WidgetConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 3000,
            upstream_base_url: DEFAULT_BASE_URL.to_string(),
            model: DEFAULT_MODEL.to_string(),
            api_key_env: DEFAULT_API_KEY_ENV.to_string(),
            max_turn_secs: DEFAULT_MAX_TURN_SECS,
            business_name: DEFAULT_BUSINESS_NAME.to_string(),
        }
    }
}

impl WidgetConfig {
    /// Read the file named by `CONFIG_FILE` if set, otherwise the environment.
    pub fn load() -> Result<Self, ConfigError> {
        match std::env::var("CONFIG_FILE") {
            Ok(path) => Self::from_file(path),
            Err(_) => Self::from_env(),
        }
    }

    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let config: Self = serde_json::from_str(&text).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })?;
        config.validate()?;
        Ok(config)
    }

    /// `TIDY_CHAT_*` variables layered over the defaults.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let mut config = Self::default();
        if let Some(host) = lookup("TIDY_CHAT_HOST") {
            config.host = host;
        }
        if let Some(port) = lookup("TIDY_CHAT_PORT") {
            config.port = parse("TIDY_CHAT_PORT", port)?;
        }
        if let Some(url) = lookup("TIDY_CHAT_UPSTREAM_URL") {
            config.upstream_base_url = url;
        }
        if let Some(model) = lookup("TIDY_CHAT_MODEL") {
            config.model = model;
        }
        if let Some(name) = lookup("TIDY_CHAT_API_KEY_ENV") {
            config.api_key_env = name;
        }
        if let Some(secs) = lookup("TIDY_CHAT_MAX_TURN_SECS") {
            config.max_turn_secs = parse("TIDY_CHAT_MAX_TURN_SECS", secs)?;
        }
        if let Some(name) = lookup("TIDY_CHAT_BUSINESS_NAME") {
            config.business_name = name;
        }
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.max_turn_secs == 0 {
            return Err(ConfigError::InvalidValue {
                key: "max_turn_secs".to_string(),
                value: "0".to_string(),
            });
        }
        if self.model.trim().is_empty() {
            return Err(ConfigError::InvalidValue {
                key: "model".to_string(),
                value: self.model.clone(),
            });
        }
        Ok(())
    }

    pub fn max_turn_duration(&self) -> Duration {
        Duration::from_secs(self.max_turn_secs)
    }

    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

fn parse<T: std::str::FromStr>(key: &str, value: String) -> Result<T, ConfigError> {
    value.trim().parse().map_err(|_| ConfigError::InvalidValue {
        key: key.to_string(),
        value,
    })
}
