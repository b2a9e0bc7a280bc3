mod channels;
mod defaults;


pub use channels::*;

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::error::WasendError;
use defaults::*;

/// Top-level wasend configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub app: AppConfig,
    #[serde(default)]
    pub api: ApiConfig,
    #[serde(default)]
    pub connection: ConnectionConfig,
    #[serde(default)]
    pub whatsapp: WhatsAppConfig,
    #[serde(default)]
    pub messaging: MessagingConfig,
    #[serde(default)]
    pub storage: StorageConfig,
}

/// General settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    #[serde(default = "default_name")]
    pub name: String,
    #[serde(default = "default_data_dir")]
    pub data_dir: String,
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            name: default_name(),
            data_dir: default_data_dir(),
            log_level: default_log_level(),
        }
    }
}

/// HTTP API and realtime channel.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiConfig {
    #[serde(default = "default_api_host")]
    pub host: String,
    #[serde(default = "default_api_port")]
    pub port: u16,
    /// Bearer token for `/api/*` and `/ws`. Empty = no auth (for local-only use).
    #[serde(default)]
    pub api_key: String,
    /// Directory holding `index.html` and `app.js`.
    #[serde(default = "default_web_dir")]
    pub web_dir: String,
    /// Allow cross-origin requests from any origin.
    #[serde(default = "default_true")]
    pub cors: bool,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            host: default_api_host(),
            port: default_api_port(),
            api_key: String::new(),
            web_dir: default_web_dir(),
            cors: true,
        }
    }
}

/// Where records live.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StorageBackend {
    /// One JSON file per collection, rewritten on every change.
    #[default]
    Json,
    /// In-process only; everything is lost on restart.
    Memory,
}

impl StorageBackend {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Json => "json",
            Self::Memory => "memory",
        }
    }
}

/// Storage config.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StorageConfig {
    #[serde(default)]
    pub backend: StorageBackend,
    /// Directory for the JSON files. Empty = `{data_dir}/data`.
    #[serde(default)]
    pub dir: String,
}

impl Config {
    /// Expanded data directory.
    pub fn data_dir(&self) -> PathBuf {
        PathBuf::from(shellexpand(&self.app.data_dir))
    }

    /// Directory holding the protocol library's session material.
    pub fn session_dir(&self) -> PathBuf {
        self.data_dir().join("whatsapp_session")
    }

    /// Directory holding the JSON record files.
    pub fn storage_dir(&self) -> PathBuf {
        if self.storage.dir.is_empty() {
            self.data_dir().join("data")
        } else {
            PathBuf::from(shellexpand(&self.storage.dir))
        }
    }

    pub fn logs_dir(&self) -> PathBuf {
        self.data_dir().join("logs")
    }

    /// Reject values that would make the lifecycle policy meaningless.
    pub fn validate(&self) -> Result<(), WasendError> {
        if self.connection.max_attempts == 0 {
            return Err(WasendError::Config(
                "connection.max_attempts must be at least 1".into(),
            ));
        }
        if self.connection.backoff == Backoff::Exponential
            && self.connection.max_cooldown_secs < self.connection.cooldown_secs
        {
            return Err(WasendError::Config(
                "connection.max_cooldown_secs must not be below cooldown_secs".into(),
            ));
        }
        if self.messaging.max_bulk_recipients == 0 {
            return Err(WasendError::Config(
                "messaging.max_bulk_recipients must be at least 1".into(),
            ));
        }
        if self.connection.qr_scale == 0 {
            return Err(WasendError::Config("connection.qr_scale must be at least 1".into()));
        }
        Ok(())
    }
}

/// Expand `~` to home directory.
pub fn shellexpand(path: &str) -> String {
    if let Some(rest) = path.strip_prefix("~/") {
        if let Some(home) = std::env::var_os("HOME") {
            return format!("{}/{rest}", home.to_string_lossy());
        }
    }
    path.to_string()
}

/// Load configuration from a TOML file.
///
/// Falls back to defaults if the file does not exist.
pub fn load(path: &str) -> Result<Config, WasendError> {
    let path = Path::new(path);
    if !path.exists() {
        tracing::info!(
            "Config file not found at {}, using defaults",
            path.display()
        );
        return Ok(Config::default());
    }

    let content = std::fs::read_to_string(path)
        .map_err(|e| WasendError::Config(format!("failed to read {}: {}", path.display(), e)))?;

    let config: Config = toml::from_str(&content)
        .map_err(|e| WasendError::Config(format!("failed to parse config: {}", e)))?;

    config.validate()?;
    Ok(config)
}
