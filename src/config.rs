//! Classifier service configuration

use serde::Deserialize;
use std::path::{Path, PathBuf};

use crate::error::ConfigError;

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Config {
    pub server: ServerConfig,
    pub inference: InferenceConfig,
    pub models: ModelsConfig,
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    /// Directory mounted under `/static`
    pub static_dir: PathBuf,
    /// Directory holding `index.html`
    pub view_dir: PathBuf,
    pub max_upload_bytes: usize,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct InferenceConfig {
    pub device: String,
    /// Number of analyze requests allowed to run inference at once
    pub max_concurrent_requests: usize,
    /// 0 disables the timeout
    pub request_timeout_ms: u64,
    /// Serialize forward passes per model for runtimes that are not re-entrant
    pub exclusive_model_access: bool,
    /// Run one zero-filled forward pass per model at startup
    pub warmup: bool,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ModelsConfig {
    /// JSON model definition document
    pub definitions: PathBuf,
    /// Directory the `modelFileName` entries are resolved against
    pub dir: PathBuf,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    pub level: String,
    /// "text" or "json"
    pub format: String,
}

impl Config {
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        toml::from_str(&content).map_err(|source| ConfigError::ParseToml {
            path: path.to_path_buf(),
            source,
        })
    }

    pub fn default_path() -> &'static str {
        "config.toml"
    }

    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.server.host, self.server.port)
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 5042,
            static_dir: PathBuf::from("app/static"),
            view_dir: PathBuf::from("app/view"),
            max_upload_bytes: 50 * 1024 * 1024,
        }
    }
}

impl Default for InferenceConfig {
    fn default() -> Self {
        Self {
            device: "CPU".to_string(),
            max_concurrent_requests: 1,
            request_timeout_ms: 0,
            exclusive_model_access: false,
            warmup: true,
        }
    }
}

impl Default for ModelsConfig {
    fn default() -> Self {
        Self {
            definitions: PathBuf::from("modelDefinition.json"),
            dir: PathBuf::from("models"),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: "text".to_string(),
        }
    }
}
