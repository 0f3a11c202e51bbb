//! Logging initialization
//!
//! `RUST_LOG` takes precedence over the configured level.

use thiserror::Error;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::config::LoggingConfig;

/// Log output format
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum LogFormat {
    #[default]
    Text,
    Json,
}

impl LogFormat {
    pub fn parse(value: &str) -> Result<Self, LogError> {
        match value.to_ascii_lowercase().as_str() {
            "text" | "pretty" => Ok(LogFormat::Text),
            "json" => Ok(LogFormat::Json),
            other => Err(LogError::UnknownFormat(other.to_string())),
        }
    }
}

#[derive(Debug, Error)]
pub enum LogError {
    #[error("Invalid log filter: {0}")]
    InvalidFilter(String),
    #[error("Unknown log format: {0}")]
    UnknownFormat(String),
    #[error("Subscriber already initialized")]
    AlreadyInitialized,
}

/// Build the filter from `RUST_LOG`, falling back to the configured level
pub fn build_filter(level: &str) -> Result<EnvFilter, LogError> {
    let env = std::env::var(EnvFilter::DEFAULT_ENV).ok();
    resolve_filter(env.as_deref(), level)
}

/// An unparsable environment directive is ignored in favour of `level`
fn resolve_filter(env: Option<&str>, level: &str) -> Result<EnvFilter, LogError> {
    if let Some(filter) = env.and_then(|directives| EnvFilter::try_new(directives).ok()) {
        return Ok(filter);
    }
    EnvFilter::try_new(level).map_err(|e| LogError::InvalidFilter(e.to_string()))
}

/// Install the global subscriber. Call once at startup.
pub fn init_logging(config: &LoggingConfig) -> Result<(), LogError> {
    let format = LogFormat::parse(&config.format)?;
    let filter = build_filter(&config.level)?;
    let registry = tracing_subscriber::registry().with(filter);

    match format {
        LogFormat::Json => registry
            .with(fmt::layer().json().with_target(false))
            .try_init()
            .map_err(|_| LogError::AlreadyInitialized),
        LogFormat::Text => registry
            .with(fmt::layer().with_target(false))
            .try_init()
            .map_err(|_| LogError::AlreadyInitialized),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_format() {
        assert_eq!(LogFormat::parse("json").unwrap(), LogFormat::Json);
        assert_eq!(LogFormat::parse("TEXT").unwrap(), LogFormat::Text);
        assert_eq!(LogFormat::parse("pretty").unwrap(), LogFormat::Text);
        assert!(matches!(LogFormat::parse("xml"), Err(LogError::UnknownFormat(_))));
    }

    #[test]
    fn test_build_filter_accepts_level() {
        assert!(build_filter("info").is_ok());
    }

    #[test]
    fn test_configured_level_used_without_env() {
        let filter = resolve_filter(None, "image_classifier=debug,tower_http=info").unwrap();
        assert!(filter.to_string().contains("image_classifier=debug"));
    }

    #[test]
    fn test_invalid_level_rejected() {
        let err = resolve_filter(None, "image_classifier=loud").unwrap_err();
        assert!(matches!(err, LogError::InvalidFilter(_)));
    }

    #[test]
    fn test_env_directive_overrides_level() {
        let filter = resolve_filter(Some("tower_http=trace"), "warn").unwrap();
        assert!(filter.to_string().contains("tower_http=trace"));
    }

    #[test]
    fn test_unparsable_env_falls_back_to_level() {
        let filter = resolve_filter(Some("image_classifier=loud"), "warn").unwrap();
        assert_eq!(filter.to_string(), "warn");
    }
}
