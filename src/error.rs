//! Error taxonomy for startup and request handling

use std::path::PathBuf;

use thiserror::Error;

/// Fatal errors raised while loading configuration and models.
/// Any of these aborts startup before the listener is bound.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read {}: {source}", path.display())]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Failed to parse config {}: {source}", path.display())]
    ParseToml {
        path: PathBuf,
        source: toml::de::Error,
    },

    #[error("Failed to parse model definitions {}: {source}", path.display())]
    ParseDefinitions {
        path: PathBuf,
        source: serde_json::Error,
    },

    #[error("No models configured")]
    EmptyRegistry,

    #[error("Duplicate model identifier: {0}")]
    DuplicateIdentifier(String),

    #[error("Model '{0}' has no class labels")]
    EmptyClasses(String),

    #[error("Model '{0}' has an invalid image size (must be positive)")]
    InvalidImageSize(String),

    #[error("Weight file for model '{model}' not found: {}", path.display())]
    MissingWeights { model: String, path: PathBuf },

    #[error("Failed to initialize inference runtime: {0}")]
    Runtime(String),

    #[error("Failed to load model '{model}': {reason}")]
    Load { model: String, reason: String },

    #[error("Model '{model}' produces {actual} scores but has {expected} class labels")]
    OutputMismatch {
        model: String,
        expected: usize,
        actual: usize,
    },
}

/// Errors raised while analyzing an uploaded image.
#[derive(Debug, Error)]
pub enum AnalyzeError {
    #[error("Failed to decode image: {0}")]
    Decode(String),

    /// One model failed; the rest of the request is unaffected.
    #[error("Model '{model}' failed: {message}")]
    PartialInference { model: String, message: String },

    #[error("Validation failed: {0}")]
    Validation(String),

    #[error("All {0} models failed to produce a prediction")]
    AllModelsFailed(usize),

    #[error("Analysis timed out after {0} ms")]
    Timeout(u64),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl AnalyzeError {
    /// Stable machine-readable code used in error response bodies
    pub fn code(&self) -> &'static str {
        match self {
            AnalyzeError::Decode(_) => "DECODE_ERROR",
            AnalyzeError::PartialInference { .. } => "PARTIAL_INFERENCE",
            AnalyzeError::Validation(_) => "VALIDATION_ERROR",
            AnalyzeError::AllModelsFailed(_) => "INFERENCE_FAILED",
            AnalyzeError::Timeout(_) => "TIMEOUT",
            AnalyzeError::Internal(_) => "INTERNAL",
        }
    }
}
