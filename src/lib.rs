//! Multi-model Image Classification Service Library

pub mod config;
pub mod engine;
pub mod error;
pub mod service;
pub mod api;
pub mod telemetry;
pub mod utils;

pub use config::Config;
pub use error::{AnalyzeError, ConfigError};
