//! Service layer module

pub mod analyze_service;
pub mod types;

pub use analyze_service::AnalyzeService;
pub use types::*;
