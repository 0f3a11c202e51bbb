//! REST API response data transfer objects

use serde::{Deserialize, Serialize};

/// Analyze response. The three main arrays hold one entry per configured
/// model in registry order, so callers can zip them by index.
#[derive(Debug, Serialize, Deserialize)]
pub struct AnalyzeResponse {
    #[serde(rename = "textResult")]
    pub text_result: Vec<String>,
    pub result: Vec<ModelPredictionDto>,
    pub top_3_result: Vec<ModelPredictionDto>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub errors: Vec<ModelErrorDto>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelPredictionDto {
    #[serde(rename = "modelName")]
    pub model_name: String,
    pub prediction: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelErrorDto {
    #[serde(rename = "modelName")]
    pub model_name: String,
    pub error: String,
}

/// Health response
#[derive(Debug, Serialize, Deserialize)]
pub struct HealthResponse {
    pub healthy: bool,
    pub version: String,
    pub models: Vec<ModelInfoDto>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ModelInfoDto {
    pub id: String,
    pub name: String,
    pub architecture: String,
    #[serde(rename = "imageSize")]
    pub image_size: u32,
    pub classes: usize,
}

/// Error response
#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
    pub code: String,
}

impl ErrorResponse {
    pub fn new(error: &str, code: &str) -> Self {
        Self {
            error: error.to_string(),
            code: code.to_string(),
        }
    }
}
