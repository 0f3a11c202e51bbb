//! Service layer types

use serde::Serialize;

use crate::engine::{PredictionResult, RankedClass};

/// Successful prediction of one model, with its top-3 ranking
#[derive(Debug, Clone, Serialize)]
pub struct ModelPrediction {
    pub model_name: String,
    pub prediction: PredictionResult,
    pub top3: Vec<RankedClass>,
}

/// Result of one model for one request. Failures are isolated per model.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum ModelOutcome {
    Success(ModelPrediction),
    Failed {
        model_id: String,
        model_name: String,
        error: String,
    },
}

impl ModelOutcome {
    pub fn model_name(&self) -> &str {
        match self {
            ModelOutcome::Success(p) => &p.model_name,
            ModelOutcome::Failed { model_name, .. } => model_name,
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, ModelOutcome::Success(_))
    }
}

/// Outcome of every configured model, in registry order
#[derive(Debug, Clone, Serialize)]
pub struct AnalyzeResult {
    pub outcomes: Vec<ModelOutcome>,
    pub inference_time_ms: u64,
}

impl AnalyzeResult {
    pub fn failed_count(&self) -> usize {
        self.outcomes.iter().filter(|o| !o.is_success()).count()
    }
}

/// Summary of one resident model
#[derive(Debug, Clone, Serialize)]
pub struct ModelSummary {
    pub id: String,
    pub name: String,
    pub architecture: String,
    pub image_size: u32,
    pub classes: usize,
}

/// Health check result
#[derive(Debug, Clone, Serialize)]
pub struct HealthResult {
    pub healthy: bool,
    pub version: String,
    pub models: Vec<ModelSummary>,
}
