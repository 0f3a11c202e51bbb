//! Analyze Service - multi-model inference pipeline
//!
//! Decodes an uploaded image and runs it through every resident model in
//! registry order. Inference is CPU bound and runs on the blocking pool,
//! gated by a semaphore so a bounded number of requests infer at once.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

use ndarray::Array4;
use tokio::sync::Semaphore;
use tracing::{info, warn, Span};

use crate::config::InferenceConfig;
use crate::engine::preprocess::{decode_image, preprocess_for_classification};
use crate::engine::ranking::rank_top3;
use crate::engine::{ImageClassifier, ModelPool};
use crate::error::AnalyzeError;

use super::types::*;

/// Image analysis service shared by all request handlers
pub struct AnalyzeService {
    pool: Arc<ModelPool>,
    permits: Arc<Semaphore>,
    timeout: Option<Duration>,
}

impl AnalyzeService {
    pub fn new(pool: Arc<ModelPool>, config: &InferenceConfig) -> Self {
        let timeout = (config.request_timeout_ms > 0)
            .then(|| Duration::from_millis(config.request_timeout_ms));

        Self {
            pool,
            permits: Arc::new(Semaphore::new(config.max_concurrent_requests.max(1))),
            timeout,
        }
    }

    pub fn pool(&self) -> &Arc<ModelPool> {
        &self.pool
    }

    /// Analyze an image with every model.
    ///
    /// A model that fails is reported in its outcome; the request only fails
    /// when the image cannot be decoded or every model fails.
    pub async fn analyze(&self, image_data: Vec<u8>) -> Result<AnalyzeResult, AnalyzeError> {
        let start = Instant::now();

        let outcomes = match self.timeout {
            Some(limit) => tokio::time::timeout(limit, self.run_blocking(image_data))
                .await
                .map_err(|_| AnalyzeError::Timeout(limit.as_millis() as u64))??,
            None => self.run_blocking(image_data).await?,
        };

        if !outcomes.is_empty() && outcomes.iter().all(|o| !o.is_success()) {
            return Err(AnalyzeError::AllModelsFailed(outcomes.len()));
        }

        Ok(AnalyzeResult {
            outcomes,
            inference_time_ms: start.elapsed().as_millis() as u64,
        })
    }

    async fn run_blocking(&self, image_data: Vec<u8>) -> Result<Vec<ModelOutcome>, AnalyzeError> {
        let permit = self
            .permits
            .clone()
            .acquire_owned()
            .await
            .map_err(|e| AnalyzeError::Internal(e.to_string()))?;

        let pool = self.pool.clone();
        let span = Span::current();

        // The permit travels with the job so it is held until inference ends,
        // even if the caller stops waiting.
        tokio::task::spawn_blocking(move || {
            let _permit = permit;
            let _entered = span.enter();
            run_pipeline(&pool, &image_data)
        })
        .await
        .map_err(|e| AnalyzeError::Internal(format!("inference task failed: {}", e)))?
    }

    /// Get health status
    pub fn health(&self) -> HealthResult {
        let models = self
            .pool
            .classifiers()
            .iter()
            .map(|c| {
                let config = c.config();
                ModelSummary {
                    id: c.id().to_string(),
                    name: config.display_name.clone(),
                    architecture: config.architecture.as_str().to_string(),
                    image_size: config.input_image_size,
                    classes: config.num_classes(),
                }
            })
            .collect();

        HealthResult {
            healthy: !self.pool.is_empty(),
            version: env!("CARGO_PKG_VERSION").to_string(),
            models,
        }
    }
}

/// Decode once and run every model sequentially, one outcome per model
pub fn run_pipeline(pool: &ModelPool, image_data: &[u8]) -> Result<Vec<ModelOutcome>, AnalyzeError> {
    let image = decode_image(image_data)?;

    // Models sharing an input size share the preprocessed tensor
    let mut tensors: HashMap<u32, Array4<f32>> = HashMap::new();
    let mut outcomes = Vec::with_capacity(pool.len());

    for classifier in pool.classifiers() {
        let start = Instant::now();
        let tensor = tensors
            .entry(classifier.input_size())
            .or_insert_with(|| preprocess_for_classification(&image, classifier.input_size()));

        let outcome = match classify(classifier, tensor) {
            Ok(prediction) => {
                info!(
                    model = classifier.id(),
                    prediction = %prediction.prediction.predicted_label,
                    elapsed_ms = start.elapsed().as_millis() as u64,
                    "Model inference complete"
                );
                ModelOutcome::Success(prediction)
            }
            Err(e) => {
                warn!(model = classifier.id(), error = %e, "Model inference failed");
                ModelOutcome::Failed {
                    model_id: classifier.id().to_string(),
                    model_name: classifier.config().display_name.clone(),
                    error: e.to_string(),
                }
            }
        };
        outcomes.push(outcome);
    }

    Ok(outcomes)
}

fn classify(classifier: &ImageClassifier, tensor: &Array4<f32>) -> Result<ModelPrediction, AnalyzeError> {
    let prediction = classifier.predict_tensor(tensor)?;
    let top3 = rank_top3(&classifier.config().class_labels, &prediction.scores)?;

    Ok(ModelPrediction {
        model_name: classifier.config().display_name.clone(),
        prediction,
        top3,
    })
}
