//! Image classifier
//!
//! Binds one model definition to a resident inference backend and turns a
//! forward pass into a labelled prediction.

use image::DynamicImage;
use ndarray::Array4;
use parking_lot::Mutex;
use serde::Serialize;

use crate::error::AnalyzeError;
use crate::utils::math::{argmax, softmax};

use super::preprocess::preprocess_for_classification;
use super::registry::ModelConfig;

/// A forward pass over a 1x3xHxW tensor returning the flattened output.
/// Implementations must tolerate concurrent calls unless the owning
/// classifier was built with exclusive access.
pub trait InferenceBackend: Send + Sync {
    fn infer(&self, input: &Array4<f32>) -> anyhow::Result<Vec<f32>>;
}

/// Prediction of one model for one image
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PredictionResult {
    pub model_id: String,
    pub predicted_label: String,
    /// Same length and order as the model's class labels
    pub scores: Vec<f32>,
}

/// A loaded model ready for inference
pub struct ImageClassifier {
    config: ModelConfig,
    backend: Box<dyn InferenceBackend>,
    gate: Option<Mutex<()>>,
}

impl ImageClassifier {
    /// Create a classifier. With `exclusive` set, forward passes through this
    /// model are serialized.
    pub fn new(config: ModelConfig, backend: Box<dyn InferenceBackend>, exclusive: bool) -> Self {
        Self {
            config,
            backend,
            gate: exclusive.then(|| Mutex::new(())),
        }
    }

    pub fn config(&self) -> &ModelConfig {
        &self.config
    }

    pub fn id(&self) -> &str {
        self.config.identifier()
    }

    pub fn input_size(&self) -> u32 {
        self.config.input_image_size
    }

    /// Raw backend output for a prepared tensor
    pub fn forward(&self, input: &Array4<f32>) -> anyhow::Result<Vec<f32>> {
        let _guard = self.gate.as_ref().map(|gate| gate.lock());
        self.backend.infer(input)
    }

    /// Classify a decoded image
    pub fn predict(&self, image: &DynamicImage) -> Result<PredictionResult, AnalyzeError> {
        let tensor = preprocess_for_classification(image, self.input_size());
        self.predict_tensor(&tensor)
    }

    /// Classify an already preprocessed tensor of this model's input size
    pub fn predict_tensor(&self, tensor: &Array4<f32>) -> Result<PredictionResult, AnalyzeError> {
        let raw = self.forward(tensor).map_err(|e| AnalyzeError::PartialInference {
            model: self.id().to_string(),
            message: format!("{:#}", e),
        })?;

        let expected = self.config.num_classes();
        if raw.len() != expected {
            return Err(AnalyzeError::Validation(format!(
                "model '{}' returned {} scores for {} classes",
                self.id(),
                raw.len(),
                expected
            )));
        }

        let scores = if self.config.apply_softmax { softmax(&raw) } else { raw };

        let idx = argmax(&scores).ok_or_else(|| {
            AnalyzeError::Validation(format!("model '{}' returned no scores", self.id()))
        })?;

        tracing::debug!(
            model = self.id(),
            label = %self.config.class_labels[idx],
            score = scores[idx],
            "Prediction complete"
        );

        Ok(PredictionResult {
            model_id: self.id().to_string(),
            predicted_label: self.config.class_labels[idx].clone(),
            scores,
        })
    }
}

impl std::fmt::Debug for ImageClassifier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ImageClassifier")
            .field("id", &self.id())
            .field("architecture", &self.config.architecture)
            .field("input_size", &self.config.input_image_size)
            .field("exclusive", &self.gate.is_some())
            .finish()
    }
}
