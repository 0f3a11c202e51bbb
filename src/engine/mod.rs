//! Inference engine module
//!
//! Model definitions, resident OpenVINO models, preprocessing and ranking.

pub mod classifier;
pub mod pool;
pub mod preprocess;
pub mod ranking;
pub mod registry;

#[cfg(test)]
pub(crate) mod testing;

pub use classifier::{ImageClassifier, InferenceBackend, PredictionResult};
pub use pool::ModelPool;
pub use ranking::RankedClass;
pub use registry::{ArchitectureKind, ModelConfig, ModelRegistry};
