//! Model Pool
//!
//! Loads every registered model at startup and keeps it resident for the
//! lifetime of the process. Models are never unloaded or swapped.

use std::path::Path;
use std::sync::Arc;
use std::time::Instant;

use anyhow::Context;
use ndarray::Array4;
use openvino::{CompiledModel, Core, ElementType, Shape, Tensor};
use parking_lot::Mutex;
use tracing::{debug, info};

use crate::config::InferenceConfig;
use crate::error::ConfigError;

use super::classifier::{ImageClassifier, InferenceBackend};
use super::registry::ModelRegistry;

/// Wrapper for OpenVINO Core that implements Send + Sync.
/// Only held so the core outlives the models compiled from it.
#[allow(dead_code)]
struct SafeCore(Core);
unsafe impl Send for SafeCore {}
unsafe impl Sync for SafeCore {}

/// Wrapper for OpenVINO CompiledModel that implements Send + Sync.
/// The bindings need `&mut self` to create infer requests, so creation is
/// serialized; the requests themselves run independently.
struct SafeCompiledModel(Mutex<CompiledModel>);
unsafe impl Send for SafeCompiledModel {}
unsafe impl Sync for SafeCompiledModel {}

impl SafeCompiledModel {
    fn create_infer_request(&self) -> anyhow::Result<openvino::InferRequest> {
        self.0.lock().create_infer_request().map_err(|e| e.into())
    }
}

/// Forward passes through a compiled OpenVINO model
pub struct OpenVinoBackend {
    compiled: SafeCompiledModel,
}

impl InferenceBackend for OpenVinoBackend {
    fn infer(&self, input: &Array4<f32>) -> anyhow::Result<Vec<f32>> {
        let mut request = self.compiled.create_infer_request()?;

        let dims: Vec<i64> = input.shape().iter().map(|&d| d as i64).collect();
        let input_shape = Shape::new(&dims)?;
        let mut tensor = Tensor::new(ElementType::F32, &input_shape)?;

        let input_data = input
            .as_slice()
            .context("input tensor is not in standard layout")?;
        let raw = tensor.get_raw_data_mut()?;
        anyhow::ensure!(
            raw.len() == input_data.len() * 4,
            "input buffer holds {} bytes, expected {}",
            raw.len(),
            input_data.len() * 4
        );
        for (dst, value) in raw.chunks_exact_mut(4).zip(input_data) {
            dst.copy_from_slice(&value.to_ne_bytes());
        }

        request.set_input_tensor(&tensor)?;
        request.infer()?;

        let output = request.get_output_tensor()?;
        let output_len = output.get_shape()?.get_dimensions().iter().product::<i64>() as usize;
        let bytes = output.get_raw_data()?;
        anyhow::ensure!(
            bytes.len() >= output_len * 4,
            "output buffer holds {} bytes, expected {}",
            bytes.len(),
            output_len * 4
        );

        Ok(bytes[..output_len * 4]
            .chunks_exact(4)
            .map(|chunk| f32::from_ne_bytes([chunk[0], chunk[1], chunk[2], chunk[3]]))
            .collect())
    }
}

/// Resident, read-only set of classifiers in registry order
pub struct ModelPool {
    classifiers: Vec<Arc<ImageClassifier>>,
    // Kept alive alongside the compiled models it produced
    _core: Option<SafeCore>,
}

impl ModelPool {
    /// Load every model in the registry onto the configured device.
    ///
    /// All weight files are checked before anything is compiled, and the
    /// first failure aborts the whole load.
    pub fn load(
        registry: &ModelRegistry,
        config: &InferenceConfig,
        models_dir: &Path,
    ) -> Result<Self, ConfigError> {
        for model in registry.models() {
            let path = model.weight_path(models_dir);
            if !path.is_file() {
                return Err(ConfigError::MissingWeights {
                    model: model.identifier().to_string(),
                    path,
                });
            }
        }

        let mut core = Core::new().map_err(|e| ConfigError::Runtime(e.to_string()))?;
        let mut classifiers = Vec::with_capacity(registry.len());

        for model in registry.models() {
            let path = model.weight_path(models_dir);
            info!(
                "Loading model: {} ({}, {} classes) from {}",
                model.identifier(),
                model.architecture.as_str(),
                model.num_classes(),
                path.display()
            );
            let start = Instant::now();

            let compiled = compile(&mut core, &path, &config.device).map_err(|e| ConfigError::Load {
                model: model.identifier().to_string(),
                reason: format!("{:#}", e),
            })?;

            info!("Model {} loaded in {:?}", model.identifier(), start.elapsed());

            let backend = OpenVinoBackend {
                compiled: SafeCompiledModel(Mutex::new(compiled)),
            };
            classifiers.push(Arc::new(ImageClassifier::new(
                model.clone(),
                Box::new(backend),
                config.exclusive_model_access,
            )));
        }

        Ok(Self {
            classifiers,
            _core: Some(SafeCore(core)),
        })
    }

    /// Build a pool from already constructed classifiers
    pub fn from_classifiers(classifiers: Vec<ImageClassifier>) -> Self {
        Self {
            classifiers: classifiers.into_iter().map(Arc::new).collect(),
            _core: None,
        }
    }

    pub fn classifiers(&self) -> &[Arc<ImageClassifier>] {
        &self.classifiers
    }

    pub fn len(&self) -> usize {
        self.classifiers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.classifiers.is_empty()
    }

    /// Run one zero-filled forward pass per model and check the output size
    pub fn warmup(&self) -> Result<(), ConfigError> {
        for classifier in &self.classifiers {
            let size = classifier.input_size() as usize;
            let input = Array4::<f32>::zeros((1, 3, size, size));
            let start = Instant::now();

            let output = classifier.forward(&input).map_err(|e| ConfigError::Load {
                model: classifier.id().to_string(),
                reason: format!("warmup failed: {:#}", e),
            })?;

            let expected = classifier.config().num_classes();
            if output.len() != expected {
                return Err(ConfigError::OutputMismatch {
                    model: classifier.id().to_string(),
                    expected,
                    actual: output.len(),
                });
            }

            debug!("Model {} warmed up in {:?}", classifier.id(), start.elapsed());
        }
        Ok(())
    }
}

impl std::fmt::Debug for ModelPool {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ModelPool")
            .field("classifiers", &self.classifiers)
            .finish()
    }
}

fn compile(core: &mut Core, path: &Path, device: &str) -> anyhow::Result<CompiledModel> {
    let path_str = path
        .to_str()
        .with_context(|| format!("model path is not valid UTF-8: {}", path.display()))?;
    let model = core.read_model_from_file(path_str, "")?;
    let compiled = core.compile_model(&model, device.into())?;
    Ok(compiled)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::testing::{model_config, FailingBackend, FixedBackend};

    #[test]
    fn test_missing_weights_fail_before_runtime() {
        let dir = tempfile::tempdir().unwrap();
        let registry = ModelRegistry::new(vec![model_config("catdog", &["cat", "dog"], 224)]).unwrap();

        let err = ModelPool::load(&registry, &InferenceConfig::default(), dir.path()).unwrap_err();
        match err {
            ConfigError::MissingWeights { model, path } => {
                assert_eq!(model, "catdog");
                assert_eq!(path, dir.path().join("catdog-stage-2.onnx"));
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_second_missing_weight_still_fatal() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("first-stage-2.onnx"), b"onnx").unwrap();
        let registry = ModelRegistry::new(vec![
            model_config("first", &["a"], 64),
            model_config("second", &["b"], 64),
        ])
        .unwrap();

        let err = ModelPool::load(&registry, &InferenceConfig::default(), dir.path()).unwrap_err();
        assert!(matches!(err, ConfigError::MissingWeights { model, .. } if model == "second"));
    }

    #[test]
    fn test_warmup_checks_output_size() {
        let pool = ModelPool::from_classifiers(vec![
            ImageClassifier::new(model_config("ok", &["a", "b"], 8), Box::new(FixedBackend::new(vec![0.0, 1.0])), false),
            ImageClassifier::new(model_config("bad", &["a", "b"], 8), Box::new(FixedBackend::new(vec![0.0; 10])), false),
        ]);

        let err = pool.warmup().unwrap_err();
        assert!(matches!(
            err,
            ConfigError::OutputMismatch { model, expected: 2, actual: 10 } if model == "bad"
        ));
    }

    #[test]
    fn test_warmup_backend_failure_is_fatal() {
        let pool = ModelPool::from_classifiers(vec![ImageClassifier::new(
            model_config("broken", &["a"], 8),
            Box::new(FailingBackend),
            false,
        )]);
        assert!(matches!(pool.warmup(), Err(ConfigError::Load { .. })));
    }

    #[test]
    fn test_pool_preserves_registry_order() {
        let pool = ModelPool::from_classifiers(vec![
            ImageClassifier::new(model_config("first", &["a"], 8), Box::new(FixedBackend::new(vec![1.0])), false),
            ImageClassifier::new(model_config("second", &["b"], 8), Box::new(FixedBackend::new(vec![1.0])), false),
        ]);
        let ids: Vec<_> = pool.classifiers().iter().map(|c| c.id().to_string()).collect();
        assert_eq!(ids, vec!["first", "second"]);
        assert!(pool.warmup().is_ok());
    }
}
