//! Model Registry
//!
//! Parses and validates the JSON model definition document. The registry is
//! built once at startup and never mutated afterwards.

use std::collections::HashSet;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

/// Supported classifier architectures.
/// Unknown `modelType` values are rejected while the definitions are parsed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ArchitectureKind {
    Resnet18,
    Resnet34,
    Resnet50,
    Resnet101,
    Resnet152,
}

impl ArchitectureKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ArchitectureKind::Resnet18 => "resnet18",
            ArchitectureKind::Resnet34 => "resnet34",
            ArchitectureKind::Resnet50 => "resnet50",
            ArchitectureKind::Resnet101 => "resnet101",
            ArchitectureKind::Resnet152 => "resnet152",
        }
    }
}

/// One entry of the model definition document
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ModelConfig {
    /// Explicit identifier; falls back to `name`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(rename = "name")]
    pub display_name: String,
    #[serde(rename = "classes")]
    pub class_labels: Vec<String>,
    #[serde(rename = "imageSize")]
    pub input_image_size: u32,
    #[serde(rename = "modelType")]
    pub architecture: ArchitectureKind,
    #[serde(rename = "modelFileName")]
    pub weight_file: String,
    #[serde(default = "default_apply_softmax")]
    pub apply_softmax: bool,
}

fn default_apply_softmax() -> bool {
    true
}

impl ModelConfig {
    pub fn identifier(&self) -> &str {
        self.id.as_deref().unwrap_or(&self.display_name)
    }

    pub fn num_classes(&self) -> usize {
        self.class_labels.len()
    }

    /// Resolve the weight file against the models directory.
    /// A bare name gets the `.onnx` extension.
    pub fn weight_path(&self, models_dir: &Path) -> PathBuf {
        let mut path = models_dir.join(&self.weight_file);
        if path.extension().is_none() {
            path.set_extension("onnx");
        }
        path
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.class_labels.is_empty() {
            return Err(ConfigError::EmptyClasses(self.identifier().to_string()));
        }
        if self.input_image_size == 0 {
            return Err(ConfigError::InvalidImageSize(self.identifier().to_string()));
        }
        Ok(())
    }
}

/// Validated, ordered list of model definitions
#[derive(Debug, Clone)]
pub struct ModelRegistry {
    models: Vec<ModelConfig>,
}

impl ModelRegistry {
    /// Build a registry, rejecting empty lists, duplicate ids and invalid entries
    pub fn new(models: Vec<ModelConfig>) -> Result<Self, ConfigError> {
        if models.is_empty() {
            return Err(ConfigError::EmptyRegistry);
        }

        let mut seen = HashSet::new();
        for model in &models {
            model.validate()?;
            if !seen.insert(model.identifier().to_string()) {
                return Err(ConfigError::DuplicateIdentifier(model.identifier().to_string()));
            }
        }

        Ok(Self { models })
    }

    pub fn from_json(json: &str, source: &Path) -> Result<Self, ConfigError> {
        let models: Vec<ModelConfig> =
            serde_json::from_str(json).map_err(|e| ConfigError::ParseDefinitions {
                path: source.to_path_buf(),
                source: e,
            })?;
        Self::new(models)
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_json(&content, path)
    }

    pub fn models(&self) -> &[ModelConfig] {
        &self.models
    }

    pub fn len(&self) -> usize {
        self.models.len()
    }

    pub fn is_empty(&self) -> bool {
        self.models.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const CATDOG: &str = r#"[
        {"name": "catdog", "classes": ["cat", "dog"], "imageSize": 224,
         "modelType": "resnet34", "modelFileName": "catdog-stage-2"}
    ]"#;

    fn parse(json: &str) -> Result<ModelRegistry, ConfigError> {
        ModelRegistry::from_json(json, Path::new("modelDefinition.json"))
    }

    #[test]
    fn test_parse_definition_document() {
        let registry = parse(CATDOG).unwrap();
        assert_eq!(registry.len(), 1);

        let model = &registry.models()[0];
        assert_eq!(model.identifier(), "catdog");
        assert_eq!(model.display_name, "catdog");
        assert_eq!(model.class_labels, vec!["cat", "dog"]);
        assert_eq!(model.input_image_size, 224);
        assert_eq!(model.architecture, ArchitectureKind::Resnet34);
        assert!(model.apply_softmax);
    }

    #[test]
    fn test_unknown_architecture_rejected() {
        let json = CATDOG.replace("resnet34", "vgg16");
        assert!(matches!(parse(&json), Err(ConfigError::ParseDefinitions { .. })));
    }

    #[test]
    fn test_empty_classes_rejected() {
        let json = CATDOG.replace(r#"["cat", "dog"]"#, "[]");
        assert!(matches!(parse(&json), Err(ConfigError::EmptyClasses(id)) if id == "catdog"));
    }

    #[test]
    fn test_zero_image_size_rejected() {
        let json = CATDOG.replace("224", "0");
        assert!(matches!(parse(&json), Err(ConfigError::InvalidImageSize(_))));
    }

    #[test]
    fn test_empty_registry_rejected() {
        assert!(matches!(parse("[]"), Err(ConfigError::EmptyRegistry)));
    }

    #[test]
    fn test_duplicate_identifier_rejected() {
        let json = r#"[
            {"name": "pets", "classes": ["cat"], "imageSize": 224,
             "modelType": "resnet18", "modelFileName": "a"},
            {"name": "pets", "classes": ["dog"], "imageSize": 224,
             "modelType": "resnet50", "modelFileName": "b"}
        ]"#;
        assert!(matches!(parse(json), Err(ConfigError::DuplicateIdentifier(id)) if id == "pets"));
    }

    #[test]
    fn test_explicit_id_allows_same_display_name() {
        let json = r#"[
            {"id": "pets-v1", "name": "pets", "classes": ["cat"], "imageSize": 224,
             "modelType": "resnet18", "modelFileName": "a"},
            {"id": "pets-v2", "name": "pets", "classes": ["dog"], "imageSize": 299,
             "modelType": "resnet152", "modelFileName": "b", "applySoftmax": false}
        ]"#;
        let registry = parse(json).unwrap();
        assert_eq!(registry.models()[0].identifier(), "pets-v1");
        assert_eq!(registry.models()[1].identifier(), "pets-v2");
        assert!(!registry.models()[1].apply_softmax);
    }

    #[test]
    fn test_weight_path() {
        let model = parse(CATDOG).unwrap().models()[0].clone();
        assert_eq!(
            model.weight_path(Path::new("models")),
            PathBuf::from("models/catdog-stage-2.onnx")
        );

        let mut ir = model.clone();
        ir.weight_file = "catdog.xml".to_string();
        assert_eq!(ir.weight_path(Path::new("models")), PathBuf::from("models/catdog.xml"));
    }

    #[test]
    fn test_load_missing_file() {
        let err = ModelRegistry::load("/nonexistent/modelDefinition.json").unwrap_err();
        assert!(matches!(err, ConfigError::Read { .. }));
    }
}
