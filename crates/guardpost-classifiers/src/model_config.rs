//! Model source and inference configuration

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// HuggingFace repository of the default toxicity model
pub const DEFAULT_MODEL_REPO: &str = "unitary/unbiased-toxic-roberta";

/// Configuration for the toxicity model
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelSpec {
    /// Model name used in logs and score metadata
    #[serde(default)]
    pub name: String,

    /// Where to load weights, config, and tokenizer from
    pub source: ModelSource,

    /// Device to run inference on (cpu, cuda, metal)
    #[serde(default = "default_device")]
    pub device: String,

    /// Maximum token sequence length; longer input is truncated
    #[serde(default = "default_max_length")]
    pub max_length: usize,

    /// Label names, overriding the model's `id2label` mapping when non-empty
    #[serde(default)]
    pub labels: Vec<String>,
}

/// Model source configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum ModelSource {
    /// Load from a local directory containing config, tokenizer, and weights
    Local { path: PathBuf },

    /// Download from the HuggingFace Hub
    HuggingFace {
        repo: String,
        #[serde(default = "default_revision")]
        revision: String,
    },
}

fn default_device() -> String {
    "cpu".to_string()
}

fn default_max_length() -> usize {
    512
}

fn default_revision() -> String {
    "main".to_string()
}

impl Default for ModelSpec {
    fn default() -> Self {
        Self::huggingface(DEFAULT_MODEL_REPO)
    }
}

impl ModelSpec {
    /// Spec for a HuggingFace-hosted model
    pub fn huggingface(repo: impl Into<String>) -> Self {
        let repo = repo.into();
        Self {
            name: repo.clone(),
            source: ModelSource::HuggingFace {
                repo,
                revision: default_revision(),
            },
            device: default_device(),
            max_length: default_max_length(),
            labels: Vec::new(),
        }
    }

    /// Spec for a model stored on the local filesystem
    pub fn local(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        Self {
            name: path
                .file_name()
                .and_then(|n| n.to_str())
                .unwrap_or("local-model")
                .to_string(),
            source: ModelSource::Local { path },
            device: default_device(),
            max_length: default_max_length(),
            labels: Vec::new(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_spec_points_at_hub() {
        let spec = ModelSpec::default();
        match &spec.source {
            ModelSource::HuggingFace { repo, revision } => {
                assert_eq!(repo, DEFAULT_MODEL_REPO);
                assert_eq!(revision, "main");
            }
            _ => panic!("Expected HuggingFace source"),
        }
        assert_eq!(spec.max_length, 512);
    }

    #[test]
    fn test_spec_deserialization() {
        let json = r#"{
            "name": "custom",
            "source": { "type": "local", "path": "./models/toxicity" },
            "max_length": 256
        }"#;

        let spec: ModelSpec = serde_json::from_str(json).unwrap();
        assert_eq!(spec.name, "custom");
        assert_eq!(spec.max_length, 256);
        assert_eq!(spec.device, "cpu");
        assert!(matches!(spec.source, ModelSource::Local { .. }));
    }
}
