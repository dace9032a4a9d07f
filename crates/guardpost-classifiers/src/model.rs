//! Candle-backed toxicity model loading and inference
//!
//! Loads a BERT/RoBERTa sequence-classification model from the HuggingFace
//! Hub or a local directory and produces multi-label sigmoid scores. All
//! blocking work (download, weight mmap, forward pass) runs on the blocking
//! thread pool so inference never stalls the async runtime.

use async_trait::async_trait;
use candle_core::{DType, Device, IndexOp, Tensor};
use candle_nn::{Linear, Module, VarBuilder};
use candle_transformers::models::bert::{BertModel, Config as BertConfig};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokenizers::{Tokenizer, TruncationDirection};

use guardpost_core::{Error, LabelScore, Result};

use crate::classifier::{Classifier, ClassifierLoader};
use crate::model_config::{ModelSpec, ModelSource};

/// Toxicity classifier backed by a Candle sequence-classification model.
pub struct ToxicityModel {
    name: String,
    inner: Arc<ModelInner>,
}

struct ModelInner {
    tokenizer: Tokenizer,
    model: BertModel,
    head: ClassificationHead,
    device: Device,
    labels: Vec<String>,
    max_length: usize,
}

/// Classification head over the CLS embedding.
enum ClassificationHead {
    /// Single linear layer (BERT convention: `classifier`)
    Linear(Linear),

    /// RoBERTa convention: `classifier.dense` + tanh + `classifier.out_proj`
    Projected { dense: Linear, out_proj: Linear },
}

impl ClassificationHead {
    fn forward(&self, cls: &Tensor) -> candle_core::Result<Tensor> {
        match self {
            Self::Linear(linear) => linear.forward(cls),
            Self::Projected { dense, out_proj } => {
                let hidden = dense.forward(cls)?.tanh()?;
                out_proj.forward(&hidden)
            }
        }
    }
}

impl ToxicityModel {
    /// Load a model from its spec. Blocking; call from a blocking context.
    pub fn load(spec: &ModelSpec) -> Result<Self> {
        let model_dir = resolve_model_dir(&spec.source)?;
        let tokenizer = load_tokenizer(&model_dir)?;

        let config_path = model_dir.join("config.json");
        let bert_config: BertConfig = parse_json_config(&config_path)?;
        let labels = resolve_labels(spec, &config_path)?;

        let device = resolve_device(&spec.device)?;
        let vb = load_var_builder(&model_dir, &device)?;

        let model = load_bert_backbone(&vb, &bert_config, &["roberta", "bert", ""])?;
        let head = load_classification_head(&vb, bert_config.hidden_size, labels.len())?;

        tracing::info!(
            "Loaded toxicity model '{}' with {} labels: {:?}",
            spec.name,
            labels.len(),
            labels
        );

        Ok(Self {
            name: spec.name.clone(),
            inner: Arc::new(ModelInner {
                tokenizer,
                model,
                head,
                device,
                labels,
                max_length: spec.max_length,
            }),
        })
    }
}

impl ModelInner {
    fn run(&self, text: &str) -> Result<Vec<LabelScore>> {
        let mut encoding = self
            .tokenizer
            .encode(text, true)
            .map_err(|e| Error::model_unavailable(format!("Tokenization failed: {}", e)))?;

        encoding.truncate(self.max_length, 0, TruncationDirection::Right);

        let input_ids = Tensor::new(encoding.get_ids(), &self.device)
            .and_then(|t| t.unsqueeze(0))
            .map_err(|e| {
                Error::model_unavailable(format!("Failed to build input tensor: {}", e))
            })?;

        let token_type_ids = Tensor::new(encoding.get_type_ids(), &self.device)
            .and_then(|t| t.unsqueeze(0))
            .map_err(|e| {
                Error::model_unavailable(format!("Failed to build token type tensor: {}", e))
            })?;

        let hidden_states = self
            .model
            .forward(&input_ids, &token_type_ids, None)
            .map_err(|e| Error::model_unavailable(format!("Model forward pass failed: {}", e)))?;

        let cls_embedding = hidden_states
            .i((0, 0, ..))
            .and_then(|t| t.unsqueeze(0))
            .map_err(|e| Error::model_unavailable(format!("Failed to take CLS token: {}", e)))?;

        let logits = self
            .head
            .forward(&cls_embedding)
            .map_err(|e| Error::model_unavailable(format!("Classification head failed: {}", e)))?;

        // Independent per-label probabilities: the reference toxicity models
        // are multi-label, so sigmoid rather than softmax.
        let probs: Vec<f32> = candle_nn::ops::sigmoid(&logits)
            .and_then(|t| t.squeeze(0))
            .and_then(|t| t.to_vec1())
            .map_err(|e| Error::model_unavailable(format!("Failed to read scores: {}", e)))?;

        let mut scores: Vec<LabelScore> = self
            .labels
            .iter()
            .zip(probs.iter())
            .map(|(label, score)| LabelScore::new(label.clone(), *score))
            .collect();

        scores.sort_by(|a, b| {
            b.score
                .partial_cmp(&a.score)
                .unwrap_or(std::cmp::Ordering::Equal)
        });

        Ok(scores)
    }
}

#[async_trait]
impl Classifier for ToxicityModel {
    async fn classify(&self, text: &str) -> Result<Vec<LabelScore>> {
        let inner = self.inner.clone();
        let text = text.to_string();

        tokio::task::spawn_blocking(move || inner.run(&text))
            .await
            .map_err(|e| Error::model_unavailable(format!("Inference task failed: {}", e)))?
    }

    fn name(&self) -> &str {
        &self.name
    }
}

/// Loader that materializes a [`ToxicityModel`] on first use.
pub struct ToxicityModelLoader {
    spec: ModelSpec,
}

impl ToxicityModelLoader {
    /// Create a loader for the given model spec
    pub fn new(spec: ModelSpec) -> Self {
        Self { spec }
    }
}

#[async_trait]
impl ClassifierLoader for ToxicityModelLoader {
    async fn load(&self) -> Result<Arc<dyn Classifier>> {
        let spec = self.spec.clone();

        let model = tokio::task::spawn_blocking(move || ToxicityModel::load(&spec))
            .await
            .map_err(|e| Error::model_unavailable(format!("Model load task failed: {}", e)))??;

        Ok(Arc::new(model))
    }
}

fn resolve_model_dir(source: &ModelSource) -> Result<PathBuf> {
    match source {
        ModelSource::Local { path } => {
            if !path.exists() {
                return Err(Error::model_unavailable(format!(
                    "Model path does not exist: {}",
                    path.display()
                )));
            }
            Ok(path.clone())
        }
        ModelSource::HuggingFace { repo, revision } => download_from_huggingface(repo, revision),
    }
}

fn download_from_huggingface(repo: &str, revision: &str) -> Result<PathBuf> {
    tracing::info!("Downloading model from HuggingFace: {}", repo);

    let api = hf_hub::api::sync::Api::new().map_err(|e| {
        Error::model_unavailable(format!("Failed to initialize HuggingFace API: {}", e))
    })?;

    let repo_obj = api.repo(hf_hub::Repo::with_revision(
        repo.to_string(),
        hf_hub::RepoType::Model,
        revision.to_string(),
    ));

    for file in ["model.safetensors", "tokenizer.json"] {
        repo_obj.get(file).map_err(|e| {
            Error::model_unavailable(format!("Failed to download {}: {}", file, e))
        })?;
    }

    let config_path = repo_obj.get("config.json").map_err(|e| {
        Error::model_unavailable(format!("Failed to download config.json: {}", e))
    })?;

    let model_dir = config_path
        .parent()
        .ok_or_else(|| Error::model_unavailable("Invalid model cache path"))?;

    tracing::info!("Model available at: {}", model_dir.display());
    Ok(model_dir.to_path_buf())
}

fn resolve_device(device: &str) -> Result<Device> {
    match device.to_lowercase().as_str() {
        "cuda" | "cuda:0" => Device::new_cuda(0)
            .map_err(|e| Error::model_unavailable(format!("Failed to initialize CUDA: {}", e))),
        "mps" | "metal" => Device::new_metal(0)
            .map_err(|e| Error::model_unavailable(format!("Failed to initialize Metal: {}", e))),
        _ => Ok(Device::Cpu),
    }
}

fn parse_json_config<T: serde::de::DeserializeOwned>(config_path: &Path) -> Result<T> {
    let config_str = std::fs::read_to_string(config_path).map_err(|e| {
        Error::model_unavailable(format!(
            "Failed to read config {}: {}",
            config_path.display(),
            e
        ))
    })?;

    serde_json::from_str(&config_str).map_err(|e| {
        Error::model_unavailable(format!(
            "Failed to parse config {}: {}",
            config_path.display(),
            e
        ))
    })
}

/// Resolve label names: spec override first, else the model's `id2label`.
fn resolve_labels(spec: &ModelSpec, config_path: &Path) -> Result<Vec<String>> {
    if !spec.labels.is_empty() {
        return Ok(spec.labels.clone());
    }

    let raw: serde_json::Value = parse_json_config(config_path)?;
    let id2label = raw
        .get("id2label")
        .and_then(|v| v.as_object())
        .ok_or_else(|| {
            Error::model_unavailable("config.json has no id2label mapping and no labels configured")
        })?;

    let mut labels = vec![String::new(); id2label.len()];
    for (key, value) in id2label {
        let idx: usize = key.parse().map_err(|_| {
            Error::model_unavailable(format!("Invalid id2label index: {}", key))
        })?;
        let label = value
            .as_str()
            .ok_or_else(|| Error::model_unavailable("id2label values must be strings"))?;
        if idx >= labels.len() {
            return Err(Error::model_unavailable(format!(
                "id2label index {} out of range",
                idx
            )));
        }
        labels[idx] = label.to_string();
    }

    Ok(labels)
}

fn load_var_builder(model_dir: &Path, device: &Device) -> Result<VarBuilder<'static>> {
    let weights_path = model_dir.join("model.safetensors");
    if !weights_path.exists() {
        return Err(Error::model_unavailable(format!(
            "model.safetensors not found in {}",
            model_dir.display()
        )));
    }

    let vb = unsafe {
        VarBuilder::from_mmaped_safetensors(&[weights_path], DType::F32, device)
            .map_err(|e| Error::model_unavailable(format!("Failed to load weights: {}", e)))?
    };

    Ok(vb)
}

fn load_tokenizer(model_dir: &Path) -> Result<Tokenizer> {
    let tokenizer_path = model_dir.join("tokenizer.json");
    Tokenizer::from_file(&tokenizer_path)
        .map_err(|e| Error::model_unavailable(format!("Failed to load tokenizer: {}", e)))
}

fn load_bert_backbone(
    vb: &VarBuilder,
    config: &BertConfig,
    prefixes: &[&str],
) -> Result<BertModel> {
    let mut errors = Vec::new();

    for prefix in prefixes {
        let vb_prefix = if prefix.is_empty() {
            vb.clone()
        } else {
            vb.pp(prefix)
        };

        match BertModel::load(vb_prefix, config) {
            Ok(model) => {
                let effective_prefix = if prefix.is_empty() { "<root>" } else { prefix };
                tracing::debug!("Loaded transformer backbone from '{}'", effective_prefix);
                return Ok(model);
            }
            Err(e) => {
                errors.push(format!(
                    "{}: {}",
                    if prefix.is_empty() { "<root>" } else { prefix },
                    e
                ));
            }
        }
    }

    Err(Error::model_unavailable(format!(
        "Failed to load transformer backbone, tried prefixes [{}]",
        errors.join(" | ")
    )))
}

fn load_classification_head(
    vb: &VarBuilder,
    hidden_size: usize,
    num_labels: usize,
) -> Result<ClassificationHead> {
    if let Ok(linear) = candle_nn::linear(hidden_size, num_labels, vb.pp("classifier")) {
        tracing::debug!("Loaded linear classification head");
        return Ok(ClassificationHead::Linear(linear));
    }

    let dense = candle_nn::linear(hidden_size, hidden_size, vb.pp("classifier.dense"));
    let out_proj = candle_nn::linear(hidden_size, num_labels, vb.pp("classifier.out_proj"));

    match (dense, out_proj) {
        (Ok(dense), Ok(out_proj)) => {
            tracing::debug!("Loaded projected classification head");
            Ok(ClassificationHead::Projected { dense, out_proj })
        }
        _ => Err(Error::model_unavailable(
            "No classification head found (tried classifier, classifier.dense/out_proj)",
        )),
    }
}
