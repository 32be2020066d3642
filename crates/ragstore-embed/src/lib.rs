//! ragstore-embed
//!
//! Dense embedders: BGE-M3 on candle and a model-free hashing embedder for
//! tests and offline runs.
use anyhow::{anyhow, Context, Result};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;

use candle_core::{DType, Device, Tensor};
use candle_nn::VarBuilder;
use candle_transformers::models::xlm_roberta::{Config as XLMRobertaConfig, XLMRobertaModel};
use tokenizers::Tokenizer;

use ragstore_core::config::{expand_path, DenseConfig, DenseProvider, Pooling};
use ragstore_core::traits::DenseEmbedder;
use ragstore_core::types::DenseVector;

pub mod device;
pub mod hashing;
pub mod pool;
pub mod tokenize;

pub use device::select_device;
pub use hashing::HashingEmbedder;
pub use pool::{cls_l2, l2_normalize, masked_mean_l2};
pub use tokenize::tokenize_on_device;

pub struct BgeM3Embedder {
    model: XLMRobertaModel,
    tokenizer: Tokenizer,
    device: Device,
    model_id: String,
    dim: usize,
    max_len: usize,
    pooling: Pooling,
}

impl BgeM3Embedder {
    pub fn load(cfg: &DenseConfig) -> Result<Self> {
        let device = select_device(cfg.device);
        let model_dir = resolve_model_dir(cfg.model_dir.as_deref())?;
        tracing::info!(model = %cfg.model_id, dir = %model_dir.display(), "loading dense model");

        let tokenizer_path = model_dir.join("tokenizer.json");
        let tokenizer = Tokenizer::from_file(&tokenizer_path)
            .map_err(|e| anyhow!("Failed to load tokenizer from {}: {}", tokenizer_path.display(), e))?;

        let config_path = model_dir.join("config.json");
        let raw = std::fs::read_to_string(&config_path).with_context(|| format!("reading {}", config_path.display()))?;
        let config: XLMRobertaConfig = serde_json::from_str(&raw).with_context(|| format!("parsing {}", config_path.display()))?;

        let vb = load_weights(&model_dir, &device)?;
        let model = XLMRobertaModel::new(&config, vb)?;
        tracing::info!(dim = config.hidden_size, "dense model loaded");

        Ok(Self {
            model,
            tokenizer,
            device,
            model_id: cfg.model_id.clone(),
            dim: config.hidden_size,
            max_len: cfg.max_len,
            pooling: cfg.pooling,
        })
    }
}

impl DenseEmbedder for BgeM3Embedder {
    fn dim(&self) -> usize { self.dim }

    fn model_id(&self) -> &str { &self.model_id }

    fn embed(&self, text: &str) -> Result<DenseVector> {
        let start = Instant::now();
        let (input_ids, attention_mask) = tokenize_on_device(&self.tokenizer, text, self.max_len, &self.device)?;
        let token_type_ids = input_ids.zeros_like()?;
        let hidden = self.model.forward(&input_ids, &attention_mask, &token_type_ids, None, None, None)?;
        let pooled = match self.pooling {
            Pooling::Cls => cls_l2(&hidden)?,
            Pooling::Mean => masked_mean_l2(&hidden, &attention_mask)?,
        };
        let emb: Vec<f32> = pooled.to_dtype(DType::F32)?.to_device(&Device::Cpu)?.squeeze(0)?.to_vec1()?;
        if emb.len() != self.dim {
            return Err(anyhow!("model produced {} values, expected {}", emb.len(), self.dim));
        }
        tracing::trace!(elapsed_ms = start.elapsed().as_millis() as u64, "embedded text");
        Ok(emb)
    }
}

fn load_weights(model_dir: &Path, device: &Device) -> Result<VarBuilder<'static>> {
    let safetensors = model_dir.join("model.safetensors");
    if safetensors.exists() {
        // SAFETY: the weights file is not modified while mapped.
        let vb = unsafe { VarBuilder::from_mmaped_safetensors(&[safetensors], DType::F32, device)? };
        return Ok(vb);
    }
    let weights_path = model_dir.join("pytorch_model.bin");
    let weights = candle_core::pickle::read_all(&weights_path)
        .with_context(|| format!("reading weights from {}", weights_path.display()))?;
    let weights_map: std::collections::HashMap<String, Tensor> = weights.into_iter().collect();
    Ok(VarBuilder::from_tensors(weights_map, DType::F32, device))
}

fn resolve_model_dir(configured: Option<&str>) -> Result<PathBuf> {
    let mut candidates: Vec<PathBuf> = Vec::new();
    if let Some(dir) = configured { candidates.push(expand_path(dir)); }
    candidates.push(PathBuf::from("models/bge-m3"));
    candidates.push(PathBuf::from("../models/bge-m3"));
    for dir in &candidates {
        if dir.is_dir() { return Ok(dir.clone()); }
    }
    let tried: Vec<String> = candidates.iter().map(|p| p.display().to_string()).collect();
    Err(anyhow!("Could not locate BGE-M3 model directory (tried {})", tried.join(", ")))
}

/// Build the dense embedder named by `cfg.provider`.
pub fn build_dense_embedder(cfg: &DenseConfig) -> Result<Arc<dyn DenseEmbedder>> {
    match cfg.provider {
        DenseProvider::Hashing => {
            tracing::info!(dim = cfg.dim, "using hashing embedder");
            Ok(Arc::new(HashingEmbedder::new(cfg.dim)?))
        }
        DenseProvider::BgeM3 => Ok(Arc::new(BgeM3Embedder::load(cfg)?)),
    }
}
