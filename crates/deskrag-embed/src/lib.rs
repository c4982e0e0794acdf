//! Embedding providers.
//!
//! `SentenceEmbedder` runs a BERT-family sentence-transformer (e.g.
//! all-MiniLM-L6-v2) locally with candle. `HashEmbedder` is a deterministic
//! feature-hashing stand-in for tests and development; select it with
//! `APP_USE_FAKE_EMBEDDINGS=1` or `embedding.use_fake = true`.

use anyhow::{anyhow, Context, Result};
use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;
use std::time::Instant;

use candle_core::{DType, Device, Tensor};
use candle_nn::VarBuilder;
use candle_transformers::models::bert::{BertModel, Config as BertConfig};
use tokenizers::Tokenizer;
use tracing::{debug, info};

use deskrag_core::config::Settings;
use deskrag_core::traits::Embedder;

pub mod device;
pub mod pool;
pub mod tokenize;

pub use pool::{l2_normalize, masked_mean, masked_mean_l2};

pub struct SentenceEmbedder {
    model: BertModel,
    tokenizer: Tokenizer,
    device: Device,
    model_name: String,
    dim: usize,
    max_len: usize,
    pad_id: u32,
}

impl SentenceEmbedder {
    /// Load `tokenizer.json`, `config.json` and weights (`model.safetensors`
    /// or `pytorch_model.bin`) from `model_dir`.
    pub fn load(model_dir: &Path, model_name: &str, max_len: usize) -> Result<Self> {
        let device = device::select_device();
        info!("🔄 Loading embedding model {} from {}", model_name, model_dir.display());

        let tokenizer_path = model_dir.join("tokenizer.json");
        let tokenizer = Tokenizer::from_file(&tokenizer_path)
            .map_err(|e| anyhow!("Failed to load tokenizer from {}: {}", tokenizer_path.display(), e))?;
        let pad_id = tokenizer.token_to_id("[PAD]").unwrap_or(0);

        let config_path = model_dir.join("config.json");
        let config_text = std::fs::read_to_string(&config_path)
            .with_context(|| format!("Failed to read {}", config_path.display()))?;
        let config: BertConfig = serde_json::from_str(&config_text)
            .with_context(|| format!("Failed to parse {}", config_path.display()))?;

        let weights = load_weights(model_dir, &device)?;
        let vb = VarBuilder::from_tensors(weights, DType::F32, &device);
        let model = BertModel::load(vb, &config)?;
        let max_len = max_len.min(config.max_position_embeddings);

        info!("✅ Embedding model loaded (d{})", config.hidden_size);
        Ok(Self {
            model,
            tokenizer,
            device,
            model_name: model_name.to_string(),
            dim: config.hidden_size,
            max_len,
            pad_id,
        })
    }
}

fn load_weights(model_dir: &Path, device: &Device) -> Result<HashMap<String, Tensor>> {
    let safetensors = model_dir.join("model.safetensors");
    if safetensors.exists() {
        return Ok(candle_core::safetensors::load(&safetensors, device)?);
    }
    let pickle = model_dir.join("pytorch_model.bin");
    if pickle.exists() {
        let tensors = candle_core::pickle::read_all(&pickle)?;
        return tensors
            .into_iter()
            .map(|(name, t)| -> Result<(String, Tensor)> { Ok((name, t.to_device(device)?)) })
            .collect();
    }
    Err(anyhow!("No model.safetensors or pytorch_model.bin in {}", model_dir.display()))
}

impl Embedder for SentenceEmbedder {
    fn model_name(&self) -> &str { &self.model_name }
    fn dim(&self) -> usize { self.dim }
    fn max_len(&self) -> usize { self.max_len }

    fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        if texts.is_empty() { return Ok(Vec::new()); }
        let start = Instant::now();
        let (input_ids, attention_mask) =
            tokenize::tokenize_batch(&self.tokenizer, texts, self.max_len, self.pad_id, &self.device)?;
        let token_type_ids = input_ids.zeros_like()?;
        let hidden = self.model.forward(&input_ids, &token_type_ids, Some(&attention_mask))?;
        let pooled = masked_mean_l2(&hidden, &attention_mask)?;
        let vectors: Vec<Vec<f32>> = pooled.to_device(&Device::Cpu)?.to_vec2()?;
        debug!("Embedded {} texts in {:?}", texts.len(), start.elapsed());
        Ok(vectors)
    }
}

/// Deterministic bag-of-words embedder built on feature hashing.
///
/// Texts sharing lowercase alphanumeric tokens land near each other, which is
/// enough for retrieval tests without a model on disk.
pub struct HashEmbedder {
    dim: usize,
    model_name: String,
}

impl HashEmbedder {
    pub fn new(dim: usize) -> Self {
        let dim = dim.max(1);
        Self { dim, model_name: format!("hash-embedder-v1:d{}", dim) }
    }

    fn embed_one(&self, text: &str) -> Vec<f32> {
        use std::hash::Hasher;
        use twox_hash::XxHash64;

        let mut v = vec![0f32; self.dim];
        for token in text.split(|c: char| !c.is_alphanumeric()).filter(|t| !t.is_empty()) {
            let mut hasher = XxHash64::with_seed(0);
            hasher.write(token.to_lowercase().as_bytes());
            let h = hasher.finish();
            let idx = (h % self.dim as u64) as usize;
            let sign = if (h >> 63) == 0 { 1.0 } else { -1.0 };
            v[idx] += sign;
        }
        let norm = v.iter().map(|x| x * x).sum::<f32>().sqrt();
        if norm > 0.0 {
            for x in &mut v { *x /= norm; }
        }
        v
    }
}

impl Embedder for HashEmbedder {
    fn model_name(&self) -> &str { &self.model_name }
    fn dim(&self) -> usize { self.dim }
    fn max_len(&self) -> usize { usize::MAX }

    fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        Ok(texts.iter().map(|t| self.embed_one(t)).collect())
    }
}

fn fake_requested() -> bool {
    std::env::var("APP_USE_FAKE_EMBEDDINGS")
        .ok()
        .map(|v| v == "1" || v.eq_ignore_ascii_case("true"))
        .unwrap_or(false)
}

/// Build the embedder selected by configuration.
pub fn load_embedder(settings: &Settings) -> Result<Arc<dyn Embedder>> {
    if settings.embedding.use_fake || fake_requested() {
        info!("🧪 Using HashEmbedder (d{})", settings.embedding.fake_dim);
        return Ok(Arc::new(HashEmbedder::new(settings.embedding.fake_dim)));
    }
    let embedder = SentenceEmbedder::load(&settings.model_dir(), &settings.embedding.model, settings.embedding.max_len)?;
    Ok(Arc::new(embedder))
}
