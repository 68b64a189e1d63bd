use anyhow::{anyhow, Context, Result};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::time::Instant;

use candle_core::{DType, Device, Tensor};
use candle_nn::VarBuilder;
use candle_transformers::models::bert::{BertModel, Config as BertConfig};
use tokenizers::Tokenizer;
use tracing::{info, warn};

pub use ticketrag_core::traits::Embedder;

mod device;
mod pool;
mod tokenize;

pub use device::select_device;
pub use pool::masked_mean_l2;
pub use tokenize::{encode_truncated, tokenize_batch};

/// Output size of all-MiniLM-L6-v2.
pub const DEFAULT_DIM: usize = 384;
/// Tokens per text; MiniLM was trained on 256-token windows.
pub const DEFAULT_MAX_LEN: usize = 256;
const BATCH_SIZE: usize = 32;

/// Sentence embedder over a local BERT-family checkpoint (all-MiniLM-L6-v2).
pub struct BertEmbedder {
    model: BertModel,
    tokenizer: Tokenizer,
    device: Device,
    dim: usize,
    max_len: usize,
    pad_id: u32,
}

impl BertEmbedder {
    pub fn load(model_dir: &Path) -> Result<Self> {
        let device = select_device();
        info!(dir = %model_dir.display(), "🔄 Loading embedding model");

        let tokenizer_path = model_dir.join("tokenizer.json");
        let tokenizer = Tokenizer::from_file(&tokenizer_path)
            .map_err(|e| anyhow!("Failed to load tokenizer from {}: {}", tokenizer_path.display(), e))?;

        let config_path = model_dir.join("config.json");
        let raw: serde_json::Value = serde_json::from_str(
            &std::fs::read_to_string(&config_path).with_context(|| format!("reading {}", config_path.display()))?,
        )?;
        let field = |key: &str| raw.get(key).and_then(serde_json::Value::as_u64).map(|v| v as usize);
        let dim = field("hidden_size").ok_or_else(|| anyhow!("{} has no hidden_size", config_path.display()))?;
        let max_len = DEFAULT_MAX_LEN.min(field("max_position_embeddings").unwrap_or(DEFAULT_MAX_LEN));
        let pad_id = field("pad_token_id").unwrap_or(0) as u32;
        let config: BertConfig = serde_json::from_value(raw)?;

        let vb = load_var_builder(model_dir, DType::F32, &device)?;
        let model = BertModel::load(vb, &config)?;
        info!(dim, max_len, "✅ Embedding model loaded");
        Ok(Self { model, tokenizer, device, dim, max_len, pad_id })
    }

    fn embed_chunk(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        let (input_ids, attention_mask) = tokenize_batch(&self.tokenizer, texts, self.max_len, self.pad_id, &self.device)?;
        let token_type_ids = input_ids.zeros_like()?;
        let hidden = self.model.forward(&input_ids, &token_type_ids, Some(&attention_mask))?;
        let pooled = masked_mean_l2(&hidden, &attention_mask)?;
        Ok(pooled.to_device(&Device::Cpu)?.to_dtype(DType::F32)?.to_vec2()?)
    }
}

impl Embedder for BertEmbedder {
    fn dim(&self) -> usize { self.dim }
    fn max_len(&self) -> usize { self.max_len }

    fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        let start = Instant::now();
        let mut out = Vec::with_capacity(texts.len());
        for chunk in texts.chunks(BATCH_SIZE) {
            out.extend(self.embed_chunk(chunk)?);
        }
        if texts.len() == 1 && start.elapsed().as_millis() > 500 {
            warn!(ms = start.elapsed().as_millis(), "⚠️  Slow embedding");
        }
        Ok(out)
    }
}

/// Weights from `model.safetensors`, falling back to `pytorch_model.bin`.
pub fn load_var_builder(model_dir: &Path, dtype: DType, device: &Device) -> Result<VarBuilder<'static>> {
    let safetensors = model_dir.join("model.safetensors");
    let tensors: HashMap<String, Tensor> = if safetensors.exists() {
        candle_core::safetensors::load(&safetensors, device)?
    } else {
        let pickle = model_dir.join("pytorch_model.bin");
        if !pickle.exists() {
            return Err(anyhow!("No model.safetensors or pytorch_model.bin in {}", model_dir.display()));
        }
        candle_core::pickle::read_all(&pickle)?.into_iter().collect()
    };
    Ok(VarBuilder::from_tensors(tensors, dtype, device))
}

/// Deterministic bag-of-tokens embedder for tests and model-free runs.
pub struct FakeEmbedder {
    dim: usize,
}

impl FakeEmbedder {
    pub fn new(dim: usize) -> Self { Self { dim: dim.max(1) } }
}

impl Embedder for FakeEmbedder {
    fn dim(&self) -> usize { self.dim }
    fn max_len(&self) -> usize { DEFAULT_MAX_LEN }

    fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        use std::hash::{Hash, Hasher};
        use twox_hash::XxHash64;

        Ok(texts
            .iter()
            .map(|text| {
                let mut v = vec![0f32; self.dim];
                for (i, token) in text.split_whitespace().enumerate() {
                    let mut hasher = XxHash64::with_seed(0);
                    token.to_lowercase().hash(&mut hasher);
                    let h = hasher.finish();
                    let idx = (h as usize) % self.dim;
                    let val = (((h >> 32) as u32) as f32) / (u32::MAX as f32);
                    v[idx] += val + (i as f32 % 3.0) * 0.01;
                }
                // Empty text still gets a unit vector so distances stay finite.
                if v.iter().all(|x| *x == 0.0) {
                    v[0] = 1.0;
                }
                let norm = v.iter().map(|x| x * x).sum::<f32>().sqrt().max(1e-6);
                v.iter().map(|x| x / norm).collect()
            })
            .collect())
    }
}

pub fn use_fake_embeddings() -> bool {
    std::env::var("APP_USE_FAKE_EMBEDDINGS")
        .ok()
        .map(|v| v == "1" || v.eq_ignore_ascii_case("true"))
        .unwrap_or(false)
}

/// The real model from `model_dir`, or `FakeEmbedder` when
/// `APP_USE_FAKE_EMBEDDINGS` is set.
pub fn get_default_embedder(model_dir: &Path) -> Result<Box<dyn Embedder>> {
    if use_fake_embeddings() {
        info!("🧪 Using FakeEmbedder");
        return Ok(Box::new(FakeEmbedder::new(DEFAULT_DIM)));
    }
    Ok(Box::new(BertEmbedder::load(&resolve_model_dir(model_dir)?)?))
}

/// First existing directory among `APP_EMBED_MODEL_DIR`, `configured` and
/// `../configured` (for binaries run from a crate directory).
pub fn resolve_model_dir(configured: &Path) -> Result<PathBuf> {
    let mut tried = Vec::new();
    if let Ok(dir) = std::env::var("APP_EMBED_MODEL_DIR") {
        tried.push(PathBuf::from(dir));
    }
    tried.push(configured.to_path_buf());
    if configured.is_relative() {
        tried.push(Path::new("..").join(configured));
    }
    if let Some(found) = tried.iter().find(|p| p.is_dir()) {
        info!(dir = %found.display(), "📦 Using embedding model dir");
        return Ok(found.clone());
    }
    Err(anyhow!(
        "Could not locate the embedding model directory (tried {}). Download all-MiniLM-L6-v2 there or set APP_USE_FAKE_EMBEDDINGS=1.",
        tried.iter().map(|p| p.display().to_string()).collect::<Vec<_>>().join(", ")
    ))
}
