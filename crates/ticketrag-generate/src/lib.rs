//! Text generation behind the core `Generator` trait.
//!
//! `T5Generator` runs a local flan-t5 checkpoint with greedy decoding.
//! `EchoGenerator` is a deterministic stand-in for tests and dry runs.

use anyhow::{anyhow, Context, Result};
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use std::time::Instant;

use candle_core::{DType, Device, Tensor};
use candle_transformers::generation::LogitsProcessor;
use candle_transformers::models::t5::{Config as T5Config, T5ForConditionalGeneration};
use tokenizers::Tokenizer;
use tracing::{debug, info};

pub use ticketrag_core::traits::Generator;
use ticketrag_embed::{encode_truncated, load_var_builder, select_device};

/// Penalty applied to tokens already generated, over this many recent tokens.
const REPEAT_PENALTY: f32 = 1.1;
const REPEAT_LAST_N: usize = 64;

pub struct T5Generator {
    model: Mutex<T5ForConditionalGeneration>,
    tokenizer: Tokenizer,
    device: Device,
    name: String,
    max_input_tokens: usize,
    decoder_start_id: u32,
    eos_id: u32,
    use_cache: bool,
}

impl T5Generator {
    pub fn load(model_dir: &Path, max_input_tokens: usize) -> Result<Self> {
        let device = select_device();
        info!(dir = %model_dir.display(), "🔄 Loading generator model");

        let tokenizer_path = model_dir.join("tokenizer.json");
        let tokenizer = Tokenizer::from_file(&tokenizer_path)
            .map_err(|e| anyhow!("Failed to load tokenizer from {}: {}", tokenizer_path.display(), e))?;

        let config_path = model_dir.join("config.json");
        let raw: serde_json::Value = serde_json::from_str(
            &std::fs::read_to_string(&config_path).with_context(|| format!("reading {}", config_path.display()))?,
        )?;
        let field = |key: &str| raw.get(key).and_then(serde_json::Value::as_u64).map(|v| v as u32);
        let pad_id = field("pad_token_id").unwrap_or(0);
        let decoder_start_id = field("decoder_start_token_id").unwrap_or(pad_id);
        let eos_id = field("eos_token_id").unwrap_or(1);
        let use_cache = raw.get("use_cache").and_then(serde_json::Value::as_bool).unwrap_or(true);
        let config: T5Config = serde_json::from_value(raw)?;

        let vb = load_var_builder(model_dir, DType::F32, &device)?;
        let model = T5ForConditionalGeneration::load(vb, &config)?;
        let name = model_dir.file_name().map_or_else(|| "t5".to_string(), |n| n.to_string_lossy().into_owned());
        info!(model = %name, "✅ Generator loaded");

        Ok(Self {
            model: Mutex::new(model),
            tokenizer,
            device,
            name,
            max_input_tokens,
            decoder_start_id,
            eos_id,
            use_cache,
        })
    }
}

impl Generator for T5Generator {
    fn model_name(&self) -> &str { &self.name }

    fn generate(&self, prompt: &str, max_output_length: usize) -> Result<String> {
        let start = Instant::now();
        let input = encode_truncated(&self.tokenizer, prompt, self.max_input_tokens)?;
        let input_ids = Tensor::new(input.as_slice(), &self.device)?.unsqueeze(0)?;

        let mut model = self.model.lock().map_err(|_| anyhow!("generator model lock poisoned"))?;
        model.clear_kv_cache();
        let encoder_output = model.encode(&input_ids)?;

        let mut processor = LogitsProcessor::new(0, None, None);
        let mut output = vec![self.decoder_start_id];
        for step in 0..max_output_length {
            let decoder_ids = if step == 0 || !self.use_cache {
                Tensor::new(output.as_slice(), &self.device)?.unsqueeze(0)?
            } else {
                let last = output[output.len() - 1];
                Tensor::new(&[last], &self.device)?.unsqueeze(0)?
            };
            let logits = model.decode(&decoder_ids, &encoder_output)?.squeeze(0)?;
            // Without the cache the decoder returns one row per position.
            let logits = if logits.rank() == 2 { logits.get(logits.dim(0)? - 1)? } else { logits };
            let logits = logits.to_dtype(DType::F32)?;
            let recent = &output[output.len().saturating_sub(REPEAT_LAST_N)..];
            let logits = candle_transformers::utils::apply_repeat_penalty(&logits, REPEAT_PENALTY, recent)?;

            let next = processor.sample(&logits)?;
            if next == self.eos_id {
                break;
            }
            output.push(next);
        }
        model.clear_kv_cache();
        drop(model);

        let text = self
            .tokenizer
            .decode(&output[1..], true)
            .map_err(|e| anyhow!("Detokenization failed: {}", e))?;
        debug!(ms = start.elapsed().as_millis(), tokens = output.len() - 1, input_tokens = input.len(), "generated");
        Ok(text.trim().to_string())
    }
}

/// Deterministic generator: the last non-empty prompt line's words, capped at
/// `max_output_length`.
#[derive(Debug, Clone, Default)]
pub struct EchoGenerator;

impl Generator for EchoGenerator {
    fn model_name(&self) -> &str { "echo" }

    fn generate(&self, prompt: &str, max_output_length: usize) -> Result<String> {
        let line = prompt.lines().rev().map(str::trim).find(|l| !l.is_empty()).unwrap_or_default();
        Ok(line.split_whitespace().take(max_output_length).collect::<Vec<_>>().join(" "))
    }
}

pub fn use_fake_generator() -> bool {
    std::env::var("APP_USE_FAKE_GENERATOR")
        .ok()
        .map(|v| v == "1" || v.eq_ignore_ascii_case("true"))
        .unwrap_or(false)
}

/// The T5 model from `model_dir`, or `EchoGenerator` when
/// `APP_USE_FAKE_GENERATOR` is set.
pub fn get_default_generator(model_dir: &Path, max_input_tokens: usize) -> Result<Box<dyn Generator>> {
    if use_fake_generator() {
        info!("🧪 Using EchoGenerator");
        return Ok(Box::new(EchoGenerator));
    }
    Ok(Box::new(T5Generator::load(&resolve_model_dir(model_dir)?, max_input_tokens)?))
}

/// First existing directory among `APP_GENERATOR_MODEL_DIR`, `configured`
/// and `../configured`.
pub fn resolve_model_dir(configured: &Path) -> Result<PathBuf> {
    let mut tried = Vec::new();
    if let Ok(dir) = std::env::var("APP_GENERATOR_MODEL_DIR") {
        tried.push(PathBuf::from(dir));
    }
    tried.push(configured.to_path_buf());
    if configured.is_relative() {
        tried.push(Path::new("..").join(configured));
    }
    tried.iter().find(|p| p.is_dir()).cloned().ok_or_else(|| {
        anyhow!(
            "Could not locate the generator model directory (tried {}). Download flan-t5 there or set APP_USE_FAKE_GENERATOR=1.",
            tried.iter().map(|p| p.display().to_string()).collect::<Vec<_>>().join(", ")
        )
    })
}
