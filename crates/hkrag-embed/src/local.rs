use anyhow::{anyhow, Result};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::time::Instant;

use candle_core::{DType, Device, Tensor};
use candle_nn::VarBuilder;
use candle_transformers::models::bert::{BertModel, Config as BertConfig};
use tokenizers::Tokenizer;
use tracing::{debug, info, warn};

use hkrag_core::error::Error;
use hkrag_core::traits::Embedder;

use crate::pool::masked_mean_l2;
use crate::tokenize::tokenize_batch;

const MAX_SEQ_LEN: usize = 256;
const BERT_PAD_ID: u32 = 0;
/// Texts per forward pass.
const FORWARD_BATCH: usize = 32;

/// Sentence encoder (all-MiniLM-L6-v2 or another BERT checkpoint) with masked mean pooling.
pub struct LocalBertEmbedder {
    model: BertModel,
    tokenizer: Tokenizer,
    device: Device,
    id: String,
    dim: usize,
}

impl LocalBertEmbedder {
    /// Loads `tokenizer.json`, `config.json` and the weights from `model_dir`.
    /// A missing file is `Error::NotFound`.
    pub fn new(model_dir: &Path, model_name: &str) -> Result<Self> {
        let tokenizer_path = required_file(model_dir, "tokenizer.json")?;
        let config_path = required_file(model_dir, "config.json")?;
        let device = select_device();
        info!("Loading local embedding model from {}", model_dir.display());
        let tokenizer = Tokenizer::from_file(&tokenizer_path)
            .map_err(|e| anyhow!("Failed to load tokenizer from {}: {}", tokenizer_path.display(), e))?;
        let config: BertConfig = serde_json::from_str(&std::fs::read_to_string(&config_path)?)?;
        let weights = load_weights(model_dir, &device)?;
        let vb = VarBuilder::from_tensors(weights, DType::F32, &device);
        let model = BertModel::load(vb, &config)?;
        let dim = config.hidden_size;
        info!("Local embedding model ready ({} dims)", dim);
        Ok(Self { model, tokenizer, device, id: format!("local:{model_name}:d{dim}"), dim })
    }

    fn forward(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        let start = Instant::now();
        let (input_ids, attention_mask) = tokenize_batch(&self.tokenizer, texts, MAX_SEQ_LEN, BERT_PAD_ID, &self.device)?;
        let token_type_ids = input_ids.zeros_like()?;
        let hidden = self.model.forward(&input_ids, &token_type_ids, Some(&attention_mask))?;
        let pooled: Vec<Vec<f32>> = masked_mean_l2(&hidden, &attention_mask)?.to_device(&Device::Cpu)?.to_vec2()?;
        if let Some(v) = pooled.iter().find(|v| v.len() != self.dim) {
            return Err(anyhow!("Embedding dimension {} does not match model hidden size {}", v.len(), self.dim));
        }
        debug!("Embedded {} texts in {:?}", texts.len(), start.elapsed());
        Ok(pooled)
    }
}

impl Embedder for LocalBertEmbedder {
    fn embedder_id(&self) -> &str { &self.id }
    fn dim(&self) -> usize { self.dim }
    fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        let mut out = Vec::with_capacity(texts.len());
        for batch in texts.chunks(FORWARD_BATCH) {
            out.extend(self.forward(batch)?);
        }
        Ok(out)
    }
}

fn select_device() -> Device {
    #[cfg(feature = "metal")]
    {
        if let Ok(dev) = Device::new_metal(0) { info!("Device: Metal (MPS)"); return dev; }
    }
    info!("Device: CPU");
    Device::Cpu
}

fn required_file(model_dir: &Path, name: &str) -> Result<PathBuf> {
    let path = model_dir.join(name);
    if !path.is_file() {
        return Err(Error::NotFound(format!("{} (local embedding model)", path.display())).into());
    }
    Ok(path)
}

fn load_weights(model_dir: &Path, device: &Device) -> Result<HashMap<String, Tensor>> {
    let safetensors = model_dir.join("model.safetensors");
    if safetensors.exists() {
        return Ok(candle_core::safetensors::load(&safetensors, device)?);
    }
    let pickle = model_dir.join("pytorch_model.bin");
    if pickle.exists() {
        return Ok(candle_core::pickle::read_all(&pickle)?.into_iter().collect());
    }
    Err(Error::NotFound(format!("model.safetensors or pytorch_model.bin in {}", model_dir.display())).into())
}

/// Model directory lookup: explicit setting, then `APP_MODEL_DIR`, then `./models/all-MiniLM-L6-v2`.
pub fn resolve_model_dir(configured: Option<PathBuf>) -> Result<PathBuf> {
    if let Some(p) = configured {
        if p.exists() { return Ok(p); }
        warn!("Configured model_dir {} does not exist", p.display());
    }
    if let Ok(dir) = std::env::var("APP_MODEL_DIR") {
        let p = PathBuf::from(&dir);
        if p.exists() { info!("Using APP_MODEL_DIR: {}", p.display()); return Ok(p); }
    }
    let default = Path::new("models/all-MiniLM-L6-v2");
    if default.exists() { return Ok(default.to_path_buf()); }
    Err(Error::NotFound("local embedding model directory (set embedding.model_dir or APP_MODEL_DIR)".into()).into())
}
