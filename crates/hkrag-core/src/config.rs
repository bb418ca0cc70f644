//! Layered configuration loader and path helpers.
//!
//! Uses Figment to merge built-in defaults + `config.toml` + `config.<env>.toml`
//! + `APP_*` env vars (`__` separates nested keys, e.g. `APP_RETRIEVAL__K=3`).
//! Provider credentials fall back to the conventional `COHERE_API_KEY` and
//! `OLLAMA_HOST` variables.
use figment::{
    providers::{Env, Format, Serialized, Toml},
    Figment,
};
use serde::{Deserialize, Serialize};
use std::env;
use std::path::{Path, PathBuf};

use crate::error::Error;
use crate::splitter::{ChunkingConfig, DEFAULT_CHUNK_OVERLAP, DEFAULT_CHUNK_SIZE};

pub const COHERE_API_KEY_VAR: &str = "COHERE_API_KEY";
pub const OLLAMA_HOST_VAR: &str = "OLLAMA_HOST";
pub const DEFAULT_COHERE_BASE_URL: &str = "https://api.cohere.com";
pub const DEFAULT_OLLAMA_BASE_URL: &str = "http://localhost:11434";
pub const DEFAULT_COHERE_CHAT_MODEL: &str = "command-r7b-12-2024";
pub const DEFAULT_OLLAMA_MODEL: &str = "llama3.2:3b";

/// Chat model presets offered by the front end. Any identifier is accepted.
pub const GENERATION_MODEL_PRESETS: &[(&str, &str)] = &[
    (DEFAULT_COHERE_CHAT_MODEL, "Small, fast (recommended on the free tier)"),
    ("command-r-08-2024", "Balanced"),
    ("command-r-plus-08-2024", "Highest quality"),
    (DEFAULT_OLLAMA_MODEL, "Local model served by Ollama"),
];

pub struct Config {
    figment: Figment,
}

impl Config {
    pub fn load() -> anyhow::Result<Self> {
        Self::load_from(Path::new("."))
    }

    /// Load with config files looked up in `dir`.
    pub fn load_from(dir: &Path) -> anyhow::Result<Self> {
        let env_name = env::var("RUST_ENV").unwrap_or_else(|_| "dev".to_string());

        let mut figment = Figment::from(Serialized::defaults(Settings::default()))
            .merge(Toml::file(dir.join("config.toml")));
        match env_name.as_str() {
            "dev" | "development" => figment = figment.merge(Toml::file(dir.join("config.dev.toml"))),
            "prod" | "production" => figment = figment.merge(Toml::file(dir.join("config.prod.toml"))),
            "test" | "testing" => figment = figment.merge(Toml::file(dir.join("config.test.toml"))),
            _ => {}
        }
        figment = figment.merge(Env::prefixed("APP_").split("__"));

        Ok(Self { figment })
    }

    pub fn get<T>(&self, key: &str) -> anyhow::Result<T>
    where
        T: serde::de::DeserializeOwned,
    {
        self.figment
            .extract_inner(key)
            .map_err(|e| anyhow::anyhow!("Failed to get '{}': {}", key, e))
    }

    /// Extract, apply credential fallbacks, and validate the full settings tree.
    pub fn settings(&self) -> anyhow::Result<Settings> {
        let mut settings: Settings = self
            .figment
            .extract()
            .map_err(|e| Error::InvalidConfig(e.to_string()))?;
        settings.apply_env_fallbacks();
        settings.validate()?;
        Ok(settings)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub data: DataSettings,
    pub chunking: ChunkingSettings,
    pub embedding: EmbeddingSettings,
    pub generation: GenerationSettings,
    pub retrieval: RetrievalSettings,
    pub server: ServerSettings,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DataSettings {
    pub input_dir: String,
    pub store_dir: String,
    pub table: String,
}

impl Default for DataSettings {
    fn default() -> Self {
        Self { input_dir: "./data".to_string(), store_dir: "./chroma_db".to_string(), table: "documents".to_string() }
    }
}

impl DataSettings {
    pub fn input_dir(&self) -> PathBuf { expand_path(&self.input_dir) }
    pub fn store_dir(&self) -> PathBuf { expand_path(&self.store_dir) }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ChunkingSettings {
    pub chunk_size: usize,
    pub chunk_overlap: usize,
}

impl Default for ChunkingSettings {
    fn default() -> Self {
        Self { chunk_size: DEFAULT_CHUNK_SIZE, chunk_overlap: DEFAULT_CHUNK_OVERLAP }
    }
}

impl From<&ChunkingSettings> for ChunkingConfig {
    fn from(s: &ChunkingSettings) -> Self {
        ChunkingConfig { chunk_size: s.chunk_size, chunk_overlap: s.chunk_overlap }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EmbeddingProviderKind {
    /// Cohere embed API.
    Cohere,
    /// BERT-family model on disk, run with candle.
    Local,
    /// Deterministic token-hash vectors; no model, no network.
    Hash,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EmbeddingSettings {
    pub provider: EmbeddingProviderKind,
    pub model: String,
    pub dimension: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,
    pub base_url: String,
    pub batch_size: usize,
    pub timeout_secs: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub model_dir: Option<String>,
}

impl Default for EmbeddingSettings {
    fn default() -> Self {
        Self {
            provider: EmbeddingProviderKind::Cohere,
            model: "embed-english-light-v3.0".to_string(),
            dimension: 384,
            api_key: None,
            base_url: DEFAULT_COHERE_BASE_URL.to_string(),
            batch_size: 96,
            timeout_secs: 60,
            model_dir: None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GenerationProviderKind {
    Cohere,
    Ollama,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GenerationSettings {
    pub provider: GenerationProviderKind,
    /// Unset picks the provider's default, see [`GenerationSettings::model`].
    #[serde(skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,
    pub temperature: f32,
    pub max_tokens: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub base_url: Option<String>,
    pub timeout_secs: u64,
}

impl Default for GenerationSettings {
    fn default() -> Self {
        Self {
            provider: GenerationProviderKind::Cohere,
            model: None,
            temperature: 0.3,
            max_tokens: 256,
            api_key: None,
            base_url: None,
            timeout_secs: 120,
        }
    }
}

impl GenerationSettings {
    pub fn model(&self) -> &str {
        match (&self.model, self.provider) {
            (Some(model), _) => model,
            (None, GenerationProviderKind::Cohere) => DEFAULT_COHERE_CHAT_MODEL,
            (None, GenerationProviderKind::Ollama) => DEFAULT_OLLAMA_MODEL,
        }
    }

    pub fn base_url(&self) -> &str {
        match (&self.base_url, self.provider) {
            (Some(url), _) => url,
            (None, GenerationProviderKind::Cohere) => DEFAULT_COHERE_BASE_URL,
            (None, GenerationProviderKind::Ollama) => DEFAULT_OLLAMA_BASE_URL,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RetrievalSettings {
    pub k: usize,
}

impl Default for RetrievalSettings {
    fn default() -> Self { Self { k: 4 } }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerSettings {
    pub host: String,
    pub port: u16,
}

impl Default for ServerSettings {
    fn default() -> Self { Self { host: "127.0.0.1".to_string(), port: 8000 } }
}

impl ServerSettings {
    pub fn bind_addr(&self) -> String { format!("{}:{}", self.host, self.port) }
}

impl Settings {
    /// Fill unset credentials from the provider's conventional environment variables.
    pub fn apply_env_fallbacks(&mut self) {
        let non_empty = |name: &str| env::var(name).ok().filter(|v| !v.trim().is_empty());
        if self.embedding.api_key.is_none() && self.embedding.provider == EmbeddingProviderKind::Cohere {
            self.embedding.api_key = non_empty(COHERE_API_KEY_VAR);
        }
        match self.generation.provider {
            GenerationProviderKind::Cohere if self.generation.api_key.is_none() => {
                self.generation.api_key = non_empty(COHERE_API_KEY_VAR);
            }
            GenerationProviderKind::Ollama if self.generation.base_url.is_none() => {
                self.generation.base_url = non_empty(OLLAMA_HOST_VAR);
            }
            _ => {}
        }
    }

    pub fn validate(&self) -> Result<(), Error> {
        let c = &self.chunking;
        if c.chunk_size == 0 {
            return Err(Error::InvalidConfig("chunking.chunk_size must be greater than 0".into()));
        }
        if c.chunk_overlap >= c.chunk_size {
            return Err(Error::InvalidConfig(format!(
                "chunking.chunk_overlap ({}) must be smaller than chunking.chunk_size ({})",
                c.chunk_overlap, c.chunk_size
            )));
        }
        if self.retrieval.k == 0 {
            return Err(Error::InvalidConfig("retrieval.k must be at least 1".into()));
        }
        let t = self.generation.temperature;
        if !(0.0..=1.0).contains(&t) {
            return Err(Error::InvalidConfig(format!("generation.temperature must be within 0.0..=1.0, got {t}")));
        }
        if self.generation.max_tokens == 0 {
            return Err(Error::InvalidConfig("generation.max_tokens must be at least 1".into()));
        }
        if self.embedding.dimension == 0 {
            return Err(Error::InvalidConfig("embedding.dimension must be at least 1".into()));
        }
        if self.embedding.batch_size == 0 {
            return Err(Error::InvalidConfig("embedding.batch_size must be at least 1".into()));
        }
        Ok(())
    }
}

/// Expand a user-provided path string:
/// - Expands leading '~' to the user's home directory
/// - Expands ${VAR} and $VAR environment variables
/// - Returns a PathBuf without attempting to canonicalize
pub fn expand_path<S: AsRef<str>>(input: S) -> PathBuf {
    let s = input.as_ref();
    let expanded_env = shellexpand::env(s).unwrap_or(std::borrow::Cow::Borrowed(s));
    let expanded = shellexpand::tilde(&expanded_env);
    PathBuf::from(expanded.as_ref())
}
