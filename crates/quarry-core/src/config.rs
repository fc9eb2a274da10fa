use std::path::Path;

use anyhow::Context;
use serde::Deserialize;

#[derive(Debug, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub workspace_dir: Option<String>,
    #[serde(default)]
    pub embedding: EmbeddingConfig,
    #[serde(default)]
    pub llm: LlmConfig,
    #[serde(default)]
    pub store: StoreConfig,
    #[serde(default)]
    pub templates: TemplatesConfig,
}

#[derive(Debug, Deserialize)]
pub struct EmbeddingConfig {
    #[serde(default = "default_embedding_api_url")]
    pub api_url: String,
    #[serde(default = "default_embedding_model")]
    pub model: String,
    /// Fixed embedding dimension `D` produced by the model.
    #[serde(default = "default_embedding_dim")]
    pub dim: usize,
}

#[derive(Debug, Deserialize)]
pub struct LlmConfig {
    #[serde(default = "default_llm_api_url")]
    pub api_url: String,
    #[serde(default = "default_llm_model")]
    pub model: String,
    #[serde(default = "default_temperature")]
    pub temperature: f32,
}

/// Vector store backend selector.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StoreBackend {
    Memory,
    Chroma,
}

#[derive(Debug, Deserialize)]
pub struct StoreConfig {
    #[serde(default = "default_store_backend")]
    pub backend: StoreBackend,
    #[serde(default = "default_store_url")]
    pub url: String,
}

#[derive(Debug, Deserialize)]
pub struct TemplatesConfig {
    #[serde(default = "default_templates_dir")]
    pub dir: String,
}

fn default_embedding_api_url() -> String {
    "http://localhost:8080/v1/embeddings".into()
}

fn default_embedding_model() -> String {
    "nomic-ai/nomic-embed-text-v1.5".into()
}

fn default_embedding_dim() -> usize {
    768
}

fn default_llm_api_url() -> String {
    "http://localhost:8081/v1/chat/completions".into()
}

fn default_llm_model() -> String {
    "gpt-4".into()
}

fn default_temperature() -> f32 {
    0.7
}

fn default_store_backend() -> StoreBackend {
    StoreBackend::Chroma
}

fn default_store_url() -> String {
    "http://localhost:8000".into()
}

fn default_templates_dir() -> String {
    "./prompts".into()
}

impl Default for EmbeddingConfig {
    fn default() -> Self {
        Self {
            api_url: default_embedding_api_url(),
            model: default_embedding_model(),
            dim: default_embedding_dim(),
        }
    }
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            api_url: default_llm_api_url(),
            model: default_llm_model(),
            temperature: default_temperature(),
        }
    }
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            backend: default_store_backend(),
            url: default_store_url(),
        }
    }
}

impl Default for TemplatesConfig {
    fn default() -> Self {
        Self {
            dir: default_templates_dir(),
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            workspace_dir: None,
            embedding: EmbeddingConfig::default(),
            llm: LlmConfig::default(),
            store: StoreConfig::default(),
            templates: TemplatesConfig::default(),
        }
    }
}

impl Config {
    /// Load configuration from a TOML file with env var overrides.
    ///
    /// Falls back to defaults when the file does not exist.
    ///
    /// # Errors
    ///
    /// Returns an error if the file exists but cannot be read or parsed.
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        let mut config = if path.exists() {
            let content = std::fs::read_to_string(path).context("failed to read config file")?;
            toml::from_str::<Self>(&content).context("failed to parse config file")?
        } else {
            Self::default()
        };

        config.apply_env_overrides();
        Ok(config)
    }

    fn apply_env_overrides(&mut self) {
        if let Ok(v) = std::env::var("QUARRY_WORKSPACE_DIR") {
            self.workspace_dir = Some(v);
        }
        if let Ok(v) = std::env::var("QUARRY_EMBEDDING_API_URL") {
            self.embedding.api_url = v;
        }
        if let Ok(v) = std::env::var("QUARRY_EMBEDDING_MODEL") {
            self.embedding.model = v;
        }
        if let Ok(v) = std::env::var("QUARRY_EMBEDDING_DIM")
            && let Ok(dim) = v.parse::<usize>()
        {
            self.embedding.dim = dim;
        }
        if let Ok(v) = std::env::var("QUARRY_LLM_API_URL") {
            self.llm.api_url = v;
        }
        if let Ok(v) = std::env::var("QUARRY_LLM_MODEL") {
            self.llm.model = v;
        }
        if let Ok(v) = std::env::var("QUARRY_STORE_BACKEND") {
            match v.to_ascii_lowercase().as_str() {
                "memory" => self.store.backend = StoreBackend::Memory,
                "chroma" => self.store.backend = StoreBackend::Chroma,
                other => {
                    tracing::warn!("unknown store backend {other:?}, keeping configured value");
                }
            }
        }
        if let Ok(v) = std::env::var("QUARRY_STORE_URL") {
            self.store.url = v;
        }
        if let Ok(v) = std::env::var("QUARRY_TEMPLATES_DIR") {
            self.templates.dir = v;
        }
    }
}
