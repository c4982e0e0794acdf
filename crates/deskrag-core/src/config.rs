//! Configuration loader and path helpers.
//!
//! Uses Figment to merge built-in defaults + `config.toml` + `config.<env>.toml`
//! + `APP_*` env vars (`__` separates nesting levels, e.g.
//! `APP_GENERATION__TIMEOUT_SECS=10`). Provides helpers to expand `~` and
//! `${VAR}` and to resolve relative paths against a known base directory.

use figment::{
    providers::{Env, Format, Serialized, Toml},
    Figment,
};
use serde::{Deserialize, Serialize};
use std::env;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::error::{Error, Result};

const API_KEY_VAR: &str = "GOOGLE_API_KEY";

pub struct Config {
    figment: Figment,
    dotenv: Option<PathBuf>,
}

impl Config {
    pub fn load() -> Result<Self> {
        let env_name = env::var("RUST_ENV").unwrap_or_else(|_| "dev".to_string());
        Self::load_for_env(&env_name)
    }

    pub fn load_for_env(env_name: &str) -> Result<Self> {
        let mut figment = Figment::from(Serialized::defaults(Settings::default()))
            .merge(Toml::file("config.toml"));
        match env_name {
            "dev" | "development" => figment = figment.merge(Toml::file("config.dev.toml")),
            "prod" | "production" => figment = figment.merge(Toml::file("config.prod.toml")),
            "test" | "testing" => figment = figment.merge(Toml::file("config.test.toml")),
            other => tracing::warn!("Unknown RUST_ENV '{}', using config.toml only", other),
        }
        figment = figment.merge(Env::prefixed("APP_").split("__"));
        Ok(Self { figment, dotenv: Some(PathBuf::from(".env")) })
    }

    /// Wrap an already assembled figment, e.g. one built from inline TOML.
    pub fn from_figment(figment: Figment) -> Self {
        Self { figment: Figment::from(Serialized::defaults(Settings::default())).merge(figment), dotenv: None }
    }

    /// Also look up credentials in the dotenv file at `path`.
    pub fn with_dotenv(mut self, path: impl Into<PathBuf>) -> Self {
        self.dotenv = Some(path.into());
        self
    }

    /// Extract and validate the typed settings.
    pub fn settings(&self) -> Result<Settings> {
        let mut settings: Settings = self
            .figment
            .extract()
            .map_err(|e| Error::InvalidConfig(e.to_string()))?;
        if settings.generation.api_key.is_empty() {
            let key = env::var(API_KEY_VAR)
                .ok()
                .or_else(|| self.dotenv.as_deref().and_then(|path| dotenv_value(path, API_KEY_VAR)));
            if let Some(key) = key {
                settings.generation.api_key = key;
            }
        }
        settings.validate()?;
        Ok(settings)
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub knowledge_base: KnowledgeBaseSettings,
    pub index: IndexSettings,
    pub retrieval: RetrievalSettings,
    pub embedding: EmbeddingSettings,
    pub generation: GenerationSettings,
    pub prompt: PromptSettings,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct KnowledgeBaseSettings {
    pub dir: String,
    pub extension: String,
}

impl Default for KnowledgeBaseSettings {
    fn default() -> Self {
        Self { dir: "knowledge_base".to_string(), extension: "txt".to_string() }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct IndexSettings {
    pub path: String,
}

impl Default for IndexSettings {
    fn default() -> Self {
        Self { path: "vector_store.json".to_string() }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RetrievalSettings {
    pub k: usize,
}

impl Default for RetrievalSettings {
    fn default() -> Self {
        Self { k: 1 }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EmbeddingSettings {
    pub model: String,
    pub model_dir: String,
    pub max_len: usize,
    pub use_fake: bool,
    pub fake_dim: usize,
}

impl Default for EmbeddingSettings {
    fn default() -> Self {
        Self {
            model: "sentence-transformers/all-MiniLM-L6-v2".to_string(),
            model_dir: "models/all-MiniLM-L6-v2".to_string(),
            max_len: 256,
            use_fake: false,
            fake_dim: 384,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GenerationSettings {
    pub endpoint: String,
    pub model: String,
    pub api_key: String,
    pub timeout_secs: u64,
    pub max_retries: u32,
    pub retry_delay_ms: u64,
}

impl Default for GenerationSettings {
    fn default() -> Self {
        Self {
            endpoint: "https://generativelanguage.googleapis.com/v1beta".to_string(),
            model: "gemini-2.5-flash".to_string(),
            api_key: String::new(),
            timeout_secs: 30,
            max_retries: 0,
            retry_delay_ms: 2000,
        }
    }
}

impl GenerationSettings {
    /// Limit for a single request to the provider.
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    pub fn retry_delay(&self) -> Duration {
        Duration::from_millis(self.retry_delay_ms)
    }

    /// Limit for a whole `generate` call: every attempt at `timeout()` plus
    /// the doubling backoff between them, with one second of slack.
    pub fn deadline(&self) -> Duration {
        let attempts = self.max_retries.saturating_add(1);
        let mut backoff = Duration::ZERO;
        let mut delay = self.retry_delay();
        for _ in 0..self.max_retries {
            backoff = backoff.saturating_add(delay);
            delay = delay.saturating_mul(2);
            if backoff == Duration::MAX {
                break;
            }
        }
        self.timeout()
            .saturating_mul(attempts)
            .saturating_add(backoff)
            .saturating_add(Duration::from_secs(1))
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PromptSettings {
    pub max_context_chars: usize,
}

impl Default for PromptSettings {
    fn default() -> Self {
        Self { max_context_chars: 12_000 }
    }
}

impl Settings {
    pub fn validate(&self) -> Result<()> {
        if self.retrieval.k == 0 {
            return Err(Error::InvalidConfig("retrieval.k must be at least 1".to_string()));
        }
        if self.prompt.max_context_chars == 0 {
            return Err(Error::InvalidConfig("prompt.max_context_chars must be greater than 0".to_string()));
        }
        if self.generation.timeout_secs == 0 {
            return Err(Error::InvalidConfig("generation.timeout_secs must be greater than 0".to_string()));
        }
        if self.knowledge_base.extension.trim_start_matches('.').is_empty() {
            return Err(Error::InvalidConfig("knowledge_base.extension must not be empty".to_string()));
        }
        Ok(())
    }

    pub fn knowledge_base_dir(&self) -> PathBuf {
        expand_path(&self.knowledge_base.dir)
    }

    pub fn index_path(&self) -> PathBuf {
        expand_path(&self.index.path)
    }

    pub fn model_dir(&self) -> PathBuf {
        expand_path(&self.embedding.model_dir)
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

/// Value of `key` in a dotenv file, without touching the process environment.
/// A missing or unreadable file yields `None`.
pub fn dotenv_value(path: &Path, key: &str) -> Option<String> {
    let entries = dotenvy::from_path_iter(path).ok()?;
    entries
        .filter_map(|entry| match entry {
            Ok(pair) => Some(pair),
            Err(e) => {
                tracing::warn!("Ignoring malformed line in {}: {}", path.display(), e);
                None
            }
        })
        .find(|(k, _)| k == key)
        .map(|(_, v)| v)
        .filter(|v| !v.is_empty())
}
