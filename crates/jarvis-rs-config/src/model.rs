//! Configuration schema for Jarvis.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;
use std::time::Duration;

/// Root config for Jarvis.
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
pub struct JarvisConfig {
    #[serde(default, rename = "$schema")]
    pub schema: Option<String>,
    #[serde(default)]
    pub memory: MemoryConfig,
    #[serde(default)]
    pub embedding: EmbeddingConfig,
    #[serde(default)]
    pub session: SessionConfig,
}

impl JarvisConfig {
    /// Start building a config programmatically with defaults applied.
    pub fn builder() -> JarvisConfigBuilder {
        JarvisConfigBuilder::new()
    }
}

/// Builder for assembling a `JarvisConfig` in code.
#[derive(Debug, Default, Clone)]
pub struct JarvisConfigBuilder {
    config: JarvisConfig,
}

impl JarvisConfigBuilder {
    /// Create a new builder seeded with default config values.
    pub fn new() -> Self {
        Self {
            config: JarvisConfig::default(),
        }
    }

    /// Replace the memory store configuration.
    pub fn memory(mut self, memory: MemoryConfig) -> Self {
        self.config.memory = memory;
        self
    }

    /// Replace the embedding gateway configuration.
    pub fn embedding(mut self, embedding: EmbeddingConfig) -> Self {
        self.config.embedding = embedding;
        self
    }

    /// Replace the session identity configuration.
    pub fn session(mut self, session: SessionConfig) -> Self {
        self.config.session = session;
        self
    }

    /// Finalize and return the built `JarvisConfig`.
    pub fn build(self) -> JarvisConfig {
        self.config
    }
}

/// Long-term memory store settings.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct MemoryConfig {
    /// Store root directory; relative paths resolve against the working directory.
    #[serde(default = "default_memory_path")]
    pub path: PathBuf,
    /// Embedding dimension the store is built for.
    #[serde(default = "default_dimension")]
    pub dimension: usize,
    /// Default number of records returned by a recall.
    #[serde(default = "default_recall_k")]
    pub recall_k: usize,
    /// Candidate pool multiplier applied to the recall limit.
    #[serde(default = "default_over_fetch")]
    pub over_fetch: usize,
}

impl Default for MemoryConfig {
    fn default() -> Self {
        Self {
            path: default_memory_path(),
            dimension: default_dimension(),
            recall_k: default_recall_k(),
            over_fetch: default_over_fetch(),
        }
    }
}

fn default_memory_path() -> PathBuf {
    PathBuf::from(".jarvis/memory")
}

fn default_dimension() -> usize {
    768
}

fn default_recall_k() -> usize {
    5
}

fn default_over_fetch() -> usize {
    2
}

/// Embedding backend selection.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum EmbeddingProvider {
    /// Google Generative Language embedding API.
    #[default]
    Gemini,
    /// Offline feature-hashing embedder.
    Hashing,
}

impl fmt::Display for EmbeddingProvider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EmbeddingProvider::Gemini => f.write_str("gemini"),
            EmbeddingProvider::Hashing => f.write_str("hashing"),
        }
    }
}

/// Embedding gateway settings.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct EmbeddingConfig {
    #[serde(default)]
    pub provider: EmbeddingProvider,
    #[serde(default = "default_embedding_model")]
    pub model: String,
    /// Base URL override for the provider API.
    #[serde(default)]
    pub endpoint: Option<String>,
    /// Environment variable holding the API key.
    #[serde(default = "default_api_key_env")]
    pub api_key_env: String,
    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u64,
}

impl EmbeddingConfig {
    /// Gateway call timeout as a duration.
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }
}

impl Default for EmbeddingConfig {
    fn default() -> Self {
        Self {
            provider: EmbeddingProvider::default(),
            model: default_embedding_model(),
            endpoint: None,
            api_key_env: default_api_key_env(),
            timeout_ms: default_timeout_ms(),
        }
    }
}

fn default_embedding_model() -> String {
    "models/embedding-001".to_string()
}

fn default_api_key_env() -> String {
    "GOOGLE_API_KEY".to_string()
}

fn default_timeout_ms() -> u64 {
    10_000
}

/// Identity of the conversation writing to memory.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct SessionConfig {
    #[serde(default = "default_user_id")]
    pub user_id: String,
    /// Fixed session id; a fresh one is generated per run when absent.
    #[serde(default)]
    pub session_id: Option<String>,
    #[serde(default = "default_project_id")]
    pub project_id: String,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            user_id: default_user_id(),
            session_id: None,
            project_id: default_project_id(),
        }
    }
}

fn default_user_id() -> String {
    "default_user".to_string()
}

fn default_project_id() -> String {
    "default_project".to_string()
}
