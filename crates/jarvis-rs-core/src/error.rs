//! Error types for the core session crate.

use jarvis_rs_config::ConfigError;
use jarvis_rs_memory::{MemoryError, PromotionError};
use thiserror::Error;

/// Errors returned by session and bootstrap operations.
#[derive(Debug, Error)]
pub enum JarvisCoreError {
    /// Memory store error.
    #[error("memory error: {0}")]
    Memory(#[from] MemoryError),
    /// Buffer promotion stopped part way.
    #[error("promotion error: {0}")]
    Promotion(#[from] PromotionError),
    /// Config loading or validation error.
    #[error("config error: {0}")]
    Config(#[from] ConfigError),
    /// Embedding gateway could not be constructed.
    #[error("gateway error: {0}")]
    Gateway(String),
}

impl JarvisCoreError {
    /// Whether retrying the same call may succeed.
    pub fn is_retryable(&self) -> bool {
        match self {
            JarvisCoreError::Memory(err) => err.is_retryable(),
            JarvisCoreError::Promotion(err) => err.source.is_retryable(),
            JarvisCoreError::Config(_) | JarvisCoreError::Gateway(_) => false,
        }
    }
}
