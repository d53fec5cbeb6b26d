//! Embedding gateway implementations selected by config.

mod gemini;
mod hashing;

pub use gemini::{DEFAULT_GEMINI_ENDPOINT, GeminiEmbedder};
pub use hashing::HashingEmbedder;

use crate::error::JarvisCoreError;
use jarvis_rs_config::{EmbeddingConfig, EmbeddingProvider};
use jarvis_rs_memory::EmbeddingGateway;
use log::info;
use std::sync::Arc;

/// Build the gateway named by `config`, producing vectors of `dimension` components.
pub fn gateway_from_config(
    config: &EmbeddingConfig,
    dimension: usize,
) -> Result<Arc<dyn EmbeddingGateway>, JarvisCoreError> {
    info!(
        "building embedding gateway (provider={}, model={}, dimension={})",
        config.provider, config.model, dimension
    );
    match config.provider {
        EmbeddingProvider::Gemini => {
            let api_key = std::env::var(&config.api_key_env).map_err(|_| {
                JarvisCoreError::Gateway(format!(
                    "environment variable {} is not set",
                    config.api_key_env
                ))
            })?;
            Ok(Arc::new(GeminiEmbedder::new(
                api_key,
                config.model.clone(),
                config.endpoint.clone(),
                dimension,
                config.timeout(),
            )?))
        }
        EmbeddingProvider::Hashing => Ok(Arc::new(HashingEmbedder::new(dimension))),
    }
}
