//! Embedding gateway interface consumed by the store.

use crate::error::MemoryError;
use async_trait::async_trait;
use log::warn;
use std::time::Duration;

#[async_trait]
/// Converts text into a fixed-dimension vector.
pub trait EmbeddingGateway: Send + Sync {
    /// Output dimension of every vector returned by `embed`.
    fn dimension(&self) -> usize;

    /// Embed a single text. Network, auth and quota failures map to
    /// [`MemoryError::EmbeddingUnavailable`].
    async fn embed(&self, text: &str) -> Result<Vec<f32>, MemoryError>;
}

/// Embed `text`, failing with `EmbeddingUnavailable` once `timeout` expires.
///
/// The returned vector is checked against `dimension` and for non-finite
/// components, which would not survive the JSON record log.
pub(crate) async fn embed_checked(
    gateway: &dyn EmbeddingGateway,
    text: &str,
    dimension: usize,
    timeout: Duration,
) -> Result<Vec<f32>, MemoryError> {
    let vector = match tokio::time::timeout(timeout, gateway.embed(text)).await {
        Ok(result) => result?,
        Err(_) => {
            warn!(
                "embedding timed out (timeout_ms={}, text_len={})",
                timeout.as_millis(),
                text.len()
            );
            return Err(MemoryError::EmbeddingUnavailable(format!(
                "timed out after {}ms",
                timeout.as_millis()
            )));
        }
    };
    if vector.len() != dimension {
        return Err(MemoryError::DimensionMismatch {
            expected: dimension,
            actual: vector.len(),
        });
    }
    if vector.iter().any(|value| !value.is_finite()) {
        return Err(MemoryError::EmbeddingUnavailable(
            "gateway returned a non-finite component".to_string(),
        ));
    }
    Ok(vector)
}
