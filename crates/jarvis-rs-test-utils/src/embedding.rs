use async_trait::async_trait;
use jarvis_rs_memory::{EmbeddingGateway, MemoryError};
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

/// Deterministic bag-of-words gateway.
///
/// Identical texts always embed to identical vectors, and texts sharing
/// words land close together. Individual texts can be pinned to an exact
/// vector with [`StubEmbedder::with_vector`].
#[derive(Clone)]
pub struct StubEmbedder {
    dimension: usize,
    pinned: Arc<Mutex<HashMap<String, Vec<f32>>>>,
    calls: Arc<AtomicUsize>,
    fail_after: Option<usize>,
    delay: Option<Duration>,
}

impl StubEmbedder {
    pub fn new(dimension: usize) -> Self {
        Self {
            dimension,
            pinned: Arc::new(Mutex::new(HashMap::new())),
            calls: Arc::new(AtomicUsize::new(0)),
            fail_after: None,
            delay: None,
        }
    }

    /// Return `vector` whenever `text` is embedded.
    pub fn with_vector(self, text: impl Into<String>, vector: Vec<f32>) -> Self {
        self.pinned.lock().insert(text.into(), vector);
        self
    }

    /// Succeed for the first `calls` embeds, then report the gateway as unavailable.
    pub fn failing_after(mut self, calls: usize) -> Self {
        self.fail_after = Some(calls);
        self
    }

    /// Sleep before answering each call.
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    /// Number of embed calls observed so far.
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    /// Vector the stub produces for `text`, without counting a call.
    pub fn vector_for(&self, text: &str) -> Vec<f32> {
        if let Some(vector) = self.pinned.lock().get(text) {
            return vector.clone();
        }
        bag_of_words(text, self.dimension)
    }
}

#[async_trait]
impl EmbeddingGateway for StubEmbedder {
    fn dimension(&self) -> usize {
        self.dimension
    }

    async fn embed(&self, text: &str) -> Result<Vec<f32>, MemoryError> {
        let call = self.calls.fetch_add(1, Ordering::SeqCst);
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        if self.fail_after.is_some_and(|limit| call >= limit) {
            return Err(MemoryError::EmbeddingUnavailable(
                "stub gateway offline".to_string(),
            ));
        }
        Ok(self.vector_for(text))
    }
}

/// Gateway that is always unreachable.
#[derive(Debug, Clone)]
pub struct FailingEmbedder {
    dimension: usize,
}

impl FailingEmbedder {
    pub fn new(dimension: usize) -> Self {
        Self { dimension }
    }
}

#[async_trait]
impl EmbeddingGateway for FailingEmbedder {
    fn dimension(&self) -> usize {
        self.dimension
    }

    async fn embed(&self, _text: &str) -> Result<Vec<f32>, MemoryError> {
        Err(MemoryError::EmbeddingUnavailable("quota exceeded".to_string()))
    }
}

/// Gateway that advertises one dimension but returns vectors of another.
#[derive(Debug, Clone)]
pub struct MisreportingEmbedder {
    reported: usize,
    actual: usize,
}

impl MisreportingEmbedder {
    pub fn new(reported: usize, actual: usize) -> Self {
        Self { reported, actual }
    }
}

#[async_trait]
impl EmbeddingGateway for MisreportingEmbedder {
    fn dimension(&self) -> usize {
        self.reported
    }

    async fn embed(&self, _text: &str) -> Result<Vec<f32>, MemoryError> {
        Ok(vec![1.0; self.actual])
    }
}

fn bag_of_words(text: &str, dimension: usize) -> Vec<f32> {
    let mut vector = vec![0.0; dimension];
    if dimension == 0 {
        return vector;
    }
    for word in text
        .split(|c: char| !c.is_alphanumeric())
        .filter(|word| !word.is_empty())
    {
        let bucket = fnv1a(&word.to_lowercase()) as usize % dimension;
        vector[bucket] += 1.0;
    }
    vector
}

fn fnv1a(value: &str) -> u64 {
    value.bytes().fold(0xcbf2_9ce4_8422_2325, |hash, byte| {
        (hash ^ u64::from(byte)).wrapping_mul(0x0100_0000_01b3)
    })
}
