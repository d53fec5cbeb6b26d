//! Gemini `embedContent` gateway over HTTP.

use crate::error::JarvisCoreError;
use async_trait::async_trait;
use jarvis_rs_memory::{EmbeddingGateway, MemoryError};
use log::{debug, warn};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Public Generative Language API base URL.
pub const DEFAULT_GEMINI_ENDPOINT: &str = "https://generativelanguage.googleapis.com";

/// Longest response body quoted in error messages.
const ERROR_BODY_LIMIT: usize = 200;

#[derive(Debug, Serialize)]
struct EmbedRequest<'a> {
    model: &'a str,
    content: Content<'a>,
}

#[derive(Debug, Serialize)]
struct Content<'a> {
    parts: [Part<'a>; 1],
}

#[derive(Debug, Serialize)]
struct Part<'a> {
    text: &'a str,
}

#[derive(Debug, Deserialize)]
struct EmbedResponse {
    embedding: ContentEmbedding,
}

#[derive(Debug, Deserialize)]
struct ContentEmbedding {
    values: Vec<f32>,
}

/// Embedding gateway backed by the Gemini embedding API.
pub struct GeminiEmbedder {
    client: reqwest::Client,
    url: String,
    model: String,
    api_key: String,
    dimension: usize,
}

impl GeminiEmbedder {
    /// Build a client for `model` (e.g. `models/embedding-001`).
    ///
    /// `timeout` bounds every HTTP request; `endpoint` overrides the API base URL.
    pub fn new(
        api_key: String,
        model: String,
        endpoint: Option<String>,
        dimension: usize,
        timeout: Duration,
    ) -> Result<Self, JarvisCoreError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|err| JarvisCoreError::Gateway(format!("failed to build HTTP client: {err}")))?;
        let model = qualified_model(&model);
        let url = embed_url(
            endpoint.as_deref().unwrap_or(DEFAULT_GEMINI_ENDPOINT),
            &model,
        );
        Ok(Self {
            client,
            url,
            model,
            api_key,
            dimension,
        })
    }
}

#[async_trait]
impl EmbeddingGateway for GeminiEmbedder {
    fn dimension(&self) -> usize {
        self.dimension
    }

    async fn embed(&self, text: &str) -> Result<Vec<f32>, MemoryError> {
        let request = EmbedRequest {
            model: &self.model,
            content: Content {
                parts: [Part { text }],
            },
        };
        let response = self
            .client
            .post(&self.url)
            .header("x-goog-api-key", &self.api_key)
            .json(&request)
            .send()
            .await
            .map_err(|err| {
                warn!("embedding request failed (model={}, err={})", self.model, err);
                MemoryError::EmbeddingUnavailable(err.to_string())
            })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            warn!(
                "embedding request rejected (model={}, status={})",
                self.model, status
            );
            return Err(MemoryError::EmbeddingUnavailable(format!(
                "{status}: {}",
                truncate(&body, ERROR_BODY_LIMIT)
            )));
        }

        let body: EmbedResponse = response.json().await.map_err(|err| {
            MemoryError::EmbeddingUnavailable(format!("malformed embedding response: {err}"))
        })?;
        debug!(
            "embedding received (model={}, values={})",
            self.model,
            body.embedding.values.len()
        );
        Ok(body.embedding.values)
    }
}

fn qualified_model(model: &str) -> String {
    if model.starts_with("models/") {
        model.to_string()
    } else {
        format!("models/{model}")
    }
}

fn embed_url(endpoint: &str, model: &str) -> String {
    format!(
        "{}/v1beta/{model}:embedContent",
        endpoint.trim_end_matches('/')
    )
}

fn truncate(text: &str, limit: usize) -> &str {
    match text.char_indices().nth(limit) {
        Some((idx, _)) => &text[..idx],
        None => text,
    }
}
