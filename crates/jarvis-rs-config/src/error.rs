//! Error types for config loading and validation.

use thiserror::Error;

/// Errors returned while loading or validating `jarvis.json5` layers.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// A layer file could not be read.
    #[error("failed to read jarvis config: {0}")]
    ReadFailed(#[from] std::io::Error),
    /// A layer is not valid JSON5.
    #[error("failed to parse jarvis config: {0}")]
    ParseFailed(#[from] json5::Error),
    /// The merged value does not fit the config model.
    #[error("failed to decode jarvis config: {0}")]
    DecodeFailed(#[from] serde_json::Error),
    /// A field has the wrong shape or is not part of the schema.
    #[error("invalid config at {path}: {message}")]
    InvalidField { path: String, message: String },
    /// A value is well-formed but out of range.
    #[error("invalid config: {0}")]
    Invalid(String),
}
