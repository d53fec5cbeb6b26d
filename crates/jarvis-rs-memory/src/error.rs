//! Error types for memory operations.

use std::fmt;

/// Boxed source error carried by persistence failures.
pub type BoxedSource = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Errors returned by the memory store and its collaborators.
#[derive(Debug, thiserror::Error)]
pub enum MemoryError {
    /// The embedding gateway could not produce a vector (network, auth, quota or timeout).
    #[error("embedding unavailable: {0}")]
    EmbeddingUnavailable(String),
    /// A durable write could not complete; the mutation did not happen.
    #[error("persistence failure ({operation}): {source}")]
    PersistenceFailure {
        operation: String,
        #[source]
        source: BoxedSource,
    },
    /// A vector did not match the store dimension.
    #[error("dimension mismatch: expected {expected}, got {actual}")]
    DimensionMismatch { expected: usize, actual: usize },
    /// Scope triple with a missing component.
    #[error("invalid scope: {0}")]
    InvalidScope(String),
    /// Store options rejected at construction.
    #[error("invalid store options: {0}")]
    InvalidOptions(String),
}

impl MemoryError {
    /// Wrap an IO or serialization error raised while persisting.
    pub fn persistence(
        operation: impl Into<String>,
        source: impl Into<BoxedSource>,
    ) -> Self {
        Self::PersistenceFailure {
            operation: operation.into(),
            source: source.into(),
        }
    }

    /// Prefix a gateway failure with the operation and scope it interrupted.
    ///
    /// Other variants already name their context and pass through unchanged.
    pub fn context(self, operation: impl fmt::Display) -> Self {
        match self {
            Self::EmbeddingUnavailable(message) => {
                Self::EmbeddingUnavailable(format!("{operation}: {message}"))
            }
            other => other,
        }
    }

    /// Whether the caller may retry the same call unchanged.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::EmbeddingUnavailable(_))
    }
}

#[cfg(test)]
mod tests {
    use super::MemoryError;
    use pretty_assertions::assert_eq;

    #[test]
    fn only_embedding_errors_are_retryable() {
        assert!(MemoryError::EmbeddingUnavailable("quota".to_string()).is_retryable());
        assert!(
            !MemoryError::DimensionMismatch {
                expected: 3,
                actual: 4
            }
            .is_retryable()
        );
        let io = std::io::Error::other("disk full");
        assert!(!MemoryError::persistence("append", io).is_retryable());
    }

    #[test]
    fn context_prefixes_gateway_failures_only() {
        let err = MemoryError::EmbeddingUnavailable("quota".to_string()).context("append (user=u)");
        assert_eq!(err.to_string(), "embedding unavailable: append (user=u): quota");

        let err = MemoryError::InvalidScope("user_id must not be empty".to_string()).context("append");
        assert_eq!(err.to_string(), "invalid scope: user_id must not be empty");
    }

    #[test]
    fn persistence_failure_names_operation() {
        let io = std::io::Error::other("disk full");
        let err = MemoryError::persistence("append (user=u)", io);
        assert_eq!(err.to_string(), "persistence failure (append (user=u)): disk full");
    }
}
