//! Scoped semantic memory for Jarvis.
//!
//! Records are (text, embedding, scope, role, timestamp) entries kept in an
//! append-only JSONL log and served from an in-memory cosine-similarity
//! index. Queries combine similarity ranking with exact-match scope filters
//! and return the most recent relevant records. A short-term buffer holds
//! the live session's turns until they are promoted into the store.

pub mod buffer;
pub mod embedding;
pub mod error;
pub mod filter;
pub mod index;
pub mod model;
pub mod record_log;
pub mod render;
pub mod store;

/// Short-term buffer and promotion types.
pub use buffer::{PromotionError, ShortTermBuffer, Turn, TurnRole};
/// Embedding gateway interface.
pub use embedding::EmbeddingGateway;
/// Memory error type.
pub use error::MemoryError;
/// Scope filter.
pub use filter::ScopeFilter;
/// Vector index.
pub use index::{Hit, VectorIndex, cosine_similarity};
/// Record model.
pub use model::{FailureKind, Record, RecordId, Role, Scope};
/// Record log and load reporting.
pub use record_log::{LOG_FILE_NAME, LoadStatus, RecordLog};
/// History rendering.
pub use render::{NO_HISTORY, render_history};
/// Store facade and options.
pub use store::{DEFAULT_EMBED_TIMEOUT, DEFAULT_OVER_FETCH, ScopedMemoryStore, StoreOptions};
