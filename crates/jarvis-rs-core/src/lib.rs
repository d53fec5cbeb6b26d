//! Conversational memory session for Jarvis.
//!
//! This crate wires the memory store to a concrete embedding gateway and
//! exposes the caller-facing session API used by the `jarvis` binary.

pub mod bootstrap;
pub mod embedding;
pub mod error;
pub mod session;

pub use bootstrap::{open_session, open_store, open_store_with_gateway, session_scope};
pub use embedding::{GeminiEmbedder, HashingEmbedder, gateway_from_config};
pub use error::JarvisCoreError;
pub use session::ConversationSession;
