//! Test helpers shared across Jarvis crates.

pub mod embedding;

pub use embedding::{FailingEmbedder, MisreportingEmbedder, StubEmbedder};
