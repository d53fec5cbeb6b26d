//! Public surface for Jarvis.
//!
//! This crate re-exports the memory, config and session crates, provides a
//! small logging initialization helper and the chat command parser used by
//! the `jarvis` binary.

pub mod commands;

/// Re-export for convenience.
pub use jarvis_rs_config as config;
/// Re-export for convenience.
pub use jarvis_rs_core as core;
/// Re-export for convenience.
pub use jarvis_rs_memory as memory;

#[inline]
/// Initialize logging using env_logger if the "logging" feature is enabled.
///
/// `RUST_LOG` controls verbosity. Safe to call more than once.
pub fn init_logging() {
    #[cfg(feature = "logging")]
    {
        let _ = env_logger::builder()
            .format_timestamp_millis()
            .parse_default_env()
            .try_init();
    }
}
