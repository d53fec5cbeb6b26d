//! Build stores and sessions from a loaded `JarvisConfig`.

use crate::embedding::gateway_from_config;
use crate::error::JarvisCoreError;
use crate::session::ConversationSession;
use jarvis_rs_config::{JarvisConfig, SessionConfig};
use jarvis_rs_memory::{EmbeddingGateway, LoadStatus, Scope, ScopedMemoryStore, StoreOptions};
use log::warn;
use std::path::Path;
use std::sync::Arc;
use uuid::Uuid;

/// Scope described by `config`, generating a session id when none is pinned.
pub fn session_scope(config: &SessionConfig) -> Result<Scope, JarvisCoreError> {
    let session_id = config
        .session_id
        .clone()
        .unwrap_or_else(|| Uuid::new_v4().to_string());
    Ok(Scope::new(
        config.user_id.clone(),
        session_id,
        config.project_id.clone(),
    )?)
}

/// Open the configured store with the configured gateway.
///
/// A relative `memory.path` resolves against `base_dir`.
pub fn open_store(
    config: &JarvisConfig,
    base_dir: &Path,
) -> Result<Arc<ScopedMemoryStore>, JarvisCoreError> {
    let gateway = gateway_from_config(&config.embedding, config.memory.dimension)?;
    open_store_with_gateway(config, base_dir, gateway)
}

/// Open the configured store with an explicit gateway.
pub fn open_store_with_gateway(
    config: &JarvisConfig,
    base_dir: &Path,
    gateway: Arc<dyn EmbeddingGateway>,
) -> Result<Arc<ScopedMemoryStore>, JarvisCoreError> {
    let root = base_dir.join(&config.memory.path);
    let options = StoreOptions::new(config.memory.dimension)
        .with_over_fetch(config.memory.over_fetch)
        .with_embed_timeout(config.embedding.timeout());
    let store = ScopedMemoryStore::open(&root, gateway, options)?;
    if let LoadStatus::Recovered {
        reason,
        quarantined,
    } = store.load_status()
    {
        warn!(
            "memory store started empty after load failure (root={}, reason={}, quarantined={:?})",
            root.display(),
            reason,
            quarantined
        );
    }
    Ok(Arc::new(store))
}

/// Open the configured store and start a session on the configured scope.
pub fn open_session(
    config: &JarvisConfig,
    base_dir: &Path,
) -> Result<ConversationSession, JarvisCoreError> {
    let store = open_store(config, base_dir)?;
    Ok(ConversationSession::new(
        store,
        session_scope(&config.session)?,
        config.memory.recall_k,
    ))
}
