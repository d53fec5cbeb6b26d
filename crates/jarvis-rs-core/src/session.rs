//! Caller-facing conversation session.
//!
//! A session holds the active scope and the short-term buffer, and routes
//! every long-term read and write through the shared memory store with that
//! scope passed explicitly.

use crate::error::JarvisCoreError;
use chrono::NaiveDate;
use jarvis_rs_memory::{
    FailureKind, Record, RecordId, Role, Scope, ScopeFilter, ScopedMemoryStore, ShortTermBuffer,
    TurnRole, render_history,
};
use log::{debug, info};
use std::sync::Arc;

/// Active conversation bound to one scope at a time.
pub struct ConversationSession {
    store: Arc<ScopedMemoryStore>,
    scope: Scope,
    buffer: ShortTermBuffer,
    recall_k: usize,
}

impl ConversationSession {
    /// Start a session on `scope` returning up to `recall_k` records per recall.
    pub fn new(store: Arc<ScopedMemoryStore>, scope: Scope, recall_k: usize) -> Self {
        info!("conversation session started ({})", scope);
        Self {
            store,
            scope,
            buffer: ShortTermBuffer::new(),
            recall_k: recall_k.max(1),
        }
    }

    pub fn scope(&self) -> &Scope {
        &self.scope
    }

    pub fn store(&self) -> &Arc<ScopedMemoryStore> {
        &self.store
    }

    pub fn recall_k(&self) -> usize {
        self.recall_k
    }

    /// Switch to `project_id`, keeping user and session.
    ///
    /// Changing project drops the short-term buffer so turns from one project
    /// never reach another. Returns whether the project changed.
    pub fn set_scope(&mut self, project_id: &str) -> Result<bool, JarvisCoreError> {
        if self.scope.project_id == project_id {
            return Ok(false);
        }
        let scope = self.scope.with_project(project_id)?;
        info!(
            "session project changed (from={}, to={}, dropped_turns={})",
            self.scope.project_id,
            scope.project_id,
            self.buffer.len()
        );
        self.buffer.clear();
        self.scope = scope;
        Ok(true)
    }

    /// Buffer a turn without touching long-term memory.
    pub fn remember_turn(&mut self, role: TurnRole, text: impl Into<String>) {
        self.buffer.append_turn(role, text);
    }

    pub fn buffer(&self) -> &ShortTermBuffer {
        &self.buffer
    }

    /// Buffered turns as `role: text` lines.
    pub fn render_buffer(&self) -> String {
        self.buffer.render()
    }

    pub fn clear_buffer(&mut self) {
        self.buffer.clear();
    }

    /// Move every buffered turn into long-term memory under the active scope.
    pub async fn promote(&mut self) -> Result<usize, JarvisCoreError> {
        Ok(self.buffer.promote(&self.store, &self.scope).await?)
    }

    /// Write one record under the active scope.
    pub async fn remember(&self, text: &str, role: Role) -> Result<RecordId, JarvisCoreError> {
        Ok(self.store.append(text, &self.scope, role).await?)
    }

    /// Records relevant to `query` under `filter`, newest first.
    pub async fn recall(
        &self,
        query: &str,
        filter: &ScopeFilter,
        limit: usize,
    ) -> Result<Vec<Record>, JarvisCoreError> {
        Ok(self.store.query(query, filter, limit).await?)
    }

    /// Rendered history for the current user and project, across sessions.
    pub async fn project_history(&self, query: &str) -> Result<String, JarvisCoreError> {
        let filter = ScopeFilter::new()
            .user(self.scope.user_id.clone())
            .project(self.scope.project_id.clone());
        self.rendered(query, &filter).await
    }

    /// Rendered history for the current user and session, across projects.
    pub async fn session_history(&self, query: &str) -> Result<String, JarvisCoreError> {
        let filter = ScopeFilter::new()
            .user(self.scope.user_id.clone())
            .session(self.scope.session_id.clone());
        self.rendered(query, &filter).await
    }

    /// Rendered history for the current user on one UTC day.
    pub async fn day_history(&self, query: &str, day: NaiveDate) -> Result<String, JarvisCoreError> {
        let filter = ScopeFilter::new()
            .user(self.scope.user_id.clone())
            .on_day(day);
        self.rendered(query, &filter).await
    }

    /// Persist a completed human/ai exchange.
    pub async fn record_exchange(
        &self,
        human: &str,
        ai: &str,
    ) -> Result<(RecordId, RecordId), JarvisCoreError> {
        let human_id = self.remember(human, Role::Human).await?;
        let ai_id = self.remember(ai, Role::Ai).await?;
        Ok((human_id, ai_id))
    }

    /// Persist an exchange that failed, tagging both sides with `kind`.
    ///
    /// `raw` is whatever the assistant produced, or the error description
    /// when it produced nothing usable.
    pub async fn record_failure(
        &self,
        kind: FailureKind,
        human: &str,
        raw: &str,
    ) -> Result<(RecordId, RecordId), JarvisCoreError> {
        debug!("recording failed exchange ({}, kind={:?})", self.scope, kind);
        let human_id = self.remember(human, Role::HumanError(kind)).await?;
        let ai_id = self.remember(raw, Role::AiError(kind)).await?;
        Ok((human_id, ai_id))
    }

    /// Newest `ai` record in the active scope.
    pub fn last_ai_response(&self) -> Option<Record> {
        self.store
            .latest(&ScopeFilter::for_scope(&self.scope).role(Role::Ai))
    }

    async fn rendered(&self, query: &str, filter: &ScopeFilter) -> Result<String, JarvisCoreError> {
        let records = self.recall(query, filter, self.recall_k).await?;
        Ok(render_history(&records))
    }
}
