//! Short-term, session-local turn buffer with promotion into the store.

use crate::error::MemoryError;
use crate::model::{Role, Scope};
use crate::store::ScopedMemoryStore;
use log::{debug, info, warn};
use std::collections::VecDeque;
use std::fmt;

/// Speaker of a buffered turn.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TurnRole {
    Human,
    Ai,
}

impl TurnRole {
    pub fn as_str(&self) -> &'static str {
        match self {
            TurnRole::Human => "human",
            TurnRole::Ai => "ai",
        }
    }
}

impl From<TurnRole> for Role {
    fn from(role: TurnRole) -> Self {
        match role {
            TurnRole::Human => Role::Human,
            TurnRole::Ai => Role::Ai,
        }
    }
}

impl fmt::Display for TurnRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One buffered turn.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Turn {
    pub role: TurnRole,
    pub text: String,
}

/// Promotion stopped at a turn the store refused.
///
/// Turns before `failed` are durable; `failed` and everything after it are
/// still in the buffer.
#[derive(Debug, thiserror::Error)]
#[error("promotion stopped after {promoted} turn(s) at {} turn: {source}", .failed.role)]
pub struct PromotionError {
    /// Turns appended before the failure.
    pub promoted: usize,
    /// The turn whose append failed.
    pub failed: Turn,
    /// Turns left in the buffer, `failed` included.
    pub remaining: usize,
    /// Underlying store error.
    #[source]
    pub source: MemoryError,
}

/// Ordered in-memory turns for the active session.
#[derive(Debug, Clone, Default)]
pub struct ShortTermBuffer {
    turns: VecDeque<Turn>,
}

impl ShortTermBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a turn at the end of the buffer.
    pub fn append_turn(&mut self, role: TurnRole, text: impl Into<String>) {
        self.turns.push_back(Turn {
            role,
            text: text.into(),
        });
    }

    /// Buffered turns in arrival order.
    pub fn turns(&self) -> impl Iterator<Item = &Turn> {
        self.turns.iter()
    }

    pub fn len(&self) -> usize {
        self.turns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.turns.is_empty()
    }

    /// Turns in arrival order, one `role: text` per line.
    pub fn render(&self) -> String {
        self.turns
            .iter()
            .map(|turn| format!("{}: {}", turn.role, turn.text))
            .collect::<Vec<_>>()
            .join("\n")
    }

    /// Drop every buffered turn.
    pub fn clear(&mut self) {
        debug!("short-term buffer cleared (turns={})", self.turns.len());
        self.turns.clear();
    }

    /// Append every buffered turn to `store` under `scope`, oldest first.
    ///
    /// Each turn leaves the buffer only once its append succeeded, so on
    /// error the buffer holds exactly the turns that were not promoted.
    pub async fn promote(
        &mut self,
        store: &ScopedMemoryStore,
        scope: &Scope,
    ) -> Result<usize, PromotionError> {
        let mut promoted = 0;
        while let Some(turn) = self.turns.front() {
            if let Err(source) = store.append(&turn.text, scope, turn.role.into()).await {
                warn!(
                    "promotion stopped ({}, promoted={}, remaining={}, err={})",
                    scope,
                    promoted,
                    self.turns.len(),
                    source
                );
                return Err(PromotionError {
                    promoted,
                    failed: turn.clone(),
                    remaining: self.turns.len(),
                    source,
                });
            }
            self.turns.pop_front();
            promoted += 1;
        }
        info!("short-term buffer promoted ({}, turns={})", scope, promoted);
        Ok(promoted)
    }
}
