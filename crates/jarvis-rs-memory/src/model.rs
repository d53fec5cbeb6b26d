//! Record model used by the store, the index and the record log.

use crate::error::MemoryError;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

/// Unique identifier for a persisted record.
pub type RecordId = Uuid;

/// The (user, session, project) triple partitioning records.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Scope {
    /// User identifier.
    pub user_id: String,
    /// Conversational session identifier.
    pub session_id: String,
    /// Project identifier.
    pub project_id: String,
}

impl Scope {
    /// Build a scope, rejecting empty components.
    pub fn new(
        user_id: impl Into<String>,
        session_id: impl Into<String>,
        project_id: impl Into<String>,
    ) -> Result<Self, MemoryError> {
        let scope = Self {
            user_id: user_id.into(),
            session_id: session_id.into(),
            project_id: project_id.into(),
        };
        scope.validate()?;
        Ok(scope)
    }

    /// Same user and session, different project.
    pub fn with_project(&self, project_id: impl Into<String>) -> Result<Self, MemoryError> {
        Self::new(self.user_id.clone(), self.session_id.clone(), project_id)
    }

    /// Check that every component is non-empty.
    pub fn validate(&self) -> Result<(), MemoryError> {
        for (name, value) in [
            ("user_id", &self.user_id),
            ("session_id", &self.session_id),
            ("project_id", &self.project_id),
        ] {
            if value.trim().is_empty() {
                return Err(MemoryError::InvalidScope(format!("{name} must not be empty")));
            }
        }
        Ok(())
    }
}

impl fmt::Display for Scope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "user={}, session={}, project={}",
            self.user_id, self.session_id, self.project_id
        )
    }
}

/// Kind of failure recorded under an error role.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FailureKind {
    /// Response arrived but had an unexpected structure.
    Unexpected,
    /// Response could not be parsed.
    Parser,
    /// The request raised before a response arrived.
    Exception,
}

/// Origin or kind of a record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum Role {
    /// User-authored message.
    Human,
    /// Assistant-authored message.
    Ai,
    /// System-generated message.
    System,
    /// The user request that led to a failed exchange.
    HumanError(FailureKind),
    /// The assistant output (or error payload) of a failed exchange.
    AiError(FailureKind),
}

impl Role {
    /// Return the role as its persisted label.
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Human => "human",
            Role::Ai => "ai",
            Role::System => "system",
            Role::HumanError(FailureKind::Unexpected) => "human_error_query",
            Role::HumanError(FailureKind::Parser) => "human_parser_error_query",
            Role::HumanError(FailureKind::Exception) => "human_exception_query",
            Role::AiError(FailureKind::Unexpected) => "ai_error_response",
            Role::AiError(FailureKind::Parser) => "ai_parser_error_response",
            Role::AiError(FailureKind::Exception) => "ai_exception_response",
        }
    }

    /// Whether the role marks one half of a failed exchange.
    pub fn is_error(&self) -> bool {
        matches!(self, Role::HumanError(_) | Role::AiError(_))
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Role {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let role = match value {
            "human" => Role::Human,
            "ai" => Role::Ai,
            "system" => Role::System,
            "human_error_query" => Role::HumanError(FailureKind::Unexpected),
            "human_parser_error_query" => Role::HumanError(FailureKind::Parser),
            "human_exception_query" => Role::HumanError(FailureKind::Exception),
            "ai_error_response" => Role::AiError(FailureKind::Unexpected),
            "ai_parser_error_response" => Role::AiError(FailureKind::Parser),
            "ai_exception_response" => Role::AiError(FailureKind::Exception),
            other => return Err(format!("unknown role: {other}")),
        };
        Ok(role)
    }
}

impl TryFrom<String> for Role {
    type Error = String;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<Role> for String {
    fn from(role: Role) -> Self {
        role.as_str().to_string()
    }
}

/// Persisted memory record. Never mutated once appended.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Record {
    /// Record identifier.
    pub id: RecordId,
    /// Literal message content.
    pub text: String,
    /// Embedding of `text`.
    pub vector: Vec<f32>,
    /// Owning scope.
    pub scope: Scope,
    /// Message origin.
    pub role: Role,
    /// Write time, assigned by the store.
    pub timestamp: DateTime<Utc>,
}
