//! Exact-match scope filtering over record metadata.

use crate::model::{Record, Role, Scope};
use chrono::NaiveDate;
use std::fmt;

/// Conjunction of equality constraints over record fields.
///
/// Unset fields are not checked. An empty filter matches every record.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ScopeFilter {
    /// Required user id.
    pub user_id: Option<String>,
    /// Required session id.
    pub session_id: Option<String>,
    /// Required project id.
    pub project_id: Option<String>,
    /// Required role.
    pub role: Option<Role>,
    /// Required UTC calendar day of the record timestamp.
    pub day: Option<NaiveDate>,
}

impl ScopeFilter {
    /// Filter with no constraints.
    pub fn new() -> Self {
        Self::default()
    }

    /// Constrain every component of `scope`.
    pub fn for_scope(scope: &Scope) -> Self {
        Self::new()
            .user(scope.user_id.clone())
            .session(scope.session_id.clone())
            .project(scope.project_id.clone())
    }

    pub fn user(mut self, user_id: impl Into<String>) -> Self {
        self.user_id = Some(user_id.into());
        self
    }

    pub fn session(mut self, session_id: impl Into<String>) -> Self {
        self.session_id = Some(session_id.into());
        self
    }

    pub fn project(mut self, project_id: impl Into<String>) -> Self {
        self.project_id = Some(project_id.into());
        self
    }

    pub fn role(mut self, role: Role) -> Self {
        self.role = Some(role);
        self
    }

    /// Match records written on `day` (UTC).
    pub fn on_day(mut self, day: NaiveDate) -> Self {
        self.day = Some(day);
        self
    }

    /// Whether the filter places no constraint at all.
    pub fn is_open(&self) -> bool {
        *self == Self::default()
    }

    /// AND of every set constraint.
    pub fn matches(&self, record: &Record) -> bool {
        matches_field(&self.user_id, &record.scope.user_id)
            && matches_field(&self.session_id, &record.scope.session_id)
            && matches_field(&self.project_id, &record.scope.project_id)
            && self.role.is_none_or(|role| role == record.role)
            && self
                .day
                .is_none_or(|day| day == record.timestamp.date_naive())
    }
}

impl fmt::Display for ScopeFilter {
    /// Set constraints as `key=value` pairs, or `any` for an open filter.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut parts = Vec::new();
        if let Some(user_id) = &self.user_id {
            parts.push(format!("user={user_id}"));
        }
        if let Some(session_id) = &self.session_id {
            parts.push(format!("session={session_id}"));
        }
        if let Some(project_id) = &self.project_id {
            parts.push(format!("project={project_id}"));
        }
        if let Some(role) = self.role {
            parts.push(format!("role={role}"));
        }
        if let Some(day) = self.day {
            parts.push(format!("day={day}"));
        }
        if parts.is_empty() {
            f.write_str("any")
        } else {
            f.write_str(&parts.join(", "))
        }
    }
}

fn matches_field(expected: &Option<String>, actual: &str) -> bool {
    expected.as_deref().is_none_or(|expected| expected == actual)
}
