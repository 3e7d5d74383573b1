//! Goal and GoalRecord - conversion markers

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::SubjectId;

/// Longest stored value for any captured request field.
pub const MAX_FIELD_LEN: usize = 255;

fn clip(value: impl AsRef<str>) -> String {
    value.as_ref().chars().take(MAX_FIELD_LEN).collect()
}

/// A named conversion goal.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Goal {
    name: String,
    created_at: DateTime<Utc>,
}

impl Goal {
    /// Create a goal with the current timestamp.
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            created_at: Utc::now(),
        }
    }

    /// Get the goal name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Get the creation timestamp.
    #[must_use]
    pub const fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }
}

/// Snapshot of the request that triggered a goal.
///
/// Every field is clipped to [`MAX_FIELD_LEN`] characters on construction.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct RequestContext {
    referrer: Option<String>,
    remote_addr: Option<String>,
    path: Option<String>,
}

impl RequestContext {
    /// Capture referrer, network address and path.
    #[must_use]
    pub fn new(
        referrer: Option<&str>,
        remote_addr: Option<&str>,
        path: Option<&str>,
    ) -> Self {
        Self {
            referrer: referrer.map(clip),
            remote_addr: remote_addr.map(clip),
            path: path.map(clip),
        }
    }

    /// Context with nothing captured (back-end goal logging).
    #[must_use]
    pub fn empty() -> Self {
        Self::default()
    }

    /// Referrer header, if any.
    #[must_use]
    pub fn referrer(&self) -> Option<&str> {
        self.referrer.as_deref()
    }

    /// Client network address, if any.
    #[must_use]
    pub fn remote_addr(&self) -> Option<&str> {
        self.remote_addr.as_deref()
    }

    /// Request path, if any.
    #[must_use]
    pub fn path(&self) -> Option<&str> {
        self.path.as_deref()
    }
}

/// One subject's completion of one goal. Unique per (subject, goal).
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct GoalRecord {
    goal: String,
    subject: SubjectId,
    created_at: DateTime<Utc>,
    context: RequestContext,
    extra: Option<String>,
}

impl GoalRecord {
    /// Create a record with the current timestamp.
    #[must_use]
    pub fn new(
        subject: SubjectId,
        goal: impl Into<String>,
        context: RequestContext,
        extra: Option<String>,
    ) -> Self {
        Self {
            goal: goal.into(),
            subject,
            created_at: Utc::now(),
            context,
            extra: extra.map(clip),
        }
    }

    /// Get the goal name.
    #[must_use]
    pub fn goal(&self) -> &str {
        &self.goal
    }

    /// Get the owning subject.
    #[must_use]
    pub const fn subject(&self) -> SubjectId {
        self.subject
    }

    /// Get the creation timestamp.
    #[must_use]
    pub const fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    /// Get the captured request context.
    #[must_use]
    pub const fn context(&self) -> &RequestContext {
        &self.context
    }

    /// Get the annotation, if any.
    #[must_use]
    pub fn extra(&self) -> Option<&str> {
        self.extra.as_deref()
    }

    /// Fill `extra` only when it is currently empty. Returns whether it changed.
    pub(crate) fn fill_extra(&mut self, extra: Option<String>) -> bool {
        match extra {
            Some(value) if !value.is_empty() && self.extra.as_deref().map_or(true, str::is_empty) => {
                self.extra = Some(clip(value));
                true
            }
            _ => false,
        }
    }

    pub(crate) fn reassign(&mut self, subject: SubjectId) {
        self.subject = subject;
    }
}
