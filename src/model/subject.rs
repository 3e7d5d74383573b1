//! Subject - one experimental participant, anonymous or identified

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Opaque subject identifier, allocated by the store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SubjectId(u64);

impl SubjectId {
    /// Wrap a raw identifier.
    #[must_use]
    pub const fn new(raw: u64) -> Self {
        Self(raw)
    }

    /// Raw numeric value.
    #[must_use]
    pub const fn get(self) -> u64 {
        self.0
    }
}

impl fmt::Display for SubjectId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Stable identifier of an authenticated user, supplied by the host application.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct IdentityId(String);

impl IdentityId {
    /// Wrap an identifier from the authentication layer.
    #[must_use]
    pub fn new(raw: impl Into<String>) -> Self {
        Self(raw.into())
    }

    /// Borrow the raw identifier.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for IdentityId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Subject record.
///
/// Owns goal records and enrollments through the store's indexes. A subject
/// is linked to at most one identity, and each identity to at most one subject.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Subject {
    id: SubjectId,
    created_at: DateTime<Utc>,
    identity: Option<IdentityId>,
}

impl Subject {
    /// Create an anonymous subject with the current timestamp.
    #[must_use]
    pub fn new(id: SubjectId) -> Self {
        Self {
            id,
            created_at: Utc::now(),
            identity: None,
        }
    }

    /// Get the subject ID.
    #[must_use]
    pub const fn id(&self) -> SubjectId {
        self.id
    }

    /// Get the creation timestamp.
    #[must_use]
    pub const fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    /// Get the linked identity, if the subject has been promoted.
    #[must_use]
    pub const fn identity(&self) -> Option<&IdentityId> {
        self.identity.as_ref()
    }

    /// Whether the subject is still anonymous.
    #[must_use]
    pub const fn is_anonymous(&self) -> bool {
        self.identity.is_none()
    }

    pub(crate) fn link(&mut self, identity: IdentityId) {
        self.identity = Some(identity);
    }
}

impl fmt::Display for Subject {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let prefix = if self.is_anonymous() {
            "anonymous"
        } else {
            "registered"
        };
        write!(f, "{prefix} subject {}", self.id)
    }
}
