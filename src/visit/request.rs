//! Ambient request metadata handed to the coordinator

use crate::model::{IdentityId, RequestContext};

/// What the host knows about the request that starts a visit.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct VisitRequest {
    host: String,
    identity: Option<IdentityId>,
    referrer: Option<String>,
    remote_addr: Option<String>,
    path: Option<String>,
}

impl VisitRequest {
    /// Request to this site's `host` (e.g. `example.com`).
    #[must_use]
    pub fn new(host: impl Into<String>) -> Self {
        Self {
            host: host.into(),
            ..Self::default()
        }
    }

    /// Authenticated identity at the start of the visit.
    #[must_use]
    pub fn identity(mut self, identity: IdentityId) -> Self {
        self.identity = Some(identity);
        self
    }

    /// Referrer header.
    #[must_use]
    pub fn referrer(mut self, referrer: impl Into<String>) -> Self {
        self.referrer = Some(referrer.into());
        self
    }

    /// Client network address.
    #[must_use]
    pub fn remote_addr(mut self, addr: impl Into<String>) -> Self {
        self.remote_addr = Some(addr.into());
        self
    }

    /// Request path.
    #[must_use]
    pub fn path(mut self, path: impl Into<String>) -> Self {
        self.path = Some(path.into());
        self
    }

    /// Identity the visit started with.
    #[must_use]
    pub const fn initial_identity(&self) -> Option<&IdentityId> {
        self.identity.as_ref()
    }

    /// Snapshot stored on goal records.
    #[must_use]
    pub fn context(&self) -> RequestContext {
        RequestContext::new(
            self.referrer.as_deref(),
            self.remote_addr.as_deref(),
            self.path.as_deref(),
        )
    }

    /// Heuristic for a first contact: anonymous, and arriving with no
    /// referrer or from another site.
    #[must_use]
    pub fn is_first_contact(&self) -> bool {
        if self.identity.is_some() {
            return false;
        }

        let referrer = self.referrer.as_deref().unwrap_or_default().to_lowercase();
        if referrer.is_empty() {
            return true;
        }

        let referrer = referrer
            .strip_prefix("http://")
            .or_else(|| referrer.strip_prefix("https://"))
            .unwrap_or(&referrer);
        !referrer.starts_with(&self.host.to_lowercase())
    }
}
