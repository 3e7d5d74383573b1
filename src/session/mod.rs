//! Per-visit session storage
//!
//! The host application owns the actual session backend (cookie store,
//! cache, database). This module defines the narrow interface the visit
//! coordinator needs and ships an in-memory implementation.
//!
//! # Example
//!
//! ```rust
//! use splitdb::session::{ConfirmationStatus, MemorySessionStore, SessionStore, VisitUpdate};
//!
//! # async fn example() -> splitdb::Result<()> {
//! let store = MemorySessionStore::new();
//!
//! let update = VisitUpdate {
//!     status: ConfirmationStatus::Human,
//!     ..VisitUpdate::default()
//! };
//! let state = store.update("visit-1", &update).await?;
//! assert!(state.status.is_human());
//!
//! store.delete("visit-1").await?;
//! assert!(store.load("visit-1").await?.is_none());
//! # Ok(())
//! # }
//! ```

mod memory;
mod state;

pub use memory::MemorySessionStore;
pub use state::{ConfirmationStatus, QueuedAction, VisitState, VisitUpdate};

use crate::Result;
use std::future::Future;

/// Key-value store for per-visit state.
///
/// Keys are opaque visit identifiers chosen by the host (typically a session cookie).
pub trait SessionStore: Send + Sync {
    /// Load a visit's state.
    ///
    /// Returns `None` for a brand-new visit.
    fn load(&self, key: &str) -> impl Future<Output = Result<Option<VisitState>>> + Send;

    /// Replace a visit's state.
    fn save(&self, key: &str, state: &VisitState) -> impl Future<Output = Result<()>> + Send;

    /// Atomically apply a finished visit's changes and return the new state.
    ///
    /// Implementations must not lose actions appended by a concurrent update
    /// to the same key.
    fn update(
        &self,
        key: &str,
        update: &VisitUpdate,
    ) -> impl Future<Output = Result<VisitState>> + Send;

    /// Delete a visit's state.
    ///
    /// No-op if the key doesn't exist.
    fn delete(&self, key: &str) -> impl Future<Output = Result<()>> + Send;
}
