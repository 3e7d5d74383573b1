//! Visit lifecycle
//!
//! ```text
//! begin_visit ──> Coordinator ──┬─ declare_and_enroll / log_goal
//!   (load state)                ├─ confirm_human
//!                               └─ finish_visit ──> VisitOutcome ──> SessionStore::update
//! ```
//!
//! The coordinator itself is synchronous and never touches the session
//! store; [`begin_visit`] and [`end_visit`] bind it to one.
//!
//! # Example
//!
//! ```rust
//! use splitdb::session::MemorySessionStore;
//! use splitdb::visit::{begin_visit, confirm_visit, end_visit, VisitRequest};
//! use splitdb::{SplitConfig, SplitStore};
//!
//! # async fn example() -> splitdb::Result<()> {
//! let store = SplitStore::new();
//! let sessions = MemorySessionStore::new();
//! let config = SplitConfig::default();
//!
//! let mut visit = begin_visit(&sessions, "cookie-1", &store, &config, VisitRequest::new("example.com")).await?;
//! let variant = visit.declare_and_enroll("signup_button", ["red", "blue"])?;
//! let outcome = end_visit(&sessions, "cookie-1", visit).await?;
//! assert!(outcome.inject_confirmation());
//!
//! // The injected trigger calls back:
//! confirm_visit(&sessions, "cookie-1", &store, &config, VisitRequest::new("example.com")).await?;
//! assert_eq!(store.enrollment_count("signup_button", &variant), 1);
//! # Ok(())
//! # }
//! ```

mod coordinator;
mod request;

pub use coordinator::{Coordinator, VisitOutcome};
pub use request::VisitRequest;

use tracing::{debug, info, warn};

use crate::config::SplitConfig;
use crate::session::{SessionStore, VisitState, VisitUpdate};
use crate::store::SplitStore;
use crate::{Error, Result};

/// Load a visit's persisted state and start its coordinator.
///
/// # Errors
///
/// Returns [`crate::Error::CorruptVisitState`] for an undecodable record, or
/// propagates store errors from executing carried-over actions.
pub async fn begin_visit<'a, S: SessionStore>(
    sessions: &S,
    key: &str,
    store: &'a SplitStore,
    config: &SplitConfig,
    request: VisitRequest,
) -> Result<Coordinator<'a>> {
    let persisted = sessions.load(key).await?;
    debug!(visit = key, resumed = persisted.is_some(), "visit started");
    Coordinator::new(store, config, persisted, request)
}

/// Finish a visit and persist its update.
///
/// If a concurrent visit on the same key already bound a different subject,
/// this visit's subject is merged into that one so the key keeps a single
/// history.
///
/// # Errors
///
/// Propagates errors from [`Coordinator::finish_visit`] and from the session
/// store. When a queued action fails, the partial update is persisted first
/// and the action's own error is returned.
pub async fn end_visit<S: SessionStore>(
    sessions: &S,
    key: &str,
    coordinator: Coordinator<'_>,
) -> Result<VisitOutcome> {
    let store = coordinator.store();
    let outcome = match coordinator.finish_visit() {
        Ok(outcome) => outcome,
        Err(Error::VisitInterrupted { source, update }) => {
            let state = sessions.update(key, &update).await?;
            reconcile_subject(store, &update, &state)?;
            warn!(visit = key, kept = state.queue.len(), "visit interrupted; unexecuted actions kept");
            return Err(*source);
        }
        Err(err) => return Err(err),
    };

    let state = sessions.update(key, outcome.update()).await?;
    reconcile_subject(store, outcome.update(), &state)?;
    debug!(visit = key, status = ?state.status, queued = state.queue.len(), "visit finished");
    Ok(outcome)
}

/// Merge a subject that lost the race for a session key into the winner.
fn reconcile_subject(store: &SplitStore, update: &VisitUpdate, state: &VisitState) -> Result<()> {
    let (Some(ours), Some(kept)) = (update.subject, state.subject) else {
        return Ok(());
    };
    if ours == kept {
        return Ok(());
    }
    if !store.subject_exists(kept) {
        warn!(%kept, %ours, "session subject no longer exists; leaving visit subject unmerged");
        return Ok(());
    }
    let summary = store.merge(ours, kept)?;
    info!(source = %ours, target = %kept, ?summary, "merged concurrent visit subject");
    Ok(())
}

/// Handle the confirmation endpoint: a whole visit that only confirms the visitor.
///
/// # Errors
///
/// Propagates errors from loading, draining the queue, or persisting. A
/// failed drain still persists what ran.
pub async fn confirm_visit<S: SessionStore>(
    sessions: &S,
    key: &str,
    store: &SplitStore,
    config: &SplitConfig,
    request: VisitRequest,
) -> Result<VisitOutcome> {
    let mut coordinator = begin_visit(sessions, key, store, config, request).await?;
    let confirmed = coordinator.confirm_human();
    let outcome = end_visit(sessions, key, coordinator).await;
    confirmed?;
    outcome
}
