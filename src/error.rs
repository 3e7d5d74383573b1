//! Error types for splitdb
//!
//! Toyota Way: Clear error messages with actionable guidance (Respect for People)

use thiserror::Error;

use crate::session::VisitUpdate;

/// Result type alias
pub type Result<T> = std::result::Result<T, Error>;

/// splitdb error types
#[derive(Error, Debug)]
pub enum Error {
    /// Persistent identity requested before the visitor was confirmed human
    #[error("Visitor not confirmed as human\nCall confirm_human() (or authenticate) before requesting a subject")]
    NotConfirmed,

    /// Experiment lookup failed
    #[error("Experiment not found: {0}")]
    ExperimentNotFound(String),

    /// Goal lookup failed
    #[error("Goal not found: {0}")]
    GoalNotFound(String),

    /// Report lookup failed
    #[error("Report not found: #{0}")]
    ReportNotFound(u64),

    /// Subject lookup failed (deleted by a merge or never created)
    #[error("Subject not found: #{0}")]
    SubjectNotFound(u64),

    /// Random assignment requested on an experiment with no variants
    #[error("Experiment '{0}' has no variants\nDeclare it with at least one variant name")]
    EmptyVariants(String),

    /// Persisted visit state could not be decoded (includes unknown queued action kinds)
    #[error("Corrupt visit state: {0}\nQueued actions cannot be dropped silently; inspect the session record")]
    CorruptVisitState(String),

    /// A queued action failed while a visit was finishing.
    ///
    /// `update` still acknowledges what ran and keeps what did not; persist it.
    #[error("Visit interrupted while draining queued actions: {source}\nPersist the carried update so unexecuted actions are kept")]
    VisitInterrupted {
        /// The failure from the queued action.
        source: Box<Error>,
        /// Session changes covering the work done before the failure.
        update: Box<VisitUpdate>,
    },

    /// Invalid caller input
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Storage backend failure
    #[error("Storage error: {0}")]
    StorageError(String),

    /// JSON encoding error
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}
