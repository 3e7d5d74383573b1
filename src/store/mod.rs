//! Durable store for experiments, subjects, enrollments and goal records
//!
//! ## Design
//!
//! All tables live behind one `RwLock`. Every write operation takes the
//! write lock for its whole check-then-write, which gives the uniqueness
//! constraints their atomic "insert if absent, else return existing"
//! semantics: two racing first-enrollments for the same (subject, experiment)
//! serialize, and the loser reads back the winner's row. The identity merge
//! runs under the same lock and cannot be observed half-applied.
//!
//! Operations are grouped by component:
//!
//! - `registry` - experiments and enrollments
//! - `ledger` - goals and goal records
//! - `identity` - subjects, identity links and merge
//!
//! Reads for reporting live in [`crate::report`].

mod identity;
mod ledger;
mod registry;

pub use identity::MergeSummary;

use std::collections::{BTreeMap, HashMap};

use parking_lot::{RwLock, RwLockReadGuard, RwLockWriteGuard};

use crate::model::{
    Enrollment, Experiment, ExperimentReport, Goal, GoalRecord, IdentityId, ReportId, Subject,
    SubjectId,
};

/// Table set. Composite keys lead with the subject so per-subject rows are a range scan.
#[derive(Debug, Default)]
pub(crate) struct Tables {
    pub(crate) goals: HashMap<String, Goal>,
    pub(crate) subjects: BTreeMap<SubjectId, Subject>,
    pub(crate) identities: HashMap<IdentityId, SubjectId>,
    pub(crate) goal_records: BTreeMap<(SubjectId, String), GoalRecord>,
    pub(crate) experiments: BTreeMap<String, Experiment>,
    pub(crate) enrollments: BTreeMap<(SubjectId, String), Enrollment>,
    pub(crate) reports: BTreeMap<ReportId, ExperimentReport>,
    next_subject: u64,
    next_report: ReportId,
}

impl Tables {
    pub(crate) fn allocate_subject(&mut self) -> SubjectId {
        self.next_subject += 1;
        SubjectId::new(self.next_subject)
    }

    pub(crate) fn allocate_report(&mut self) -> ReportId {
        self.next_report += 1;
        self.next_report
    }

    /// Keys of one subject's rows in a `(SubjectId, String)`-keyed table.
    pub(crate) fn keys_of<V>(
        table: &BTreeMap<(SubjectId, String), V>,
        subject: SubjectId,
    ) -> Vec<(SubjectId, String)> {
        table
            .range((subject, String::new())..)
            .take_while(|((owner, _), _)| *owner == subject)
            .map(|(key, _)| key.clone())
            .collect()
    }
}

/// In-memory split-test store.
///
/// Thread-safe; share it behind an `Arc` across concurrent visits.
///
/// # Example
///
/// ```rust
/// use splitdb::model::RequestContext;
/// use splitdb::SplitStore;
///
/// # fn main() -> splitdb::Result<()> {
/// let store = SplitStore::new();
/// store.declare("signup_button", ["red", "blue"])?;
///
/// let subject = store.create_subject().id();
/// let first = store.get_variant_for("signup_button", subject)?;
/// let again = store.get_variant_for("signup_button", subject)?;
/// assert_eq!(first.variant(), again.variant());
///
/// store.record(subject, "purchase", RequestContext::empty(), None)?;
/// assert_eq!(store.goal_record_count("purchase"), 1);
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Default)]
pub struct SplitStore {
    tables: RwLock<Tables>,
}

impl SplitStore {
    /// Create an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub(crate) fn read(&self) -> RwLockReadGuard<'_, Tables> {
        self.tables.read()
    }

    pub(crate) fn write(&self) -> RwLockWriteGuard<'_, Tables> {
        self.tables.write()
    }

    /// Check if the store holds no rows at all.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        let tables = self.read();
        tables.goals.is_empty()
            && tables.subjects.is_empty()
            && tables.experiments.is_empty()
            && tables.reports.is_empty()
    }

    /// Number of subjects.
    #[must_use]
    pub fn subject_count(&self) -> usize {
        self.read().subjects.len()
    }

    /// Number of experiments.
    #[must_use]
    pub fn experiment_count(&self) -> usize {
        self.read().experiments.len()
    }

    /// Number of goals.
    #[must_use]
    pub fn goal_count(&self) -> usize {
        self.read().goals.len()
    }
}
