//! Subject Identity Store - subjects, identity links and history merge

use tracing::{info, warn};

use super::{SplitStore, Tables};
use crate::model::{GoalRecord, IdentityId, RequestContext, Subject, SubjectId};
use crate::{Error, Result};

/// What a merge moved and what it discarded.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MergeSummary {
    /// Goal records transferred to the target.
    pub goals_moved: usize,
    /// Source goal records dropped because the target already had that goal.
    pub goals_discarded: usize,
    /// Enrollments transferred to the target.
    pub enrollments_moved: usize,
    /// Source enrollments dropped because the target was already enrolled.
    pub enrollments_discarded: usize,
}

impl Tables {
    fn create_subject(&mut self) -> Subject {
        let id = self.allocate_subject();
        let subject = Subject::new(id);
        self.subjects.insert(id, subject.clone());
        info!(subject = %id, "created subject");
        subject
    }

    /// Move `source`'s history into `target`; the target's rows win on conflict.
    ///
    /// Both subjects must exist and differ. Nothing here can fail, so the
    /// caller's write lock makes the whole transfer atomic.
    fn merge_into(&mut self, source: SubjectId, target: SubjectId) -> MergeSummary {
        let mut summary = MergeSummary::default();

        for key in Self::keys_of(&self.goal_records, source) {
            let Some(mut record) = self.goal_records.remove(&key) else {
                continue;
            };
            let target_key = (target, key.1);
            if self.goal_records.contains_key(&target_key) {
                summary.goals_discarded += 1;
            } else {
                record.reassign(target);
                self.goal_records.insert(target_key, record);
                summary.goals_moved += 1;
            }
        }

        for key in Self::keys_of(&self.enrollments, source) {
            let Some(mut enrollment) = self.enrollments.remove(&key) else {
                continue;
            };
            let target_key = (target, key.1);
            if self.enrollments.contains_key(&target_key) {
                summary.enrollments_discarded += 1;
            } else {
                enrollment.reassign(target);
                self.enrollments.insert(target_key, enrollment);
                summary.enrollments_moved += 1;
            }
        }

        if let Some(removed) = self.subjects.remove(&source) {
            if let Some(identity) = removed.identity() {
                self.identities.remove(identity);
            }
        }

        summary
    }

    fn link(&mut self, subject: SubjectId, identity: &IdentityId) -> Result<()> {
        let record = self
            .subjects
            .get_mut(&subject)
            .ok_or(Error::SubjectNotFound(subject.get()))?;
        record.link(identity.clone());
        self.identities.insert(identity.clone(), subject);
        Ok(())
    }
}

impl SplitStore {
    /// Create and persist a new anonymous subject.
    #[must_use]
    pub fn create_subject(&self) -> Subject {
        self.write().create_subject()
    }

    /// Get a subject by ID.
    ///
    /// # Errors
    ///
    /// Returns [`Error::SubjectNotFound`] if it never existed or was merged away.
    pub fn subject(&self, id: SubjectId) -> Result<Subject> {
        self.read()
            .subjects
            .get(&id)
            .cloned()
            .ok_or(Error::SubjectNotFound(id.get()))
    }

    /// Whether a subject currently exists.
    #[must_use]
    pub fn subject_exists(&self, id: SubjectId) -> bool {
        self.read().subjects.contains_key(&id)
    }

    /// The subject linked to an authenticated identity, if any.
    #[must_use]
    pub fn subject_for_identity(&self, identity: &IdentityId) -> Option<Subject> {
        let tables = self.read();
        tables
            .identities
            .get(identity)
            .and_then(|id| tables.subjects.get(id))
            .cloned()
    }

    /// Lookup-or-create the subject linked to an identity.
    ///
    /// # Errors
    ///
    /// Returns [`Error::SubjectNotFound`] only if the new subject vanished mid-link.
    pub fn subject_for_identity_or_create(&self, identity: &IdentityId) -> Result<Subject> {
        let mut tables = self.write();
        if let Some(existing) = tables
            .identities
            .get(identity)
            .and_then(|id| tables.subjects.get(id))
        {
            return Ok(existing.clone());
        }
        let id = tables.create_subject().id();
        tables.link(id, identity)?;
        tables
            .subjects
            .get(&id)
            .cloned()
            .ok_or(Error::SubjectNotFound(id.get()))
    }

    /// Merge `source`'s goal records and enrollments into `target`, then delete `source`.
    ///
    /// Where both subjects hold a record for the same goal, or an enrollment
    /// in the same experiment, the target's row is kept and the source's is
    /// discarded. Merging a source that no longer exists is a no-op, so a
    /// repeated merge is harmless.
    ///
    /// # Errors
    ///
    /// Returns [`Error::SubjectNotFound`] if `target` does not exist while
    /// `source` still does.
    pub fn merge(&self, source: SubjectId, target: SubjectId) -> Result<MergeSummary> {
        let mut tables = self.write();
        if source == target || !tables.subjects.contains_key(&source) {
            return Ok(MergeSummary::default());
        }
        if !tables.subjects.contains_key(&target) {
            return Err(Error::SubjectNotFound(target.get()));
        }
        let summary = tables.merge_into(source, target);
        info!(%source, %target, ?summary, "merged subjects");
        Ok(summary)
    }

    /// Bind an authenticated identity to a visit's subject, atomically.
    ///
    /// - identity already linked to another subject: `current` is merged into
    ///   it and the linked subject is returned
    /// - identity already linked and no `current`: the linked subject is returned
    /// - identity not linked: `current` (or a fresh subject when `current` is
    ///   absent, gone, or linked elsewhere) is promoted and returned
    ///
    /// # Errors
    ///
    /// Returns [`Error::StorageError`] only if the table indexes disagree.
    pub fn adopt_identity(
        &self,
        current: Option<SubjectId>,
        identity: &IdentityId,
    ) -> Result<SubjectId> {
        let mut guard = self.write();
        let tables = &mut *guard;

        let current = current.filter(|id| tables.subjects.contains_key(id));

        if let Some(existing) = tables.identities.get(identity).copied() {
            if !tables.subjects.contains_key(&existing) {
                return Err(Error::StorageError(format!(
                    "identity '{identity}' points at missing subject {existing}"
                )));
            }
            if let Some(source) = current.filter(|id| *id != existing) {
                let summary = tables.merge_into(source, existing);
                info!(%source, target = %existing, %identity, ?summary, "merged visit subject into registered subject");
            }
            return Ok(existing);
        }

        let promotable = current.filter(|id| {
            tables
                .subjects
                .get(id)
                .is_some_and(Subject::is_anonymous)
        });
        let subject = match promotable {
            Some(id) => id,
            None => {
                if current.is_some() {
                    warn!(%identity, "visit subject already registered elsewhere; starting a new subject");
                }
                tables.create_subject().id()
            }
        };
        tables.link(subject, identity)?;
        info!(%subject, %identity, "promoted subject to registered");
        Ok(subject)
    }

    /// Record a goal for an authenticated identity outside any visit.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidInput`] for an empty goal name.
    pub fn record_identity_goal(&self, identity: &IdentityId, goal_name: &str) -> Result<GoalRecord> {
        let subject = self.subject_for_identity_or_create(identity)?;
        self.record(subject.id(), goal_name, RequestContext::empty(), None)
    }
}
