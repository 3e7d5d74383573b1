//! Goal Ledger - goal catalog and at-most-once goal records

use std::collections::btree_map::Entry;

use tracing::{debug, info};

use super::SplitStore;
use crate::model::{Goal, GoalRecord, RequestContext, SubjectId};
use crate::{Error, Result};

impl SplitStore {
    /// Lookup-or-create a goal by name.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidInput`] if `name` is empty.
    pub fn ensure_goal(&self, name: &str) -> Result<Goal> {
        if name.is_empty() {
            return Err(Error::InvalidInput("goal name must not be empty".into()));
        }
        let mut tables = self.write();
        Ok(tables
            .goals
            .entry(name.to_string())
            .or_insert_with(|| Goal::new(name))
            .clone())
    }

    /// Get a goal by name.
    ///
    /// # Errors
    ///
    /// Returns [`Error::GoalNotFound`] if no goal with that name was ever recorded.
    pub fn goal(&self, name: &str) -> Result<Goal> {
        self.read()
            .goals
            .get(name)
            .cloned()
            .ok_or_else(|| Error::GoalNotFound(name.to_string()))
    }

    /// Record that `subject` completed `goal_name`.
    ///
    /// The goal is created if absent. At most one record exists per
    /// (subject, goal): a repeat keeps the original record and context, and
    /// only fills `extra` if the stored record has none.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidInput`] for an empty goal name or
    /// [`Error::SubjectNotFound`] for an unknown subject.
    pub fn record(
        &self,
        subject: SubjectId,
        goal_name: &str,
        context: RequestContext,
        extra: Option<String>,
    ) -> Result<GoalRecord> {
        if goal_name.is_empty() {
            return Err(Error::InvalidInput("goal name must not be empty".into()));
        }

        let mut guard = self.write();
        let tables = &mut *guard;
        if !tables.subjects.contains_key(&subject) {
            return Err(Error::SubjectNotFound(subject.get()));
        }

        tables
            .goals
            .entry(goal_name.to_string())
            .or_insert_with(|| Goal::new(goal_name));

        match tables.goal_records.entry((subject, goal_name.to_string())) {
            Entry::Occupied(mut existing) => {
                if existing.get_mut().fill_extra(extra) {
                    debug!(goal = goal_name, %subject, "filled extra on existing goal record");
                }
                Ok(existing.get().clone())
            }
            Entry::Vacant(slot) => {
                info!(goal = goal_name, %subject, "goal recorded");
                Ok(slot
                    .insert(GoalRecord::new(subject, goal_name, context, extra))
                    .clone())
            }
        }
    }

    /// A subject's record for a goal, if any.
    #[must_use]
    pub fn goal_record(&self, subject: SubjectId, goal_name: &str) -> Option<GoalRecord> {
        self.read()
            .goal_records
            .get(&(subject, goal_name.to_string()))
            .cloned()
    }

    /// Goal records owned by a subject, ordered by goal name.
    #[must_use]
    pub fn goal_records_for(&self, subject: SubjectId) -> Vec<GoalRecord> {
        let tables = self.read();
        tables
            .goal_records
            .range((subject, String::new())..)
            .take_while(|((owner, _), _)| *owner == subject)
            .map(|(_, record)| record.clone())
            .collect()
    }

    /// Number of subjects that completed `goal_name`.
    #[must_use]
    pub fn goal_record_count(&self, goal_name: &str) -> usize {
        self.read()
            .goal_records
            .keys()
            .filter(|(_, goal)| goal == goal_name)
            .count()
    }
}
