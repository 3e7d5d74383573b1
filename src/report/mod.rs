//! Reporting surface: funnel reports and read-only administrative queries
//!
//! Nothing here writes experiment data. Report definitions are the only
//! rows this module adds, and they never touch enrollments or goal records.
//!
//! ```rust
//! use splitdb::model::RequestContext;
//! use splitdb::SplitStore;
//!
//! # fn main() -> splitdb::Result<()> {
//! let store = SplitStore::new();
//! store.declare("headline", ["plain", "bold"])?;
//! let subject = store.create_subject().id();
//! store.enroll_as_variant("headline", subject, "bold")?;
//! store.record(subject, "signup", RequestContext::empty(), None)?;
//!
//! let report = store.add_report("headline", "Signup funnel", "signup")?;
//! let funnel = store.generate(&report)?;
//! assert_eq!(funnel.rows().len(), 2);
//! assert_eq!(funnel.rows()[1].cell("bold").map(|c| c.count()), Some(1));
//! # Ok(())
//! # }
//! ```

mod funnel;

pub use funnel::{FunnelReport, FunnelRow, StageCell};

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::model::{
    parse_funnel, Enrollment, Experiment, ExperimentReport, GoalRecord, ReportId,
};
use crate::store::SplitStore;
use crate::{Error, Result};

/// An experiment together with its report definitions.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ExperimentOverview {
    /// The experiment.
    pub experiment: Experiment,
    /// Reports defined over it, ordered by ID.
    pub reports: Vec<ExperimentReport>,
}

/// One entry of an activity log.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Activity {
    /// A subject was enrolled in the variant.
    Enrolled(Enrollment),
    /// A subject completed the goal.
    Converted(GoalRecord),
}

impl Activity {
    /// When the activity happened.
    #[must_use]
    pub const fn created_at(&self) -> DateTime<Utc> {
        match self {
            Self::Enrolled(e) => e.created_at(),
            Self::Converted(r) => r.created_at(),
        }
    }
}

impl SplitStore {
    /// Define a funnel report over an experiment.
    ///
    /// `funnel` is one goal name per line; blank lines are ignored.
    ///
    /// # Errors
    ///
    /// Returns [`Error::ExperimentNotFound`] if the experiment was never declared.
    pub fn add_report(&self, experiment: &str, title: &str, funnel: &str) -> Result<ExperimentReport> {
        let mut tables = self.write();
        if !tables.experiments.contains_key(experiment) {
            return Err(Error::ExperimentNotFound(experiment.to_string()));
        }
        let id = tables.allocate_report();
        let report = ExperimentReport::new(id, experiment, title, parse_funnel(funnel));
        tables.reports.insert(id, report.clone());
        Ok(report)
    }

    /// Get a report definition by ID.
    ///
    /// # Errors
    ///
    /// Returns [`Error::ReportNotFound`] if no such report exists.
    pub fn report(&self, id: ReportId) -> Result<ExperimentReport> {
        self.read()
            .reports
            .get(&id)
            .cloned()
            .ok_or(Error::ReportNotFound(id))
    }

    /// Report definitions for one experiment.
    #[must_use]
    pub fn reports_for(&self, experiment: &str) -> Vec<ExperimentReport> {
        self.read()
            .reports
            .values()
            .filter(|r| r.experiment() == experiment)
            .cloned()
            .collect()
    }

    /// Every experiment with its reports, ordered by experiment name.
    #[must_use]
    pub fn overview(&self) -> Vec<ExperimentOverview> {
        let tables = self.read();
        tables
            .experiments
            .values()
            .map(|experiment| ExperimentOverview {
                experiment: experiment.clone(),
                reports: tables
                    .reports
                    .values()
                    .filter(|r| r.experiment() == experiment.name())
                    .cloned()
                    .collect(),
            })
            .collect()
    }

    /// Chronological log of one variant's converting subjects for a goal.
    ///
    /// Takes up to `limit` enrollments in `variant` whose subject completed
    /// `goal`, adds those subjects' records for `goal`, and sorts everything
    /// by creation time.
    ///
    /// # Errors
    ///
    /// Returns [`Error::ExperimentNotFound`] or [`Error::GoalNotFound`].
    pub fn activity_log(
        &self,
        experiment: &str,
        variant: &str,
        goal: &str,
        limit: usize,
    ) -> Result<Vec<Activity>> {
        let tables = self.read();
        if !tables.experiments.contains_key(experiment) {
            return Err(Error::ExperimentNotFound(experiment.to_string()));
        }
        if !tables.goals.contains_key(goal) {
            return Err(Error::GoalNotFound(goal.to_string()));
        }

        let mut activities: Vec<Activity> = Vec::new();
        let converted = tables
            .enrollments
            .values()
            .filter(|e| e.experiment() == experiment && e.variant() == variant)
            .filter_map(|e| {
                tables
                    .goal_records
                    .get(&(e.subject(), goal.to_string()))
                    .map(|record| (e, record))
            })
            .take(limit);
        for (enrollment, record) in converted {
            activities.push(Activity::Enrolled(enrollment.clone()));
            activities.push(Activity::Converted(record.clone()));
        }

        activities.sort_by_key(Activity::created_at);
        Ok(activities)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::RequestContext;

    #[test]
    fn test_add_report_requires_experiment() {
        let store = SplitStore::new();
        assert!(matches!(
            store.add_report("nope", "t", "a"),
            Err(Error::ExperimentNotFound(_))
        ));
    }

    #[test]
    fn test_report_lookup() {
        let store = SplitStore::new();
        store.declare("exp", ["a"]).unwrap();
        let report = store.add_report("exp", "Main", "viewed\npurchased\n").unwrap();

        assert_eq!(store.report(report.id()).unwrap(), report);
        assert_eq!(report.funnel(), ["viewed", "purchased"]);
        assert!(matches!(store.report(999), Err(Error::ReportNotFound(999))));
    }

    #[test]
    fn test_overview_groups_reports() {
        let store = SplitStore::new();
        store.declare("a", ["x"]).unwrap();
        store.declare("b", ["y"]).unwrap();
        store.add_report("a", "first", "g").unwrap();
        store.add_report("a", "second", "g").unwrap();

        let overview = store.overview();
        assert_eq!(overview.len(), 2);
        assert_eq!(overview[0].experiment.name(), "a");
        assert_eq!(overview[0].reports.len(), 2);
        assert!(overview[1].reports.is_empty());
        assert_eq!(store.reports_for("a").len(), 2);
    }

    #[test]
    fn test_activity_log() {
        let store = SplitStore::new();
        store.declare("exp", ["a", "b"]).unwrap();
        let converted = store.create_subject().id();
        let idle = store.create_subject().id();
        let other = store.create_subject().id();
        store.enroll_as_variant("exp", converted, "a").unwrap();
        store.enroll_as_variant("exp", idle, "a").unwrap();
        store.enroll_as_variant("exp", other, "b").unwrap();
        store.record(converted, "buy", RequestContext::empty(), None).unwrap();
        store.record(other, "buy", RequestContext::empty(), None).unwrap();

        let log = store.activity_log("exp", "a", "buy", 1000).unwrap();

        assert_eq!(log.len(), 2);
        assert!(matches!(&log[0], Activity::Enrolled(e) if e.subject() == converted));
        assert!(matches!(&log[1], Activity::Converted(r) if r.subject() == converted));
        assert!(log.windows(2).all(|w| w[0].created_at() <= w[1].created_at()));
    }

    #[test]
    fn test_activity_log_limit_and_missing_goal() {
        let store = SplitStore::new();
        store.declare("exp", ["a"]).unwrap();
        for _ in 0..3 {
            let s = store.create_subject().id();
            store.enroll_as_variant("exp", s, "a").unwrap();
            store.record(s, "buy", RequestContext::empty(), None).unwrap();
        }

        assert_eq!(store.activity_log("exp", "a", "buy", 2).unwrap().len(), 4);
        assert!(matches!(
            store.activity_log("exp", "a", "never", 10),
            Err(Error::GoalNotFound(_))
        ));
    }
}
