//! Experiment Report - stored funnel definition for an experiment

use serde::{Deserialize, Serialize};

/// Report identifier, allocated by the store.
pub type ReportId = u64;

/// A named funnel over one experiment's goals.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ExperimentReport {
    id: ReportId,
    experiment: String,
    title: String,
    funnel: Vec<String>,
}

impl ExperimentReport {
    /// Create a report definition.
    #[must_use]
    pub fn new(
        id: ReportId,
        experiment: impl Into<String>,
        title: impl Into<String>,
        funnel: Vec<String>,
    ) -> Self {
        Self {
            id,
            experiment: experiment.into(),
            title: title.into(),
            funnel,
        }
    }

    /// Get the report ID.
    #[must_use]
    pub const fn id(&self) -> ReportId {
        self.id
    }

    /// Get the experiment this report analyses.
    #[must_use]
    pub fn experiment(&self) -> &str {
        &self.experiment
    }

    /// Get the report title.
    #[must_use]
    pub fn title(&self) -> &str {
        &self.title
    }

    /// Get the funnel goals, in order.
    #[must_use]
    pub fn funnel(&self) -> &[String] {
        &self.funnel
    }
}

/// Parse a funnel written one goal per line; lines are trimmed and blanks dropped.
#[must_use]
pub fn parse_funnel(text: &str) -> Vec<String> {
    text.lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .map(str::to_string)
        .collect()
}
