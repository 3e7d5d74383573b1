//! Funnel Report Engine - stage-by-stage conversion per variant
//!
//! A funnel is an ordered list of goals. Stage 0 counts every subject
//! enrolled in each variant; stage *k* counts the enrolled subjects that
//! completed goal *k*, whatever they did upstream. The stage fraction is
//! `count / previous count` (0 when the previous count is 0) and the
//! cumulative fraction multiplies down the funnel. Counts only shrink
//! monotonically when subjects reach goals in funnel order.

use serde::Serialize;
use tracing::warn;

use crate::model::{ExperimentReport, ReportId, SubjectId};
use crate::store::SplitStore;
use crate::{Error, Result};

/// One variant's numbers at one funnel stage.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StageCell {
    variant: String,
    count: usize,
    fraction: Option<f64>,
    cumulative: f64,
}

impl StageCell {
    /// Variant name.
    #[must_use]
    pub fn variant(&self) -> &str {
        &self.variant
    }

    /// Subjects of this variant still in the funnel at this stage.
    #[must_use]
    pub const fn count(&self) -> usize {
        self.count
    }

    /// Conversion from the previous stage; `None` on stage 0.
    #[must_use]
    pub const fn fraction(&self) -> Option<f64> {
        self.fraction
    }

    /// Conversion from stage 0 (product of all stage fractions so far).
    #[must_use]
    pub const fn cumulative(&self) -> f64 {
        self.cumulative
    }

    /// Stage conversion as a percentage with two decimals.
    #[must_use]
    pub fn percent(&self) -> Option<String> {
        self.fraction.map(format_percent)
    }

    /// Cumulative conversion as a percentage with two decimals.
    #[must_use]
    pub fn cumulative_percent(&self) -> String {
        format_percent(self.cumulative)
    }
}

fn format_percent(fraction: f64) -> String {
    format!("{:.2}", 100.0 * fraction)
}

/// One funnel stage across all variants.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FunnelRow {
    goal: Option<String>,
    cells: Vec<StageCell>,
}

impl FunnelRow {
    /// Goal for this stage; `None` for stage 0 (enrollment).
    #[must_use]
    pub fn goal(&self) -> Option<&str> {
        self.goal.as_deref()
    }

    /// Per-variant cells, in declared variant order.
    #[must_use]
    pub fn cells(&self) -> &[StageCell] {
        &self.cells
    }

    /// Cell for a named variant.
    #[must_use]
    pub fn cell(&self, variant: &str) -> Option<&StageCell> {
        self.cells.iter().find(|c| c.variant == variant)
    }
}

/// Generated funnel report.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FunnelReport {
    experiment: String,
    title: String,
    variants: Vec<String>,
    rows: Vec<FunnelRow>,
}

impl FunnelReport {
    /// Experiment name.
    #[must_use]
    pub fn experiment(&self) -> &str {
        &self.experiment
    }

    /// Report title.
    #[must_use]
    pub fn title(&self) -> &str {
        &self.title
    }

    /// Variant names, in declared order.
    #[must_use]
    pub fn variants(&self) -> &[String] {
        &self.variants
    }

    /// Rows: stage 0 followed by one row per funnel goal.
    #[must_use]
    pub fn rows(&self) -> &[FunnelRow] {
        &self.rows
    }
}

impl SplitStore {
    /// Generate the funnel for a report definition.
    ///
    /// Read-only and repeatable: the whole computation runs against one
    /// consistent snapshot. A funnel goal that was never recorded yields a
    /// zero row instead of an error, so the report always has
    /// `funnel.len() + 1` rows.
    ///
    /// # Errors
    ///
    /// Returns [`Error::ExperimentNotFound`] if the report's experiment is gone.
    pub fn generate(&self, report: &ExperimentReport) -> Result<FunnelReport> {
        let tables = self.read();
        let experiment = tables
            .experiments
            .get(report.experiment())
            .ok_or_else(|| Error::ExperimentNotFound(report.experiment().to_string()))?;
        let variants = experiment.variants().to_vec();

        let enrolled: Vec<Vec<SubjectId>> = variants
            .iter()
            .map(|variant| {
                tables
                    .enrollments
                    .values()
                    .filter(|e| e.experiment() == experiment.name() && e.variant() == variant)
                    .map(|e| e.subject())
                    .collect()
            })
            .collect();

        let mut rows = Vec::with_capacity(report.funnel().len() + 1);
        rows.push(FunnelRow {
            goal: None,
            cells: variants
                .iter()
                .zip(&enrolled)
                .map(|(variant, subjects)| StageCell {
                    variant: variant.clone(),
                    count: subjects.len(),
                    fraction: None,
                    cumulative: 1.0,
                })
                .collect(),
        });

        for goal in report.funnel() {
            let known = tables.goals.contains_key(goal);
            if !known {
                warn!(report = report.id(), goal = %goal, "funnel goal has never been recorded");
            }

            let previous = rows.last().map(|row: &FunnelRow| row.cells.clone()).unwrap_or_default();
            let mut cells = Vec::with_capacity(variants.len());

            for ((variant, subjects), prev) in variants.iter().zip(&enrolled).zip(previous) {
                let count = if known {
                    subjects
                        .iter()
                        .filter(|subject| {
                            tables
                                .goal_records
                                .contains_key(&(**subject, goal.clone()))
                        })
                        .count()
                } else {
                    0
                };

                #[allow(clippy::cast_precision_loss)]
                let fraction = if prev.count == 0 {
                    0.0
                } else {
                    count as f64 / prev.count as f64
                };
                cells.push(StageCell {
                    variant: variant.clone(),
                    count,
                    fraction: Some(fraction),
                    cumulative: prev.cumulative * fraction,
                });
            }

            rows.push(FunnelRow {
                goal: Some(goal.clone()),
                cells,
            });
        }

        Ok(FunnelReport {
            experiment: experiment.name().to_string(),
            title: report.title().to_string(),
            variants,
            rows,
        })
    }

    /// Look up a stored report definition and generate it.
    ///
    /// # Errors
    ///
    /// Returns [`Error::ReportNotFound`] or [`Error::ExperimentNotFound`].
    pub fn generate_report(&self, id: ReportId) -> Result<FunnelReport> {
        let report = self.report(id)?;
        self.generate(&report)
    }
}
