//! Record schema for split testing
//!
//! ## Schema Overview
//!
//! ```text
//! Goal (1) ──< GoalRecord (N) >── (1) Subject (1) ──< Enrollment (N) >── (1) Experiment
//!                                                                            │
//!                                                           ExperimentReport (N)
//! ```
//!
//! Records keep their fields private; the store is the only writer.

mod experiment;
mod goal;
mod report;
mod subject;

pub use experiment::{Enrollment, Experiment};
pub use goal::{Goal, GoalRecord, RequestContext, MAX_FIELD_LEN};
pub use report::{parse_funnel, ExperimentReport, ReportId};
pub use subject::{IdentityId, Subject, SubjectId};
