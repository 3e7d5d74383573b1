//! Experiment and Enrollment - variant sets and sticky assignments

use chrono::{DateTime, Utc};
use rand::seq::SliceRandom;
use rand::Rng;
use serde::{Deserialize, Serialize};

use super::SubjectId;
use crate::{Error, Result};

/// A named experiment with an ordered variant list.
///
/// The variant list is fixed at creation: a later declaration with a
/// different list does not redefine it.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Experiment {
    name: String,
    variants: Vec<String>,
    created_at: DateTime<Utc>,
}

impl Experiment {
    /// Create an experiment; blank variant names are dropped, order is kept.
    #[must_use]
    pub fn new<I, V>(name: impl Into<String>, variants: I) -> Self
    where
        I: IntoIterator<Item = V>,
        V: Into<String>,
    {
        Self {
            name: name.into(),
            variants: variants
                .into_iter()
                .map(Into::into)
                .filter(|v: &String| !v.is_empty())
                .collect(),
            created_at: Utc::now(),
        }
    }

    /// Create an experiment from newline-separated variant names.
    #[must_use]
    pub fn from_lines(name: impl Into<String>, lines: &str) -> Self {
        Self::new(name, lines.lines().map(str::trim))
    }

    /// Get the experiment name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Get the declared variants, in order.
    #[must_use]
    pub fn variants(&self) -> &[String] {
        &self.variants
    }

    /// Variants joined by commas, for listings.
    #[must_use]
    pub fn variants_commasep(&self) -> String {
        self.variants.join(",")
    }

    /// Whether `variant` is one of the declared variants.
    #[must_use]
    pub fn has_variant(&self, variant: &str) -> bool {
        self.variants.iter().any(|v| v == variant)
    }

    /// Get the creation timestamp.
    #[must_use]
    pub const fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    /// Uniform choice over the variant list using the thread RNG.
    ///
    /// # Errors
    ///
    /// Returns [`Error::EmptyVariants`] if no variants are declared.
    pub fn random_variant(&self) -> Result<&str> {
        self.random_variant_with(&mut rand::thread_rng())
    }

    /// Uniform choice over the variant list using the given RNG.
    ///
    /// # Errors
    ///
    /// Returns [`Error::EmptyVariants`] if no variants are declared.
    pub fn random_variant_with<R: Rng + ?Sized>(&self, rng: &mut R) -> Result<&str> {
        self.variants
            .choose(rng)
            .map(String::as_str)
            .ok_or_else(|| Error::EmptyVariants(self.name.clone()))
    }
}

/// A subject's sticky variant within one experiment. Unique per (subject, experiment).
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Enrollment {
    subject: SubjectId,
    experiment: String,
    variant: String,
    created_at: DateTime<Utc>,
}

impl Enrollment {
    /// Create an enrollment with the current timestamp.
    #[must_use]
    pub fn new(subject: SubjectId, experiment: impl Into<String>, variant: impl Into<String>) -> Self {
        Self {
            subject,
            experiment: experiment.into(),
            variant: variant.into(),
            created_at: Utc::now(),
        }
    }

    /// Get the enrolled subject.
    #[must_use]
    pub const fn subject(&self) -> SubjectId {
        self.subject
    }

    /// Get the experiment name.
    #[must_use]
    pub fn experiment(&self) -> &str {
        &self.experiment
    }

    /// Get the assigned variant.
    #[must_use]
    pub fn variant(&self) -> &str {
        &self.variant
    }

    /// Get the creation timestamp.
    #[must_use]
    pub const fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    pub(crate) fn reassign(&mut self, subject: SubjectId) {
        self.subject = subject;
    }
}
