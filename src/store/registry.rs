//! Experiment Registry - experiment catalog and sticky variant assignment

use std::collections::btree_map::Entry;

use tracing::{debug, info};

use super::SplitStore;
use crate::model::{Enrollment, Experiment, SubjectId};
use crate::{Error, Result};

impl SplitStore {
    /// Register an experiment, or return the existing one unchanged.
    ///
    /// The first declaration wins: a later call with a different variant
    /// list does not redefine the experiment.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidInput`] if `name` is empty.
    pub fn declare<I, V>(&self, name: &str, variants: I) -> Result<Experiment>
    where
        I: IntoIterator<Item = V>,
        V: Into<String>,
    {
        if name.is_empty() {
            return Err(Error::InvalidInput("experiment name must not be empty".into()));
        }

        let mut tables = self.write();
        let experiment = tables.experiments.entry(name.to_string()).or_insert_with(|| {
            let experiment = Experiment::new(name, variants);
            info!(experiment = name, variants = %experiment.variants_commasep(), "declared experiment");
            experiment
        });
        Ok(experiment.clone())
    }

    /// Get an experiment by name.
    ///
    /// # Errors
    ///
    /// Returns [`Error::ExperimentNotFound`] if it was never declared.
    pub fn experiment(&self, name: &str) -> Result<Experiment> {
        self.read()
            .experiments
            .get(name)
            .cloned()
            .ok_or_else(|| Error::ExperimentNotFound(name.to_string()))
    }

    /// All experiments, ordered by name.
    #[must_use]
    pub fn experiments(&self) -> Vec<Experiment> {
        self.read().experiments.values().cloned().collect()
    }

    /// Declared variants of an experiment.
    ///
    /// # Errors
    ///
    /// Returns [`Error::ExperimentNotFound`] if it was never declared.
    pub fn get_variants(&self, experiment: &str) -> Result<Vec<String>> {
        Ok(self.experiment(experiment)?.variants().to_vec())
    }

    /// Uniform random choice over an experiment's variants.
    ///
    /// # Errors
    ///
    /// Returns [`Error::ExperimentNotFound`] or [`Error::EmptyVariants`].
    pub fn random_variant(&self, experiment: &str) -> Result<String> {
        let tables = self.read();
        let experiment = tables
            .experiments
            .get(experiment)
            .ok_or_else(|| Error::ExperimentNotFound(experiment.to_string()))?;
        experiment.random_variant().map(str::to_string)
    }

    /// Lookup-or-create the subject's enrollment, picking a random variant on create.
    ///
    /// # Errors
    ///
    /// Returns [`Error::ExperimentNotFound`], [`Error::SubjectNotFound`], or
    /// [`Error::EmptyVariants`] when a new assignment is needed and impossible.
    pub fn get_variant_for(&self, experiment: &str, subject: SubjectId) -> Result<Enrollment> {
        self.enroll_with(experiment, subject, |exp| {
            exp.random_variant().map(str::to_string)
        })
    }

    /// Lookup-or-create the subject's enrollment with an explicit variant.
    ///
    /// An existing enrollment is returned untouched even if its variant
    /// differs; `variant` is only used when creating.
    ///
    /// A new enrollment must name a declared variant, and an enrollment that
    /// already exists is returned without that check. The first declaration
    /// of an experiment is permanent, so a variant queued by a coordinator
    /// stays valid however long it waits in a session queue.
    ///
    /// # Errors
    ///
    /// Returns [`Error::ExperimentNotFound`], [`Error::SubjectNotFound`], or
    /// [`Error::InvalidInput`] if a new enrollment would use an undeclared variant.
    pub fn enroll_as_variant(
        &self,
        experiment: &str,
        subject: SubjectId,
        variant: &str,
    ) -> Result<Enrollment> {
        self.enroll_with(experiment, subject, |exp| {
            if exp.has_variant(variant) {
                Ok(variant.to_string())
            } else {
                Err(Error::InvalidInput(format!(
                    "variant '{variant}' is not declared for experiment '{}'",
                    exp.name()
                )))
            }
        })
    }

    fn enroll_with<F>(&self, experiment: &str, subject: SubjectId, choose: F) -> Result<Enrollment>
    where
        F: FnOnce(&Experiment) -> Result<String>,
    {
        let mut guard = self.write();
        let tables = &mut *guard;

        let exp = tables
            .experiments
            .get(experiment)
            .ok_or_else(|| Error::ExperimentNotFound(experiment.to_string()))?;
        if !tables.subjects.contains_key(&subject) {
            return Err(Error::SubjectNotFound(subject.get()));
        }

        match tables.enrollments.entry((subject, experiment.to_string())) {
            Entry::Occupied(existing) => {
                debug!(experiment, %subject, variant = existing.get().variant(), "existing enrollment");
                Ok(existing.get().clone())
            }
            Entry::Vacant(slot) => {
                let variant = choose(exp)?;
                info!(experiment, %subject, variant = %variant, "enrolled subject");
                Ok(slot.insert(Enrollment::new(subject, experiment, variant)).clone())
            }
        }
    }

    /// A subject's enrollment in an experiment, if any.
    #[must_use]
    pub fn enrollment(&self, experiment: &str, subject: SubjectId) -> Option<Enrollment> {
        self.read()
            .enrollments
            .get(&(subject, experiment.to_string()))
            .cloned()
    }

    /// Number of enrollments in `experiment` assigned to `variant`.
    #[must_use]
    pub fn enrollment_count(&self, experiment: &str, variant: &str) -> usize {
        self.read()
            .enrollments
            .values()
            .filter(|e| e.experiment() == experiment && e.variant() == variant)
            .count()
    }
}
