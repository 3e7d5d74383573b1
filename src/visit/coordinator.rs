//! Request Session Coordinator - per-visit confirmation state machine

use tracing::{debug, info, warn};

use super::VisitRequest;
use crate::config::SplitConfig;
use crate::model::{IdentityId, SubjectId};
use crate::session::{ConfirmationStatus, QueuedAction, VisitState, VisitUpdate};
use crate::store::SplitStore;
use crate::{Error, Result};

/// Result of finishing a visit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VisitOutcome {
    confirm_path: Option<String>,
    update: VisitUpdate,
}

impl VisitOutcome {
    /// Whether an HTML response should carry the confirmation trigger.
    #[must_use]
    pub const fn inject_confirmation(&self) -> bool {
        self.confirm_path.is_some()
    }

    /// Endpoint the confirmation trigger should request, when one is needed.
    #[must_use]
    pub fn confirm_path(&self) -> Option<&str> {
        self.confirm_path.as_deref()
    }

    /// Changes to persist into the visit's session record.
    #[must_use]
    pub const fn update(&self) -> &VisitUpdate {
        &self.update
    }
}

/// Per-visit coordinator.
///
/// Starts from the persisted [`VisitState`] and decides, for every
/// enrollment or goal, whether to write through to the store or defer the
/// write until the visitor is confirmed human.
///
/// - Enrollment writes through once `Human`; before that a variant is drawn
///   at random and an `Enroll` action is queued.
/// - Goals are always queued, even when `Human`; the queue is the single
///   point where goal records are written.
/// - Queued actions run in enqueue order, carried-over ones first.
#[derive(Debug)]
pub struct Coordinator<'a> {
    store: &'a SplitStore,
    request: VisitRequest,
    confirm_path: String,
    state: VisitState,
    consumed: usize,
    pending: Vec<QueuedAction>,
    identity: Option<IdentityId>,
    first_visit: bool,
    rebound: bool,
}

impl<'a> Coordinator<'a> {
    /// Start a visit from its persisted state (`None` for a brand-new visit).
    ///
    /// A brand-new anonymous visit without an internal referrer is a first
    /// visit; the configured first-visit goal, if any, is queued. A visit
    /// that is already `Human` executes any carried-over actions right away.
    ///
    /// # Errors
    ///
    /// Propagates store errors from executing carried-over actions.
    pub fn new(
        store: &'a SplitStore,
        config: &SplitConfig,
        persisted: Option<VisitState>,
        request: VisitRequest,
    ) -> Result<Self> {
        let brand_new = persisted.is_none();
        let identity = request.initial_identity().cloned();
        let mut coordinator = Self {
            store,
            first_visit: brand_new && request.is_first_contact(),
            request,
            confirm_path: config.confirm_path().to_string(),
            state: persisted.unwrap_or_default(),
            consumed: 0,
            pending: Vec::new(),
            identity,
            rebound: false,
        };

        if coordinator.first_visit {
            info!("first visit");
            if let Some(goal) = config.first_visit_goal() {
                coordinator.log_goal(goal, None);
            }
        }

        if coordinator.is_human() {
            coordinator.drain_carried()?;
        }

        Ok(coordinator)
    }

    /// Current confirmation status.
    #[must_use]
    pub const fn status(&self) -> ConfirmationStatus {
        self.state.status
    }

    /// Whether the visitor is confirmed human.
    #[must_use]
    pub const fn is_human(&self) -> bool {
        self.state.status.is_human()
    }

    /// Whether this visit was detected as the visitor's first.
    #[must_use]
    pub const fn is_first_visit(&self) -> bool {
        self.first_visit
    }

    /// Subject bound to the visit, without creating one.
    #[must_use]
    pub const fn subject(&self) -> Option<SubjectId> {
        self.state.subject
    }

    /// Carried-over actions not yet executed.
    #[must_use]
    pub fn carried(&self) -> &[QueuedAction] {
        &self.state.queue[self.consumed..]
    }

    /// Actions queued during this visit and not yet executed.
    #[must_use]
    pub fn pending(&self) -> &[QueuedAction] {
        &self.pending
    }

    /// Record that the visitor signed in during this visit.
    pub fn authenticate(&mut self, identity: IdentityId) {
        self.identity = Some(identity);
    }

    /// Record that the visitor signed out during this visit.
    pub fn logout(&mut self) {
        self.identity = None;
    }

    /// Declare an experiment and get this visitor's variant.
    ///
    /// Unconfirmed visitors get a random variant and a queued enrollment;
    /// confirmed visitors get their sticky enrollment immediately.
    ///
    /// # Errors
    ///
    /// Returns [`Error::EmptyVariants`] if no assignment is possible, or
    /// propagates store errors.
    pub fn declare_and_enroll<I, V>(&mut self, experiment: &str, variants: I) -> Result<String>
    where
        I: IntoIterator<Item = V>,
        V: Into<String>,
    {
        let declared = self.store.declare(experiment, variants)?;

        if !self.is_human() {
            let variant = declared.random_variant()?.to_string();
            debug!(experiment, variant = %variant, "random variant for unconfirmed visitor");
            self.pending.push(QueuedAction::Enroll {
                experiment: declared.name().to_string(),
                variant: variant.clone(),
            });
            return Ok(variant);
        }

        let subject = self.get_subject()?;
        let enrollment = self.store.get_variant_for(declared.name(), subject)?;
        debug!(experiment, %subject, variant = enrollment.variant(), "variant for subject");
        Ok(enrollment.variant().to_string())
    }

    /// Queue a goal, capturing the current request context.
    ///
    /// Always deferred, even for confirmed visitors: the goal is written when
    /// the queue drains (on confirmation or at the end of a confirmed visit).
    pub fn log_goal(&mut self, goal: &str, extra: Option<&str>) {
        debug!(goal, "queued goal");
        self.pending.push(QueuedAction::LogGoal {
            goal: goal.to_string(),
            context: self.request.context(),
            extra: extra.map(str::to_string),
        });
    }

    /// Mark the visitor human and execute everything queued so far.
    ///
    /// # Errors
    ///
    /// Propagates store errors from executing queued actions.
    pub fn confirm_human(&mut self) -> Result<()> {
        info!("human confirmed");
        self.state.status = ConfirmationStatus::Human;
        self.drain_carried()?;
        self.drain_pending()
    }

    /// The visit's subject, created on first use.
    ///
    /// # Errors
    ///
    /// Returns [`Error::NotConfirmed`] while the visitor is not confirmed human.
    pub fn get_subject(&mut self) -> Result<SubjectId> {
        if !self.is_human() {
            return Err(Error::NotConfirmed);
        }

        if let Some(id) = self.state.subject {
            if self.store.subject_exists(id) {
                return Ok(id);
            }
            warn!(subject = %id, "bound subject no longer exists; creating a new one");
            self.rebound = true;
        }

        let id = self.store.create_subject().id();
        self.state.subject = Some(id);
        Ok(id)
    }

    /// End the visit.
    ///
    /// A sign-in during the visit first runs the identity merge and makes the
    /// visit `Human`. Then a `Human` visit executes its queue, and an
    /// unconfirmed one hands its queue over for persistence. The returned
    /// update must be applied to the session record.
    ///
    /// # Errors
    ///
    /// Propagates store errors from the identity merge. A failing queued
    /// action yields [`Error::VisitInterrupted`], whose update acknowledges
    /// the actions that ran and appends the ones that did not.
    pub fn finish_visit(mut self) -> Result<VisitOutcome> {
        if let Some(identity) = self.signed_in() {
            self.state.status = ConfirmationStatus::Human;
            let subject = self.store.adopt_identity(self.state.subject, &identity)?;
            info!(%subject, %identity, "visitor signed in");
            self.rebound |= self.state.subject != Some(subject);
            self.state.subject = Some(subject);
        }

        if self.is_human() {
            let drained = self.drain_carried().and_then(|()| self.drain_pending());
            if let Err(source) = drained {
                warn!(error = %source, kept = self.pending.len(), "queued action failed; keeping the rest");
                let kept = std::mem::take(&mut self.pending);
                let update = self.update(kept);
                return Err(Error::VisitInterrupted {
                    source: Box::new(source),
                    update: Box::new(update),
                });
            }
        }

        let append = std::mem::take(&mut self.pending);
        let confirm_path = (!self.is_human()).then(|| self.confirm_path.clone());
        Ok(VisitOutcome {
            confirm_path,
            update: self.update(append),
        })
    }

    fn update(&self, append: Vec<QueuedAction>) -> VisitUpdate {
        VisitUpdate {
            status: self.state.status,
            subject: self.state.subject,
            rebind: self.rebound,
            executed_until: self.state.head + self.consumed as u64,
            append,
        }
    }

    /// Store this coordinator writes to.
    pub(super) const fn store(&self) -> &'a SplitStore {
        self.store
    }

    /// Identity gained during this visit, if any.
    fn signed_in(&self) -> Option<IdentityId> {
        match &self.identity {
            Some(now) if self.request.initial_identity() != Some(now) => Some(now.clone()),
            _ => None,
        }
    }

    fn drain_carried(&mut self) -> Result<()> {
        while let Some(action) = self.state.queue.get(self.consumed).cloned() {
            self.execute(&action)?;
            self.consumed += 1;
        }
        Ok(())
    }

    fn drain_pending(&mut self) -> Result<()> {
        let actions = std::mem::take(&mut self.pending);
        for (done, action) in actions.iter().enumerate() {
            if let Err(err) = self.execute(action) {
                self.pending = actions[done..].to_vec();
                return Err(err);
            }
        }
        Ok(())
    }

    fn execute(&mut self, action: &QueuedAction) -> Result<()> {
        let subject = self.get_subject()?;
        info!(?action, %subject, "dequeued");
        match action {
            QueuedAction::Enroll {
                experiment,
                variant,
            } => {
                self.store.enroll_as_variant(experiment, subject, variant)?;
            }
            QueuedAction::LogGoal {
                goal,
                context,
                extra,
            } => {
                self.store
                    .record(subject, goal, context.clone(), extra.clone())?;
            }
        }
        Ok(())
    }
}
