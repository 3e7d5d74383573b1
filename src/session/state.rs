//! Visit state - confirmation status, bound subject and the deferred action queue

use serde::{Deserialize, Serialize};

use crate::model::{RequestContext, SubjectId};
use crate::{Error, Result};

/// Whether a visit has been proven non-automated.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ConfirmationStatus {
    /// Not yet confirmed; persistent writes are deferred.
    #[default]
    Unknown,
    /// Confirmed by the client or by authenticating.
    Human,
}

impl ConfirmationStatus {
    /// Whether this is [`ConfirmationStatus::Human`].
    #[must_use]
    pub const fn is_human(self) -> bool {
        matches!(self, Self::Human)
    }
}

/// A persistent write deferred until the visitor is confirmed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum QueuedAction {
    /// Enroll the subject in `experiment` as `variant`.
    Enroll {
        /// Experiment name.
        experiment: String,
        /// Variant chosen while unconfirmed.
        variant: String,
    },
    /// Record `goal` for the subject.
    LogGoal {
        /// Goal name.
        goal: String,
        /// Request snapshot taken when the goal fired.
        context: RequestContext,
        /// Optional annotation.
        extra: Option<String>,
    },
}

/// Persisted per-visit record.
///
/// Every queued action has a sequence number: the first entry of `queue` is
/// number `head`, the next `head + 1`, and so on. Numbers are never reused,
/// so a visit can acknowledge exactly the actions it executed even if other
/// visits appended or acknowledged in the meantime.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct VisitState {
    /// Confirmation status.
    #[serde(default)]
    pub status: ConfirmationStatus,
    /// Subject bound to this visitor, once confirmed.
    #[serde(default)]
    pub subject: Option<SubjectId>,
    /// Sequence number of the first entry in `queue`.
    #[serde(default)]
    pub head: u64,
    /// Actions carried over from unconfirmed visits, oldest first.
    #[serde(default)]
    pub queue: Vec<QueuedAction>,
}

impl VisitState {
    /// Sequence number one past the last queued action.
    #[must_use]
    pub fn tail(&self) -> u64 {
        self.head + self.queue.len() as u64
    }

    /// Decode from JSON bytes.
    ///
    /// # Errors
    ///
    /// Returns [`Error::CorruptVisitState`] for malformed data, including an
    /// unknown queued action kind.
    pub fn decode(bytes: &[u8]) -> Result<Self> {
        serde_json::from_slice(bytes).map_err(|e| Error::CorruptVisitState(e.to_string()))
    }

    /// Encode to JSON bytes.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Serialization`] if encoding fails.
    pub fn encode(&self) -> Result<Vec<u8>> {
        Ok(serde_json::to_vec(self)?)
    }
}

/// Changes one finished visit makes to its persisted state.
///
/// Applied with read-modify-write semantics so that concurrent visits sharing
/// a record append to the queue instead of replacing it.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct VisitUpdate {
    /// Status reached by the visit.
    pub status: ConfirmationStatus,
    /// Subject bound during the visit, if any.
    pub subject: Option<SubjectId>,
    /// Replace an already persisted subject instead of keeping it.
    ///
    /// Set when the visit deliberately moved to another subject (sign-in,
    /// or the bound subject had vanished).
    pub rebind: bool,
    /// Carried actions with a sequence number below this were executed.
    pub executed_until: u64,
    /// New actions to append to the queue.
    pub append: Vec<QueuedAction>,
}

impl VisitUpdate {
    /// Apply to a persisted state.
    ///
    /// `Human` is sticky. Only acknowledged sequence numbers leave the queue
    /// and new actions go to the tail. A persisted subject is kept unless the
    /// update rebinds; the caller reconciles a losing subject with
    /// [`crate::SplitStore::merge`].
    pub fn apply_to(&self, state: &mut VisitState) {
        if self.status.is_human() {
            state.status = ConfirmationStatus::Human;
        }
        if self.subject.is_some() && (self.rebind || state.subject.is_none()) {
            state.subject = self.subject;
        }
        let acknowledged = self.executed_until.saturating_sub(state.head);
        let drop = usize::try_from(acknowledged)
            .unwrap_or(usize::MAX)
            .min(state.queue.len());
        state.queue.drain(..drop);
        state.head += drop as u64;
        state.queue.extend(self.append.iter().cloned());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn enroll(variant: &str) -> QueuedAction {
        QueuedAction::Enroll {
            experiment: "exp".into(),
            variant: variant.into(),
        }
    }

    #[test]
    fn test_status_wire_format() {
        let json = serde_json::to_string(&ConfirmationStatus::Human).unwrap();
        assert_eq!(json, "\"HUMAN\"");
        assert!(!ConfirmationStatus::default().is_human());
    }

    #[test]
    fn test_action_wire_format() {
        let json = serde_json::to_value(enroll("blue")).unwrap();
        assert_eq!(json["kind"], "enroll");
        assert_eq!(json["variant"], "blue");
    }

    #[test]
    fn test_decode_rejects_unknown_kind() {
        let raw = br#"{"status":"UNKNOWN","subject":null,"queue":[{"kind":"teleport"}]}"#;
        assert!(matches!(
            VisitState::decode(raw),
            Err(Error::CorruptVisitState(_))
        ));
    }

    #[test]
    fn test_decode_tolerates_missing_fields() {
        let state = VisitState::decode(b"{}").unwrap();
        assert_eq!(state, VisitState::default());
    }

    #[test]
    fn test_apply_appends_after_acknowledged_prefix() {
        let mut state = VisitState {
            queue: vec![enroll("a"), enroll("b"), enroll("c")],
            ..VisitState::default()
        };
        let update = VisitUpdate {
            executed_until: 2,
            append: vec![enroll("d")],
            ..VisitUpdate::default()
        };

        update.apply_to(&mut state);

        assert_eq!(state.head, 2);
        assert_eq!(state.queue, vec![enroll("c"), enroll("d")]);
        assert_eq!(state.tail(), 4);
    }

    #[test]
    fn test_apply_stale_acknowledgement_keeps_newer_actions() {
        // Another visit already acknowledged "a"; "c" arrived since.
        let mut state = VisitState {
            head: 1,
            queue: vec![enroll("c")],
            ..VisitState::default()
        };
        let update = VisitUpdate {
            executed_until: 1,
            ..VisitUpdate::default()
        };

        update.apply_to(&mut state);

        assert_eq!(state.queue, vec![enroll("c")]);
        assert_eq!(state.head, 1);
    }

    #[test]
    fn test_apply_keeps_human() {
        let mut state = VisitState {
            status: ConfirmationStatus::Human,
            subject: Some(SubjectId::new(4)),
            ..VisitState::default()
        };
        VisitUpdate::default().apply_to(&mut state);

        assert!(state.status.is_human());
        assert_eq!(state.subject, Some(SubjectId::new(4)));
    }

    #[test]
    fn test_apply_keeps_first_subject_unless_rebinding() {
        let mut state = VisitState {
            subject: Some(SubjectId::new(1)),
            ..VisitState::default()
        };
        let mut update = VisitUpdate {
            subject: Some(SubjectId::new(2)),
            ..VisitUpdate::default()
        };

        update.apply_to(&mut state);
        assert_eq!(state.subject, Some(SubjectId::new(1)));

        update.rebind = true;
        update.apply_to(&mut state);
        assert_eq!(state.subject, Some(SubjectId::new(2)));
    }

    #[test]
    fn test_apply_acknowledgement_beyond_queue() {
        let mut state = VisitState {
            queue: vec![enroll("a")],
            ..VisitState::default()
        };
        let update = VisitUpdate {
            executed_until: 5,
            ..VisitUpdate::default()
        };
        update.apply_to(&mut state);
        assert!(state.queue.is_empty());
        assert_eq!(state.head, 1);
    }
}
