//! Property-based tests for splitdb invariants
//!
//! - Sticky enrollment: one row per (subject, experiment), same variant every time
//! - Goal records: one row per (subject, goal), `extra` filled at most once
//! - Merge law: union of histories, target wins, repeat is a no-op
//! - Funnel monotonicity: for in-order progress, counts and cumulative fractions never grow
//! - Queue order: carried actions execute before new ones, in enqueue order

use std::collections::BTreeSet;

use proptest::prelude::*;
use splitdb::model::{ExperimentReport, RequestContext};
use splitdb::session::{QueuedAction, VisitState};
use splitdb::visit::{Coordinator, VisitRequest};
use splitdb::{SplitConfig, SplitStore};

const GOALS: [&str; 5] = ["viewed", "clicked", "signed_up", "paid", "shared"];
const VARIANTS: [&str; 3] = ["a", "b", "c"];

/// Subset of `GOALS` as a bitmask.
fn arb_goal_mask() -> impl Strategy<Value = u8> {
    0u8..32
}

fn goals_in(mask: u8) -> impl Iterator<Item = &'static str> {
    GOALS
        .iter()
        .enumerate()
        .filter(move |(i, _)| mask & (1 << i) != 0)
        .map(|(_, g)| *g)
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(100))]

    /// Property: variant resolution is sticky and creates exactly one row
    #[test]
    fn prop_enrollment_is_sticky(calls in 1usize..20) {
        let store = SplitStore::new();
        store.declare("exp", VARIANTS).unwrap();
        let subject = store.create_subject().id();

        let first = store.get_variant_for("exp", subject).unwrap();
        for _ in 1..calls {
            let again = store.get_variant_for("exp", subject).unwrap();
            prop_assert_eq!(again.variant(), first.variant());
        }

        let total: usize = VARIANTS.iter().map(|v| store.enrollment_count("exp", v)).sum();
        prop_assert_eq!(total, 1);
    }

    /// Property: a goal is recorded once; extra is set by the first call that supplies one
    #[test]
    fn prop_goal_recorded_once(extras in proptest::collection::vec(proptest::option::of("[a-z]{1,6}"), 1..8)) {
        let store = SplitStore::new();
        let subject = store.create_subject().id();

        for extra in &extras {
            store.record(subject, "purchase", RequestContext::empty(), extra.clone()).unwrap();
        }

        prop_assert_eq!(store.goal_record_count("purchase"), 1);
        let expected = extras.iter().flatten().next().map(String::as_str);
        let record = store.goal_record(subject, "purchase").unwrap();
        prop_assert_eq!(record.extra(), expected);
    }

    /// Property: merge yields the union, prefers the target, and is idempotent
    #[test]
    fn prop_merge_law(
        source_goals in arb_goal_mask(),
        target_goals in arb_goal_mask(),
        source_variant in 0usize..3,
        target_variant in proptest::option::of(0usize..3),
    ) {
        let store = SplitStore::new();
        store.declare("exp", VARIANTS).unwrap();
        let source = store.create_subject().id();
        let target = store.create_subject().id();

        for goal in goals_in(source_goals) {
            store.record(source, goal, RequestContext::empty(), Some("source".into())).unwrap();
        }
        for goal in goals_in(target_goals) {
            store.record(target, goal, RequestContext::empty(), Some("target".into())).unwrap();
        }
        store.enroll_as_variant("exp", source, VARIANTS[source_variant]).unwrap();
        if let Some(v) = target_variant {
            store.enroll_as_variant("exp", target, VARIANTS[v]).unwrap();
        }

        store.merge(source, target).unwrap();

        prop_assert!(!store.subject_exists(source));
        let merged: BTreeSet<String> = store
            .goal_records_for(target)
            .iter()
            .map(|r| r.goal().to_string())
            .collect();
        let expected: BTreeSet<String> = goals_in(source_goals | target_goals).map(str::to_string).collect();
        prop_assert_eq!(&merged, &expected);

        for goal in goals_in(target_goals) {
            let record = store.goal_record(target, goal).unwrap();
            prop_assert_eq!(record.extra(), Some("target"));
        }
        let expected_variant = VARIANTS[target_variant.unwrap_or(source_variant)];
        let record = store.enrollment("exp", target).unwrap();
        prop_assert_eq!(record.variant(), expected_variant);

        let again = store.merge(source, target).unwrap();
        prop_assert_eq!(again, splitdb::store::MergeSummary::default());
        prop_assert_eq!(store.goal_records_for(target).len(), expected.len());
    }

    /// Property: when subjects reach goals in funnel order, counts and
    /// cumulative fractions are non-increasing
    #[test]
    fn prop_funnel_monotonic(
        subjects in proptest::collection::vec((0usize..3, 0usize..=5), 0..40),
        funnel_len in 0usize..=5,
    ) {
        let store = SplitStore::new();
        store.declare("exp", VARIANTS).unwrap();
        for (variant, depth) in &subjects {
            let s = store.create_subject().id();
            store.enroll_as_variant("exp", s, VARIANTS[*variant]).unwrap();
            for goal in &GOALS[..*depth] {
                store.record(s, goal, RequestContext::empty(), None).unwrap();
            }
        }

        let funnel: Vec<String> = GOALS[..funnel_len].iter().map(|g| (*g).to_string()).collect();
        let report = ExperimentReport::new(1, "exp", "prop", funnel);
        let generated = store.generate(&report).unwrap();

        prop_assert_eq!(generated.rows().len(), funnel_len + 1);
        for pair in generated.rows().windows(2) {
            for (prev, next) in pair[0].cells().iter().zip(pair[1].cells()) {
                prop_assert!(next.count() <= prev.count());
                prop_assert!(next.cumulative() <= prev.cumulative());
                let fraction = next.fraction().unwrap();
                prop_assert!((0.0..=1.0).contains(&fraction));
            }
        }
    }

    /// Property: carried goals execute before this visit's goals, in order
    #[test]
    fn prop_queue_order_preserved(carried in 0usize..6, fresh in 0usize..6) {
        let store = SplitStore::new();
        let queue = (0..carried)
            .map(|i| QueuedAction::LogGoal {
                goal: "step".into(),
                context: RequestContext::empty(),
                extra: Some(format!("carried-{i}")),
            })
            .collect();
        let state = VisitState { queue, ..VisitState::default() };

        let mut visit = Coordinator::new(
            &store,
            &SplitConfig::default(),
            Some(state),
            VisitRequest::new("example.com"),
        )
        .unwrap();
        for i in 0..fresh {
            visit.log_goal("step", Some(&format!("fresh-{i}")));
        }
        visit.confirm_human().unwrap();

        if carried + fresh > 0 {
            let subject = visit.subject().unwrap();
            let expected = if carried > 0 { "carried-0" } else { "fresh-0" };
            let record = store.goal_record(subject, "step").unwrap();
            prop_assert_eq!(record.extra(), Some(expected));
        } else {
            prop_assert!(visit.subject().is_none());
        }
    }
}
