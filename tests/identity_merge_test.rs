//! Identity merge under concurrency
//!
//! Sign-ins racing for the same identity must end with exactly one linked
//! subject holding the union of everybody's history.

use std::sync::Arc;
use std::thread;

use splitdb::model::{IdentityId, RequestContext};
use splitdb::SplitStore;

#[test]
fn test_concurrent_sign_ins_converge_on_one_subject() {
    let store = Arc::new(SplitStore::new());
    store.declare("exp", ["a", "b"]).unwrap();
    let identity = IdentityId::new("shared-user");

    let anonymous: Vec<_> = (0..8)
        .map(|i| {
            let s = store.create_subject().id();
            store
                .record(s, &format!("goal-{i}"), RequestContext::empty(), None)
                .unwrap();
            store.enroll_as_variant("exp", s, if i % 2 == 0 { "a" } else { "b" }).unwrap();
            s
        })
        .collect();

    let handles: Vec<_> = anonymous
        .iter()
        .map(|&subject| {
            let store = Arc::clone(&store);
            let identity = identity.clone();
            thread::spawn(move || store.adopt_identity(Some(subject), &identity).unwrap())
        })
        .collect();
    let bound: Vec<_> = handles.into_iter().map(|h| h.join().unwrap()).collect();

    assert!(bound.windows(2).all(|w| w[0] == w[1]));
    let winner = bound[0];
    assert_eq!(store.subject_count(), 1);
    assert_eq!(store.subject_for_identity(&identity).unwrap().id(), winner);
    assert_eq!(store.goal_records_for(winner).len(), 8);
    assert_eq!(
        store.enrollment_count("exp", "a") + store.enrollment_count("exp", "b"),
        1
    );
}

#[test]
fn test_concurrent_merges_of_same_source() {
    let store = Arc::new(SplitStore::new());
    let source = store.create_subject().id();
    let target = store.create_subject().id();
    for goal in ["viewed", "clicked", "paid"] {
        store.record(source, goal, RequestContext::empty(), None).unwrap();
    }

    let handles: Vec<_> = (0..4)
        .map(|_| {
            let store = Arc::clone(&store);
            thread::spawn(move || store.merge(source, target).unwrap())
        })
        .collect();
    let moved: usize = handles
        .into_iter()
        .map(|h| h.join().unwrap().goals_moved)
        .sum();

    assert_eq!(moved, 3);
    assert!(!store.subject_exists(source));
    assert_eq!(store.goal_records_for(target).len(), 3);
}

#[test]
fn test_record_identity_goal_reuses_promoted_subject() {
    let store = SplitStore::new();
    let identity = IdentityId::new("returning");
    let subject = store.create_subject().id();
    store.adopt_identity(Some(subject), &identity).unwrap();

    let record = store.record_identity_goal(&identity, "renewed").unwrap();

    assert_eq!(record.subject(), subject);
    assert!(record.context().referrer().is_none());
}
