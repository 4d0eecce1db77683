//! Reconciler behavior tests against the in-memory store fake.

use assert_matches::assert_matches;
use std::sync::Arc;
use std::time::Duration;
use tessera_core::{EngineError, MemberId, ParticipantId, PartyId, ShutdownSignal};
use tessera_retry::{RetryPolicy, RetryProvider};
use tessera_testkit::InMemoryTopologyStore;
use tessera_topology::{
    HostingParticipant, OnAuthorizedChange, ParticipantChange, PartyToParticipant, Permission,
    Serial, TopologyQuery, TopologyReconciler, TopologyStore,
};
fn p(id: &str) -> ParticipantId {
    ParticipantId::new(id)
}

fn party() -> PartyId {
    PartyId::new("alice")
}

fn signer() -> MemberId {
    MemberId::Participant(p("p1"))
}

fn base_mapping() -> PartyToParticipant {
    PartyToParticipant::new(
        party(),
        1,
        vec![HostingParticipant::new(p("p1"), Permission::Submission)],
    )
    .unwrap()
}

fn fast_policy() -> RetryPolicy {
    RetryPolicy {
        max_attempts: Some(5),
        initial_backoff: Duration::from_millis(1),
        max_backoff: Duration::from_millis(2),
        multiplier: 2.0,
        jitter: 0.0,
    }
}

fn reconciler(store: &Arc<InMemoryTopologyStore>) -> TopologyReconciler {
    TopologyReconciler::new(
        Arc::clone(store) as Arc<dyn TopologyStore>,
        RetryProvider::new(ShutdownSignal::new()),
        signer(),
    )
}

#[tokio::test]
async fn creates_mapping_when_view_is_empty() {
    let store = Arc::new(InMemoryTopologyStore::new());
    let result = reconciler(&store)
        .ensure_topology_mapping(
            "create alice hosting",
            &party(),
            TopologyQuery::AuthorizedState,
            |_| true,
            |previous| {
                assert!(previous.is_none());
                Ok(base_mapping())
            },
            &fast_policy(),
            false,
            OnAuthorizedChange::Abort,
        )
        .await
        .unwrap();
    assert_eq!(result.serial, Serial(1));
    assert_eq!(result.mapping, base_mapping());
    assert_eq!(store.propose_call_count(), 1);
}

#[tokio::test]
async fn satisfied_mapping_issues_no_write() {
    let store = Arc::new(InMemoryTopologyStore::new());
    store.set_authorized(base_mapping(), Serial(4), signer());
    let result = reconciler(&store)
        .ensure_topology_mapping(
            "already hosted",
            &party(),
            TopologyQuery::AuthorizedState,
            |result| result.mapping.permission_of(&p("p1")).is_some(),
            |_| panic!("update must not run"),
            &fast_policy(),
            false,
            OnAuthorizedChange::Abort,
        )
        .await
        .unwrap();
    assert_eq!(result.serial, Serial(4));
    assert_eq!(store.propose_call_count(), 0);
}

#[tokio::test]
async fn second_reconciliation_is_idempotent() {
    let store = Arc::new(InMemoryTopologyStore::new());
    store.set_authorized(base_mapping(), Serial(1), signer());
    let recon = reconciler(&store);
    let change = ParticipantChange::Add(p("p2"), Permission::Observation);

    let first = recon
        .ensure_topology_proposal(
            "host on p2",
            &party(),
            &change,
            &fast_policy(),
            OnAuthorizedChange::Recreate,
        )
        .await
        .unwrap();
    assert!(first.is_proposal);
    assert_eq!(store.propose_call_count(), 1);

    // Re-running with no intervening external change finds the pending
    // proposal and performs zero mutating RPCs.
    let second = recon
        .ensure_topology_proposal(
            "host on p2",
            &party(),
            &change,
            &fast_policy(),
            OnAuthorizedChange::Recreate,
        )
        .await
        .unwrap();
    assert_eq!(second.mapping, first.mapping);
    assert_eq!(store.propose_call_count(), 1);
}

#[tokio::test]
async fn authorized_fast_path_skips_proposal_lookup() {
    let store = Arc::new(InMemoryTopologyStore::new());
    let hosted = ParticipantChange::Add(p("p2"), Permission::Observation)
        .apply(&base_mapping())
        .unwrap();
    store.set_authorized(hosted, Serial(2), signer());

    let result = reconciler(&store)
        .ensure_topology_proposal(
            "host on p2",
            &party(),
            &ParticipantChange::Add(p("p2"), Permission::Observation),
            &fast_policy(),
            OnAuthorizedChange::Abort,
        )
        .await
        .unwrap();
    assert!(!result.is_proposal);
    assert_eq!(store.propose_call_count(), 0);
}

#[tokio::test]
async fn update_precondition_fault_aborts_without_retry() {
    let store = Arc::new(InMemoryTopologyStore::new());
    store.set_authorized(base_mapping(), Serial(1), signer());
    // Removing a participant that does not host the party is a logic
    // fault; the reconciler must not retry it.
    let result = reconciler(&store)
        .ensure_topology_proposal(
            "remove absent host",
            &party(),
            &ParticipantChange::Remove(p("p9")),
            &fast_policy(),
            OnAuthorizedChange::Recreate,
        )
        .await;
    assert_matches!(result, Err(EngineError::FailedPrecondition { .. }));
    assert_eq!(store.propose_call_count(), 0);
}

#[tokio::test]
async fn stale_proposal_aborts_under_abort_policy() {
    let store = Arc::new(InMemoryTopologyStore::new());
    store.set_authorized(base_mapping(), Serial(3), signer());
    // Our own proposal based on an older serial: another author committed
    // serial 3 after we proposed at base serial 1.
    let stale = ParticipantChange::Add(p("p2"), Permission::Observation)
        .apply(&base_mapping())
        .unwrap();
    store.add_proposal(stale, Serial(2), signer());

    let result = reconciler(&store)
        .ensure_topology_proposal(
            "host on p2",
            &party(),
            &ParticipantChange::Add(p("p2"), Permission::Observation),
            &fast_policy(),
            OnAuthorizedChange::Abort,
        )
        .await;
    assert_matches!(result, Err(EngineError::FailedPrecondition { .. }));
    assert_eq!(store.propose_call_count(), 0);
}

#[tokio::test]
async fn stale_proposal_is_recreated_under_recreate_policy() {
    let store = Arc::new(InMemoryTopologyStore::new());
    store.set_authorized(base_mapping(), Serial(3), signer());
    let stale = ParticipantChange::Add(p("p2"), Permission::Observation)
        .apply(&base_mapping())
        .unwrap();
    store.add_proposal(stale, Serial(2), signer());

    let result = reconciler(&store)
        .ensure_topology_proposal(
            "host on p2",
            &party(),
            &ParticipantChange::Add(p("p2"), Permission::Observation),
            &fast_policy(),
            OnAuthorizedChange::Recreate,
        )
        .await
        .unwrap();
    // Rebased onto the advanced authorized serial.
    assert_eq!(result.serial, Serial(4));
    assert!(result.is_proposal);
    assert_eq!(store.propose_call_count(), 1);
}

#[tokio::test]
async fn differently_ordered_matching_proposal_is_not_duplicated() {
    let store = Arc::new(InMemoryTopologyStore::new());
    store.set_authorized(base_mapping(), Serial(1), signer());
    // A concurrent proposer built the same target from the reversed
    // hosting list; construction canonicalizes, matching is by set.
    let pending = PartyToParticipant::new(
        party(),
        1,
        vec![
            HostingParticipant::new(p("p2"), Permission::Observation),
            HostingParticipant::new(p("p1"), Permission::Submission),
        ],
    )
    .unwrap();
    store.add_proposal(pending, Serial(2), signer());

    let result = reconciler(&store)
        .ensure_topology_proposal(
            "host on p2",
            &party(),
            &ParticipantChange::Add(p("p2"), Permission::Observation),
            &fast_policy(),
            OnAuthorizedChange::Recreate,
        )
        .await
        .unwrap();
    assert_eq!(result.serial, Serial(2));
    assert_eq!(store.propose_call_count(), 0);
}

#[tokio::test]
async fn serial_race_rebases_under_recreate_policy() {
    let store = Arc::new(InMemoryTopologyStore::new());
    store.set_authorized(base_mapping(), Serial(1), signer());
    // Another author commits serial 2 after our first read.
    let foreign = ParticipantChange::Add(p("p3"), Permission::Observation)
        .apply(&base_mapping())
        .unwrap();
    store.authorize_after_reads(foreign, Serial(2), MemberId::Participant(p("p3")), 1);

    let result = reconciler(&store)
        .ensure_topology_proposal(
            "host on p2",
            &party(),
            &ParticipantChange::Add(p("p2"), Permission::Observation),
            &fast_policy(),
            OnAuthorizedChange::Recreate,
        )
        .await
        .unwrap();
    // Rebased target includes the foreign addition.
    assert!(result.mapping.permission_of(&p("p3")).is_some());
    assert!(result.mapping.permission_of(&p("p2")).is_some());
    assert_eq!(result.serial, Serial(3));
}
