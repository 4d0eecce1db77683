//! Convergent, retryable topology reconciliation.
//!
//! The reconciler drives the store toward a target mapping through
//! check / update / submit loops. There is no client-side locking; the
//! mapping serial is the optimistic-concurrency token, and a lost race is
//! handled by rebasing onto the new authorized state or by aborting,
//! depending on the configured policy.

use std::sync::Arc;
use tessera_core::{EngineError, EngineResult, MemberId, PartyId};
use tessera_retry::{RetryPolicy, RetryProvider, Satisfaction};
use tracing::{debug, info};

use crate::mapping::{ParticipantChange, PartyToParticipant};
use crate::store::{Serial, TopologyQuery, TopologyResult, TopologyStore};

/// What to do when the authorized serial advances past the expected base
/// while a reconciliation attempt is in flight.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OnAuthorizedChange {
    /// Surface the conflict to the caller as a `FailedPrecondition`.
    Abort,
    /// Transparently recreate the change from the new authorized base.
    Recreate,
}

/// Drives party-to-participant mappings toward a target state.
///
/// Holds no mapping state of its own; every attempt re-reads the live store.
#[derive(Clone)]
pub struct TopologyReconciler {
    store: Arc<dyn TopologyStore>,
    retry: RetryProvider,
    signer: MemberId,
}

impl TopologyReconciler {
    /// Create a reconciler signing as `signer`.
    pub fn new(store: Arc<dyn TopologyStore>, retry: RetryProvider, signer: MemberId) -> Self {
        Self {
            store,
            retry,
            signer,
        }
    }

    /// Ensure the queried view satisfies a predicate, submitting updated
    /// mappings until it does.
    ///
    /// Each iteration re-reads the view. When satisfied, the current result
    /// is returned and no write is issued. Otherwise `update` maps the
    /// previous mapping (or `None` when the view is empty) to the desired
    /// one, which is submitted at the next serial. An `update` error fails
    /// the operation without retry: a violated membership precondition is a
    /// logic fault, not a transient condition.
    pub async fn ensure_topology_mapping<C, U>(
        &self,
        description: &str,
        party: &PartyId,
        query: TopologyQuery,
        is_satisfied: C,
        update: U,
        policy: &RetryPolicy,
        is_proposal: bool,
        on_authorized_change: OnAuthorizedChange,
    ) -> EngineResult<TopologyResult<PartyToParticipant>>
    where
        C: Fn(&TopologyResult<PartyToParticipant>) -> bool,
        U: Fn(Option<&PartyToParticipant>) -> EngineResult<PartyToParticipant>,
    {
        let op_id = format!("topology/{party}");
        let query = &query;
        let is_satisfied = &is_satisfied;
        let update = &update;
        self.retry
            .ensure_that(
                policy,
                &op_id,
                description,
                move || async move {
                    match self.store.get(party, query.clone()).await {
                        Ok(result) if is_satisfied(&result) => Ok(Satisfaction::Satisfied(result)),
                        Ok(result) => Ok(Satisfaction::Pending(Some(result))),
                        Err(err) if err.is_not_found() => Ok(Satisfaction::Pending(None)),
                        Err(err) => Err(err),
                    }
                },
                move |previous: Option<TopologyResult<PartyToParticipant>>| async move {
                    let next_serial = previous
                        .as_ref()
                        .map(|r| r.serial.next())
                        .unwrap_or(Serial(1));
                    let mapping = update(previous.as_ref().map(|r| &r.mapping))?;
                    self.submit(mapping, next_serial, is_proposal, on_authorized_change)
                        .await
                },
            )
            .await
    }

    /// Ensure a membership change is either authorized or proposed.
    ///
    /// Fast path: if the authorized state already reflects the change
    /// (another proposer's proposal was ratified first), nothing is written.
    /// Otherwise an existing proposal signed by this identity is looked for;
    /// absence of one is expected, not an error. A live matching proposal is
    /// returned as-is so co-signatures keep accumulating on it. Only when no
    /// matching proposal exists is a new one submitted, based on the current
    /// authorized serial.
    ///
    /// Matching is order-invariant: a candidate matches when applying the
    /// same change to it yields the target's participant set and recomputed
    /// threshold, regardless of how its hosting list was ordered.
    pub async fn ensure_topology_proposal(
        &self,
        description: &str,
        party: &PartyId,
        change: &ParticipantChange,
        policy: &RetryPolicy,
        on_authorized_change: OnAuthorizedChange,
    ) -> EngineResult<TopologyResult<PartyToParticipant>> {
        let op_id = format!("topology-proposal/{party}");
        let op_id_ref = op_id.as_str();
        self.retry
            .ensure_that(
                policy,
                &op_id,
                description,
                move || self.check_proposal(op_id_ref, party, change, on_authorized_change),
                move |(mapping, serial): (PartyToParticipant, Serial)| async move {
                    self.submit(mapping, serial, true, on_authorized_change)
                        .await
                },
            )
            .await
    }

    /// One goal check of `ensure_topology_proposal`.
    async fn check_proposal(
        &self,
        op_id: &str,
        party: &PartyId,
        change: &ParticipantChange,
        on_authorized_change: OnAuthorizedChange,
    ) -> EngineResult<
        Satisfaction<TopologyResult<PartyToParticipant>, (PartyToParticipant, Serial)>,
    > {
        let authorized = self
            .store
            .get(party, TopologyQuery::AuthorizedState)
            .await
            .map_err(|err| {
                if err.is_not_found() {
                    EngineError::failed_precondition(format!(
                        "{party}: no authorized mapping to apply a membership change to"
                    ))
                } else {
                    err
                }
            })?;

        let target = change.apply(&authorized.mapping)?;
        if authorized.mapping.is_equivalent_to(&target) {
            debug!(op_id, "change already authorized");
            return Ok(Satisfaction::Satisfied(authorized));
        }

        // NOT_FOUND on the proposal view means "no proposal yet".
        let own_proposals = match self
            .store
            .list(
                Some(party),
                TopologyQuery::ProposalSignedBy(self.signer.clone()),
            )
            .await
        {
            Ok(proposals) => proposals,
            Err(err) if err.is_not_found() => Vec::new(),
            Err(err) => return Err(err),
        };

        let mut matching: Vec<_> = own_proposals
            .into_iter()
            .filter(|p| Self::proposal_matches(change, &p.mapping, &target))
            .collect();
        matching.sort_by_key(|p| p.serial);

        // A live matching proposal (based on the current authorized serial)
        // wins over any stale one; co-signatures keep accumulating on it.
        if let Some(live) = matching.iter().rev().find(|p| p.serial > authorized.serial) {
            debug!(op_id, serial = live.serial.0, "matching proposal already pending");
            return Ok(Satisfaction::Satisfied(live.clone()));
        }

        if let Some(stale) = matching.last() {
            // The authorized state advanced past the proposal's base.
            match on_authorized_change {
                OnAuthorizedChange::Abort => {
                    return Err(EngineError::failed_precondition(format!(
                        "{party}: authorized state advanced to {} past proposal base {}",
                        authorized.serial, stale.serial
                    )));
                }
                OnAuthorizedChange::Recreate => {
                    info!(op_id, "recreating proposal from advanced authorized base");
                }
            }
        }

        Ok(Satisfaction::Pending((target, authorized.serial.next())))
    }

    /// A candidate proposal matches the goal when applying the change to its
    /// member list reproduces the target's participant-id set and threshold.
    fn proposal_matches(
        change: &ParticipantChange,
        candidate: &PartyToParticipant,
        target: &PartyToParticipant,
    ) -> bool {
        match change.apply(candidate) {
            Ok(transformed) => {
                transformed.participant_set() == target.participant_set()
                    && transformed.threshold() == target.threshold()
            }
            Err(_) => false,
        }
    }

    /// Submit one signed transaction, translating a lost serial race
    /// according to the configured policy.
    async fn submit(
        &self,
        mapping: PartyToParticipant,
        serial: Serial,
        is_proposal: bool,
        on_authorized_change: OnAuthorizedChange,
    ) -> EngineResult<()> {
        let party = mapping.party().clone();
        match self
            .store
            .propose(mapping, serial, self.signer.clone(), is_proposal)
            .await
        {
            Ok(result) => {
                info!(
                    party = %party,
                    serial = result.serial.0,
                    is_proposal,
                    "submitted topology transaction"
                );
                Ok(())
            }
            Err(EngineError::FailedPrecondition { message })
                if on_authorized_change == OnAuthorizedChange::Recreate =>
            {
                // Lost the optimistic-concurrency race; rebase on re-check.
                debug!(party = %party, reason = %message, "serial race lost, rebasing");
                Err(EngineError::unavailable(format!(
                    "{party}: serial race lost at {serial}, rebasing"
                )))
            }
            Err(err) => Err(err),
        }
    }
}
