//! In-memory topology store.
//!
//! Models the authorized state and the proposal shelf per party, enforces
//! the serial compare-and-swap discipline on `propose`, and counts mutating
//! calls. `authorize_after_reads` injects a concurrent author: after the
//! given number of authorized-state reads, a foreign authorization lands,
//! so the next propose at the previously observed serial loses the race.

use async_trait::async_trait;
use parking_lot::Mutex;
use std::collections::HashMap;
use tessera_core::{EngineError, EngineResult, MemberId, PartyId};
use tessera_topology::{PartyToParticipant, Serial, TopologyQuery, TopologyResult, TopologyStore};

#[derive(Default)]
struct PartyRecord {
    authorized: Option<TopologyResult<PartyToParticipant>>,
    proposals: Vec<TopologyResult<PartyToParticipant>>,
}

struct PendingAuthorization {
    mapping: PartyToParticipant,
    serial: Serial,
    signed_by: MemberId,
    reads_remaining: u32,
}

#[derive(Default)]
struct Inner {
    parties: HashMap<PartyId, PartyRecord>,
    pending: Option<PendingAuthorization>,
    propose_calls: u32,
}

/// In-memory, serially-consistent topology store fake.
#[derive(Default)]
pub struct InMemoryTopologyStore {
    inner: Mutex<Inner>,
}

impl InMemoryTopologyStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed the authorized state for the mapping's party.
    pub fn set_authorized(&self, mapping: PartyToParticipant, serial: Serial, signed_by: MemberId) {
        let mut inner = self.inner.lock();
        let record = inner.parties.entry(mapping.party().clone()).or_default();
        record.authorized = Some(TopologyResult {
            mapping,
            serial,
            is_proposal: false,
            signed_by,
        });
    }

    /// Shelve a proposal without going through `propose`.
    pub fn add_proposal(&self, mapping: PartyToParticipant, serial: Serial, signed_by: MemberId) {
        let mut inner = self.inner.lock();
        let record = inner.parties.entry(mapping.party().clone()).or_default();
        record.proposals.push(TopologyResult {
            mapping,
            serial,
            is_proposal: true,
            signed_by,
        });
    }

    /// Schedule a foreign authorization to land after `reads` further reads
    /// of the authorized state.
    pub fn authorize_after_reads(
        &self,
        mapping: PartyToParticipant,
        serial: Serial,
        signed_by: MemberId,
        reads: u32,
    ) {
        self.inner.lock().pending = Some(PendingAuthorization {
            mapping,
            serial,
            signed_by,
            reads_remaining: reads,
        });
    }

    /// Number of `propose` calls issued, including rejected ones.
    pub fn propose_call_count(&self) -> u32 {
        self.inner.lock().propose_calls
    }

    /// Proposals currently shelved for a party.
    pub fn proposals_for(&self, party: &PartyId) -> Vec<TopologyResult<PartyToParticipant>> {
        self.inner
            .lock()
            .parties
            .get(party)
            .map(|r| r.proposals.clone())
            .unwrap_or_default()
    }
}

impl Inner {
    fn install_authorization(&mut self, pending: PendingAuthorization) {
        let record = self
            .parties
            .entry(pending.mapping.party().clone())
            .or_default();
        record.authorized = Some(TopologyResult {
            mapping: pending.mapping,
            serial: pending.serial,
            is_proposal: false,
            signed_by: pending.signed_by,
        });
        record.proposals.retain(|p| p.serial > pending.serial);
    }

    /// Count down the pending foreign authorization on an authorized-state
    /// read; the read that reaches zero still observes the old state.
    fn tick_pending(&mut self) {
        if let Some(pending) = &mut self.pending {
            if pending.reads_remaining > 0 {
                pending.reads_remaining -= 1;
            }
            if pending.reads_remaining == 0 {
                if let Some(pending) = self.pending.take() {
                    self.install_authorization(pending);
                }
            }
        }
    }

    fn results_for(
        record: &PartyRecord,
        query: &TopologyQuery,
    ) -> Vec<TopologyResult<PartyToParticipant>> {
        match query {
            TopologyQuery::AuthorizedState => record.authorized.clone().into_iter().collect(),
            TopologyQuery::ProposalSignedBy(member) => record
                .proposals
                .iter()
                .filter(|p| p.signed_by == *member)
                .cloned()
                .collect(),
            TopologyQuery::AllProposals => record.proposals.clone(),
        }
    }
}

#[async_trait]
impl TopologyStore for InMemoryTopologyStore {
    async fn list(
        &self,
        party: Option<&PartyId>,
        query: TopologyQuery,
    ) -> EngineResult<Vec<TopologyResult<PartyToParticipant>>> {
        let inner = self.inner.lock();
        let results = match party {
            Some(party) => inner
                .parties
                .get(party)
                .map(|record| Inner::results_for(record, &query))
                .unwrap_or_default(),
            None => inner
                .parties
                .values()
                .flat_map(|record| Inner::results_for(record, &query))
                .collect(),
        };
        Ok(results)
    }

    async fn get(
        &self,
        party: &PartyId,
        query: TopologyQuery,
    ) -> EngineResult<TopologyResult<PartyToParticipant>> {
        let mut inner = self.inner.lock();
        let result = inner
            .parties
            .get(party)
            .and_then(|record| {
                Inner::results_for(record, &query)
                    .into_iter()
                    .max_by_key(|r| r.serial)
            })
            .ok_or_else(|| EngineError::not_found(format!("{party}: no mapping in {query:?}")));
        if matches!(query, TopologyQuery::AuthorizedState) {
            inner.tick_pending();
        }
        result
    }

    async fn propose(
        &self,
        mapping: PartyToParticipant,
        serial: Serial,
        signed_by: MemberId,
        is_proposal: bool,
    ) -> EngineResult<TopologyResult<PartyToParticipant>> {
        let mut inner = self.inner.lock();
        inner.propose_calls += 1;
        let party = mapping.party().clone();
        let current = inner
            .parties
            .get(&party)
            .and_then(|r| r.authorized.as_ref())
            .map(|r| r.serial)
            .unwrap_or_default();
        if serial != current.next() {
            return Err(EngineError::failed_precondition(format!(
                "{party}: serial conflict, expected {}, got {serial}",
                current.next()
            )));
        }
        let result = TopologyResult {
            mapping,
            serial,
            is_proposal,
            signed_by,
        };
        let record = inner.parties.entry(party).or_default();
        if is_proposal {
            record.proposals.push(result.clone());
        } else {
            record.authorized = Some(result.clone());
            record.proposals.retain(|p| p.serial > serial);
        }
        Ok(result)
    }
}
