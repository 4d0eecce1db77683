//! Topology store accessor interface.
//!
//! The store is an external distributed log. Reads return point-in-time
//! snapshots; writes are signed transactions ordered by a monotonically
//! increasing serial per mapping identity. The serial doubles as the
//! optimistic-concurrency token: a propose whose serial is not exactly one
//! past the authorized serial loses the race and is rejected.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::fmt;
use tessera_core::{EngineResult, MemberId, PartyId};

use crate::mapping::PartyToParticipant;

/// Monotonic version counter of a topology mapping.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize,
)]
pub struct Serial(pub u64);

impl Serial {
    /// The successor serial.
    pub fn next(&self) -> Serial {
        Serial(self.0 + 1)
    }
}

impl fmt::Display for Serial {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "serial={}", self.0)
    }
}

/// Which view of the store a query targets.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum TopologyQuery {
    /// The fully co-signed, effective state.
    AuthorizedState,
    /// Pending proposals carrying a signature by the given member.
    ProposalSignedBy(MemberId),
    /// All pending proposals regardless of signer.
    AllProposals,
}

/// A mapping snapshot together with its authorization metadata.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TopologyResult<M> {
    /// The mapping payload.
    pub mapping: M,
    /// Version of the transaction carrying the mapping.
    pub serial: Serial,
    /// Whether this is a pending proposal (vs. authorized state).
    pub is_proposal: bool,
    /// The member whose signature this snapshot carries.
    pub signed_by: MemberId,
}

/// Accessor for the party-to-participant mappings of the topology store.
///
/// All operations are single round-trips to the distributed log. `get` fails
/// with `NotFound` when the queried view holds no mapping for the party;
/// callers routinely treat that as "not created yet".
#[async_trait]
pub trait TopologyStore: Send + Sync {
    /// List mappings visible in the queried view, optionally filtered to one
    /// party.
    async fn list(
        &self,
        party: Option<&PartyId>,
        query: TopologyQuery,
    ) -> EngineResult<Vec<TopologyResult<PartyToParticipant>>>;

    /// Fetch the mapping for one party from the queried view.
    async fn get(
        &self,
        party: &PartyId,
        query: TopologyQuery,
    ) -> EngineResult<TopologyResult<PartyToParticipant>>;

    /// Submit a signed topology transaction at the given serial.
    ///
    /// With `is_proposal` the transaction awaits co-signatures; otherwise it
    /// authorizes directly. Fails with `FailedPrecondition` when `serial` is
    /// not exactly one past the currently authorized serial.
    async fn propose(
        &self,
        mapping: PartyToParticipant,
        serial: Serial,
        signed_by: MemberId,
        is_proposal: bool,
    ) -> EngineResult<TopologyResult<PartyToParticipant>>;
}
