//! Pruning coordination.
//!
//! History before a safe timestamp may be discarded once every member has
//! acknowledged it. A member whose acknowledged timestamp is older than the
//! requested cutoff prevents pruning. This node may disable its own lagging
//! members (they are being decommissioned or will catch up from a snapshot),
//! but never a foreign one: if a foreign member lags, the cycle fails loudly
//! and an operator has to intervene.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use tessera_core::{EngineError, EngineResult, MemberId, NodeContext, Timestamp};
use tracing::{debug, info, warn};

use crate::target::TargetStateSource;
use crate::trigger::PollingTrigger;

/// Acknowledged pruning timestamp of one member.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MemberPruningInfo {
    /// The member.
    pub member: MemberId,
    /// Oldest timestamp the member still needs history from.
    pub safe_timestamp: Timestamp,
}

/// Per-member safe-pruning timestamps of one sequencer.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SequencerPruningStatus {
    /// All members the sequencer tracks acknowledgements for.
    pub members: Vec<MemberPruningInfo>,
}

impl SequencerPruningStatus {
    /// The timestamp up to which pruning is currently safe, i.e. the oldest
    /// member acknowledgement. `None` when no members are tracked.
    pub fn safe_timestamp(&self) -> Option<Timestamp> {
        self.members.iter().map(|m| m.safe_timestamp).min()
    }

    /// Members whose acknowledgement is older than the requested cutoff.
    pub fn members_preventing_pruning(&self, cutoff: Timestamp) -> Vec<&MemberPruningInfo> {
        self.members
            .iter()
            .filter(|m| m.safe_timestamp < cutoff)
            .collect()
    }
}

/// Admin API surface of the sequencer's pruning operations.
#[async_trait]
pub trait SequencerPruningAdmin: Send + Sync {
    /// Current per-member acknowledgement status.
    async fn pruning_status(&self) -> EngineResult<SequencerPruningStatus>;
    /// Stop tracking a member's acknowledgements.
    async fn disable_member(&self, member: &MemberId) -> EngineResult<()>;
    /// Irreversibly discard history before `cutoff`.
    async fn prune(&self, cutoff: Timestamp) -> EngineResult<()>;
}

/// Configuration of the pruning coordinator.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PruningConfig {
    /// How much history to retain behind the current wall clock.
    pub retention: Duration,
}

impl Default for PruningConfig {
    fn default() -> Self {
        Self {
            retention: Duration::from_secs(30 * 24 * 3600),
        }
    }
}

/// Fire-and-forget pruning pass, run once per poll cycle.
pub struct SequencerPruningTrigger {
    admin: Arc<dyn SequencerPruningAdmin>,
    source: Arc<dyn TargetStateSource>,
    ctx: NodeContext,
    config: PruningConfig,
}

impl SequencerPruningTrigger {
    /// Create a pruning trigger for the node's own sequencer.
    pub fn new(
        admin: Arc<dyn SequencerPruningAdmin>,
        source: Arc<dyn TargetStateSource>,
        ctx: NodeContext,
        config: PruningConfig,
    ) -> Self {
        Self {
            admin,
            source,
            ctx,
            config,
        }
    }

    async fn prune_once(&self) -> EngineResult<()> {
        let cutoff = self.ctx.now().minus(self.config.retention);
        let status = self.admin.pruning_status().await?;
        let blockers = status.members_preventing_pruning(cutoff);

        if !blockers.is_empty() {
            // Authority check first: never disable a member this node does
            // not own, and do not touch the local ones either when a foreign
            // member would still block the prune afterwards.
            let foreign: Vec<&MemberId> = blockers
                .iter()
                .filter(|b| !self.ctx.owns(&b.member))
                .map(|b| &b.member)
                .collect();
            if !foreign.is_empty() {
                return Err(EngineError::failed_precondition(format!(
                    "pruning at {cutoff} blocked by members outside local authority: {}",
                    foreign
                        .iter()
                        .map(|m| m.to_string())
                        .collect::<Vec<_>>()
                        .join(", ")
                )));
            }
            for blocker in &blockers {
                info!(member = %blocker.member, acknowledged = %blocker.safe_timestamp,
                      "disabling lagging local member to unblock pruning");
                self.admin.disable_member(&blocker.member).await?;
            }
            // The disables must have moved the safe timestamp past the
            // cutoff; anything else is an inconsistency.
            let refreshed = self.admin.pruning_status().await?;
            let still_blocking = refreshed.members_preventing_pruning(cutoff);
            if !still_blocking.is_empty() {
                return Err(EngineError::internal(format!(
                    "disabled all local blockers but {} members still prevent pruning at {cutoff}",
                    still_blocking.len()
                )));
            }
        }

        info!(%cutoff, "pruning sequencer history");
        self.admin.prune(cutoff).await
    }
}

#[async_trait]
impl PollingTrigger for SequencerPruningTrigger {
    fn name(&self) -> &str {
        "sequencer-pruning"
    }

    /// One pruning pass. Always reports no further work: the next cycle
    /// re-derives everything from live status.
    async fn perform_work_if_available(&self) -> EngineResult<bool> {
        let Some(own_sequencer) = self.ctx.sequencer_id() else {
            debug!("node runs no sequencer, skipping pruning pass");
            return Ok(false);
        };
        // During bootstrap our own info is not yet in the shared
        // coordination state; skip silently until it is.
        let published = self.source.published_members().await?;
        if !published.contains(&MemberId::Sequencer(own_sequencer.clone())) {
            debug!(sequencer = %own_sequencer, "own sequencer not yet published, skipping");
            return Ok(false);
        }
        if let Err(err) = self.prune_once().await {
            warn!(%err, "pruning pass failed");
            return Err(err);
        }
        Ok(false)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn member(id: &str) -> MemberId {
        MemberId::Participant(tessera_core::ParticipantId::new(id))
    }

    fn info_at(id: &str, micros: i64) -> MemberPruningInfo {
        MemberPruningInfo {
            member: member(id),
            safe_timestamp: Timestamp::from_micros(micros),
        }
    }

    #[test]
    fn safe_timestamp_is_the_oldest_acknowledgement() {
        let status = SequencerPruningStatus {
            members: vec![info_at("a", 100), info_at("b", 50), info_at("c", 200)],
        };
        assert_eq!(status.safe_timestamp(), Some(Timestamp::from_micros(50)));
    }

    #[test]
    fn members_behind_the_cutoff_prevent_pruning() {
        let status = SequencerPruningStatus {
            members: vec![info_at("a", 100), info_at("b", 50)],
        };
        let blockers = status.members_preventing_pruning(Timestamp::from_micros(80));
        assert_eq!(blockers.len(), 1);
        assert_eq!(blockers[0].member, member("b"));
    }

    #[test]
    fn empty_status_never_blocks() {
        let status = SequencerPruningStatus::default();
        assert_eq!(status.safe_timestamp(), None);
        assert!(status
            .members_preventing_pruning(Timestamp::from_micros(1))
            .is_empty());
    }
}
