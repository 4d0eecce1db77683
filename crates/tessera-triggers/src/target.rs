//! External target-state source.
//!
//! Discovery/registry service consumed read-only by the triggers: it knows
//! the sequencer endpoints the cluster agreed on, the migration schedule,
//! and which members have published their coordination info.

use async_trait::async_trait;
use std::collections::BTreeSet;
use tessera_core::{EngineResult, MemberId, Timestamp};

use crate::connectivity::SequencerConnection;
use crate::migration::ScheduledMigration;

/// Read-only view of the externally agreed target state.
#[async_trait]
pub trait TargetStateSource: Send + Sync {
    /// The sequencer connections a participant should hold as of the given
    /// instant; `None` while the registry has not published a set yet.
    async fn sequencer_connections(
        &self,
        as_of: Timestamp,
    ) -> EngineResult<Option<Vec<SequencerConnection>>>;

    /// The next scheduled migration, if any.
    async fn migration_schedule(&self) -> EngineResult<Option<ScheduledMigration>>;

    /// Members that have published their coordination info for the domain.
    async fn published_members(&self) -> EngineResult<BTreeSet<MemberId>>;
}
