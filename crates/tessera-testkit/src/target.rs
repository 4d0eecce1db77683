//! Static target-state source set directly by the test.

use async_trait::async_trait;
use parking_lot::Mutex;
use std::collections::BTreeSet;
use tessera_core::{EngineResult, MemberId, Timestamp};
use tessera_triggers::{ScheduledMigration, SequencerConnection, TargetStateSource};

#[derive(Default)]
struct Inner {
    connections: Option<Vec<SequencerConnection>>,
    migration: Option<ScheduledMigration>,
    published: BTreeSet<MemberId>,
}

/// Target-state source whose answers are fixed by the test.
#[derive(Default)]
pub struct StaticTargetSource {
    inner: Mutex<Inner>,
}

impl StaticTargetSource {
    /// Create a source with no published state.
    pub fn new() -> Self {
        Self::default()
    }

    /// Publish a sequencer connection set.
    pub fn set_connections(&self, connections: Vec<SequencerConnection>) {
        self.inner.lock().connections = Some(connections);
    }

    /// Retract the published connection set.
    pub fn clear_connections(&self) {
        self.inner.lock().connections = None;
    }

    /// Schedule a migration.
    pub fn set_migration(&self, migration: ScheduledMigration) {
        self.inner.lock().migration = Some(migration);
    }

    /// Clear the migration schedule.
    pub fn clear_migration(&self) {
        self.inner.lock().migration = None;
    }

    /// Mark a member's coordination info as published.
    pub fn publish(&self, member: MemberId) {
        self.inner.lock().published.insert(member);
    }
}

#[async_trait]
impl TargetStateSource for StaticTargetSource {
    async fn sequencer_connections(
        &self,
        _as_of: Timestamp,
    ) -> EngineResult<Option<Vec<SequencerConnection>>> {
        Ok(self.inner.lock().connections.clone())
    }

    async fn migration_schedule(&self) -> EngineResult<Option<ScheduledMigration>> {
        Ok(self.inner.lock().migration.clone())
    }

    async fn published_members(&self) -> EngineResult<BTreeSet<MemberId>> {
        Ok(self.inner.lock().published.clone())
    }
}
