//! Migration cut-over trigger.
//!
//! A scheduled migration is a (timestamp, migration id) pair agreed out of
//! band. Once the cut-over instant is reached, this trigger pauses the
//! configured reconciliation gates (nothing should mutate topology or
//! connectivity during the handover) and invokes the migration handler
//! exactly once per migration id. In-flight work is not cancelled; the gates
//! only stop new task production.

use async_trait::async_trait;
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tessera_core::{EngineResult, MigrationId, NodeContext, Timestamp};
use tracing::{debug, info};

use crate::target::TargetStateSource;
use crate::trigger::{PollingTrigger, TriggerGate};

/// A future cut-over point for a synchronizer migration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScheduledMigration {
    /// Instant at which the dump/handover must occur.
    pub timestamp: Timestamp,
    /// Identifier of the migration.
    pub migration_id: MigrationId,
}

/// Performs the dump and handover of one migration.
#[async_trait]
pub trait MigrationHandler: Send + Sync {
    /// Execute the migration. Must be idempotent; the trigger retries on the
    /// next cycle if this fails.
    async fn perform_dump_and_handover(&self, migration: &ScheduledMigration) -> EngineResult<()>;
}

/// Watches the migration schedule and fires the handover at the cut-over.
pub struct DomainMigrationTrigger {
    source: Arc<dyn TargetStateSource>,
    handler: Arc<dyn MigrationHandler>,
    ctx: NodeContext,
    gates_to_pause: Vec<TriggerGate>,
    last_handled: Mutex<Option<MigrationId>>,
}

impl DomainMigrationTrigger {
    /// Create a migration trigger pausing `gates_to_pause` at cut-over.
    pub fn new(
        source: Arc<dyn TargetStateSource>,
        handler: Arc<dyn MigrationHandler>,
        ctx: NodeContext,
        gates_to_pause: Vec<TriggerGate>,
    ) -> Self {
        Self {
            source,
            handler,
            ctx,
            gates_to_pause,
            last_handled: Mutex::new(None),
        }
    }

    /// The migration most recently handed over, if any.
    pub fn last_handled(&self) -> Option<MigrationId> {
        *self.last_handled.lock()
    }

    fn cutover_reached(&self, migration: &ScheduledMigration, now: Timestamp) -> bool {
        now >= migration.timestamp
    }
}

#[async_trait]
impl PollingTrigger for DomainMigrationTrigger {
    fn name(&self) -> &str {
        "domain-migration"
    }

    async fn perform_work_if_available(&self) -> EngineResult<bool> {
        let Some(migration) = self.source.migration_schedule().await? else {
            return Ok(false);
        };
        if *self.last_handled.lock() == Some(migration.migration_id) {
            debug!(migration = %migration.migration_id, "migration already handled");
            return Ok(false);
        }
        let now = self.ctx.now();
        if !self.cutover_reached(&migration, now) {
            debug!(
                migration = %migration.migration_id,
                cutover = %migration.timestamp,
                "cut-over not reached"
            );
            return Ok(false);
        }

        info!(
            migration = %migration.migration_id,
            "cut-over reached, pausing reconciliation and handing over"
        );
        for gate in &self.gates_to_pause {
            gate.pause();
        }
        // On failure the gates stay paused: resuming reconciliation in the
        // middle of a half-done handover would be worse than staying quiet
        // until the next attempt.
        self.handler.perform_dump_and_handover(&migration).await?;
        *self.last_handled.lock() = Some(migration.migration_id);
        info!(migration = %migration.migration_id, "handover complete");
        Ok(false)
    }
}
