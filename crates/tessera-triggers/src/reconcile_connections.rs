//! Sequencer-connection reconciliation trigger.
//!
//! Each pass reads the target endpoint set from the external registry and
//! reconciles the live domain config against it. The comparison is by
//! endpoint identity set, so a registry that republishes the same endpoints
//! in a different order causes no reconnect storm.

use async_trait::async_trait;
use std::sync::Arc;
use tessera_core::{DomainAlias, EngineResult, NodeContext};
use tracing::debug;

use crate::connectivity::ConnectivityService;
use crate::target::TargetStateSource;
use crate::trigger::PollingTrigger;

/// Polling trigger keeping one domain's sequencer connections aligned with
/// the registry.
pub struct ReconcileSequencerConnectionsTrigger {
    service: ConnectivityService,
    source: Arc<dyn TargetStateSource>,
    alias: DomainAlias,
    ctx: NodeContext,
}

impl ReconcileSequencerConnectionsTrigger {
    /// Create a trigger for `alias`.
    pub fn new(
        service: ConnectivityService,
        source: Arc<dyn TargetStateSource>,
        alias: DomainAlias,
        ctx: NodeContext,
    ) -> Self {
        Self {
            service,
            source,
            alias,
            ctx,
        }
    }
}

#[async_trait]
impl PollingTrigger for ReconcileSequencerConnectionsTrigger {
    fn name(&self) -> &str {
        "reconcile-sequencer-connections"
    }

    async fn perform_work_if_available(&self) -> EngineResult<bool> {
        let Some(target) = self.source.sequencer_connections(self.ctx.now()).await? else {
            debug!(alias = %self.alias, "registry has no sequencer connection set yet");
            return Ok(false);
        };
        self.service
            .reconcile_sequencer_connections(&self.alias, target)
            .await?;
        Ok(false)
    }
}
