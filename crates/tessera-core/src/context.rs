//! Owned per-node context.
//!
//! One context object is constructed at startup and handed to every
//! component. It carries the identities this node is authoritative for, the
//! clock, and the shutdown signal. There is no global state; teardown is
//! `ShutdownSignal::trigger` followed by dropping the context.

use crate::identifiers::{MediatorId, MemberId, ParticipantId, SequencerId};
use crate::shutdown::ShutdownSignal;
use crate::time::{Clock, Timestamp};
use std::sync::Arc;

/// Identities and shared infrastructure owned by one synchronizer node.
#[derive(Clone)]
pub struct NodeContext {
    participant_id: ParticipantId,
    mediator_id: Option<MediatorId>,
    sequencer_id: Option<SequencerId>,
    clock: Arc<dyn Clock>,
    shutdown: ShutdownSignal,
}

impl NodeContext {
    /// Build a context for a node running a participant and, optionally,
    /// co-located mediator and sequencer instances.
    pub fn new(
        participant_id: ParticipantId,
        mediator_id: Option<MediatorId>,
        sequencer_id: Option<SequencerId>,
        clock: Arc<dyn Clock>,
        shutdown: ShutdownSignal,
    ) -> Self {
        Self {
            participant_id,
            mediator_id,
            sequencer_id,
            clock,
            shutdown,
        }
    }

    /// This node's participant identity.
    pub fn participant_id(&self) -> &ParticipantId {
        &self.participant_id
    }

    /// This node's mediator identity, if it runs one.
    pub fn mediator_id(&self) -> Option<&MediatorId> {
        self.mediator_id.as_ref()
    }

    /// This node's sequencer identity, if it runs one.
    pub fn sequencer_id(&self) -> Option<&SequencerId> {
        self.sequencer_id.as_ref()
    }

    /// Whether `member` is one of this node's own identities.
    ///
    /// Pruning uses this as the authority check: members that are not owned
    /// must never be disabled by this node.
    pub fn owns(&self, member: &MemberId) -> bool {
        match member {
            MemberId::Participant(id) => *id == self.participant_id,
            MemberId::Mediator(id) => self.mediator_id.as_ref() == Some(id),
            MemberId::Sequencer(id) => self.sequencer_id.as_ref() == Some(id),
        }
    }

    /// The current wall-clock instant from the injected clock.
    pub fn now(&self) -> Timestamp {
        self.clock.now()
    }

    /// The shared clock handle.
    pub fn clock(&self) -> Arc<dyn Clock> {
        Arc::clone(&self.clock)
    }

    /// The shared shutdown signal.
    pub fn shutdown(&self) -> &ShutdownSignal {
        &self.shutdown
    }
}

impl std::fmt::Debug for NodeContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("NodeContext")
            .field("participant_id", &self.participant_id)
            .field("mediator_id", &self.mediator_id)
            .field("sequencer_id", &self.sequencer_id)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::time::SystemClock;

    fn test_context() -> NodeContext {
        NodeContext::new(
            ParticipantId::new("p1"),
            Some(MediatorId::new("m1")),
            Some(SequencerId::new("s1")),
            Arc::new(SystemClock),
            ShutdownSignal::new(),
        )
    }

    #[test]
    fn owns_all_local_identities() {
        let ctx = test_context();
        assert!(ctx.owns(&ParticipantId::new("p1").into()));
        assert!(ctx.owns(&MediatorId::new("m1").into()));
        assert!(ctx.owns(&SequencerId::new("s1").into()));
    }

    #[test]
    fn does_not_own_foreign_members() {
        let ctx = test_context();
        assert!(!ctx.owns(&ParticipantId::new("p2").into()));
        assert!(!ctx.owns(&SequencerId::new("s2").into()));
    }

    #[test]
    fn participant_only_node_owns_no_sequencer() {
        let ctx = NodeContext::new(
            ParticipantId::new("p1"),
            None,
            None,
            Arc::new(SystemClock),
            ShutdownSignal::new(),
        );
        assert!(!ctx.owns(&SequencerId::new("s1").into()));
    }
}
