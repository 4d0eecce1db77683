//! Recording fake of the sequencer pruning admin.

use async_trait::async_trait;
use parking_lot::Mutex;
use tessera_core::{EngineError, EngineResult, MemberId, Timestamp};
use tessera_triggers::{SequencerPruningAdmin, SequencerPruningStatus};

/// One mutating pruning RPC, in issue order.
#[derive(Debug, Clone, PartialEq, Eq)]
#[allow(missing_docs)]
pub enum PruningCall {
    DisableMember(MemberId),
    Prune(Timestamp),
}

#[derive(Default)]
struct Inner {
    status: SequencerPruningStatus,
    calls: Vec<PruningCall>,
    fail_prune: bool,
}

/// In-memory pruning admin. Disabling a member drops it from the tracked
/// status, so a subsequent status read no longer sees it as a blocker.
#[derive(Default)]
pub struct RecordingPruningAdmin {
    inner: Mutex<Inner>,
}

impl RecordingPruningAdmin {
    /// Create an admin reporting the given status.
    pub fn with_status(status: SequencerPruningStatus) -> Self {
        Self {
            inner: Mutex::new(Inner {
                status,
                calls: Vec::new(),
                fail_prune: false,
            }),
        }
    }

    /// Replace the reported status.
    pub fn set_status(&self, status: SequencerPruningStatus) {
        self.inner.lock().status = status;
    }

    /// Make `prune` fail with an internal error.
    pub fn fail_prune(&self) {
        self.inner.lock().fail_prune = true;
    }

    /// All mutating RPCs issued so far.
    pub fn calls(&self) -> Vec<PruningCall> {
        self.inner.lock().calls.clone()
    }

    /// Cutoffs of the prune calls issued so far.
    pub fn prune_cutoffs(&self) -> Vec<Timestamp> {
        self.inner
            .lock()
            .calls
            .iter()
            .filter_map(|c| match c {
                PruningCall::Prune(cutoff) => Some(*cutoff),
                PruningCall::DisableMember(_) => None,
            })
            .collect()
    }

    /// Members disabled so far.
    pub fn disabled_members(&self) -> Vec<MemberId> {
        self.inner
            .lock()
            .calls
            .iter()
            .filter_map(|c| match c {
                PruningCall::DisableMember(member) => Some(member.clone()),
                PruningCall::Prune(_) => None,
            })
            .collect()
    }
}

#[async_trait]
impl SequencerPruningAdmin for RecordingPruningAdmin {
    async fn pruning_status(&self) -> EngineResult<SequencerPruningStatus> {
        Ok(self.inner.lock().status.clone())
    }

    async fn disable_member(&self, member: &MemberId) -> EngineResult<()> {
        let mut inner = self.inner.lock();
        inner.calls.push(PruningCall::DisableMember(member.clone()));
        inner.status.members.retain(|m| m.member != *member);
        Ok(())
    }

    async fn prune(&self, cutoff: Timestamp) -> EngineResult<()> {
        let mut inner = self.inner.lock();
        inner.calls.push(PruningCall::Prune(cutoff));
        if inner.fail_prune {
            return Err(EngineError::internal("pruning backend unavailable"));
        }
        Ok(())
    }
}
