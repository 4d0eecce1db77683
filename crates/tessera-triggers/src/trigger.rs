//! Trigger contracts.
//!
//! Two task-production strategies converge on one execution discipline: a
//! [`TaskTrigger`] produces discrete, identity-carrying tasks that the runner
//! deduplicates and executes; a [`PollingTrigger`] performs one pass of work
//! per invocation and reports whether more is pending.

use async_trait::async_trait;
use std::fmt::Debug;
use std::hash::Hash;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tessera_core::EngineResult;

/// Outcome of executing one task.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TaskOutcome {
    /// The task performed work; carries a human-readable summary.
    Completed(String),
    /// The task found nothing to do.
    Noop,
}

/// Pause switch for a trigger, independent of the runner loop.
///
/// Pausing suspends task production only; work already in flight runs to
/// completion. Used to keep triggers quiet during externally coordinated
/// maintenance windows such as a domain migration.
#[derive(Debug, Clone, Default)]
pub struct TriggerGate {
    paused: Arc<AtomicBool>,
}

impl TriggerGate {
    /// Create a gate in the enabled state.
    pub fn new() -> Self {
        Self::default()
    }

    /// Suspend task production.
    pub fn pause(&self) {
        self.paused.store(true, Ordering::SeqCst);
    }

    /// Resume task production.
    pub fn resume(&self) {
        self.paused.store(false, Ordering::SeqCst);
    }

    /// Whether the trigger may currently produce tasks.
    pub fn is_enabled(&self) -> bool {
        !self.paused.load(Ordering::SeqCst)
    }
}

/// A trigger producing discrete tasks with stable identities.
///
/// Task identity must be stable across polling cycles: re-discovering a task
/// that is still executing must not duplicate the in-flight work, so the
/// runner excludes executing identities from each new batch.
#[async_trait]
pub trait TaskTrigger: Send + Sync + 'static {
    /// Comparable identity of one unit of pending work.
    type Task: Clone + Eq + Hash + Debug + Send + Sync + 'static;

    /// Name used in logs.
    fn name(&self) -> &str;

    /// Produce the current set of outstanding tasks, recomputed on every
    /// poll.
    async fn retrieve_tasks(&self) -> EngineResult<Vec<Self::Task>>;

    /// Execute one task. Transient failures are retried by the runner under
    /// its bounded policy.
    async fn complete_task(&self, task: &Self::Task) -> EngineResult<TaskOutcome>;

    /// Whether the real-world precondition for the task has vanished since
    /// discovery. Stale tasks are discarded without executing or retrying.
    async fn is_stale_task(&self, _task: &Self::Task) -> EngineResult<bool> {
        Ok(false)
    }
}

/// A trigger performing one pass of reconciliation work per invocation.
#[async_trait]
pub trait PollingTrigger: Send + Sync + 'static {
    /// Name used in logs.
    fn name(&self) -> &str;

    /// Perform available work; returns whether more work is pending, in
    /// which case the runner re-invokes immediately instead of waiting for
    /// the next cadence tick.
    async fn perform_work_if_available(&self) -> EngineResult<bool>;
}
