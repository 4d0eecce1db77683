//! Trigger runners.
//!
//! [`TaskTriggerRunner`] drives a [`TaskTrigger`] on a polling cadence (plus
//! explicit wake-up), deduplicating by task identity, bounding parallelism,
//! discarding stale tasks, and retrying transient failures per task under a
//! bounded policy. [`PollingTriggerRunner`] drives a [`PollingTrigger`] with
//! the same gate and shutdown discipline.
//!
//! The in-flight identity set is the only shared mutable state; insertion is
//! atomic insert-if-absent under one mutex, which is what guarantees at most
//! one outstanding attempt per task identity. Executions of distinct
//! identities run in parallel up to the pool size; within one identity they
//! are totally ordered.

use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;
use tessera_core::{EngineResult, ShutdownSignal};
use tessera_retry::RetryPolicy;
use tokio::sync::{Notify, Semaphore};
use tokio::time::interval;
use tracing::{debug, info, warn};

use crate::trigger::{PollingTrigger, TaskOutcome, TaskTrigger, TriggerGate};

/// Configuration for trigger runners.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SchedulerConfig {
    /// Interval between polling cycles.
    pub polling_interval: Duration,
    /// Maximum number of task executions in flight at once.
    pub max_parallel_tasks: usize,
    /// Retry policy applied per task on transient failure.
    pub task_retry: RetryPolicy,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            polling_interval: Duration::from_secs(30),
            max_parallel_tasks: 8,
            task_retry: RetryPolicy::automation(),
        }
    }
}

/// Counters describing runner behavior, for logs and tests.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SchedulerStatistics {
    /// Polling cycles completed.
    pub cycles: u64,
    /// Tasks handed to an executor.
    pub tasks_dispatched: u64,
    /// Tasks that completed with `Completed` or `Noop`.
    pub tasks_completed: u64,
    /// Tasks that exhausted their retry budget or failed fatally.
    pub tasks_failed: u64,
    /// Tasks discarded because their precondition vanished.
    pub tasks_discarded_stale: u64,
}

struct RunnerInner<T: TaskTrigger> {
    trigger: Arc<T>,
    config: SchedulerConfig,
    gate: TriggerGate,
    shutdown: ShutdownSignal,
    in_flight: Mutex<HashSet<T::Task>>,
    limiter: Semaphore,
    wake: Notify,
    stats: Mutex<SchedulerStatistics>,
}

/// Drives one [`TaskTrigger`]. Cheap to clone; clones share all state.
pub struct TaskTriggerRunner<T: TaskTrigger> {
    inner: Arc<RunnerInner<T>>,
}

impl<T: TaskTrigger> Clone for TaskTriggerRunner<T> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<T: TaskTrigger> TaskTriggerRunner<T> {
    /// Create a runner for `trigger`.
    pub fn new(
        trigger: Arc<T>,
        config: SchedulerConfig,
        gate: TriggerGate,
        shutdown: ShutdownSignal,
    ) -> Self {
        let limiter = Semaphore::new(config.max_parallel_tasks.max(1));
        Self {
            inner: Arc::new(RunnerInner {
                trigger,
                config,
                gate,
                shutdown,
                in_flight: Mutex::new(HashSet::new()),
                limiter,
                wake: Notify::new(),
                stats: Mutex::new(SchedulerStatistics::default()),
            }),
        }
    }

    /// Request an immediate polling cycle without waiting for the cadence.
    pub fn poke(&self) {
        self.inner.wake.notify_one();
    }

    /// Snapshot of the runner counters.
    pub fn statistics(&self) -> SchedulerStatistics {
        self.inner.stats.lock().clone()
    }

    /// Number of task identities currently executing.
    pub fn in_flight_count(&self) -> usize {
        self.inner.in_flight.lock().len()
    }

    /// Run the polling loop until shutdown.
    pub async fn run(&self) {
        let name = self.inner.trigger.name().to_string();
        info!(trigger = %name, "task runner started");
        let mut ticker = interval(self.inner.config.polling_interval);
        loop {
            tokio::select! {
                _ = ticker.tick() => {}
                _ = self.inner.wake.notified() => {}
                _ = self.inner.shutdown.triggered() => break,
            }
            if self.inner.shutdown.is_triggered() {
                break;
            }
            if !self.inner.gate.is_enabled() {
                debug!(trigger = %name, "trigger paused, skipping cycle");
                continue;
            }
            // One failed cycle is logged and retried on the next tick.
            if let Err(err) = self.run_once().await {
                warn!(trigger = %name, %err, "polling cycle failed");
            }
        }
        info!(trigger = %name, "task runner stopped");
    }

    /// Execute one polling cycle: discover tasks and dispatch the ones not
    /// already in flight.
    pub async fn run_once(&self) -> EngineResult<()> {
        let tasks = self.inner.trigger.retrieve_tasks().await?;
        let mut stats = self.inner.stats.lock();
        stats.cycles += 1;
        drop(stats);

        for task in tasks {
            // Atomic insert-if-absent: an identity already executing is
            // excluded from this batch.
            if !self.inner.in_flight.lock().insert(task.clone()) {
                debug!(trigger = self.inner.trigger.name(), ?task, "task already in flight");
                continue;
            }
            self.inner.stats.lock().tasks_dispatched += 1;
            let inner = Arc::clone(&self.inner);
            tokio::spawn(async move {
                execute_task(inner, task).await;
            });
        }
        Ok(())
    }
}

/// Execute one task to completion, honoring staleness, bounded retry, and
/// shutdown; always removes the identity from the in-flight set at the end.
async fn execute_task<T: TaskTrigger>(inner: Arc<RunnerInner<T>>, task: T::Task) {
    let permit = tokio::select! {
        permit = inner.limiter.acquire() => permit,
        _ = inner.shutdown.triggered() => {
            inner.in_flight.lock().remove(&task);
            return;
        }
    };
    // The semaphore is never closed while the runner is alive.
    let Ok(_permit) = permit else {
        inner.in_flight.lock().remove(&task);
        return;
    };

    let name = inner.trigger.name();
    let policy = &inner.config.task_retry;
    let mut attempts: u32 = 0;
    loop {
        if inner.shutdown.is_triggered() {
            debug!(trigger = %name, ?task, "abandoning task: shutdown in progress");
            break;
        }
        attempts += 1;
        let delay = policy.backoff_for(attempts);
        if delay > Duration::ZERO {
            tokio::select! {
                _ = tokio::time::sleep(delay) => {}
                _ = inner.shutdown.triggered() => break,
            }
        }

        // Re-checked before every attempt: the precondition may vanish while
        // the task waits out a backoff.
        match inner.trigger.is_stale_task(&task).await {
            Ok(true) => {
                info!(trigger = %name, ?task, "discarding stale task");
                inner.stats.lock().tasks_discarded_stale += 1;
                break;
            }
            Ok(false) => {}
            Err(err) => {
                debug!(trigger = %name, ?task, %err, "staleness check failed, treating as live");
            }
        }

        match inner.trigger.complete_task(&task).await {
            Ok(TaskOutcome::Completed(summary)) => {
                info!(trigger = %name, ?task, summary, "task completed");
                inner.stats.lock().tasks_completed += 1;
                break;
            }
            Ok(TaskOutcome::Noop) => {
                debug!(trigger = %name, ?task, "task was a no-op");
                inner.stats.lock().tasks_completed += 1;
                break;
            }
            Err(err) if err.is_cancelled() => {
                debug!(trigger = %name, ?task, "task cancelled by shutdown");
                break;
            }
            Err(err) if !err.is_retryable() => {
                warn!(trigger = %name, ?task, %err, "task failed fatally");
                inner.stats.lock().tasks_failed += 1;
                break;
            }
            Err(err) => {
                if policy.allows_another_attempt(attempts) {
                    debug!(trigger = %name, ?task, attempt = attempts, %err, "task failed, will retry");
                } else {
                    warn!(trigger = %name, ?task, attempts, %err, "task retry budget exhausted");
                    inner.stats.lock().tasks_failed += 1;
                    break;
                }
            }
        }
    }
    inner.in_flight.lock().remove(&task);
}

/// Drives one [`PollingTrigger`] on a fixed cadence until shutdown.
pub struct PollingTriggerRunner {
    trigger: Arc<dyn PollingTrigger>,
    polling_interval: Duration,
    gate: TriggerGate,
    shutdown: ShutdownSignal,
}

impl PollingTriggerRunner {
    /// Create a runner for `trigger`.
    pub fn new(
        trigger: Arc<dyn PollingTrigger>,
        polling_interval: Duration,
        gate: TriggerGate,
        shutdown: ShutdownSignal,
    ) -> Self {
        Self {
            trigger,
            polling_interval,
            gate,
            shutdown,
        }
    }

    /// Run the polling loop until shutdown. A failed pass is logged and
    /// retried on the next tick; it never crashes the loop.
    pub async fn run(&self) {
        let name = self.trigger.name().to_string();
        info!(trigger = %name, "polling runner started");
        let mut ticker = interval(self.polling_interval);
        loop {
            tokio::select! {
                _ = ticker.tick() => {}
                _ = self.shutdown.triggered() => break,
            }
            if self.shutdown.is_triggered() {
                break;
            }
            if !self.gate.is_enabled() {
                debug!(trigger = %name, "trigger paused, skipping pass");
                continue;
            }
            // Drain the more-work hint before going back to sleep. The hint
            // can repeat indefinitely, so shutdown is re-checked per pass.
            loop {
                if self.shutdown.is_triggered() {
                    info!(trigger = %name, "polling runner stopped");
                    return;
                }
                match self.trigger.perform_work_if_available().await {
                    Ok(true) => continue,
                    Ok(false) => break,
                    Err(err) if err.is_cancelled() => {
                        info!(trigger = %name, "polling runner stopped");
                        return;
                    }
                    Err(err) => {
                        warn!(trigger = %name, %err, "trigger pass failed");
                        break;
                    }
                }
            }
        }
        info!(trigger = %name, "polling runner stopped");
    }
}
