//! Check-then-update convergence loops.

use crate::policy::RetryPolicy;
use std::future::Future;
use std::time::Duration;
use tessera_core::{EngineError, EngineResult, ShutdownSignal};
use tracing::{debug, info, warn};

/// Outcome of one goal check.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Satisfaction<S, H> {
    /// The goal already holds; carries evidence (e.g. the current state).
    Satisfied(S),
    /// The goal does not hold yet; carries a hint for the update step
    /// (e.g. the state to update from).
    Pending(H),
}

/// Drives idempotent convergence loops under a named retry policy.
///
/// Cloneable; all clones observe the same shutdown signal.
#[derive(Debug, Clone)]
pub struct RetryProvider {
    shutdown: ShutdownSignal,
}

impl RetryProvider {
    /// Create a provider observing the given shutdown signal.
    pub fn new(shutdown: ShutdownSignal) -> Self {
        Self { shutdown }
    }

    /// Repeatedly check a goal and, while it does not hold, apply an update.
    ///
    /// The check runs before every update attempt, so an update that took
    /// effect despite a timeout is observed on the next iteration instead of
    /// being applied twice. `FailedPrecondition` from either closure aborts
    /// immediately: the target must be re-derived by the caller, retrying
    /// would repeat the same mistake. Exhausting the budget surfaces the last
    /// observed failure.
    pub async fn ensure_that<S, H, C, CFut, U, UFut>(
        &self,
        policy: &RetryPolicy,
        op_id: &str,
        description: &str,
        check: C,
        update: U,
    ) -> EngineResult<S>
    where
        C: Fn() -> CFut,
        CFut: Future<Output = EngineResult<Satisfaction<S, H>>>,
        U: Fn(H) -> UFut,
        UFut: Future<Output = EngineResult<()>>,
    {
        let mut attempts: u32 = 0;
        let mut last_failure: Option<EngineError> = None;
        loop {
            if self.shutdown.is_triggered() {
                debug!(op_id, "aborting convergence loop: shutdown in progress");
                return Err(EngineError::cancelled(format!("{op_id}: {description}")));
            }
            attempts += 1;
            self.sleep_before(policy, attempts, op_id).await?;

            match check().await {
                Ok(Satisfaction::Satisfied(evidence)) => {
                    if attempts > 1 {
                        info!(op_id, attempts, "converged: {description}");
                    } else {
                        debug!(op_id, "already satisfied: {description}");
                    }
                    return Ok(evidence);
                }
                Ok(Satisfaction::Pending(hint)) => {
                    debug!(op_id, attempt = attempts, "not yet satisfied, updating: {description}");
                    match update(hint).await {
                        Ok(()) => {}
                        Err(err) if !err.is_retryable() || err.is_cancelled() => {
                            warn!(op_id, %err, "update failed without retry: {description}");
                            return Err(err);
                        }
                        Err(err) => {
                            debug!(op_id, attempt = attempts, %err, "update failed, will retry");
                            last_failure = Some(err);
                        }
                    }
                }
                Err(err) if !err.is_retryable() || err.is_cancelled() => {
                    warn!(op_id, %err, "check failed without retry: {description}");
                    return Err(err);
                }
                Err(err) => {
                    debug!(op_id, attempt = attempts, %err, "check failed, will retry");
                    last_failure = Some(err);
                }
            }

            if !policy.allows_another_attempt(attempts) {
                let err = last_failure.unwrap_or_else(|| {
                    EngineError::internal(format!(
                        "{op_id}: goal not reached after {attempts} attempts: {description}"
                    ))
                });
                warn!(op_id, attempts, %err, "retry budget exhausted: {description}");
                return Err(err);
            }
        }
    }

    /// Poll a condition until it holds or the budget is exhausted.
    ///
    /// The condition may perform the mutation itself, provided the mutation
    /// is idempotent.
    pub async fn wait_until<C, CFut>(
        &self,
        policy: &RetryPolicy,
        op_id: &str,
        description: &str,
        condition: C,
    ) -> EngineResult<()>
    where
        C: Fn() -> CFut,
        CFut: Future<Output = EngineResult<bool>>,
    {
        let condition = &condition;
        self.ensure_that(
            policy,
            op_id,
            description,
            move || async move {
                if condition().await? {
                    Ok(Satisfaction::Satisfied(()))
                } else {
                    Ok(Satisfaction::Pending(()))
                }
            },
            |()| async { Ok(()) },
        )
        .await
    }

    /// Back off before the given attempt, aborting promptly on shutdown.
    async fn sleep_before(
        &self,
        policy: &RetryPolicy,
        attempt: u32,
        op_id: &str,
    ) -> EngineResult<()> {
        let delay = policy.backoff_for(attempt);
        if delay == Duration::ZERO {
            return Ok(());
        }
        tokio::select! {
            _ = tokio::time::sleep(delay) => Ok(()),
            _ = self.shutdown.triggered() => {
                debug!(op_id, "backoff interrupted by shutdown");
                Err(EngineError::cancelled(op_id.to_string()))
            }
        }
    }
}
