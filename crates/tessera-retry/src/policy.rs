//! Named retry policies.
//!
//! Call sites pick a policy by context, not by hand-tuned counts:
//!
//! - [`RetryPolicy::waiting_on_init_dependency`]: unbounded, for startup
//!   ordering where the dependency will eventually come up.
//! - [`RetryPolicy::automation`]: bounded, for background reconciliation
//!   cycles that will be re-attempted on the next poll anyway.
//! - [`RetryPolicy::client_calls`]: bounded and short, for operations a
//!   caller is actively waiting on.

use rand::Rng;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Backoff and budget for one retry loop.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RetryPolicy {
    /// Maximum number of attempts; `None` means unbounded.
    pub max_attempts: Option<u32>,
    /// Delay before the second attempt.
    pub initial_backoff: Duration,
    /// Ceiling on the delay between attempts.
    pub max_backoff: Duration,
    /// Multiplier applied to the delay after each failed attempt.
    pub multiplier: f64,
    /// Fraction of the delay randomized away to avoid thundering herds.
    pub jitter: f64,
}

impl RetryPolicy {
    /// Unbounded policy for waiting on initialization dependencies.
    ///
    /// Still observes the shutdown signal; "unbounded" only means no attempt
    /// ceiling.
    pub fn waiting_on_init_dependency() -> Self {
        Self {
            max_attempts: None,
            initial_backoff: Duration::from_millis(500),
            max_backoff: Duration::from_secs(30),
            multiplier: 2.0,
            jitter: 0.1,
        }
    }

    /// Bounded policy for background automation.
    pub fn automation() -> Self {
        Self {
            max_attempts: Some(10),
            initial_backoff: Duration::from_millis(500),
            max_backoff: Duration::from_secs(10),
            multiplier: 2.0,
            jitter: 0.1,
        }
    }

    /// Bounded, short policy for operations a client is waiting on.
    pub fn client_calls() -> Self {
        Self {
            max_attempts: Some(5),
            initial_backoff: Duration::from_millis(200),
            max_backoff: Duration::from_secs(2),
            multiplier: 2.0,
            jitter: 0.1,
        }
    }

    /// Whether another attempt is allowed after `attempts_made` attempts.
    pub fn allows_another_attempt(&self, attempts_made: u32) -> bool {
        match self.max_attempts {
            Some(max) => attempts_made < max,
            None => true,
        }
    }

    /// Delay to sleep before attempt `attempt` (1-based; attempt 1 has no
    /// delay), exponential with cap and jitter.
    pub fn backoff_for(&self, attempt: u32) -> Duration {
        if attempt <= 1 {
            return Duration::ZERO;
        }
        let exp = (attempt - 2).min(30);
        let raw = self.initial_backoff.as_secs_f64() * self.multiplier.powi(exp as i32);
        let capped = raw.min(self.max_backoff.as_secs_f64());
        let jittered = if self.jitter > 0.0 {
            let spread = capped * self.jitter;
            capped - spread + rand::thread_rng().gen_range(0.0..=(2.0 * spread))
        } else {
            capped
        };
        Duration::from_secs_f64(jittered.max(0.0))
    }
}
