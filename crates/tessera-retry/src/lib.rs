//! Tessera Retry - Idempotent Convergence Primitives
//!
//! This crate provides the retry discipline every reconciliation component
//! builds on:
//!
//! - [`RetryPolicy`]: named backoff profiles for the three calling contexts
//!   (startup dependency waits, background automation, interactive client
//!   calls).
//! - [`RetryProvider::ensure_that`]: check-then-update convergence that
//!   re-checks the goal before every update attempt, making the update
//!   idempotent under retry even when an earlier attempt timed out after
//!   taking effect.
//! - [`RetryProvider::wait_until`]: polls a condition until it holds. The
//!   condition may itself perform the mutation; that is an accepted abuse of
//!   the primitive since the mutation must then be idempotent.
//!
//! Exhausting a retry budget always surfaces the last observed failure;
//! nothing is silently dropped. Every loop observes the shutdown signal
//! between attempts.

#![forbid(unsafe_code)]

/// Named retry/backoff profiles
pub mod policy;

/// The convergence primitives
pub mod provider;

pub use policy::RetryPolicy;
pub use provider::{RetryProvider, Satisfaction};
