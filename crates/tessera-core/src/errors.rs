//! Unified error type for all Tessera operations.
//!
//! One flat enum instead of a per-crate error hierarchy. The taxonomy
//! matters operationally:
//!
//! - `NotFound` is often an expected answer (a proposal that does not exist
//!   yet) and callers frequently convert it into "start from scratch".
//! - `FailedPrecondition` means a computed invariant was violated; retrying
//!   without re-deriving state would repeat the same mistake, so the retry
//!   primitives never retry it.
//! - `Unavailable` covers transient infrastructure trouble (lagging replica,
//!   domain not yet reachable) and is the retryable class.
//! - `Internal` is an unexpected inconsistency, fatal to the current cycle.
//! - `Cancelled` reports shutdown; it is expected and logged quietly.

use serde::{Deserialize, Serialize};

/// Result alias used throughout the workspace.
pub type EngineResult<T> = Result<T, EngineError>;

/// Unified error type for all reconciliation operations.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, thiserror::Error)]
pub enum EngineError {
    /// The requested entity does not exist in the queried view.
    #[error("Not found: {message}")]
    NotFound {
        /// What was looked up and where.
        message: String,
    },

    /// A computed precondition or invariant was violated.
    #[error("Failed precondition: {message}")]
    FailedPrecondition {
        /// Which invariant failed.
        message: String,
    },

    /// Transient infrastructure failure; safe to retry.
    #[error("Unavailable: {message}")]
    Unavailable {
        /// What was unreachable or lagging.
        message: String,
    },

    /// Unexpected inconsistency; fatal to the current cycle.
    #[error("Internal error: {message}")]
    Internal {
        /// Description of the inconsistency.
        message: String,
    },

    /// Shutdown is in progress; the operation was abandoned.
    #[error("Cancelled: {message}")]
    Cancelled {
        /// Which operation was abandoned.
        message: String,
    },
}

impl EngineError {
    /// Create a not-found error.
    pub fn not_found(message: impl Into<String>) -> Self {
        Self::NotFound {
            message: message.into(),
        }
    }

    /// Create a failed-precondition error.
    pub fn failed_precondition(message: impl Into<String>) -> Self {
        Self::FailedPrecondition {
            message: message.into(),
        }
    }

    /// Create a transient unavailability error.
    pub fn unavailable(message: impl Into<String>) -> Self {
        Self::Unavailable {
            message: message.into(),
        }
    }

    /// Create an internal error.
    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal {
            message: message.into(),
        }
    }

    /// Create a cancellation error.
    pub fn cancelled(message: impl Into<String>) -> Self {
        Self::Cancelled {
            message: message.into(),
        }
    }

    /// Whether a retry loop may try again after observing this error.
    ///
    /// `NotFound` is retryable here because convergence loops routinely wait
    /// for an entity another node is about to create; callers that treat
    /// absence as definitive match on the variant directly. `Internal` is
    /// not: an unexpected inconsistency ends the current cycle, and the
    /// runner loops re-attempt on the next cadence tick anyway.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            EngineError::Unavailable { .. } | EngineError::NotFound { .. }
        )
    }

    /// Whether this error reports absence of the queried entity.
    pub fn is_not_found(&self) -> bool {
        matches!(self, EngineError::NotFound { .. })
    }

    /// Whether this error reports shutdown.
    pub fn is_cancelled(&self) -> bool {
        matches!(self, EngineError::Cancelled { .. })
    }
}
