//! Tessera Core - Reconciliation Engine Foundation
//!
//! Foundation types shared by every Tessera crate: typed identifiers for
//! synchronizer members, wall-clock timestamps behind an injectable clock,
//! the unified error type, the cooperative shutdown signal, and the owned
//! node context that replaces global lifecycle singletons.
//!
//! Nothing in this crate performs I/O; it only defines the vocabulary the
//! reconciliation components speak.

#![forbid(unsafe_code)]

/// Typed identifiers for synchronizer members, parties, and domains
pub mod identifiers;

/// Unified error handling
pub mod errors;

/// Wall-clock timestamps and the injectable clock seam
pub mod time;

/// Cooperative shutdown signalling
pub mod shutdown;

/// Owned per-node context (identities, clock, shutdown)
pub mod context;

pub use context::NodeContext;
pub use errors::{EngineError, EngineResult};
pub use identifiers::{
    DomainAlias, MediatorId, MemberId, MigrationId, ParticipantId, PartyId, SequencerId,
};
pub use shutdown::ShutdownSignal;
pub use time::{Clock, SystemClock, Timestamp};
