//! Tessera Testing Infrastructure
//!
//! In-memory implementations of every external collaborator interface, each
//! recording its mutating calls so tests can assert properties like "the
//! second reconciliation performed zero mutating RPCs".
//!
//! Add to a crate's dev-dependencies:
//! ```toml
//! [dev-dependencies]
//! tessera-testkit = { path = "../tessera-testkit" }
//! ```

#![allow(clippy::unwrap_used)]
#![allow(clippy::expect_used)]
#![forbid(unsafe_code)]

/// Manually driven clock
pub mod clock;

/// In-memory topology store with a proposal shelf
pub mod topology_store;

/// Recording domain connectivity admin
pub mod connectivity;

/// Recording sequencer pruning admin
pub mod pruning;

/// Static target-state source
pub mod target;

pub use clock::ManualClock;
pub use connectivity::{ConnectivityCall, RecordingConnectivityAdmin};
pub use pruning::{PruningCall, RecordingPruningAdmin};
pub use target::StaticTargetSource;
pub use topology_store::InMemoryTopologyStore;
