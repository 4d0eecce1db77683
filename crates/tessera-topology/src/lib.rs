//! Tessera Topology - Convergent Membership Reconciliation
//!
//! The topology store is a distributed log of versioned, signable assertions
//! about cluster membership. A change enters the store as a signed proposal
//! and becomes authorized once enough hosting members co-sign it. This crate
//! provides:
//!
//! - the party-to-participant mapping model with its canonical-ordering and
//!   threshold invariants ([`mapping`]),
//! - cluster-size-derived threshold functions ([`thresholds`]),
//! - the store accessor interface ([`store`]),
//! - the reconciler that drives the store toward a target mapping with
//!   serial-based optimistic concurrency ([`reconciler`]).
//!
//! The store is external and shared; nothing here caches a mapping beyond a
//! single reconciliation attempt, because staleness must always be rechecked
//! against the live store.

#![forbid(unsafe_code)]

/// Party-to-participant mappings and membership transforms
pub mod mapping;

/// Cluster-size-derived threshold functions
pub mod thresholds;

/// Topology store accessor interface
pub mod store;

/// The convergent topology reconciler
pub mod reconciler;

pub use mapping::{HostingParticipant, ParticipantChange, PartyToParticipant, Permission};
pub use reconciler::{OnAuthorizedChange, TopologyReconciler};
pub use store::{Serial, TopologyQuery, TopologyResult, TopologyStore};
