//! Tessera Triggers - Scheduled Reconciliation
//!
//! A trigger is a unit of reconciliation logic driven on a polling cadence or
//! by explicit wake-up. This crate provides:
//!
//! - the trigger contracts and the pause gate ([`trigger`]),
//! - the task runner with in-flight deduplication, bounded parallelism,
//!   staleness discard, and bounded per-task retry ([`scheduler`]),
//! - the domain connectivity manager and the sequencer-connection
//!   reconciliation trigger ([`connectivity`], [`reconcile_connections`]),
//! - the pruning coordinator ([`pruning`]),
//! - the migration cut-over trigger ([`migration`]),
//! - the external target-state source interface ([`target`]).
//!
//! A failed cycle never crashes a runner loop; it is logged and retried on
//! the next cadence tick.

#![forbid(unsafe_code)]

/// Trigger contracts and the pause gate
pub mod trigger;

/// Task runner and polling-trigger runner
pub mod scheduler;

/// Domain connection configuration and the connectivity manager
pub mod connectivity;

/// Sequencer-connection reconciliation trigger
pub mod reconcile_connections;

/// Pruning coordination
pub mod pruning;

/// Migration cut-over trigger
pub mod migration;

/// External target-state source interface
pub mod target;

pub use connectivity::{
    ConnectivityService, DomainConnectionConfig, DomainConnectivityAdmin, SequencerConnection,
    SequencerValidationMode,
};
pub use migration::{DomainMigrationTrigger, MigrationHandler, ScheduledMigration};
pub use pruning::{
    MemberPruningInfo, PruningConfig, SequencerPruningAdmin, SequencerPruningStatus,
    SequencerPruningTrigger,
};
pub use reconcile_connections::ReconcileSequencerConnectionsTrigger;
pub use scheduler::{PollingTriggerRunner, SchedulerConfig, SchedulerStatistics, TaskTriggerRunner};
pub use target::TargetStateSource;
pub use trigger::{PollingTrigger, TaskOutcome, TaskTrigger, TriggerGate};
