//! Migration cut-over scenarios.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::Mutex;
use tessera_core::{
    EngineError, EngineResult, MigrationId, NodeContext, ParticipantId, ShutdownSignal, Timestamp,
};
use tessera_testkit::{ManualClock, StaticTargetSource};
use tessera_triggers::{
    DomainMigrationTrigger, MigrationHandler, PollingTrigger, ScheduledMigration,
    TargetStateSource, TriggerGate,
};

#[derive(Default)]
struct RecordingHandler {
    handled: Mutex<Vec<MigrationId>>,
    failures_remaining: Mutex<u32>,
}

impl RecordingHandler {
    fn fail_next(&self, n: u32) {
        *self.failures_remaining.lock() = n;
    }

    fn handled(&self) -> Vec<MigrationId> {
        self.handled.lock().clone()
    }
}

#[async_trait]
impl MigrationHandler for RecordingHandler {
    async fn perform_dump_and_handover(&self, migration: &ScheduledMigration) -> EngineResult<()> {
        {
            let mut failures = self.failures_remaining.lock();
            if *failures > 0 {
                *failures -= 1;
                return Err(EngineError::unavailable("dump endpoint not reachable"));
            }
        }
        self.handled.lock().push(migration.migration_id);
        Ok(())
    }
}

struct Fixture {
    clock: Arc<ManualClock>,
    source: Arc<StaticTargetSource>,
    handler: Arc<RecordingHandler>,
    gate: TriggerGate,
    trigger: DomainMigrationTrigger,
}

fn cutover() -> Timestamp {
    Timestamp::epoch().plus(Duration::from_secs(500))
}

fn fixture() -> Fixture {
    let clock = Arc::new(ManualClock::at(Timestamp::epoch()));
    let source = Arc::new(StaticTargetSource::new());
    let handler = Arc::new(RecordingHandler::default());
    let gate = TriggerGate::new();
    let ctx = NodeContext::new(
        ParticipantId::new("p1"),
        None,
        None,
        Arc::clone(&clock) as Arc<dyn tessera_core::Clock>,
        ShutdownSignal::new(),
    );
    let trigger = DomainMigrationTrigger::new(
        Arc::clone(&source) as Arc<dyn TargetStateSource>,
        Arc::clone(&handler) as Arc<dyn MigrationHandler>,
        ctx,
        vec![gate.clone()],
    );
    Fixture {
        clock,
        source,
        handler,
        gate,
        trigger,
    }
}

#[tokio::test]
async fn nothing_happens_before_the_cutover() {
    let f = fixture();
    f.source.set_migration(ScheduledMigration {
        timestamp: cutover(),
        migration_id: MigrationId(7),
    });
    assert!(!f.trigger.perform_work_if_available().await.unwrap());
    assert!(f.gate.is_enabled());
    assert!(f.handler.handled().is_empty());
}

#[tokio::test]
async fn cutover_pauses_gates_and_hands_over_exactly_once() {
    let f = fixture();
    f.source.set_migration(ScheduledMigration {
        timestamp: cutover(),
        migration_id: MigrationId(7),
    });
    // The cut-over instant itself counts as reached.
    f.clock.set(cutover());

    f.trigger.perform_work_if_available().await.unwrap();
    assert!(!f.gate.is_enabled());
    assert_eq!(f.handler.handled(), vec![MigrationId(7)]);
    assert_eq!(f.trigger.last_handled(), Some(MigrationId(7)));

    // The schedule is still published; subsequent cycles must not hand over
    // again.
    f.trigger.perform_work_if_available().await.unwrap();
    assert_eq!(f.handler.handled(), vec![MigrationId(7)]);
}

#[tokio::test]
async fn failed_handover_keeps_gates_paused_and_retries_next_cycle() {
    let f = fixture();
    f.handler.fail_next(1);
    f.source.set_migration(ScheduledMigration {
        timestamp: cutover(),
        migration_id: MigrationId(7),
    });
    f.clock.set(cutover().plus(Duration::from_secs(1)));

    assert!(f.trigger.perform_work_if_available().await.is_err());
    assert!(!f.gate.is_enabled());
    assert_eq!(f.trigger.last_handled(), None);

    // Next cycle retries the handover; the gates stay paused throughout.
    f.trigger.perform_work_if_available().await.unwrap();
    assert_eq!(f.handler.handled(), vec![MigrationId(7)]);
    assert!(!f.gate.is_enabled());
}

#[tokio::test]
async fn a_later_migration_is_handled_independently() {
    let f = fixture();
    f.source.set_migration(ScheduledMigration {
        timestamp: cutover(),
        migration_id: MigrationId(7),
    });
    f.clock.set(cutover());
    f.trigger.perform_work_if_available().await.unwrap();

    f.source.set_migration(ScheduledMigration {
        timestamp: cutover().plus(Duration::from_secs(100)),
        migration_id: MigrationId(8),
    });
    // Not yet reached.
    assert!(!f.trigger.perform_work_if_available().await.unwrap());
    assert_eq!(f.handler.handled(), vec![MigrationId(7)]);

    f.clock.advance(Duration::from_secs(200));
    f.trigger.perform_work_if_available().await.unwrap();
    assert_eq!(f.handler.handled(), vec![MigrationId(7), MigrationId(8)]);
}
