//! Integration tests for the focus machine and session bridge.
//!
//! The machine is driven by hand and its events are pumped through the
//! bridge after every operation, the way the runtime's bridge task sees them.

mod common;

use std::sync::Arc;

use common::{pump, tick_until_phase_changes, Call, RecordingLedger};
use focusbridge_core::sync::SessionKind;
use focusbridge_core::{
    FocusMachine, Phase, Rejection, SessionBridge, SyncGuard, SyncNotice, TaskRecord, TaskReconciler,
    TaskRef, TimerSettings,
};
use proptest::prelude::*;

fn short_settings() -> TimerSettings {
    TimerSettings::new(10, 5, true)
}

// ============================================================================
// Scenarios
// ============================================================================

#[tokio::test]
async fn test_full_work_interval_creates_and_completes_once() {
    let ledger = Arc::new(RecordingLedger::new());
    let mut bridge = SessionBridge::new(ledger.clone());
    let mut machine = FocusMachine::new(short_settings());
    let mut events = machine.subscribe();

    machine.start_work(None).unwrap();
    pump(&mut bridge, &mut events).await;

    for _ in 0..10 {
        machine.tick();
        pump(&mut bridge, &mut events).await;
    }

    let state = machine.snapshot();
    assert_eq!(state.phase, Phase::ShortBreak);
    assert_eq!(state.time_left_secs, 5);
    assert!(state.running);
    assert_eq!(state.completed_intervals, 1);

    assert_eq!(ledger.creates(), 1);
    assert_eq!(ledger.completes(), 1);
    assert_eq!(ledger.cancels(), 0);
    assert_eq!(bridge.guard(), &SyncGuard::default());

    let create = ledger
        .calls()
        .into_iter()
        .find_map(|c| match c {
            Call::Create(payload) => Some(payload),
            _ => None,
        })
        .unwrap();
    assert_eq!(create.kind, SessionKind::Focus);
    assert_eq!(create.target_duration_minutes, 1);
}

#[tokio::test]
async fn test_skip_before_first_tick_cancels_session() {
    let ledger = Arc::new(RecordingLedger::new());
    let mut bridge = SessionBridge::new(ledger.clone());
    let mut machine = FocusMachine::new(short_settings());
    let mut events = machine.subscribe();

    machine.start_work(None).unwrap();
    machine.skip().unwrap();
    let notices = pump(&mut bridge, &mut events).await;

    assert!(matches!(notices[0], SyncNotice::SessionCreated { .. }));
    assert!(matches!(notices[1], SyncNotice::SessionCancelled { .. }));

    let mutating: Vec<_> = ledger
        .calls()
        .into_iter()
        .filter(|c| !matches!(c, Call::Active))
        .collect();
    assert_eq!(mutating.len(), 2);
    assert!(matches!(mutating[0], Call::Create(_)));
    assert!(matches!(mutating[1], Call::Cancel { .. }));

    assert!(bridge.guard().is_clear());
    assert_eq!(machine.phase(), Phase::Idle);
}

#[tokio::test]
async fn test_failed_create_does_not_disturb_countdown() {
    let ledger = Arc::new(RecordingLedger::failing_create());
    let mut bridge = SessionBridge::new(ledger.clone());
    let mut machine = FocusMachine::new(short_settings());
    let mut events = machine.subscribe();

    machine.start_work(None).unwrap();
    let notices = pump(&mut bridge, &mut events).await;
    assert!(matches!(notices[..], [SyncNotice::CreateFailed { .. }]));
    assert_eq!(machine.phase(), Phase::Working);
    assert!(machine.snapshot().running);

    let ticks = tick_until_phase_changes(&mut machine, 20);
    pump(&mut bridge, &mut events).await;

    assert_eq!(ticks, 10);
    assert_eq!(machine.phase(), Phase::ShortBreak);
    assert_eq!(machine.snapshot().completed_intervals, 1);
    // Nothing to complete, so no completion call is made.
    assert_eq!(ledger.completes(), 0);
    assert!(bridge.guard().is_clear());
}

#[tokio::test]
async fn test_provisional_task_remaps_and_completion_carries_permanent_id() {
    let ledger = Arc::new(RecordingLedger::new());
    let mut bridge = SessionBridge::new(ledger.clone());
    let mut machine = FocusMachine::new(short_settings());
    let mut events = machine.subscribe();
    let mut reconciler = TaskReconciler::new();

    machine
        .start_work(Some(TaskRef::new("temp_1", "Essay")))
        .unwrap();
    pump(&mut bridge, &mut events).await;

    let snapshot = vec![TaskRecord::new("real_42", "Essay")];
    let outcome = reconciler.reconcile(machine.active_task(), &snapshot);
    machine.rebind_task(outcome.replacement().unwrap().clone()).unwrap();
    assert_eq!(machine.active_task().map(|t| t.id.as_str()), Some("real_42"));

    // A second pass over the same snapshot changes nothing.
    let again = reconciler.reconcile(machine.active_task(), &snapshot);
    assert!(!again.is_change());

    tick_until_phase_changes(&mut machine, 20);
    pump(&mut bridge, &mut events).await;

    assert_eq!(ledger.creates(), 1);
    assert!(ledger.calls().contains(&Call::Complete {
        id: ledger.sessions()[0].id.clone(),
        notes: Some("Essay".into()),
    }));
    assert_eq!(reconciler.summary().remapped, 1);
}

#[tokio::test]
async fn test_break_is_not_mirrored() {
    let ledger = Arc::new(RecordingLedger::new());
    let mut bridge = SessionBridge::new(ledger.clone());
    let mut machine = FocusMachine::new(short_settings());
    let mut events = machine.subscribe();

    machine.start_break().unwrap();
    machine.pause();
    machine.resume().unwrap();
    machine.cancel().unwrap();
    let notices = pump(&mut bridge, &mut events).await;

    assert!(notices.is_empty());
    assert!(ledger.calls().is_empty());
}

#[tokio::test]
async fn test_rejected_start_leaves_state_and_ledger_alone() {
    let ledger = Arc::new(RecordingLedger::new());
    let mut bridge = SessionBridge::new(ledger.clone());
    let mut machine = FocusMachine::new(short_settings());
    let mut events = machine.subscribe();

    machine.start_work(None).unwrap();
    machine.tick();
    pump(&mut bridge, &mut events).await;
    let before = machine.snapshot();

    assert_eq!(machine.start_work(None), Err(Rejection::AlreadyWorking));
    pump(&mut bridge, &mut events).await;

    assert_eq!(machine.snapshot(), before);
    assert_eq!(ledger.creates(), 1);
}

// ============================================================================
// Exactly-once property
// ============================================================================

#[derive(Debug, Clone, Copy)]
enum Step {
    Tick,
    Pause,
    Resume,
    Reset,
}

#[derive(Debug, Clone, Copy)]
enum Ending {
    Skip,
    Cancel,
    Complete,
}

fn arb_step() -> impl Strategy<Value = Step> {
    prop_oneof![
        4 => Just(Step::Tick),
        1 => Just(Step::Pause),
        1 => Just(Step::Resume),
        1 => Just(Step::Reset),
    ]
}

fn arb_ending() -> impl Strategy<Value = Ending> {
    prop_oneof![Just(Ending::Skip), Just(Ending::Cancel), Just(Ending::Complete)]
}

proptest! {
    #[test]
    fn one_create_and_one_finish_per_work_interval(
        steps in proptest::collection::vec(arb_step(), 0..9),
        ending in arb_ending(),
    ) {
        let rt = tokio::runtime::Builder::new_current_thread().build().unwrap();
        let ledger = Arc::new(RecordingLedger::new());

        rt.block_on(async {
            let mut bridge = SessionBridge::new(ledger.clone());
            let mut machine = FocusMachine::new(short_settings());
            let mut events = machine.subscribe();

            machine.start_work(None).unwrap();
            for step in &steps {
                match step {
                    Step::Tick => { machine.tick(); }
                    Step::Pause => { machine.pause(); }
                    Step::Resume => { machine.resume().unwrap(); }
                    Step::Reset => { machine.reset(); }
                }
                pump(&mut bridge, &mut events).await;
            }

            match ending {
                Ending::Skip => { machine.skip().unwrap(); }
                Ending::Cancel => { machine.cancel().unwrap(); }
                Ending::Complete => {
                    machine.resume().unwrap();
                    tick_until_phase_changes(&mut machine, 100);
                }
            }
            pump(&mut bridge, &mut events).await;
            assert!(bridge.guard().is_clear());
        });

        prop_assert_eq!(ledger.creates(), 1);
        prop_assert_eq!(ledger.completes() + ledger.cancels(), 1);
        match ending {
            Ending::Complete => prop_assert_eq!(ledger.completes(), 1),
            _ => prop_assert_eq!(ledger.cancels(), 1),
        }
    }
}
