//! Integration tests for offline reconciliation.
//!
//! Tests verify:
//! 1. Missed generation intervals are replayed with backdated expirations
//! 2. Missions that finished while closed pay out exactly once
//! 3. Short gaps are ignored
//! 4. The catalog cap stops catch-up early without advancing the timer
//! 5. N one-second ticks and one reconcile over N seconds agree, from a
//!    fresh bootstrap as well as from a running outpost

use outpost_core::{
    config::SimConfig,
    engine::SimEngine,
    entity::{Item, Mission, MissionState, WorkerStatus},
    event::SimEvent,
    snapshot::Snapshot,
    store::MemoryStore,
};
use uuid::Uuid;

const T0: f64 = 1_700_000_000.0;

// ── Test helpers ────────────────────────────────────────────────────────────

fn build(snapshot: Snapshot, last_active: f64) -> (SimEngine, MemoryStore) {
    let store = MemoryStore::new();
    let config = SimConfig::default_test(snapshot.seed);
    let engine = SimEngine::new(config, snapshot, Some(last_active), Box::new(store.clone()));
    (engine, store)
}

fn mission(id: u128, duration: f64, reward: &str, state: MissionState) -> Mission {
    Mission {
        id: Uuid::from_u128(id),
        name: format!("Mission {id}"),
        description: String::new(),
        template: "test".into(),
        duration,
        difficulty: 1,
        rewards: vec![Item::new(Uuid::from_u128(1_000 + id), reward, "", 5)],
        state,
    }
}

/// Put worker `index` on a mission that started at `start_time`.
fn send_worker(snapshot: &mut Snapshot, index: usize, id: u128, duration: f64, reward: &str, start_time: f64) {
    let worker_id = snapshot.workers[index].id;
    snapshot.workers[index].status = WorkerStatus::OnMission;
    snapshot.active.push(mission(
        id,
        duration,
        reward,
        MissionState::Active { worker_id, start_time },
    ));
}

fn summary(events: &[SimEvent]) -> Option<(usize, usize, usize)> {
    events.iter().find_map(|e| match e {
        SimEvent::OfflineReconciled {
            completed,
            expired,
            generated,
            ..
        } => Some((*completed, *expired, *generated)),
        _ => None,
    })
}

// ── Generation catch-up ─────────────────────────────────────────────────────

#[test]
fn missed_intervals_generate_backdated_missions() {
    let mut snapshot = Snapshot::bootstrap(7);
    snapshot.last_generation_time = Some(T0);
    let (mut engine, store) = build(snapshot, T0);

    let events = engine.reconcile(T0 + 500.0);

    // floor(500 / 120) = 4 attempts, all under the cap of 5.
    let snapshot = engine.snapshot();
    assert_eq!(snapshot.available.len(), 4);
    assert_eq!(snapshot.last_generation_time, Some(T0 + 480.0));
    let expirations: Vec<f64> = snapshot
        .available
        .iter()
        .filter_map(Mission::expiration_time)
        .collect();
    assert_eq!(expirations, vec![T0 + 720.0, T0 + 840.0, T0 + 960.0, T0 + 1_080.0]);

    assert_eq!(summary(&events), Some((0, 0, 4)));
    assert_eq!(store.write_count(), 1, "reconcile saves exactly once");
    assert_eq!(engine.last_active(), Some(T0 + 500.0));
}

#[test]
fn catch_up_stops_at_cap_and_keeps_timer() {
    let mut snapshot = Snapshot::bootstrap(8);
    snapshot.available = (1..=4)
        .map(|i| mission(i, 60.0, "Scrap", MissionState::Available { expiration_time: T0 + 10_000.0 }))
        .collect();
    snapshot.last_generation_time = Some(T0);
    let (mut engine, _store) = build(snapshot, T0);

    let events = engine.reconcile(T0 + 1_000.0);

    assert_eq!(summary(&events), Some((0, 0, 1)));
    assert_eq!(engine.snapshot().available.len(), 5);
    // Only the one generation that happened moves the timer.
    assert_eq!(engine.snapshot().last_generation_time, Some(T0 + 120.0));
}

#[test]
fn never_generated_catalog_is_due_at_gap_start() {
    let (mut engine, _store) = build(Snapshot::bootstrap(9), T0);
    let events = engine.reconcile(T0 + 500.0);

    // Due at T0, then every 120s: T0, +120, +240, +360, +480.
    assert_eq!(summary(&events), Some((0, 0, 5)));
    let snapshot = engine.snapshot();
    assert_eq!(snapshot.last_generation_time, Some(T0 + 480.0));
    let expirations: Vec<f64> = snapshot
        .available
        .iter()
        .filter_map(Mission::expiration_time)
        .collect();
    assert_eq!(expirations, vec![T0 + 600.0, T0 + 720.0, T0 + 840.0, T0 + 960.0, T0 + 1_080.0]);
}

#[test]
fn long_first_gap_fills_the_catalog() {
    let (mut engine, _store) = build(Snapshot::bootstrap(9), T0);
    engine.reconcile(T0 + 1_000.0);
    assert_eq!(engine.snapshot().available.len(), 5);
}

// ── Completion and expiration ───────────────────────────────────────────────

#[test]
fn mission_finished_while_closed_pays_out_once() {
    let mut snapshot = Snapshot::bootstrap(10);
    send_worker(&mut snapshot, 0, 1, 60.0, "Scrap", T0);
    let worker_id = snapshot.workers[0].id;
    let (mut engine, _store) = build(snapshot, T0 + 10.0);

    // remaining at offline start = 50s < 200s elapsed
    let events = engine.reconcile(T0 + 210.0);

    // Generation is due at T0+10 and T0+130 as well.
    assert_eq!(summary(&events), Some((1, 0, 2)));
    let completed: Vec<&SimEvent> = events
        .iter()
        .filter(|e| matches!(e, SimEvent::MissionCompleted { .. }))
        .collect();
    assert_eq!(completed.len(), 1);
    assert!(matches!(completed[0], SimEvent::MissionCompleted { at, .. } if *at == T0 + 60.0));

    let snapshot = engine.snapshot();
    assert!(snapshot.active.is_empty());
    assert_eq!(snapshot.inventory_quantity("Scrap"), 5);
    assert_eq!(snapshot.worker(worker_id).unwrap().status, WorkerStatus::Idle);

    // Running again cannot pay twice.
    engine.reconcile(T0 + 400.0);
    engine.tick(T0 + 401.0);
    assert_eq!(engine.snapshot().inventory_quantity("Scrap"), 5);
}

#[test]
fn mission_still_running_after_gap_stays_active() {
    let mut snapshot = Snapshot::bootstrap(11);
    send_worker(&mut snapshot, 0, 1, 300.0, "Food", T0);
    let (mut engine, _store) = build(snapshot, T0 + 10.0);

    let events = engine.reconcile(T0 + 210.0);

    assert_eq!(summary(&events), Some((0, 0, 2)));
    assert_eq!(engine.snapshot().active.len(), 1);
    assert_eq!(engine.snapshot().workers[0].status, WorkerStatus::OnMission);
}

#[test]
fn catalog_entries_expire_during_gap() {
    let mut snapshot = Snapshot::bootstrap(12);
    snapshot.available = vec![
        mission(1, 60.0, "Scrap", MissionState::Available { expiration_time: T0 + 100.0 }),
        mission(2, 60.0, "Scrap", MissionState::Available { expiration_time: T0 + 400.0 }),
    ];
    let (mut engine, _store) = build(snapshot, T0);

    let events = engine.reconcile(T0 + 300.0);

    // Generation is due at T0, T0+120 and T0+240 too.
    assert_eq!(summary(&events), Some((0, 1, 3)));
    let ids: Vec<Uuid> = engine.snapshot().available.iter().map(|m| m.id).collect();
    assert_eq!(ids[0], Uuid::from_u128(2));
    assert!(!ids.contains(&Uuid::from_u128(1)));
}

#[test]
fn short_gap_is_ignored() {
    let mut snapshot = Snapshot::bootstrap(13);
    snapshot.last_generation_time = Some(T0 - 1_000.0);
    let before = snapshot.clone();
    let (mut engine, store) = build(snapshot, T0);

    assert!(engine.reconcile(T0 + 1.0).is_empty());
    assert!(engine.reconcile(T0 - 50.0).is_empty(), "clock moved backwards");
    assert_eq!(engine.snapshot(), &before);
    assert_eq!(store.write_count(), 0);
    assert_eq!(engine.last_active(), Some(T0));
}

// ── Tick / reconcile equivalence ────────────────────────────────────────────

fn equivalence_snapshot(seed: u64) -> Snapshot {
    let mut snapshot = Snapshot::bootstrap(seed);
    // Finishes at +70 and +250, in active-list order.
    send_worker(&mut snapshot, 0, 1, 100.0, "Scrap", T0 - 30.0);
    send_worker(&mut snapshot, 1, 2, 250.0, "Food", T0);
    snapshot.available.push(mission(
        3,
        60.0,
        "Water",
        MissionState::Available { expiration_time: T0 + 30.0 },
    ));
    // Generations due at +100 and +220.
    snapshot.last_generation_time = Some(T0 - 20.0);
    snapshot
}

#[test]
fn ticks_and_reconcile_reach_the_same_state() {
    const SEED: u64 = 0xDEAD_BEEF_CAFE_1234;
    const SECONDS: u32 = 300;

    let (mut ticked, _) = build(equivalence_snapshot(SEED), T0);
    let (mut reconciled, _) = build(equivalence_snapshot(SEED), T0);

    let mut tick_events = Vec::new();
    for k in 1..=SECONDS {
        tick_events.extend(ticked.tick(T0 + k as f64));
    }
    let offline_events = reconciled.reconcile(T0 + SECONDS as f64);

    assert_eq!(ticked.snapshot(), reconciled.snapshot());
    assert!(reconciled.snapshot().validate().is_ok());
    assert_eq!(summary(&offline_events), Some((2, 1, 2)));

    // Same missions, in the same order, whichever path produced them.
    let generated = |events: &[SimEvent]| -> Vec<Uuid> {
        events
            .iter()
            .filter_map(|e| match e {
                SimEvent::MissionGenerated { mission_id, .. } => Some(*mission_id),
                _ => None,
            })
            .collect()
    };
    assert_eq!(generated(&tick_events), generated(&offline_events));
}

#[test]
fn reconcile_agrees_with_ticks_for_many_gap_lengths() {
    for seconds in [2u32, 59, 121, 240, 299, 480] {
        let (mut ticked, _) = build(equivalence_snapshot(seconds as u64), T0);
        let (mut reconciled, _) = build(equivalence_snapshot(seconds as u64), T0);

        for k in 1..=seconds {
            ticked.tick(T0 + k as f64);
        }
        reconciled.reconcile(T0 + seconds as f64);

        assert_eq!(
            ticked.snapshot(),
            reconciled.snapshot(),
            "paths diverged for a {seconds}s gap"
        );
    }
}

#[test]
fn ticks_and_reconcile_agree_from_a_fresh_outpost() {
    const SECONDS: u32 = 500;

    let (mut ticked, _) = build(Snapshot::bootstrap(31), T0);
    let (mut reconciled, _) = build(Snapshot::bootstrap(31), T0);

    // A live host ticks as soon as it is running.
    for k in 0..=SECONDS {
        ticked.tick(T0 + k as f64);
    }
    reconciled.reconcile(T0 + SECONDS as f64);

    assert_eq!(ticked.snapshot(), reconciled.snapshot());
    assert_eq!(reconciled.snapshot().available.len(), 5);
}
