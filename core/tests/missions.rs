//! Live-tick tests for the mission state machine.
//!
//! Tests verify:
//! 1. Assignment rejects unknown ids and busy workers without mutating
//! 2. The completion, expiration and generation sweeps
//! 3. The generation cap under many small ticks
//! 4. One save per mutating sweep (not batched) unless configured otherwise
//! 5. The worker/mission 1:1 invariant across long runs

use outpost_core::{
    config::{SavePolicy, SimConfig},
    engine::SimEngine,
    entity::{Item, Mission, MissionState, WorkerStatus},
    error::SimError,
    event::SimEvent,
    snapshot::Snapshot,
    store::MemoryStore,
};
use uuid::Uuid;

const T0: f64 = 1_700_000_000.0;

// ── Test helpers ────────────────────────────────────────────────────────────

fn build(snapshot: Snapshot, config: SimConfig) -> (SimEngine, MemoryStore) {
    let store = MemoryStore::new();
    let engine = SimEngine::new(config, snapshot, Some(T0), Box::new(store.clone()));
    (engine, store)
}

fn fresh(seed: u64) -> (SimEngine, MemoryStore) {
    build(Snapshot::bootstrap(seed), SimConfig::default_test(seed))
}

fn mission(id: u128, duration: f64, state: MissionState) -> Mission {
    Mission {
        id: Uuid::from_u128(id),
        name: format!("Mission {id}"),
        description: String::new(),
        template: "test".into(),
        duration,
        difficulty: 1,
        rewards: vec![Item::new(Uuid::from_u128(1_000 + id), "Scrap", "", 5)],
        state,
    }
}

fn on_mission_count(snapshot: &Snapshot) -> usize {
    snapshot
        .workers
        .iter()
        .filter(|w| w.status == WorkerStatus::OnMission)
        .count()
}

// ── Assignment ──────────────────────────────────────────────────────────────

#[test]
fn assign_unknown_mission_is_not_found() {
    let (mut engine, store) = fresh(1);
    engine.tick(T0);
    let before = engine.snapshot().clone();
    let saves = store.write_count();

    let worker_id = before.workers[0].id;
    let err = engine.assign(Uuid::from_u128(404), worker_id, T0 + 1.0).unwrap_err();

    assert!(matches!(err, SimError::MissionNotFound { .. }), "got {err:?}");
    assert_eq!(engine.snapshot(), &before);
    assert_eq!(store.write_count(), saves, "a rejected assign must not save");
}

#[test]
fn assign_unknown_worker_is_not_found() {
    let (mut engine, _store) = fresh(2);
    engine.tick(T0);
    let before = engine.snapshot().clone();
    let mission_id = before.available[0].id;

    let err = engine.assign(mission_id, Uuid::from_u128(404), T0 + 1.0).unwrap_err();

    assert!(matches!(err, SimError::WorkerNotFound { .. }), "got {err:?}");
    assert_eq!(engine.snapshot(), &before);
}

#[test]
fn assign_busy_worker_is_rejected() {
    let (mut engine, _store) = fresh(3);
    engine.tick(T0);
    engine.tick(T0 + 120.0);
    let first = engine.snapshot().available[0].id;
    let second = engine.snapshot().available[1].id;
    let worker_id = engine.snapshot().workers[0].id;

    engine.assign(first, worker_id, T0 + 121.0).unwrap();
    let before = engine.snapshot().clone();
    let err = engine.assign(second, worker_id, T0 + 122.0).unwrap_err();

    assert!(
        matches!(err, SimError::WorkerBusy { status: WorkerStatus::OnMission, .. }),
        "got {err:?}"
    );
    assert!(err.is_rejection());
    assert_eq!(engine.snapshot(), &before);
}

#[test]
fn assign_moves_mission_to_active() {
    let (mut engine, store) = fresh(4);
    engine.tick(T0);
    let mission_id = engine.snapshot().available[0].id;
    let worker_id = engine.snapshot().workers[1].id;
    let saves = store.write_count();

    let events = engine.assign(mission_id, worker_id, T0 + 5.0).unwrap();

    assert_eq!(
        events,
        vec![SimEvent::MissionAssigned {
            at: T0 + 5.0,
            mission_id,
            worker_id
        }]
    );
    let snapshot = engine.snapshot();
    assert!(snapshot.available.is_empty());
    assert_eq!(snapshot.active.len(), 1);
    assert_eq!(
        snapshot.active[0].state,
        MissionState::Active {
            worker_id,
            start_time: T0 + 5.0
        }
    );
    assert_eq!(snapshot.active[0].expiration_time(), None);
    assert_eq!(snapshot.worker(worker_id).unwrap().status, WorkerStatus::OnMission);
    assert_eq!(store.write_count(), saves + 1);
    assert!(snapshot.validate().is_ok());
}

#[test]
fn second_assign_of_same_mission_changes_nothing() {
    let (mut engine, _store) = fresh(5);
    engine.tick(T0);
    let mission_id = engine.snapshot().available[0].id;
    let worker_id = engine.snapshot().workers[0].id;

    engine.assign(mission_id, worker_id, T0 + 1.0).unwrap();
    let after_first = engine.snapshot().clone();
    let again = engine.assign(mission_id, worker_id, T0 + 1.0);

    assert!(matches!(again, Err(SimError::MissionNotFound { .. })));
    assert_eq!(engine.snapshot(), &after_first);
}

// ── Sweeps ──────────────────────────────────────────────────────────────────

#[test]
fn first_tick_generates_immediately() {
    let (mut engine, store) = fresh(6);
    let events = engine.tick(T0);

    assert_eq!(events.len(), 1);
    assert!(matches!(events[0], SimEvent::MissionGenerated { at, .. } if at == T0));
    let snapshot = engine.snapshot();
    assert_eq!(snapshot.available.len(), 1);
    assert_eq!(snapshot.last_generation_time, Some(T0));
    assert_eq!(snapshot.available[0].expiration_time(), Some(T0 + 600.0));
    assert_eq!(snapshot.missions_generated, 1);
    assert_eq!(store.write_count(), 1);
}

#[test]
fn tick_at_same_instant_is_a_no_op() {
    let (mut engine, store) = fresh(7);
    engine.tick(T0);
    let before = engine.snapshot().clone();
    let saves = store.write_count();

    assert!(engine.tick(T0).is_empty());
    assert_eq!(engine.snapshot(), &before);
    assert_eq!(store.write_count(), saves);
}

#[test]
fn generation_waits_for_interval() {
    let (mut engine, _store) = fresh(8);
    engine.tick(T0);
    assert!(engine.tick(T0 + 60.0).is_empty());
    assert!(engine.tick(T0 + 119.0).is_empty());

    let events = engine.tick(T0 + 120.0);
    assert_eq!(events.len(), 1);
    assert_eq!(engine.snapshot().available.len(), 2);
    assert_eq!(engine.snapshot().last_generation_time, Some(T0 + 120.0));
}

#[test]
fn completion_deposits_rewards_and_frees_worker() {
    let (mut engine, _store) = fresh(9);
    engine.tick(T0);
    let mission = engine.snapshot().available[0].clone();
    let worker_id = engine.snapshot().workers[2].id;
    let start = T0 + 1.0;
    engine.assign(mission.id, worker_id, start).unwrap();

    let before: Vec<u32> = mission
        .rewards
        .iter()
        .map(|r| engine.snapshot().inventory_quantity(&r.name))
        .collect();

    engine.tick(start + mission.duration - 0.5);
    assert_eq!(engine.snapshot().active.len(), 1, "not finished yet");

    let events = engine.tick(start + mission.duration);
    assert!(events.iter().any(|e| matches!(
        e,
        SimEvent::MissionCompleted { mission_id, .. } if *mission_id == mission.id
    )));

    let snapshot = engine.snapshot();
    assert!(snapshot.active.is_empty());
    assert_eq!(snapshot.worker(worker_id).unwrap().status, WorkerStatus::Idle);
    for (reward, had) in mission.rewards.iter().zip(before) {
        assert_eq!(
            snapshot.inventory_quantity(&reward.name),
            had + reward.quantity,
            "reward {} deposited once",
            reward.name
        );
    }
}

#[test]
fn expiration_removes_unassigned_mission() {
    let (mut engine, _store) = fresh(10);
    engine.tick(T0);
    let stale = engine.snapshot().available[0].id;

    engine.tick(T0 + 599.0);
    assert!(engine.snapshot().available.iter().any(|m| m.id == stale));

    let events = engine.tick(T0 + 600.0);
    assert!(events.contains(&SimEvent::MissionExpired {
        at: T0 + 600.0,
        mission_id: stale
    }));
    assert!(engine.snapshot().available.iter().all(|m| m.id != stale));
}

#[test]
fn freed_slot_is_refilled_in_the_same_tick() {
    let mut snapshot = Snapshot::bootstrap(11);
    snapshot.available = (1..=5)
        .map(|i| mission(i, 60.0, MissionState::Available { expiration_time: T0 + 50.0 * i as f64 }))
        .collect();
    snapshot.last_generation_time = Some(T0 - 1_000.0);
    let (mut engine, _store) = build(snapshot, SimConfig::default_test(11));

    assert!(engine.tick(T0 + 10.0).is_empty(), "catalog is full");

    let events = engine.tick(T0 + 50.0);
    let kinds: Vec<&str> = events.iter().map(SimEvent::type_name).collect();
    assert_eq!(kinds, vec!["mission_expired", "mission_generated"]);
    assert_eq!(engine.snapshot().available.len(), 5);
}

#[test]
fn generation_cap_holds_under_many_small_ticks() {
    let (mut engine, _store) = fresh(12);
    let cap = engine.config().max_available_missions;
    let mut peak = 0;

    for second in 0..3_600 {
        engine.tick(T0 + second as f64);
        let available = engine.snapshot().available.len();
        assert!(available <= cap, "catalog grew to {available} at +{second}s");
        peak = peak.max(available);
    }
    assert_eq!(peak, cap, "catalog should fill up to the cap");
}

// ── Save points ─────────────────────────────────────────────────────────────

fn three_sweep_snapshot(seed: u64) -> Snapshot {
    let mut snapshot = Snapshot::bootstrap(seed);
    let worker_id = snapshot.workers[0].id;
    snapshot.workers[0].status = WorkerStatus::OnMission;
    snapshot.active.push(mission(
        1,
        10.0,
        MissionState::Active {
            worker_id,
            start_time: T0,
        },
    ));
    snapshot
        .available
        .push(mission(2, 60.0, MissionState::Available { expiration_time: T0 + 10.0 }));
    snapshot.last_generation_time = Some(T0 - 200.0);
    snapshot
}

#[test]
fn each_mutating_sweep_saves_separately() {
    let (mut engine, store) = build(three_sweep_snapshot(13), SimConfig::default_test(13));

    let events = engine.tick(T0 + 10.0);

    let kinds: Vec<&str> = events.iter().map(SimEvent::type_name).collect();
    assert_eq!(kinds, vec!["mission_completed", "mission_expired", "mission_generated"]);
    assert_eq!(store.write_count(), 3, "saves must not be batched");
    assert_eq!(engine.save_count(), 3);
}

#[test]
fn sweeps_without_changes_do_not_save() {
    let (mut engine, store) = build(three_sweep_snapshot(14), SimConfig::default_test(14));

    // Only generation is due this early.
    engine.tick(T0 + 1.0);
    assert_eq!(store.write_count(), 1);
}

#[test]
fn per_tick_policy_batches_into_one_save() {
    let config = SimConfig {
        save_policy: SavePolicy::PerTick,
        ..SimConfig::default_test(15)
    };
    let (mut engine, store) = build(three_sweep_snapshot(15), config);

    let events = engine.tick(T0 + 10.0);
    assert_eq!(events.len(), 3);
    assert_eq!(store.write_count(), 1);
}

#[test]
fn failed_save_is_retried_by_the_next_one() {
    let (mut engine, store) = fresh(16);
    store.set_failing(true);
    engine.tick(T0);
    assert_eq!(engine.failed_save_count(), 1);
    assert_eq!(engine.snapshot().available.len(), 1, "memory stays authoritative");
    assert_eq!(store.contents(), None);

    store.set_failing(false);
    engine.tick(T0 + 120.0);
    let record = outpost_core::snapshot::decode(&store.contents().unwrap()).unwrap();
    assert_eq!(&record.snapshot, engine.snapshot());
    assert_eq!(record.last_active_timestamp, Some(T0 + 120.0));
}

// ── Invariants ──────────────────────────────────────────────────────────────

#[test]
fn worker_mission_links_stay_one_to_one() {
    let (mut engine, _store) = fresh(17);

    for second in 0..4_000u32 {
        let now = T0 + second as f64;
        engine.tick(now);

        if second % 7 == 0 {
            let snapshot = engine.snapshot();
            let idle = snapshot.workers.iter().find(|w| w.is_idle()).map(|w| w.id);
            let open = snapshot.available.first().map(|m| m.id);
            if let (Some(worker_id), Some(mission_id)) = (idle, open) {
                engine.assign(mission_id, worker_id, now).unwrap();
            }
        }

        let snapshot = engine.snapshot();
        assert!(snapshot.validate().is_ok(), "invariant broken at +{second}s");
        assert_eq!(on_mission_count(snapshot), snapshot.active.len());
        assert!(snapshot.available.iter().all(Mission::is_available));
        assert!(snapshot.active.iter().all(Mission::is_active));
    }

    assert!(
        engine.snapshot().inventory.len() > Snapshot::bootstrap(17).inventory.len(),
        "an hour of play should have paid out rewards"
    );
}
