//! Save records: the snapshot, its envelope and the JSON codec.
//!
//! The persisted record is the snapshot plus the wall-clock time of the
//! last save. Fields are written by name, so adding a field with
//! `#[serde(default)]` keeps older files loadable.

use crate::{
    entity::{Equipment, EquipmentSlot, Item, Mission, ResourcePool, Worker, WorkerStatus},
    error::{StoreError, StoreResult},
    rng::{RngBank, SubsystemSlot},
    store::SnapshotStore,
    types::{Timestamp, WorkerId},
};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Save format changelog:
/// v1: initial format
pub const SAVE_VERSION: u32 = 1;

const STARTING_CREW: &[&str] = &["Rook", "Mara", "Tibbs"];

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Snapshot {
    /// Master seed for every random draw made against this snapshot.
    pub seed: u64,
    /// Number of missions generated so far; selects the next draw stream.
    #[serde(default)]
    pub missions_generated: u64,
    pub resources: ResourcePool,
    pub workers: Vec<Worker>,
    pub available: Vec<Mission>,
    pub active: Vec<Mission>,
    pub inventory: Vec<Item>,
    #[serde(default)]
    pub equipment: Vec<Equipment>,
    pub last_generation_time: Option<Timestamp>,
}

impl Snapshot {
    /// A snapshot with no workers, missions or items.
    pub fn empty(seed: u64) -> Self {
        Self {
            seed,
            missions_generated: 0,
            resources: ResourcePool::default(),
            workers: Vec::new(),
            available: Vec::new(),
            active: Vec::new(),
            inventory: Vec::new(),
            equipment: Vec::new(),
            last_generation_time: None,
        }
    }

    /// First-run state: an idle crew, a little starter kit, no missions.
    pub fn bootstrap(seed: u64) -> Self {
        let mut rng = RngBank::new(seed).for_subsystem(SubsystemSlot::Bootstrap);
        let mut snapshot = Self::empty(seed);

        snapshot.workers = STARTING_CREW
            .iter()
            .map(|name| Worker::new(rng.next_uuid(), *name))
            .collect();

        snapshot.inventory = vec![
            Item::new(rng.next_uuid(), "Bandage", "Strips of boiled cloth.", 2),
            Item::new(rng.next_uuid(), "Flashlight", "Hand-cranked, flickers.", 1),
        ];

        snapshot.equipment = vec![
            Equipment {
                id: rng.next_uuid(),
                name: "Crowbar".into(),
                description: "Opens doors that would rather stay shut.".into(),
                slot: EquipmentSlot::Tool,
                bonus: 1,
            },
            Equipment {
                id: rng.next_uuid(),
                name: "Leather Jacket".into(),
                description: "Scuffed, but stops the worst of it.".into(),
                slot: EquipmentSlot::Armor,
                bonus: 1,
            },
            Equipment {
                id: rng.next_uuid(),
                name: "Canvas Pack".into(),
                description: "Room for a little more loot.".into(),
                slot: EquipmentSlot::Pack,
                bonus: 2,
            },
        ];

        snapshot
    }

    pub fn worker(&self, id: WorkerId) -> Option<&Worker> {
        self.workers.iter().find(|w| w.id == id)
    }

    pub fn worker_mut(&mut self, id: WorkerId) -> Option<&mut Worker> {
        self.workers.iter_mut().find(|w| w.id == id)
    }

    pub fn inventory_quantity(&self, name: &str) -> u32 {
        self.inventory
            .iter()
            .find(|i| i.name == name)
            .map_or(0, |i| i.quantity)
    }

    /// Check the structural invariants a loaded snapshot must satisfy.
    pub fn validate(&self) -> StoreResult<()> {
        if let Some(m) = self.available.iter().find(|m| !m.is_available()) {
            return Err(invalid(format!("mission {} is in the catalog but assigned", m.id)));
        }
        if let Some(m) = self.active.iter().find(|m| !m.is_active()) {
            return Err(invalid(format!("mission {} is active but unassigned", m.id)));
        }

        let mut missions_per_worker: HashMap<WorkerId, usize> = HashMap::new();
        for mission in &self.active {
            let Some(worker_id) = mission.assigned_worker() else { continue };
            let Some(worker) = self.worker(worker_id) else {
                return Err(invalid(format!("mission {} references unknown worker {worker_id}", mission.id)));
            };
            if worker.status != WorkerStatus::OnMission {
                return Err(invalid(format!("worker {worker_id} runs mission {} but is {:?}", mission.id, worker.status)));
            }
            *missions_per_worker.entry(worker_id).or_default() += 1;
        }

        for worker in &self.workers {
            let count = missions_per_worker.get(&worker.id).copied().unwrap_or(0);
            if count > 1 {
                return Err(invalid(format!("worker {} is on {count} missions", worker.id)));
            }
            if worker.status == WorkerStatus::OnMission && count == 0 {
                return Err(invalid(format!("worker {} is on a mission that does not exist", worker.id)));
            }
        }

        if let Some(item) = self.inventory.iter().find(|i| i.quantity == 0) {
            return Err(invalid(format!("inventory item {} has zero quantity", item.name)));
        }
        Ok(())
    }
}

fn invalid(reason: String) -> StoreError {
    StoreError::Invalid(reason)
}

/// The persisted envelope around a snapshot.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SaveRecord {
    pub version: u32,
    /// Monotonic save counter, for inspection and ordering checks.
    #[serde(default)]
    pub sequence: u64,
    /// Wall-clock time of the save. Absent only in hand-built records.
    pub last_active_timestamp: Option<Timestamp>,
    #[serde(flatten)]
    pub snapshot: Snapshot,
}

#[derive(Serialize)]
struct SaveRecordRef<'a> {
    version: u32,
    sequence: u64,
    last_active_timestamp: Option<Timestamp>,
    #[serde(flatten)]
    snapshot: &'a Snapshot,
}

/// Serialize `snapshot` with `now` as its last-active marker.
pub fn encode(snapshot: &Snapshot, now: Timestamp, sequence: u64) -> StoreResult<Vec<u8>> {
    let record = SaveRecordRef {
        version: SAVE_VERSION,
        sequence,
        last_active_timestamp: Some(now),
        snapshot,
    };
    Ok(serde_json::to_vec_pretty(&record)?)
}

/// Parse and validate a persisted record.
pub fn decode(bytes: &[u8]) -> StoreResult<SaveRecord> {
    let record: SaveRecord = serde_json::from_slice(bytes)?;
    if record.version > SAVE_VERSION {
        return Err(StoreError::UnsupportedVersion {
            found: record.version,
            supported: SAVE_VERSION,
        });
    }
    record.snapshot.validate()?;
    Ok(record)
}

#[derive(Debug, Clone, PartialEq)]
pub enum LoadOutcome {
    Loaded(SaveRecord),
    /// Nothing has ever been saved.
    Absent,
}

/// Read and decode whatever `store` holds.
pub fn load(store: &mut dyn SnapshotStore) -> StoreResult<LoadOutcome> {
    match store.read()? {
        None => Ok(LoadOutcome::Absent),
        Some(bytes) => decode(&bytes).map(LoadOutcome::Loaded),
    }
}
