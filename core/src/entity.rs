//! Entity model: plain value records with no behavior of their own beyond
//! identity comparison and the inventory stacking rule.

use crate::types::{EquipmentId, ItemId, MissionId, Seconds, Timestamp, WorkerId};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum WorkerStatus {
    Idle,
    OnMission,
    /// Reserved. No current rule moves a worker into this state.
    Returning,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Worker {
    pub id: WorkerId,
    pub name: String,
    pub level: u32,
    pub experience: u64,
    pub status: WorkerStatus,
}

impl Worker {
    pub fn new(id: WorkerId, name: impl Into<String>) -> Self {
        Self {
            id,
            name: name.into(),
            level: 1,
            experience: 0,
            status: WorkerStatus::Idle,
        }
    }

    pub fn is_idle(&self) -> bool {
        self.status == WorkerStatus::Idle
    }

    pub fn same_identity(&self, other: &Worker) -> bool {
        self.id == other.id
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Item {
    pub id: ItemId,
    pub name: String,
    pub description: String,
    pub quantity: u32,
}

impl Item {
    pub fn new(id: ItemId, name: impl Into<String>, description: impl Into<String>, quantity: u32) -> Self {
        Self {
            id,
            name: name.into(),
            description: description.into(),
            quantity: quantity.max(1),
        }
    }

    /// Stacks are keyed by exact, case-sensitive name.
    pub fn stacks_with(&self, other: &Item) -> bool {
        self.name == other.name
    }

    pub fn same_identity(&self, other: &Item) -> bool {
        self.id == other.id
    }
}

/// Deposit `items` into `inventory`. A name already present has its quantity
/// summed into the existing entry; an unseen name is appended as given.
pub fn deposit_items(inventory: &mut Vec<Item>, items: &[Item]) {
    for item in items {
        match inventory.iter_mut().find(|held| held.stacks_with(item)) {
            Some(held) => held.quantity = held.quantity.saturating_add(item.quantity),
            None => inventory.push(item.clone()),
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum EquipmentSlot {
    Tool,
    Armor,
    Pack,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Equipment {
    pub id: EquipmentId,
    pub name: String,
    pub description: String,
    pub slot: EquipmentSlot,
    pub bonus: i32,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ResourceKind {
    Scrap,
    Food,
    Water,
}

/// Camp stockpile. Counters are unsigned and all arithmetic saturates, so
/// the pool can never go negative.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct ResourcePool {
    pub scrap: u64,
    pub food: u64,
    pub water: u64,
}

impl ResourcePool {
    pub fn get(&self, kind: ResourceKind) -> u64 {
        match kind {
            ResourceKind::Scrap => self.scrap,
            ResourceKind::Food => self.food,
            ResourceKind::Water => self.water,
        }
    }

    pub fn credit(&mut self, kind: ResourceKind, amount: u64) {
        let counter = self.counter_mut(kind);
        *counter = counter.saturating_add(amount);
    }

    fn counter_mut(&mut self, kind: ResourceKind) -> &mut u64 {
        match kind {
            ResourceKind::Scrap => &mut self.scrap,
            ResourceKind::Food => &mut self.food,
            ResourceKind::Water => &mut self.water,
        }
    }
}

/// Where a mission sits in its lifecycle. A mission is either perishable in
/// the catalog or occupying a worker, never both and never neither.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum MissionState {
    Available { expiration_time: Timestamp },
    Active { worker_id: WorkerId, start_time: Timestamp },
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Mission {
    pub id: MissionId,
    pub name: String,
    pub description: String,
    /// Name of the template this mission was rolled from.
    #[serde(default)]
    pub template: String,
    pub duration: Seconds,
    pub difficulty: u32,
    pub rewards: Vec<Item>,
    pub state: MissionState,
}

impl Mission {
    pub fn is_available(&self) -> bool {
        matches!(self.state, MissionState::Available { .. })
    }

    pub fn is_active(&self) -> bool {
        matches!(self.state, MissionState::Active { .. })
    }

    pub fn expiration_time(&self) -> Option<Timestamp> {
        match self.state {
            MissionState::Available { expiration_time } => Some(expiration_time),
            MissionState::Active { .. } => None,
        }
    }

    pub fn assigned_worker(&self) -> Option<WorkerId> {
        match self.state {
            MissionState::Active { worker_id, .. } => Some(worker_id),
            MissionState::Available { .. } => None,
        }
    }

    pub fn start_time(&self) -> Option<Timestamp> {
        match self.state {
            MissionState::Active { start_time, .. } => Some(start_time),
            MissionState::Available { .. } => None,
        }
    }

    /// The instant an active mission finishes.
    pub fn completes_at(&self) -> Option<Timestamp> {
        self.start_time().map(|start| start + self.duration)
    }

    /// Replaces the expiration with an assignment.
    pub fn activate(&mut self, worker_id: WorkerId, now: Timestamp) {
        self.state = MissionState::Active {
            worker_id,
            start_time: now,
        };
    }

    pub fn same_identity(&self, other: &Mission) -> bool {
        self.id == other.id
    }
}
