//! Events emitted by the rule subsystems.
//!
//! Every state change the engine makes is reported as one event. An empty
//! event list from a sweep means the sweep changed nothing, which is how the
//! engine decides whether a save is due.

use crate::{
    entity::Item,
    types::{MissionId, Seconds, Timestamp, WorkerId},
};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum SimEvent {
    MissionGenerated {
        at: Timestamp,
        mission_id: MissionId,
        name: String,
        expiration_time: Timestamp,
    },
    MissionExpired {
        at: Timestamp,
        mission_id: MissionId,
    },
    MissionAssigned {
        at: Timestamp,
        mission_id: MissionId,
        worker_id: WorkerId,
    },
    MissionCompleted {
        at: Timestamp,
        mission_id: MissionId,
        worker_id: WorkerId,
        rewards: Vec<Item>,
    },
    OfflineReconciled {
        at: Timestamp,
        elapsed: Seconds,
        completed: usize,
        expired: usize,
        generated: usize,
    },
}

impl SimEvent {
    /// Stable snake_case name of the variant, for logs and tooling.
    pub fn type_name(&self) -> &'static str {
        match self {
            Self::MissionGenerated { .. } => "mission_generated",
            Self::MissionExpired { .. } => "mission_expired",
            Self::MissionAssigned { .. } => "mission_assigned",
            Self::MissionCompleted { .. } => "mission_completed",
            Self::OfflineReconciled { .. } => "offline_reconciled",
        }
    }
}
