use crate::types::{MissionId, WorkerId};
use serde::{Deserialize, Serialize};

/// All player-issued commands.
/// Variants are appended, never removed or reordered.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "cmd", rename_all = "snake_case")]
pub enum PlayerCommand {
    Assign {
        mission_id: MissionId,
        worker_id: WorkerId,
    },
    /// The host is about to be backgrounded or closed.
    RequestSave,
}
