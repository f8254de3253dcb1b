//! Shared primitive types used across the entire simulation.

use uuid::Uuid;

/// Seconds since the Unix epoch. Simulated time and wall-clock time share
/// this representation so offline gaps can be subtracted directly.
pub type Timestamp = f64;

/// A span of simulated time in seconds.
pub type Seconds = f64;

pub type WorkerId = Uuid;
pub type MissionId = Uuid;
pub type ItemId = Uuid;
pub type EquipmentId = Uuid;
