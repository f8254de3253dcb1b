use crate::entity::WorkerStatus;
use crate::types::{MissionId, WorkerId};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum SimError {
    #[error("Mission {mission_id} not found in the available catalog")]
    MissionNotFound { mission_id: MissionId },

    #[error("Worker {worker_id} not found in the roster")]
    WorkerNotFound { worker_id: WorkerId },

    #[error("Worker {worker_id} is busy ({status:?})")]
    WorkerBusy { worker_id: WorkerId, status: WorkerStatus },

    #[error("Invalid simulation config: {0}")]
    InvalidConfig(String),

    #[error("Snapshot storage unavailable: {0}")]
    StorageUnavailable(#[source] StoreError),

    #[error("Failed to start simulation host thread: {0}")]
    HostSpawn(#[source] std::io::Error),

    #[error("Simulation host has stopped")]
    HostStopped,
}

impl SimError {
    /// Expected rejections in normal play, as opposed to environment failures.
    pub fn is_rejection(&self) -> bool {
        matches!(
            self,
            Self::MissionNotFound { .. } | Self::WorkerNotFound { .. } | Self::WorkerBusy { .. }
        )
    }
}

pub type SimResult<T> = Result<T, SimError>;

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("Snapshot decode failed: {0}")]
    Decode(#[from] serde_json::Error),

    #[error("Snapshot is not valid UTF-8 JSON")]
    Encoding,

    #[error("Unsupported snapshot version {found} (newest known: {supported})")]
    UnsupportedVersion { found: u32, supported: u32 },

    #[error("Snapshot violates invariant: {0}")]
    Invalid(String),
}

impl StoreError {
    /// True when the stored bytes were readable but unusable. Startup treats
    /// these as corrupt state to discard; everything else is an I/O fault.
    pub fn is_decode_failure(&self) -> bool {
        matches!(
            self,
            Self::Decode(_) | Self::Encoding | Self::UnsupportedVersion { .. } | Self::Invalid(_)
        )
    }
}

pub type StoreResult<T> = Result<T, StoreError>;
