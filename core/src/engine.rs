//! The simulation engine, sole owner of the snapshot.
//!
//! EXECUTION ORDER (fixed, documented, never reordered):
//!   1. Completion subsystem  (frees workers and rewards)
//!   2. Expiration subsystem  (drops stale catalog entries)
//!   3. Generation subsystem  (fills the catalog)
//!
//! Completion runs before generation so a slot freed this tick is visible
//! to the same tick's generation check.
//!
//! RULES:
//!   - All mutation goes through `assign`, `tick` or `reconcile`.
//!   - `tick` and the offline reconciler drive the same subsystems.
//!   - All randomness flows through the RngBank seeded from the snapshot.
//!   - A failed save is logged and retried by the next save; the in-memory
//!     snapshot stays authoritative.

use crate::{
    catalog::MissionCatalog,
    completion_subsystem::CompletionSubsystem,
    config::{SavePolicy, SimConfig},
    entity::WorkerStatus,
    error::{SimError, SimResult},
    event::SimEvent,
    expiration_subsystem::ExpirationSubsystem,
    generation_subsystem::GenerationSubsystem,
    snapshot::{self, LoadOutcome, Snapshot},
    store::SnapshotStore,
    subsystem::{RuleContext, SimSubsystem},
    types::{MissionId, Timestamp, WorkerId},
};

pub struct SimEngine {
    pub(crate) config: SimConfig,
    pub(crate) catalog: MissionCatalog,
    pub(crate) snapshot: Snapshot,
    pub(crate) subsystems: Vec<Box<dyn SimSubsystem>>,
    last_active: Option<Timestamp>,
    store: Box<dyn SnapshotStore>,
    sequence: u64,
    saves: u64,
    failed_saves: u64,
}

impl SimEngine {
    /// Wrap an existing snapshot. Nothing is loaded or saved.
    pub fn new(
        config: SimConfig,
        snapshot: Snapshot,
        last_active: Option<Timestamp>,
        store: Box<dyn SnapshotStore>,
    ) -> Self {
        let mut engine = Self {
            config,
            catalog: MissionCatalog::standard(),
            snapshot,
            subsystems: Vec::new(),
            last_active,
            store,
            sequence: 0,
            saves: 0,
            failed_saves: 0,
        };

        // Sweep order is fixed; see the module docs.
        engine.register(Box::new(CompletionSubsystem::new()));
        engine.register(Box::new(ExpirationSubsystem::new()));
        engine.register(Box::new(GenerationSubsystem::new()));
        engine
    }

    /// Load the stored snapshot and bring it up to `now`.
    ///
    /// - Nothing stored: bootstrap fresh data and save it.
    /// - Stored bytes unusable: log, discard, bootstrap.
    /// - Store unreadable: `StorageUnavailable`, the only fatal storage error.
    ///
    /// `config` is validated first; nothing is read or written if it fails.
    pub fn start(config: SimConfig, mut store: Box<dyn SnapshotStore>, now: Timestamp) -> SimResult<Self> {
        config
            .validate()
            .map_err(|e| SimError::InvalidConfig(e.to_string()))?;
        let location = store.describe();
        let loaded = match snapshot::load(store.as_mut()) {
            Ok(LoadOutcome::Loaded(record)) => Some(record),
            Ok(LoadOutcome::Absent) => {
                log::info!("No snapshot in {location}, starting a new outpost");
                None
            }
            Err(e) if e.is_decode_failure() => {
                log::warn!("Discarding unreadable snapshot in {location}: {e}");
                None
            }
            Err(e) => return Err(SimError::StorageUnavailable(e)),
        };

        let Some(record) = loaded else {
            let seed = config.seed.unwrap_or_else(rand::random);
            let mut engine = Self::new(config, Snapshot::bootstrap(seed), None, store);
            engine.save(now);
            return Ok(engine);
        };

        log::info!(
            "Loaded snapshot #{} from {location}: {} available, {} active, last active {}",
            record.sequence,
            record.snapshot.available.len(),
            record.snapshot.active.len(),
            describe_time(record.last_active_timestamp),
        );
        let mut engine = Self::new(config, record.snapshot, record.last_active_timestamp, store);
        engine.sequence = record.sequence;
        engine.reconcile(now);
        Ok(engine)
    }

    /// Register a subsystem. Call in the documented execution order.
    pub fn register(&mut self, subsystem: Box<dyn SimSubsystem>) {
        self.subsystems.push(subsystem);
    }

    pub fn with_catalog(mut self, catalog: MissionCatalog) -> Self {
        self.catalog = catalog;
        self
    }

    pub fn snapshot(&self) -> &Snapshot {
        &self.snapshot
    }

    pub fn config(&self) -> &SimConfig {
        &self.config
    }

    /// Wall-clock time of the most recent save attempt.
    pub fn last_active(&self) -> Option<Timestamp> {
        self.last_active
    }

    /// Successful saves since this engine was created.
    pub fn save_count(&self) -> u64 {
        self.saves
    }

    pub fn failed_save_count(&self) -> u64 {
        self.failed_saves
    }

    /// Send an idle worker on an available mission.
    ///
    /// Fails without touching anything if either id is unknown or the worker
    /// is not idle.
    pub fn assign(&mut self, mission_id: MissionId, worker_id: WorkerId, now: Timestamp) -> SimResult<Vec<SimEvent>> {
        let index = self
            .snapshot
            .available
            .iter()
            .position(|m| m.id == mission_id)
            .ok_or(SimError::MissionNotFound { mission_id })?;
        let worker = self
            .snapshot
            .worker_mut(worker_id)
            .ok_or(SimError::WorkerNotFound { worker_id })?;
        if worker.status != WorkerStatus::Idle {
            return Err(SimError::WorkerBusy {
                worker_id,
                status: worker.status,
            });
        }

        worker.status = WorkerStatus::OnMission;
        let mut mission = self.snapshot.available.remove(index);
        mission.activate(worker_id, now);
        log::debug!("assign: '{}' ({mission_id}) -> worker {worker_id} at {now:.0}", mission.name);
        self.snapshot.active.push(mission);

        self.save(now);
        Ok(vec![SimEvent::MissionAssigned {
            at: now,
            mission_id,
            worker_id,
        }])
    }

    /// Advance the simulation to `now`. Re-invoking at the same instant is a
    /// no-op.
    pub fn tick(&mut self, now: Timestamp) -> Vec<SimEvent> {
        let mut tick_events = Vec::new();
        let mut pending_save = false;

        for i in 0..self.subsystems.len() {
            let mut ctx = RuleContext {
                snapshot: &mut self.snapshot,
                config: &self.config,
                catalog: &self.catalog,
            };
            let new_events = self.subsystems[i].on_tick(&mut ctx, now);
            if new_events.is_empty() {
                continue;
            }

            match self.config.save_policy {
                SavePolicy::PerSweep => {
                    self.save(now);
                }
                SavePolicy::PerTick => pending_save = true,
            }
            tick_events.extend(new_events);
        }

        if pending_save {
            self.save(now);
        }
        tick_events
    }

    /// Unconditional save, for the host going to the background.
    pub fn request_save(&mut self, now: Timestamp) -> bool {
        self.save(now)
    }

    /// Encode and write the snapshot with `now` as the last-active marker.
    /// Returns whether the write landed.
    pub(crate) fn save(&mut self, now: Timestamp) -> bool {
        self.sequence += 1;
        self.last_active = Some(now);

        let result = snapshot::encode(&self.snapshot, now, self.sequence).and_then(|bytes| self.store.write(&bytes));
        match result {
            Ok(()) => {
                self.saves += 1;
                log::debug!("Snapshot #{} saved at {now:.0}", self.sequence);
                true
            }
            Err(e) => {
                self.failed_saves += 1;
                log::warn!(
                    "Saving snapshot #{} to {} failed, will retry on next save: {e}",
                    self.sequence,
                    self.store.describe()
                );
                false
            }
        }
    }
}

fn describe_time(ts: Option<Timestamp>) -> String {
    ts.and_then(|t| chrono::DateTime::<chrono::Utc>::from_timestamp_millis((t * 1000.0) as i64))
        .map(|dt| dt.to_rfc3339())
        .unwrap_or_else(|| "never".to_string())
}
