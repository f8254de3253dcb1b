//! Host runtime: one owner thread per engine.
//!
//! Nothing outside the owner thread touches the engine. UI callers and the
//! ticker send `HostRequest`s through a `SimHandle`; the owner applies them
//! one at a time, so assign, tick and save can never interleave. Saves are
//! written synchronously on the owner thread, so they land in order.

use crate::{
    clock::WallClock,
    command::PlayerCommand,
    engine::SimEngine,
    error::{SimError, SimResult},
    event::SimEvent,
    snapshot::Snapshot,
    types::{MissionId, Timestamp, WorkerId},
};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::{self, Receiver, Sender};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;

/// Sent to subscribers after every request that changed the snapshot.
#[derive(Debug, Clone)]
pub struct SnapshotUpdate {
    pub snapshot: Snapshot,
    pub events: Vec<SimEvent>,
}

enum HostRequest {
    Tick { now: Timestamp },
    Command {
        command: PlayerCommand,
        reply: Sender<SimResult<Vec<SimEvent>>>,
    },
    Snapshot { reply: Sender<Snapshot> },
    Subscribe { sender: Sender<SnapshotUpdate> },
    Shutdown,
}

/// Cloneable front door to a running engine.
#[derive(Clone)]
pub struct SimHandle {
    tx: Sender<HostRequest>,
}

impl SimHandle {
    /// Queue a tick at `now`. Fire-and-forget.
    pub fn tick(&self, now: Timestamp) -> SimResult<()> {
        self.send(HostRequest::Tick { now })
    }

    pub fn assign(&self, mission_id: MissionId, worker_id: WorkerId) -> SimResult<Vec<SimEvent>> {
        self.command(PlayerCommand::Assign { mission_id, worker_id })
    }

    /// Save now and wait for the write to finish.
    pub fn request_save(&self) -> SimResult<()> {
        self.command(PlayerCommand::RequestSave).map(|_| ())
    }

    pub fn command(&self, command: PlayerCommand) -> SimResult<Vec<SimEvent>> {
        let (reply, rx) = mpsc::channel();
        self.send(HostRequest::Command { command, reply })?;
        rx.recv().map_err(|_| SimError::HostStopped)?
    }

    /// A copy of the current snapshot.
    pub fn snapshot(&self) -> SimResult<Snapshot> {
        let (reply, rx) = mpsc::channel();
        self.send(HostRequest::Snapshot { reply })?;
        rx.recv().map_err(|_| SimError::HostStopped)
    }

    /// Receive a `SnapshotUpdate` whenever the snapshot changes.
    pub fn subscribe(&self) -> SimResult<Receiver<SnapshotUpdate>> {
        let (sender, rx) = mpsc::channel();
        self.send(HostRequest::Subscribe { sender })?;
        Ok(rx)
    }

    fn send(&self, request: HostRequest) -> SimResult<()> {
        self.tx.send(request).map_err(|_| SimError::HostStopped)
    }
}

pub struct SimHost {
    handle: SimHandle,
    thread: JoinHandle<SimEngine>,
}

impl SimHost {
    /// Move `engine` onto its own thread. `clock` stamps player commands.
    pub fn spawn(engine: SimEngine, clock: Arc<dyn WallClock>) -> SimResult<Self> {
        let (tx, rx) = mpsc::channel();
        let thread = thread::Builder::new()
            .name("outpost-sim".into())
            .spawn(move || run_owner(engine, rx, clock))
            .map_err(SimError::HostSpawn)?;
        Ok(Self {
            handle: SimHandle { tx },
            thread,
        })
    }

    pub fn handle(&self) -> SimHandle {
        self.handle.clone()
    }

    /// Save, stop the owner thread and hand the engine back.
    pub fn shutdown(self) -> SimResult<SimEngine> {
        // A send error means the owner already exited; join still works.
        let _ = self.handle.send(HostRequest::Shutdown);
        self.thread.join().map_err(|_| SimError::HostStopped)
    }
}

fn run_owner(mut engine: SimEngine, rx: Receiver<HostRequest>, clock: Arc<dyn WallClock>) -> SimEngine {
    let mut subscribers: Vec<Sender<SnapshotUpdate>> = Vec::new();

    while let Ok(request) = rx.recv() {
        match request {
            HostRequest::Tick { now } => {
                let events = engine.tick(now);
                notify(&mut subscribers, engine.snapshot(), events);
            }
            HostRequest::Command { command, reply } => {
                let now = clock.now();
                let result = match command {
                    PlayerCommand::Assign { mission_id, worker_id } => engine.assign(mission_id, worker_id, now),
                    PlayerCommand::RequestSave => {
                        engine.request_save(now);
                        Ok(vec![])
                    }
                };
                match &result {
                    Ok(events) => notify(&mut subscribers, engine.snapshot(), events.clone()),
                    Err(e) if e.is_rejection() => log::debug!("command rejected: {e}"),
                    Err(e) => log::warn!("command failed: {e}"),
                }
                // The caller may have given up waiting; nothing to do then.
                let _ = reply.send(result);
            }
            HostRequest::Snapshot { reply } => {
                let _ = reply.send(engine.snapshot().clone());
            }
            HostRequest::Subscribe { sender } => subscribers.push(sender),
            HostRequest::Shutdown => break,
        }
    }

    // Best-effort save before the process may be frozen or killed.
    engine.request_save(clock.now());
    log::info!("Simulation host stopped after {} saves", engine.save_count());
    engine
}

fn notify(subscribers: &mut Vec<Sender<SnapshotUpdate>>, snapshot: &Snapshot, events: Vec<SimEvent>) {
    if events.is_empty() {
        return;
    }
    subscribers.retain(|sub| {
        sub.send(SnapshotUpdate {
            snapshot: snapshot.clone(),
            events: events.clone(),
        })
        .is_ok()
    });
}

/// Periodic tick source. Stops on drop or when the host goes away.
pub struct Ticker {
    stop: Arc<AtomicBool>,
    thread: Option<JoinHandle<()>>,
}

impl Ticker {
    pub fn spawn(handle: SimHandle, clock: Arc<dyn WallClock>, interval: Duration) -> SimResult<Self> {
        let stop = Arc::new(AtomicBool::new(false));
        let flag = Arc::clone(&stop);
        let thread = thread::Builder::new()
            .name("outpost-ticker".into())
            .spawn(move || {
                while !flag.load(Ordering::Relaxed) {
                    thread::sleep(interval);
                    if flag.load(Ordering::Relaxed) || handle.tick(clock.now()).is_err() {
                        break;
                    }
                }
            })
            .map_err(SimError::HostSpawn)?;
        Ok(Self {
            stop,
            thread: Some(thread),
        })
    }

    pub fn stop(mut self) {
        self.halt();
    }

    fn halt(&mut self) {
        self.stop.store(true, Ordering::Relaxed);
        if let Some(thread) = self.thread.take() {
            let _ = thread.join();
        }
    }
}

impl Drop for Ticker {
    fn drop(&mut self) {
        self.halt();
    }
}
