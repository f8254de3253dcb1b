//! Completion sweep.
//!
//! An active mission whose `start_time + duration` has been reached pays
//! its rewards into the base inventory, releases its worker, and is
//! removed. Completion is removal, so a mission can never pay out twice.

use crate::{
    entity::{deposit_items, Mission, WorkerStatus},
    event::SimEvent,
    snapshot::Snapshot,
    subsystem::{is_due, OfflineWindow, RuleContext, SimSubsystem},
    types::Timestamp,
};

#[derive(Debug, Default)]
pub struct CompletionSubsystem;

impl CompletionSubsystem {
    pub fn new() -> Self {
        Self
    }
}

/// Resolve every active mission whose finish time satisfies `due`.
fn complete_where(snapshot: &mut Snapshot, due: impl Fn(Timestamp) -> bool) -> Vec<SimEvent> {
    let (finished, still_running): (Vec<Mission>, Vec<Mission>) = std::mem::take(&mut snapshot.active)
        .into_iter()
        .partition(|m| m.completes_at().is_some_and(&due));
    snapshot.active = still_running;

    let mut events = Vec::with_capacity(finished.len());
    for mission in finished {
        let (Some(worker_id), Some(at)) = (mission.assigned_worker(), mission.completes_at()) else {
            continue;
        };

        deposit_items(&mut snapshot.inventory, &mission.rewards);
        match snapshot.worker_mut(worker_id) {
            Some(worker) => worker.status = WorkerStatus::Idle,
            None => log::warn!("mission {} finished for unknown worker {worker_id}", mission.id),
        }

        log::debug!(
            "completion: '{}' ({}) finished at {at:.0}, {} reward stacks deposited",
            mission.name,
            mission.id,
            mission.rewards.len()
        );

        events.push(SimEvent::MissionCompleted {
            at,
            mission_id: mission.id,
            worker_id,
            rewards: mission.rewards,
        });
    }
    events
}

impl SimSubsystem for CompletionSubsystem {
    fn name(&self) -> &'static str {
        "completion"
    }

    fn on_tick(&mut self, ctx: &mut RuleContext<'_>, now: Timestamp) -> Vec<SimEvent> {
        complete_where(ctx.snapshot, |finish| is_due(finish, now))
    }

    fn catch_up(&mut self, ctx: &mut RuleContext<'_>, window: OfflineWindow) -> Vec<SimEvent> {
        complete_where(ctx.snapshot, |finish| window.covers(finish))
    }
}
