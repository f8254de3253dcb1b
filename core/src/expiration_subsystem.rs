//! Expiration sweep: unassigned missions past their expiration time leave
//! the catalog with no reward and no other side effect.

use crate::{
    event::SimEvent,
    snapshot::Snapshot,
    subsystem::{is_due, OfflineWindow, RuleContext, SimSubsystem},
    types::Timestamp,
};

#[derive(Debug, Default)]
pub struct ExpirationSubsystem;

impl ExpirationSubsystem {
    pub fn new() -> Self {
        Self
    }
}

fn expire_where(snapshot: &mut Snapshot, due: impl Fn(Timestamp) -> bool) -> Vec<SimEvent> {
    let mut events = Vec::new();
    snapshot.available.retain(|mission| match mission.expiration_time() {
        Some(at) if due(at) => {
            log::debug!("expiration: '{}' ({}) expired at {at:.0}", mission.name, mission.id);
            events.push(SimEvent::MissionExpired {
                at,
                mission_id: mission.id,
            });
            false
        }
        _ => true,
    });
    events
}

impl SimSubsystem for ExpirationSubsystem {
    fn name(&self) -> &'static str {
        "expiration"
    }

    fn on_tick(&mut self, ctx: &mut RuleContext<'_>, now: Timestamp) -> Vec<SimEvent> {
        expire_where(ctx.snapshot, |expires| is_due(expires, now))
    }

    fn catch_up(&mut self, ctx: &mut RuleContext<'_>, window: OfflineWindow) -> Vec<SimEvent> {
        expire_where(ctx.snapshot, |expires| window.covers(expires))
    }
}
