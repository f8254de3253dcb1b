//! Rule subsystem trait.
//!
//! RULE: Every mission rule implements SimSubsystem.
//! The engine calls `on_tick` on each registered subsystem in registration
//! order, every tick. The offline reconciler calls `catch_up` on the same
//! subsystems in the same order, once, for a whole suspension gap.
//! Execution order is fixed and documented in engine.rs.

use crate::{
    catalog::MissionCatalog,
    config::SimConfig,
    event::SimEvent,
    snapshot::Snapshot,
    types::{Seconds, Timestamp},
};

/// Everything a rule may read or change.
pub struct RuleContext<'a> {
    pub snapshot: &'a mut Snapshot,
    pub config: &'a SimConfig,
    pub catalog: &'a MissionCatalog,
}

/// A suspension gap: the host was away from `offline_start` until
/// `offline_start + elapsed`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct OfflineWindow {
    pub offline_start: Timestamp,
    pub elapsed: Seconds,
}

impl OfflineWindow {
    /// The gap since `last_active`, or `None` when it is not longer than
    /// `threshold`. Negative gaps (clock moved backwards) are ignored too.
    pub fn between(last_active: Timestamp, now: Timestamp, threshold: Seconds) -> Option<Self> {
        let elapsed = now - last_active;
        if elapsed > threshold {
            Some(Self {
                offline_start: now - elapsed,
                elapsed,
            })
        } else {
            None
        }
    }

    pub fn end(&self) -> Timestamp {
        self.offline_start + self.elapsed
    }

    /// True if `deadline` passed at some point during the gap (or before it).
    pub fn covers(&self, deadline: Timestamp) -> bool {
        let remaining_at_offline_start = (deadline - self.offline_start).max(0.0);
        remaining_at_offline_start <= self.elapsed
    }
}

/// Live-tick deadline test shared by every sweep.
pub fn is_due(deadline: Timestamp, now: Timestamp) -> bool {
    now >= deadline
}

/// The contract every mission rule must fulfill.
pub trait SimSubsystem: Send {
    /// Unique stable name for this subsystem.
    fn name(&self) -> &'static str;

    /// Apply the rule at instant `now`. Returns one event per change made.
    fn on_tick(&mut self, ctx: &mut RuleContext<'_>, now: Timestamp) -> Vec<SimEvent>;

    /// Apply the rule once for an entire offline gap, with the outcome a
    /// sequence of ticks across the gap would have produced.
    fn catch_up(&mut self, ctx: &mut RuleContext<'_>, window: OfflineWindow) -> Vec<SimEvent>;
}
