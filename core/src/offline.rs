//! Offline reconciler.
//!
//! On startup the gap between the last save and now is settled in one
//! pass: each subsystem's closed-form `catch_up` runs once, in the same
//! order a tick would run them, followed by a single save that stamps the
//! current time as the new last-active marker.

use crate::{
    engine::SimEngine,
    event::SimEvent,
    subsystem::{OfflineWindow, RuleContext},
    types::Timestamp,
};

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
struct Tally {
    completed: usize,
    expired: usize,
    generated: usize,
}

impl Tally {
    fn count(&mut self, events: &[SimEvent]) {
        for event in events {
            match event {
                SimEvent::MissionCompleted { .. } => self.completed += 1,
                SimEvent::MissionExpired { .. } => self.expired += 1,
                SimEvent::MissionGenerated { .. } => self.generated += 1,
                _ => {}
            }
        }
    }
}

impl SimEngine {
    /// Catch up on the time since the last save.
    ///
    /// Gaps no longer than `offline_threshold` are ignored and nothing is
    /// saved. Otherwise the final event is `OfflineReconciled`.
    pub fn reconcile(&mut self, now: Timestamp) -> Vec<SimEvent> {
        let Some(last_active) = self.last_active() else {
            return vec![];
        };
        let Some(window) = OfflineWindow::between(last_active, now, self.config.offline_threshold) else {
            log::debug!("offline gap {:.1}s below threshold, skipping reconciliation", now - last_active);
            return vec![];
        };
        self.reconcile_window(window, now)
    }

    fn reconcile_window(&mut self, window: OfflineWindow, now: Timestamp) -> Vec<SimEvent> {
        let mut events = Vec::new();
        let mut tally = Tally::default();

        for i in 0..self.subsystems.len() {
            let mut ctx = RuleContext {
                snapshot: &mut self.snapshot,
                config: &self.config,
                catalog: &self.catalog,
            };
            let new_events = self.subsystems[i].catch_up(&mut ctx, window);
            tally.count(&new_events);
            events.extend(new_events);
        }

        log::info!(
            "Reconciled {:.0}s offline: {} completed, {} expired, {} generated",
            window.elapsed,
            tally.completed,
            tally.expired,
            tally.generated
        );

        self.save(now);
        events.push(SimEvent::OfflineReconciled {
            at: now,
            elapsed: window.elapsed,
            completed: tally.completed,
            expired: tally.expired,
            generated: tally.generated,
        });
        events
    }
}
