//! Generation check.
//!
//! While the catalog is below `max_available_missions`, one new mission is
//! rolled every `generation_interval`. A live tick generates at most one
//! mission. Offline catch-up generates one per missed interval, each
//! backdated to the instant a tick would have produced it, and stops at
//! the cap.
//!
//! A full catalog leaves `last_generation_time` where it is, in both paths:
//! the timer only moves when a mission is actually generated. A snapshot
//! that never generated is due immediately, in both paths.

use crate::{
    event::SimEvent,
    rng::{RngBank, SubsystemSlot},
    subsystem::{OfflineWindow, RuleContext, SimSubsystem},
    types::Timestamp,
};

#[derive(Debug, Default)]
pub struct GenerationSubsystem;

impl GenerationSubsystem {
    pub fn new() -> Self {
        Self
    }
}

fn has_room(ctx: &RuleContext<'_>) -> bool {
    ctx.snapshot.available.len() < ctx.config.max_available_missions
}

/// Roll one mission as of `at` and append it to the catalog.
fn generate_at(ctx: &mut RuleContext<'_>, at: Timestamp) -> SimEvent {
    let bank = RngBank::new(ctx.snapshot.seed);
    let mut rng = bank.for_draw(SubsystemSlot::Generation, ctx.snapshot.missions_generated);
    let mission = ctx.catalog.generate(&mut rng, at, ctx.config);
    ctx.snapshot.missions_generated += 1;

    log::debug!(
        "generation: '{}' ({}) difficulty={} duration={:.0}s at {at:.0}",
        mission.name,
        mission.id,
        mission.difficulty,
        mission.duration
    );

    let event = SimEvent::MissionGenerated {
        at,
        mission_id: mission.id,
        name: mission.name.clone(),
        expiration_time: mission.expiration_time().unwrap_or(at),
    };
    ctx.snapshot.available.push(mission);
    event
}

impl SimSubsystem for GenerationSubsystem {
    fn name(&self) -> &'static str {
        "generation"
    }

    fn on_tick(&mut self, ctx: &mut RuleContext<'_>, now: Timestamp) -> Vec<SimEvent> {
        if !has_room(ctx) {
            return vec![];
        }
        let interval_elapsed = match ctx.snapshot.last_generation_time {
            None => true,
            Some(last) => now - last >= ctx.config.generation_interval,
        };
        if !interval_elapsed {
            return vec![];
        }

        let event = generate_at(ctx, now);
        ctx.snapshot.last_generation_time = Some(now);
        vec![event]
    }

    fn catch_up(&mut self, ctx: &mut RuleContext<'_>, window: OfflineWindow) -> Vec<SimEvent> {
        let interval = ctx.config.generation_interval;
        if interval <= 0.0 {
            return vec![];
        }
        // Never generated before: due right at the start of the gap, as a
        // live tick treats an absent timer as due immediately.
        let last = ctx
            .snapshot
            .last_generation_time
            .unwrap_or(window.offline_start - interval);

        let missed = ((window.offline_start - last + window.elapsed) / interval).floor();
        if missed < 1.0 {
            return vec![];
        }

        let mut events = Vec::new();
        for i in 1..=missed as u64 {
            if !has_room(ctx) {
                break;
            }
            events.push(generate_at(ctx, last + i as f64 * interval));
        }

        if !events.is_empty() {
            ctx.snapshot.last_generation_time = Some(last + events.len() as f64 * interval);
        }
        if (events.len() as f64) < missed {
            log::debug!(
                "generation: catalog full after {} of {missed} missed intervals",
                events.len()
            );
        }
        events
    }
}
