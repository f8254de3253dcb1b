//! Mission catalog: the fixed template table and the generator that rolls
//! concrete missions from it.
//!
//! `MissionTemplate::generate` is pure given its `MissionRolls`; all dice
//! are thrown up front by `MissionCatalog::roll` from an injected RNG.

use crate::{
    config::SimConfig,
    entity::{Item, Mission, MissionState},
    rng::SubsystemRng,
    types::{ItemId, MissionId, Seconds, Timestamp},
};

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RewardSpec {
    pub name: &'static str,
    pub description: &'static str,
    pub base_quantity: u32,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MissionTemplate {
    pub name: &'static str,
    pub description: &'static str,
    /// Relative pick weight within the table.
    pub weight: u32,
    pub base_duration: Seconds,
    pub base_difficulty: u32,
    pub rewards: &'static [RewardSpec],
}

const SCRAP: &str = "Scrap";
const FOOD: &str = "Food";
const WATER: &str = "Water";

pub const STANDARD_TEMPLATES: &[MissionTemplate] = &[
    MissionTemplate {
        name: "Scavenge the Old Market",
        description: "Pick through the collapsed stalls for anything still useful.",
        weight: 5,
        base_duration: 60.0,
        base_difficulty: 1,
        rewards: &[
            RewardSpec { name: SCRAP, description: "Twisted metal and salvaged parts.", base_quantity: 5 },
            RewardSpec { name: FOOD, description: "Tinned rations, mostly intact.", base_quantity: 2 },
        ],
    },
    MissionTemplate {
        name: "Search the Water Plant",
        description: "The filtration tanks might still hold clean reserves.",
        weight: 4,
        base_duration: 90.0,
        base_difficulty: 2,
        rewards: &[
            RewardSpec { name: WATER, description: "Sealed jugs of filtered water.", base_quantity: 6 },
        ],
    },
    MissionTemplate {
        name: "Raid the Supply Depot",
        description: "A fenced depot on the highway. Guarded, but well stocked.",
        weight: 2,
        base_duration: 180.0,
        base_difficulty: 3,
        rewards: &[
            RewardSpec { name: SCRAP, description: "Twisted metal and salvaged parts.", base_quantity: 10 },
            RewardSpec { name: FOOD, description: "Tinned rations, mostly intact.", base_quantity: 6 },
            RewardSpec { name: WATER, description: "Sealed jugs of filtered water.", base_quantity: 4 },
        ],
    },
    MissionTemplate {
        name: "Forage the Greenbelt",
        description: "Wild crops have overrun the old park.",
        weight: 4,
        base_duration: 45.0,
        base_difficulty: 1,
        rewards: &[
            RewardSpec { name: FOOD, description: "Tinned rations, mostly intact.", base_quantity: 4 },
        ],
    },
    MissionTemplate {
        name: "Strip the Crashed Convoy",
        description: "Trucks overturned on the overpass, cargo still strapped down.",
        weight: 1,
        base_duration: 300.0,
        base_difficulty: 4,
        rewards: &[
            RewardSpec { name: SCRAP, description: "Twisted metal and salvaged parts.", base_quantity: 20 },
            RewardSpec { name: "Medkit", description: "Field dressings and painkillers.", base_quantity: 1 },
        ],
    },
];

/// Every random draw one generated mission needs.
#[derive(Debug, Clone, PartialEq)]
pub struct MissionRolls {
    pub mission_id: MissionId,
    pub difficulty_jitter: i32,
    pub duration_ratio: f64,
    /// One (id, quantity ratio) per template reward, in template order.
    pub rewards: Vec<(ItemId, f64)>,
}

/// Tuning that bounds a generated mission.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GenerationLimits {
    pub lifespan: Seconds,
    pub min_duration: Seconds,
}

impl From<&SimConfig> for GenerationLimits {
    fn from(config: &SimConfig) -> Self {
        Self {
            lifespan: config.mission_lifespan,
            min_duration: config.min_mission_duration,
        }
    }
}

impl MissionTemplate {
    /// Build a mission from pre-drawn rolls. Expiration is `now + lifespan`.
    pub fn generate(&self, rolls: &MissionRolls, now: Timestamp, limits: GenerationLimits) -> Mission {
        let difficulty = (self.base_difficulty as i64 + rolls.difficulty_jitter as i64).max(1) as u32;
        let duration = (self.base_duration * rolls.duration_ratio).max(limits.min_duration);
        let scale = difficulty as f64 / self.base_difficulty.max(1) as f64;

        let rewards = self
            .rewards
            .iter()
            .zip(&rolls.rewards)
            .map(|(spec, (item_id, ratio))| {
                let quantity = (spec.base_quantity as f64 * scale * ratio).round().max(1.0) as u32;
                Item::new(*item_id, spec.name, spec.description, quantity)
            })
            .collect();

        Mission {
            id: rolls.mission_id,
            name: self.name.to_string(),
            description: self.description.to_string(),
            template: self.name.to_string(),
            duration,
            difficulty,
            rewards,
            state: MissionState::Available {
                expiration_time: now + limits.lifespan,
            },
        }
    }
}

#[derive(Debug, Clone, Copy)]
pub struct MissionCatalog {
    templates: &'static [MissionTemplate],
    total_weight: u64,
}

impl MissionCatalog {
    pub fn new(templates: &'static [MissionTemplate]) -> Self {
        assert!(!templates.is_empty(), "mission catalog needs at least one template");
        let total_weight = templates.iter().map(|t| u64::from(t.weight.max(1))).sum();
        Self { templates, total_weight }
    }

    pub fn standard() -> Self {
        Self::new(STANDARD_TEMPLATES)
    }

    pub fn templates(&self) -> &'static [MissionTemplate] {
        self.templates
    }

    pub fn find(&self, name: &str) -> Option<&'static MissionTemplate> {
        self.templates.iter().find(|t| t.name == name)
    }

    /// Weighted template pick.
    pub fn pick(&self, rng: &mut SubsystemRng) -> &'static MissionTemplate {
        let mut roll = rng.next_u64_below(self.total_weight);
        for template in self.templates {
            let weight = u64::from(template.weight.max(1));
            if roll < weight {
                return template;
            }
            roll -= weight;
        }
        &self.templates[self.templates.len() - 1]
    }

    /// Draw every roll `template` needs, in a fixed order.
    pub fn roll(&self, template: &MissionTemplate, rng: &mut SubsystemRng, config: &SimConfig) -> MissionRolls {
        let mission_id = rng.next_uuid();
        let difficulty_jitter = rng.signed_jitter(config.difficulty_jitter);
        let duration_ratio = rng.range_f64(1.0 - config.duration_jitter, 1.0 + config.duration_jitter);
        let rewards = template
            .rewards
            .iter()
            .map(|_| {
                let id = rng.next_uuid();
                (id, rng.range_f64(1.0 - config.reward_jitter, 1.0 + config.reward_jitter))
            })
            .collect();
        MissionRolls {
            mission_id,
            difficulty_jitter,
            duration_ratio,
            rewards,
        }
    }

    /// Pick, roll and build one mission expiring `lifespan` after `now`.
    pub fn generate(&self, rng: &mut SubsystemRng, now: Timestamp, config: &SimConfig) -> Mission {
        let template = self.pick(rng);
        let rolls = self.roll(template, rng, config);
        template.generate(&rolls, now, GenerationLimits::from(config))
    }
}

impl Default for MissionCatalog {
    fn default() -> Self {
        Self::standard()
    }
}
