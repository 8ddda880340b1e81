//! Periodic insect arrivals.
//!
//! Each species has its own interval and probability. Ladybugs only arrive
//! while pests are present, and grow more likely as the infestation grows.

use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::events::{Category, Emitter};
use crate::geometry::Position;
use crate::rng::RngExt;
use crate::species::InsectKind;
use crate::world::{EntityId, World};

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "type")]
pub enum SpawnChance {
    Fixed { probability: f64 },
    /// `min(cap, base + per_pest * pests)`.
    PestScaled { base: f64, per_pest: f64, cap: f64 },
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SpawnRule {
    pub kind: InsectKind,
    pub interval: u64,
    pub chance: SpawnChance,
    #[serde(default)]
    pub requires_pests: bool,
}

impl SpawnRule {
    /// Probability of an arrival given the current pest count, or `None`
    /// when the rule cannot fire at all.
    pub fn probability(&self, pests: usize) -> Option<f64> {
        if self.requires_pests && pests == 0 {
            return None;
        }
        Some(match self.chance {
            SpawnChance::Fixed { probability } => probability,
            SpawnChance::PestScaled {
                base,
                per_pest,
                cap,
            } => (base + per_pest * pests as f64).min(cap),
        })
    }
}

pub fn default_spawn_rules() -> Vec<SpawnRule> {
    vec![
        SpawnRule {
            kind: InsectKind::Aphid,
            interval: 60,
            chance: SpawnChance::Fixed { probability: 0.40 },
            requires_pests: false,
        },
        SpawnRule {
            kind: InsectKind::Caterpillar,
            interval: 100,
            chance: SpawnChance::Fixed { probability: 0.15 },
            requires_pests: false,
        },
        SpawnRule {
            kind: InsectKind::Bee,
            interval: 150,
            chance: SpawnChance::Fixed { probability: 0.25 },
            requires_pests: false,
        },
        SpawnRule {
            kind: InsectKind::Ladybug,
            interval: 100,
            chance: SpawnChance::PestScaled {
                base: 0.20,
                per_pest: 0.04,
                cap: 0.60,
            },
            requires_pests: true,
        },
    ]
}

pub struct Spawner {
    rules: Vec<SpawnRule>,
}

impl Spawner {
    pub fn new(rules: Vec<SpawnRule>) -> Self {
        Self { rules }
    }

    pub fn rules(&self) -> &[SpawnRule] {
        &self.rules
    }

    /// Evaluates every rule due at `tick`, in table order.
    pub fn spawn<R: Rng + ?Sized>(
        &self,
        tick: u64,
        world: &mut World,
        rng: &mut R,
        events: &Emitter<'_>,
    ) -> Result<Vec<EntityId>> {
        let mut spawned = Vec::new();
        for rule in &self.rules {
            if rule.interval == 0 || tick % rule.interval != 0 {
                continue;
            }
            let pests = world.alive_pest_count();
            let Some(probability) = rule.probability(pests) else {
                continue;
            };
            if !rng.chance(probability) {
                continue;
            }
            let bounds = world.bounds();
            let position = Position::new(rng.gen_range(0..bounds.rows), rng.gen_range(0..bounds.cols));
            let id = world.add_insect(rule.kind, position)?;
            events.info(
                Category::Insect,
                format!("{} [{id}] ({}) appeared at {position}", rule.kind, rule.kind.insect_type()),
            );
            if rule.requires_pests {
                events.info(
                    Category::Insect,
                    format!(
                        "{} attracted to garden by {pests} pest(s) (spawn chance: {:.0}%)",
                        rule.kind,
                        probability * 100.0
                    ),
                );
            }
            spawned.push(id);
        }
        Ok(spawned)
    }
}

impl Default for Spawner {
    fn default() -> Self {
        Self::new(default_spawn_rules())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ladybug_chance_scales_with_pests_and_caps() {
        let rules = default_spawn_rules();
        let ladybug = rules
            .iter()
            .find(|r| r.kind == InsectKind::Ladybug)
            .unwrap();
        assert_eq!(ladybug.probability(0), None);
        assert!((ladybug.probability(1).unwrap() - 0.24).abs() < 1e-12);
        assert!((ladybug.probability(5).unwrap() - 0.40).abs() < 1e-12);
        assert_eq!(ladybug.probability(50), Some(0.60));
    }

    #[test]
    fn nothing_spawns_off_interval() {
        use rand::SeedableRng;
        let mut world = World::new("plot", 5, 5).unwrap();
        let mut rng = rand_chacha::ChaCha8Rng::seed_from_u64(1);
        let sink = crate::events::NullSink;
        let events = Emitter::new(&sink, 7);
        let spawned = Spawner::default()
            .spawn(7, &mut world, &mut rng, &events)
            .unwrap();
        assert!(spawned.is_empty());
        assert!(world.insects().is_empty());
    }

    #[test]
    fn certain_rule_places_insect_on_grid() {
        use rand::SeedableRng;
        let mut world = World::new("plot", 3, 4).unwrap();
        let mut rng = rand_chacha::ChaCha8Rng::seed_from_u64(2);
        let sink = crate::events::NullSink;
        let events = Emitter::new(&sink, 10);
        let spawner = Spawner::new(vec![SpawnRule {
            kind: InsectKind::Aphid,
            interval: 10,
            chance: SpawnChance::Fixed { probability: 1.0 },
            requires_pests: false,
        }]);
        let spawned = spawner.spawn(10, &mut world, &mut rng, &events).unwrap();
        assert_eq!(spawned.len(), 1);
        let aphid = world.insect(spawned[0]).unwrap();
        assert!(world.bounds().contains(aphid.position()));
    }
}
