use rand::Rng;
use serde::Serialize;

use crate::events::{Category, Emitter};
use crate::geometry::{GridBounds, Position};
use crate::plant::{GrowthStage, Plant};
use crate::rng::RngExt;
use crate::species::{InsectKind, InsectSpecies, InsectType};
use crate::world::EntityId;

pub const FEEDING_RADIUS: f64 = 2.0;
pub const POLLINATION_RADIUS: f64 = 1.5;
const LOG_EVERY_AGE_TICKS: u32 = 50;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Insect {
    id: EntityId,
    kind: InsectKind,
    position: Position,
    previous_position: Position,
    alive: bool,
    age_ticks: u32,
}

impl Insect {
    pub fn new(id: EntityId, kind: InsectKind, position: Position) -> Self {
        Self {
            id,
            kind,
            position,
            previous_position: position,
            alive: true,
            age_ticks: 0,
        }
    }

    pub fn id(&self) -> EntityId {
        self.id
    }

    pub fn kind(&self) -> InsectKind {
        self.kind
    }

    pub fn species(&self) -> &'static InsectSpecies {
        self.kind.species()
    }

    pub fn insect_type(&self) -> InsectType {
        self.kind.insect_type()
    }

    pub fn is_pest(&self) -> bool {
        self.insect_type() == InsectType::Pest
    }

    pub fn position(&self) -> Position {
        self.position
    }

    pub fn previous_position(&self) -> Position {
        self.previous_position
    }

    pub fn is_alive(&self) -> bool {
        self.alive
    }

    pub fn age_ticks(&self) -> u32 {
        self.age_ticks
    }

    pub fn label(&self) -> String {
        format!("{} [{}]", self.kind, self.id)
    }

    /// Ages, moves and interacts with nearby plants.
    pub fn update<R: Rng + ?Sized>(
        &mut self,
        plants: &mut [Plant],
        bounds: GridBounds,
        rng: &mut R,
        events: &Emitter<'_>,
    ) {
        if !self.alive {
            return;
        }
        self.age_ticks += 1;
        self.previous_position = self.position;

        if self.age_ticks >= self.species().lifespan_ticks {
            self.die("Reached end of lifespan", events);
            return;
        }

        self.wander(bounds, rng);

        let log_now = self.age_ticks % LOG_EVERY_AGE_TICKS == 0;
        match self.insect_type() {
            InsectType::Pest => {
                let damage = self.species().damage_per_tick;
                for plant in plants.iter_mut() {
                    if !plant.is_alive() || !plant.position().within(self.position, FEEDING_RADIUS)
                    {
                        continue;
                    }
                    plant.apply_pest_damage(damage, events);
                    if log_now {
                        events.info(
                            Category::Insect,
                            format!(
                                "{} is feeding on {} at {}",
                                self.label(),
                                plant.label(),
                                plant.position()
                            ),
                        );
                    }
                }
            }
            InsectType::Pollinator if log_now => {
                for plant in plants.iter() {
                    if plant.is_alive()
                        && plant.stage() == GrowthStage::Flowering
                        && plant.position().within(self.position, POLLINATION_RADIUS)
                    {
                        events.info(
                            Category::Insect,
                            format!(
                                "{} is pollinating {} at {}",
                                self.label(),
                                plant.label(),
                                plant.position()
                            ),
                        );
                    }
                }
            }
            _ => {}
        }
    }

    fn wander<R: Rng + ?Sized>(&mut self, bounds: GridBounds, rng: &mut R) {
        let range = self.species().movement_range;
        let dr = f64::from(rng.gen_range(-1_i32..=1)) * range;
        let dc = f64::from(rng.gen_range(-1_i32..=1)) * range;
        let step_r = whole_step(dr, rng);
        let step_c = whole_step(dc, rng);
        self.position = bounds.clamp(Position::new(
            self.position.row + step_r,
            self.position.col + step_c,
        ));
    }

    pub fn kill(&mut self, reason: &str, events: &Emitter<'_>) {
        if self.alive {
            self.die(reason, events);
        }
    }

    fn die(&mut self, reason: &str, events: &Emitter<'_>) {
        self.alive = false;
        events.info(
            Category::Insect,
            format!("{} died. Reason: {reason}", self.label()),
        );
    }
}

// Fractional movement ranges become a probability of one full cell.
fn whole_step<R: Rng + ?Sized>(delta: f64, rng: &mut R) -> i32 {
    let step = delta.trunc() as i32;
    if step == 0 && delta != 0.0 && rng.chance(delta.abs()) {
        delta.signum() as i32
    } else {
        step
    }
}

/// Lets the beneficial insect at `hunter` eat at most one pest in range.
///
/// Every alive pest within `hunt_radius` gets one roll at `kill_chance`, in
/// collection order; the first success ends the scan. Returns the index of
/// the eaten pest.
pub fn predate_insects<R: Rng + ?Sized>(
    insects: &mut [Insect],
    hunter: usize,
    hunt_radius: f64,
    kill_chance: f64,
    rng: &mut R,
    events: &Emitter<'_>,
) -> Option<usize> {
    let predator = insects.get(hunter)?;
    if !predator.alive || predator.insect_type() != InsectType::Beneficial {
        return None;
    }
    let origin = predator.position;
    let predator_label = predator.label();
    let announce = predator.age_ticks % LOG_EVERY_AGE_TICKS == 0;

    for index in 0..insects.len() {
        if index == hunter {
            continue;
        }
        let target = &insects[index];
        if !target.alive || !target.is_pest() || !target.position.within(origin, hunt_radius) {
            continue;
        }
        if rng.chance(kill_chance) {
            let target = &mut insects[index];
            target.kill(&format!("Eaten by {predator_label}"), events);
            if announce {
                events.info(
                    Category::Insect,
                    format!(
                        "{predator_label} ate {} at {origin} (biological control)",
                        target.label()
                    ),
                );
            }
            return Some(index);
        }
    }
    None
}
