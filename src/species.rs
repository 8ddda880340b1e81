//! Per-species constants for plants and insects.
//!
//! Behaviour differences between species are pure data: a [`Plant`] or
//! [`Insect`] carries its kind, and the kind resolves to an immutable
//! descriptor from the tables below.
//!
//! [`Plant`]: crate::plant::Plant
//! [`Insect`]: crate::insect::Insect

use std::fmt;

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PlantSpecies {
    pub name: &'static str,
    pub latin_name: &'static str,
    pub ideal_temperature_min: f64,
    pub ideal_temperature_max: f64,
    pub water_need_per_tick: f64,
    pub nutrient_need_per_tick: f64,
    pub light_need_hours: f64,
    pub ticks_per_stage: u32,
    pub pest_resistance: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PlantKind {
    Tomato,
    Rose,
    Sunflower,
    Carrot,
    Lettuce,
    Cactus,
}

const TOMATO: PlantSpecies = PlantSpecies {
    name: "Tomato",
    latin_name: "Solanum lycopersicum",
    ideal_temperature_min: 60.0,
    ideal_temperature_max: 85.0,
    water_need_per_tick: 1.2,
    nutrient_need_per_tick: 0.5,
    light_need_hours: 8.0,
    ticks_per_stage: 50,
    pest_resistance: 0.3,
};

const ROSE: PlantSpecies = PlantSpecies {
    name: "Rose",
    latin_name: "Rosa",
    ideal_temperature_min: 55.0,
    ideal_temperature_max: 80.0,
    water_need_per_tick: 1.0,
    nutrient_need_per_tick: 0.4,
    light_need_hours: 6.0,
    ticks_per_stage: 60,
    pest_resistance: 0.2,
};

const SUNFLOWER: PlantSpecies = PlantSpecies {
    name: "Sunflower",
    latin_name: "Helianthus annuus",
    ideal_temperature_min: 55.0,
    ideal_temperature_max: 91.0,
    water_need_per_tick: 1.5,
    nutrient_need_per_tick: 0.5,
    light_need_hours: 10.0,
    ticks_per_stage: 40,
    pest_resistance: 0.5,
};

const CARROT: PlantSpecies = PlantSpecies {
    name: "Carrot",
    latin_name: "Daucus carota",
    ideal_temperature_min: 45.0,
    ideal_temperature_max: 75.0,
    water_need_per_tick: 0.8,
    nutrient_need_per_tick: 0.3,
    light_need_hours: 6.0,
    ticks_per_stage: 55,
    pest_resistance: 0.4,
};

const LETTUCE: PlantSpecies = PlantSpecies {
    name: "Lettuce",
    latin_name: "Lactuca sativa",
    ideal_temperature_min: 40.0,
    ideal_temperature_max: 70.0,
    water_need_per_tick: 1.1,
    nutrient_need_per_tick: 0.25,
    light_need_hours: 5.0,
    ticks_per_stage: 35,
    pest_resistance: 0.15,
};

const CACTUS: PlantSpecies = PlantSpecies {
    name: "Cactus",
    latin_name: "Cactaceae",
    ideal_temperature_min: 50.0,
    ideal_temperature_max: 100.0,
    water_need_per_tick: 0.15,
    nutrient_need_per_tick: 0.05,
    light_need_hours: 10.0,
    ticks_per_stage: 80,
    pest_resistance: 0.8,
};

impl PlantKind {
    pub const ALL: [PlantKind; 6] = [
        PlantKind::Tomato,
        PlantKind::Rose,
        PlantKind::Sunflower,
        PlantKind::Carrot,
        PlantKind::Lettuce,
        PlantKind::Cactus,
    ];

    pub fn species(self) -> &'static PlantSpecies {
        match self {
            PlantKind::Tomato => &TOMATO,
            PlantKind::Rose => &ROSE,
            PlantKind::Sunflower => &SUNFLOWER,
            PlantKind::Carrot => &CARROT,
            PlantKind::Lettuce => &LETTUCE,
            PlantKind::Cactus => &CACTUS,
        }
    }
}

impl fmt::Display for PlantKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.species().name)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum InsectType {
    Pest,
    Pollinator,
    Neutral,
    Beneficial,
}

impl fmt::Display for InsectType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            InsectType::Pest => "PEST",
            InsectType::Pollinator => "POLLINATOR",
            InsectType::Neutral => "NEUTRAL",
            InsectType::Beneficial => "BENEFICIAL",
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct InsectSpecies {
    pub name: &'static str,
    pub insect_type: InsectType,
    pub damage_per_tick: f64,
    pub movement_range: f64,
    pub lifespan_ticks: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InsectKind {
    Aphid,
    Caterpillar,
    Bee,
    Ladybug,
}

const APHID: InsectSpecies = InsectSpecies {
    name: "Aphid",
    insect_type: InsectType::Pest,
    damage_per_tick: 0.8,
    movement_range: 1.0,
    lifespan_ticks: 200,
};

const CATERPILLAR: InsectSpecies = InsectSpecies {
    name: "Caterpillar",
    insect_type: InsectType::Pest,
    damage_per_tick: 1.5,
    movement_range: 0.5,
    lifespan_ticks: 150,
};

const BEE: InsectSpecies = InsectSpecies {
    name: "Bee",
    insect_type: InsectType::Pollinator,
    damage_per_tick: 0.0,
    movement_range: 2.0,
    lifespan_ticks: 300,
};

const LADYBUG: InsectSpecies = InsectSpecies {
    name: "Ladybug",
    insect_type: InsectType::Beneficial,
    damage_per_tick: 0.0,
    movement_range: 1.5,
    lifespan_ticks: 400,
};

impl InsectKind {
    pub const ALL: [InsectKind; 4] = [
        InsectKind::Aphid,
        InsectKind::Caterpillar,
        InsectKind::Bee,
        InsectKind::Ladybug,
    ];

    pub fn species(self) -> &'static InsectSpecies {
        match self {
            InsectKind::Aphid => &APHID,
            InsectKind::Caterpillar => &CATERPILLAR,
            InsectKind::Bee => &BEE,
            InsectKind::Ladybug => &LADYBUG,
        }
    }

    pub fn insect_type(self) -> InsectType {
        self.species().insect_type
    }
}

impl fmt::Display for InsectKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.species().name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn plant_tables_are_well_formed() {
        for kind in PlantKind::ALL {
            let s = kind.species();
            assert!(s.ideal_temperature_min < s.ideal_temperature_max, "{kind}");
            assert!(s.ticks_per_stage > 0, "{kind}");
            assert!(s.light_need_hours > 0.0, "{kind}");
            assert!((0.0..=1.0).contains(&s.pest_resistance), "{kind}");
        }
    }

    #[test]
    fn only_aphids_and_caterpillars_are_pests() {
        let pests: Vec<_> = InsectKind::ALL
            .into_iter()
            .filter(|k| k.insect_type() == InsectType::Pest)
            .collect();
        assert_eq!(pests, vec![InsectKind::Aphid, InsectKind::Caterpillar]);
        for kind in InsectKind::ALL {
            let s = kind.species();
            if s.insect_type != InsectType::Pest {
                assert_eq!(s.damage_per_tick, 0.0, "{kind}");
            }
        }
    }
}
