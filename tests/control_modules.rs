use gardensim::{
    environment::Conditions,
    events::{Category, Emitter, MemorySink, NullSink},
    geometry::Position,
    modules::{
        ControlModule, HeatingMode, HeatingSystem, LightingSystem, ModuleContext, PestControl,
        PestControlMethod, WateringSystem,
    },
    plant::Plant,
    rng::RngManager,
    species::{InsectKind, PlantKind},
    world::World,
};

fn ctx(sink: &dyn gardensim::events::EventSink, tick: u64) -> ModuleContext<'_> {
    ModuleContext {
        tick,
        events: Emitter::new(sink, tick),
    }
}

fn world_with_conditions(temperature: f64, light: f64) -> World {
    let mut world = World::new("test plot", 10, 10).unwrap();
    world.set_conditions(Conditions {
        temperature,
        light,
        humidity: 50.0,
    });
    world
}

#[test]
fn heater_adds_one_step_below_target() {
    let sink = MemorySink::default();
    let mut rngs = RngManager::new(1);
    let mut world = world_with_conditions(60.0, 60.0);
    let mut heating = HeatingSystem::new();
    assert_eq!(heating.mode(), HeatingMode::Auto);

    heating
        .update(&ctx(&sink, 1), &mut world, rngs.stream("heating"))
        .unwrap();

    assert!((world.conditions().temperature - 62.0).abs() < 1e-12);
    assert_eq!(heating.heating_activations(), 1);
    assert_eq!(heating.cooling_activations(), 0);
    assert_eq!(heating.current_adjustment(), 2.0);
    assert_eq!(sink.by_category(Category::Heating).len(), 1);
}

#[test]
fn climate_control_idles_inside_dead_band() {
    let sink = MemorySink::default();
    let mut rngs = RngManager::new(1);
    let mut heating = HeatingSystem::new();

    let mut hot = world_with_conditions(70.0, 60.0);
    heating
        .update(&ctx(&sink, 1), &mut hot, rngs.stream("heating"))
        .unwrap();
    assert!((hot.conditions().temperature - 68.0).abs() < 1e-12);
    assert_eq!(heating.cooling_activations(), 1);

    let mut mild = world_with_conditions(66.0, 60.0);
    heating
        .update(&ctx(&sink, 2), &mut mild, rngs.stream("heating"))
        .unwrap();
    assert_eq!(mild.conditions().temperature, 66.0);
    assert_eq!(heating.current_adjustment(), 0.0);
    assert!(sink
        .by_category(Category::Heating)
        .iter()
        .any(|e| e.message.contains("Climate control OFF")));
}

#[test]
fn forced_heating_modes_ignore_target() {
    let mut rngs = RngManager::new(1);
    let mut heating = HeatingSystem::new();
    heating.set_mode(HeatingMode::Cooling);
    let mut world = world_with_conditions(50.0, 60.0);
    heating
        .update(&ctx(&NullSink, 1), &mut world, rngs.stream("heating"))
        .unwrap();
    assert!((world.conditions().temperature - 48.0).abs() < 1e-12);

    heating.set_mode(HeatingMode::Off);
    heating
        .update(&ctx(&NullSink, 2), &mut world, rngs.stream("heating"))
        .unwrap();
    assert!((world.conditions().temperature - 48.0).abs() < 1e-12);
}

#[test]
fn heating_rejects_non_finite_temperature() {
    let mut rngs = RngManager::new(1);
    let mut heating = HeatingSystem::new();
    let mut world = world_with_conditions(f64::NAN, 60.0);
    assert!(heating
        .update(&ctx(&NullSink, 1), &mut world, rngs.stream("heating"))
        .is_err());
    assert!(heating.set_adjust_rate(f64::INFINITY).is_err());
}

#[test]
fn watering_zone_runs_until_saturated() {
    let sink = MemorySink::default();
    let mut rngs = RngManager::new(1);
    let mut world = World::new("test plot", 10, 10).unwrap();
    let id = world.next_entity_id();
    world
        .insert_plant(Plant::new(id, PlantKind::Carrot, Position::new(5, 5)).with_water(10.0))
        .unwrap();
    let mut watering = WateringSystem::new()
        .with_sprinkler(Position::new(5, 5), 3.0, 8.0)
        .unwrap();

    let mut levels = Vec::new();
    for tick in 1..=12 {
        watering
            .update(&ctx(&sink, tick), &mut world, rngs.stream("watering"))
            .unwrap();
        levels.push(world.plant(id).unwrap().water_level());
        if world.plant(id).unwrap().water_level() < 75.0 {
            assert!(watering.sprinklers()[0].active, "zone stopped early at tick {tick}");
        }
    }

    // 10 -> 82 in nine irrigations of 8, then the zone shuts off.
    assert_eq!(levels[8], 82.0);
    assert_eq!(levels[9], 82.0);
    assert!(!watering.sprinklers()[0].active);
    assert_eq!(watering.watering_events(), 1);
    assert!(sink
        .by_category(Category::Watering)
        .iter()
        .any(|e| e.message.contains("deactivated")));
}

#[test]
fn dry_moisture_sensor_triggers_zone_without_dry_plants() {
    let mut rngs = RngManager::new(1);
    let mut world = World::new("test plot", 10, 10).unwrap();
    let sensor = world
        .add_sensor(gardensim::sensor::SensorKind::Moisture, Position::new(6, 5))
        .unwrap();
    world
        .sensors_mut()
        .get_mut(sensor)
        .unwrap()
        .record(10.0, &Emitter::new(&NullSink, 0))
        .unwrap();
    let mut watering = WateringSystem::new()
        .with_sprinkler(Position::new(5, 5), 2.0, 8.0)
        .unwrap();
    watering
        .update(&ctx(&NullSink, 1), &mut world, rngs.stream("watering"))
        .unwrap();
    assert!(watering.sprinklers()[0].active);
}

#[test]
fn watering_thresholds_must_be_ordered() {
    let mut watering = WateringSystem::new();
    assert!(watering.set_thresholds(70.0, 30.0).is_err());
    assert_eq!(watering.thresholds(), (25.0, 65.0));
    watering.set_thresholds(30.0, 70.0).unwrap();
    assert_eq!(watering.thresholds(), (30.0, 70.0));
}

#[test]
fn grow_lights_supplement_dim_light() {
    let sink = MemorySink::default();
    let mut rngs = RngManager::new(1);
    let mut lighting = LightingSystem::new();

    let mut dim = world_with_conditions(70.0, 30.0);
    lighting
        .update(&ctx(&sink, 1), &mut dim, rngs.stream("lighting"))
        .unwrap();
    assert!(lighting.lights_on());
    assert!((dim.conditions().light - 45.0).abs() < 1e-12);

    let mut bright = world_with_conditions(70.0, 55.0);
    lighting
        .update(&ctx(&sink, 2), &mut bright, rngs.stream("lighting"))
        .unwrap();
    assert!(!lighting.lights_on());
    assert_eq!(bright.conditions().light, 55.0);
    assert_eq!(lighting.activations(), 1);
    assert_eq!(lighting.on_ticks(), 1);
    assert!(lighting.set_target_light(120.0).is_err());
}

fn infested_world(pests: usize, beneficials: usize) -> World {
    let mut world = World::new("infested", 50, 50).unwrap();
    for i in 0..pests {
        let kind = if i % 2 == 0 {
            InsectKind::Aphid
        } else {
            InsectKind::Caterpillar
        };
        world
            .add_insect(kind, Position::new((i % 50) as i32, (i / 50 % 50) as i32))
            .unwrap();
    }
    for i in 0..beneficials {
        let kind = if i % 2 == 0 {
            InsectKind::Bee
        } else {
            InsectKind::Ladybug
        };
        world.add_insect(kind, Position::new(25, i as i32)).unwrap();
    }
    world
}

#[test]
fn chemical_treatment_kills_everything() {
    let mut rngs = RngManager::new(1);
    let mut world = infested_world(10, 4);
    let mut pest_control = PestControl::new().with_method(PestControlMethod::Chemical);
    let killed = pest_control.apply(1, &mut world, rngs.stream("pest_control"), &Emitter::new(&NullSink, 1));
    assert_eq!(killed, 14);
    assert_eq!(world.alive_insect_count(), 0);
}

#[test]
fn targeted_treatment_spares_beneficials() {
    let mut rngs = RngManager::new(1);
    let mut world = infested_world(10, 4);
    let mut pest_control = PestControl::new();
    assert_eq!(pest_control.method(), PestControlMethod::Targeted);
    let killed = pest_control.apply(1, &mut world, rngs.stream("pest_control"), &Emitter::new(&NullSink, 1));
    assert_eq!(killed, 10);
    assert_eq!(world.alive_insect_count(), 4);
    assert_eq!(world.alive_pest_count(), 0);
    assert_eq!(pest_control.eliminated(), 10);
}

#[test]
fn organic_treatment_follows_binomial_spread() {
    // Binomial(1000, 0.7): mean 700, sigma ~14.49.
    let mut within_one_sigma = 0;
    for seed in 0..100 {
        let mut rngs = RngManager::new(seed);
        let mut world = infested_world(1000, 0);
        let mut pest_control = PestControl::new().with_method(PestControlMethod::Organic);
        let killed = pest_control.apply(
            1,
            &mut world,
            rngs.stream("pest_control"),
            &Emitter::new(&NullSink, 1),
        );
        assert!((627..=773).contains(&killed), "seed {seed}: {killed} killed");
        if (686..=714).contains(&killed) {
            within_one_sigma += 1;
        }
    }
    assert!(within_one_sigma >= 50, "only {within_one_sigma} runs within 1 sigma");
}

#[test]
fn pest_checks_follow_interval_and_threshold() {
    let sink = MemorySink::default();
    let mut rngs = RngManager::new(1);
    let mut world = infested_world(2, 1);
    let mut pest_control = PestControl::new();
    pest_control.set_threshold(3);

    for tick in 1..=5 {
        pest_control
            .update(&ctx(&sink, tick), &mut world, rngs.stream("pest_control"))
            .unwrap();
    }
    assert_eq!(pest_control.activations(), 0);
    assert_eq!(world.alive_pest_count(), 2);

    pest_control.set_threshold(2);
    for tick in 6..=9 {
        pest_control
            .update(&ctx(&sink, tick), &mut world, rngs.stream("pest_control"))
            .unwrap();
    }
    assert_eq!(pest_control.activations(), 0);
    pest_control
        .update(&ctx(&sink, 10), &mut world, rngs.stream("pest_control"))
        .unwrap();
    assert_eq!(pest_control.activations(), 1);
    assert_eq!(pest_control.last_activation_tick(), Some(10));
    assert_eq!(world.alive_pest_count(), 0);
    assert!(pest_control.set_check_interval(0).is_err());
}

#[test]
fn manual_pest_control_reports_clean_garden() {
    let sink = MemorySink::default();
    let mut rngs = RngManager::new(1);
    let mut world = infested_world(0, 2);
    let mut pest_control = PestControl::new();
    let killed = pest_control.manual_pest_control(
        3,
        &mut world,
        rngs.stream("pest_control"),
        &Emitter::new(&sink, 3),
    );
    assert_eq!(killed, 0);
    assert_eq!(pest_control.activations(), 0);
    assert!(sink
        .all()
        .iter()
        .any(|e| e.message.contains("No pests found")));
}
