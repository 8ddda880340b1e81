use gardensim::{
    environment::Conditions,
    events::{Category, Emitter, Level, MemorySink, NullSink},
    geometry::Position,
    plant::Plant,
    sensor::{Sensor, SensorKind, SensorNetwork, MOISTURE_FALLBACK},
    species::PlantKind,
    world::EntityId,
};
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;

fn sensor(kind: SensorKind, row: i32, col: i32) -> Sensor {
    Sensor::new(EntityId::new(1), kind, Position::new(row, col))
}

#[test]
fn moisture_probe_without_plants_reads_fallback() {
    let events = Emitter::new(&NullSink, 1);
    let mut rng = ChaCha8Rng::seed_from_u64(8);
    let far_plant = Plant::new(EntityId::new(2), PlantKind::Tomato, Position::new(9, 9)).with_water(5.0);
    let plants = vec![far_plant];
    let mut probe = sensor(SensorKind::Moisture, 0, 0);
    for temperature in [-40.0, 72.0, 140.0] {
        let conditions = Conditions {
            temperature,
            light: 0.0,
            humidity: 99.0,
        };
        for _ in 0..200 {
            probe.update(&conditions, &plants, &mut rng, &events).unwrap();
            assert!(
                (probe.reading() - MOISTURE_FALLBACK).abs() <= 2.0,
                "reading {}",
                probe.reading()
            );
        }
    }
}

#[test]
fn moisture_probe_averages_nearby_plants() {
    let plants = vec![
        Plant::new(EntityId::new(2), PlantKind::Rose, Position::new(1, 1)).with_water(20.0),
        Plant::new(EntityId::new(3), PlantKind::Rose, Position::new(2, 2)).with_water(40.0),
        Plant::new(EntityId::new(4), PlantKind::Rose, Position::new(8, 8)).with_water(100.0),
    ];
    let probe = sensor(SensorKind::Moisture, 0, 0);
    assert_eq!(probe.measure(&Conditions::default(), &plants), 30.0);
}

#[test]
fn climate_sensors_track_conditions() {
    let conditions = Conditions {
        temperature: 81.0,
        light: 44.0,
        humidity: 50.0,
    };
    assert_eq!(sensor(SensorKind::Temperature, 0, 0).measure(&conditions, &[]), 81.0);
    assert_eq!(sensor(SensorKind::Light, 0, 0).measure(&conditions, &[]), 44.0);
}

#[test]
fn alerts_fire_on_transitions_only() {
    let sink = MemorySink::default();
    let events = Emitter::new(&sink, 1);
    let mut thermometer = sensor(SensorKind::Temperature, 0, 0);

    thermometer.record(100.0, &events).unwrap();
    thermometer.record(101.0, &events).unwrap();
    thermometer.record(102.0, &events).unwrap();
    assert!(thermometer.is_alert());
    assert_eq!(sink.by_level(Level::Warn).len(), 1);

    thermometer.record(70.0, &events).unwrap();
    thermometer.record(71.0, &events).unwrap();
    assert!(!thermometer.is_alert());
    let recoveries = sink.filtered(|e| e.category == Category::Sensor && e.level == Level::Info);
    assert_eq!(recoveries.len(), 1);
    assert!(recoveries[0].message.contains("returned to normal"));
}

#[test]
fn thresholds_are_validated() {
    let mut probe = sensor(SensorKind::Light, 0, 0);
    assert_eq!(probe.thresholds(), (20.0, 90.0));
    assert!(probe.set_thresholds(80.0, 10.0).is_err());
    assert!(probe.set_thresholds(f64::NAN, 10.0).is_err());
    probe.set_thresholds(10.0, 80.0).unwrap();
    assert_eq!(probe.thresholds(), (10.0, 80.0));
}

#[test]
fn network_isolates_a_failing_sensor() {
    let events = Emitter::new(&NullSink, 1);
    let mut rng = ChaCha8Rng::seed_from_u64(2);
    let mut network = SensorNetwork::new();
    network.push(Sensor::new(EntityId::new(1), SensorKind::Temperature, Position::new(0, 0)));
    network.push(Sensor::new(EntityId::new(2), SensorKind::Moisture, Position::new(1, 1)));

    let broken = Conditions {
        temperature: f64::NAN,
        light: 50.0,
        humidity: 50.0,
    };
    let failures = network.update_all(&broken, &[], &mut rng, &events);
    assert_eq!(failures.len(), 1);
    assert_eq!(network.get(EntityId::new(1)).unwrap().reading(), 0.0);
    let moisture = network.get(EntityId::new(2)).unwrap().reading();
    assert!((moisture - MOISTURE_FALLBACK).abs() <= 2.0);
    assert_eq!(network.of_kind(SensorKind::Moisture).count(), 1);
}
