use gardensim::{
    events::{Emitter, MemorySink, NullSink},
    geometry::{GridBounds, Position},
    insect::{predate_insects, Insect},
    plant::Plant,
    species::{InsectKind, PlantKind},
    world::EntityId,
};
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;

fn insect(id: u64, kind: InsectKind, row: i32, col: i32) -> Insect {
    Insect::new(EntityId::new(id), kind, Position::new(row, col))
}

#[test]
fn aphid_dies_on_its_two_hundredth_update_and_stays_frozen() {
    let events = Emitter::new(&NullSink, 1);
    let bounds = GridBounds::new(20, 20);
    let mut rng = ChaCha8Rng::seed_from_u64(5);
    let mut plants: Vec<Plant> = Vec::new();
    let mut aphid = insect(1, InsectKind::Aphid, 10, 10);

    for n in 1..200 {
        aphid.update(&mut plants, bounds, &mut rng, &events);
        assert!(aphid.is_alive(), "died early at update {n}");
        assert!(aphid.age_ticks() < 200);
    }
    aphid.update(&mut plants, bounds, &mut rng, &events);
    assert!(!aphid.is_alive());
    assert_eq!(aphid.age_ticks(), 200);

    let frozen = aphid.clone();
    aphid.update(&mut plants, bounds, &mut rng, &events);
    assert_eq!(aphid, frozen);
}

#[test]
fn wandering_never_leaves_the_grid() {
    let events = Emitter::new(&NullSink, 1);
    let bounds = GridBounds::new(4, 3);
    let mut plants: Vec<Plant> = Vec::new();
    for seed in 0..20 {
        let mut rng = ChaCha8Rng::seed_from_u64(seed);
        let mut swarm: Vec<Insect> = InsectKind::ALL
            .iter()
            .enumerate()
            .map(|(i, kind)| insect(i as u64 + 1, *kind, 0, 2))
            .collect();
        for _ in 0..150 {
            for bug in swarm.iter_mut() {
                bug.update(&mut plants, bounds, &mut rng, &events);
                assert!(bounds.contains(bug.position()), "{} left the grid", bug.label());
                let prev = bug.previous_position();
                assert!((bug.position().row - prev.row).abs() <= 2);
                assert!((bug.position().col - prev.col).abs() <= 2);
            }
        }
    }
}

#[test]
fn pests_feed_only_within_reach() {
    let events = Emitter::new(&NullSink, 1);
    let bounds = GridBounds::new(30, 30);
    let mut rng = ChaCha8Rng::seed_from_u64(9);
    let mut plants = vec![
        Plant::new(EntityId::new(10), PlantKind::Rose, Position::new(15, 15)),
        Plant::new(EntityId::new(11), PlantKind::Rose, Position::new(0, 0)),
    ];
    let mut caterpillar = insect(1, InsectKind::Caterpillar, 15, 15);
    caterpillar.update(&mut plants, bounds, &mut rng, &events);

    // A caterpillar moves at most one cell per tick, so the near rose is
    // always within 2.0 and the far one never is.
    let near_expected = 100.0 - 1.5 * (1.0 - PlantKind::Rose.species().pest_resistance);
    assert!((plants[0].health() - near_expected).abs() < 1e-9);
    assert_eq!(plants[1].health(), 100.0);
}

#[test]
fn pollinators_never_harm_plants() {
    let sink = MemorySink::default();
    let events = Emitter::new(&sink, 1);
    let bounds = GridBounds::new(5, 5);
    let mut rng = ChaCha8Rng::seed_from_u64(3);
    let mut plants = vec![Plant::new(EntityId::new(10), PlantKind::Sunflower, Position::new(2, 2))];
    let mut bee = insect(1, InsectKind::Bee, 2, 2);
    for _ in 0..100 {
        bee.update(&mut plants, bounds, &mut rng, &events);
    }
    assert_eq!(plants[0].health(), 100.0);
}

#[test]
fn ladybug_with_certain_kill_eats_exactly_one_pest() {
    let events = Emitter::new(&NullSink, 1);
    let mut rng = ChaCha8Rng::seed_from_u64(1);
    let mut insects = vec![
        insect(1, InsectKind::Ladybug, 5, 5),
        insect(2, InsectKind::Aphid, 5, 6),
        insect(3, InsectKind::Caterpillar, 6, 5),
        insect(4, InsectKind::Bee, 5, 4),
    ];
    let eaten = predate_insects(&mut insects, 0, 2.0, 1.0, &mut rng, &events);
    assert_eq!(eaten, Some(1));
    assert!(!insects[1].is_alive());
    assert!(insects[2].is_alive());
    assert!(insects[3].is_alive());
}

#[test]
fn only_beneficials_hunt_and_only_in_range() {
    let events = Emitter::new(&NullSink, 1);
    let mut rng = ChaCha8Rng::seed_from_u64(1);
    let mut insects = vec![
        insect(1, InsectKind::Bee, 5, 5),
        insect(2, InsectKind::Aphid, 5, 6),
        insect(3, InsectKind::Ladybug, 0, 0),
    ];
    assert_eq!(predate_insects(&mut insects, 0, 2.0, 1.0, &mut rng, &events), None);
    assert_eq!(predate_insects(&mut insects, 2, 2.0, 1.0, &mut rng, &events), None);
    assert!(insects.iter().all(|i| i.is_alive()));

    assert_eq!(predate_insects(&mut insects, 2, 2.0, 0.0, &mut rng, &events), None);
    assert_eq!(predate_insects(&mut insects, 9, 2.0, 1.0, &mut rng, &events), None);
}
