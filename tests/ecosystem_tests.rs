#![allow(missing_docs)]
#![allow(clippy::float_cmp)]

use ndarray::Array2;
use rand::SeedableRng;
use rand::rngs::SmallRng;

use vivarium::simulation::creature::{Creature, DeathCause};
use vivarium::simulation::ecosystem::Ecosystem;
use vivarium::simulation::event_log::EventLog;
use vivarium::simulation::events::{EventSink, NullSink, SimulationEvent};
use vivarium::simulation::genome::{Genome, MotorWeights, SegmentShape};
use vivarium::simulation::params::Params;
use vivarium::simulation::stats::StatsSnapshot;

const FRAME: f32 = 1.0 / 60.0;

fn test_params() -> Params {
    Params {
        population_size: 5,
        stats_interval: 1.0,
        ..Params::default()
    }
}

/// Sink that captures everything for assertions.
#[derive(Default)]
struct CaptureSink {
    events: Vec<(f64, SimulationEvent)>,
    stats: Vec<StatsSnapshot>,
}

impl EventSink for CaptureSink {
    fn record(&mut self, time: f64, event: SimulationEvent) {
        self.events.push((time, event));
    }

    fn stats(&mut self, snapshot: &StatsSnapshot) {
        self.stats.push(snapshot.clone());
    }
}

/// A minimal one-segment genome: no joints, no sensors, a small circle.
/// Keeps staged scenarios free of motor-driven drift.
fn blob_genome(seed: u64) -> Genome {
    let mut rng = SmallRng::seed_from_u64(seed);
    let mut genome = Genome::random(&mut rng, 4);
    genome.segments.truncate(1);
    genome.segments[0].shape = SegmentShape::Circle { radius: 8.0 };
    genome.joints.clear();
    genome.sensors.clear();
    genome.sensor_motor_weights = Array2::from_shape_fn((0, 0), |_| MotorWeights {
        amplitude: 0.0,
        frequency: 0.0,
        phase: 0.0,
    });
    genome
}

fn clear_creatures(eco: &mut Ecosystem) {
    let creatures = std::mem::take(&mut eco.arena.creatures);
    for mut creature in creatures {
        creature.despawn(&mut eco.arena.physics);
    }
}

#[test]
fn test_ecosystem_creation() {
    let params = test_params();
    let eco = Ecosystem::new(params.clone(), 1);

    assert_eq!(eco.arena.creatures.len(), params.population_size);
    assert_eq!(eco.arena.living_count(), params.population_size);
    assert_eq!(eco.generation(), 0);
    assert_eq!(eco.time(), 0.0);
    for creature in &eco.arena.creatures {
        assert!(creature.is_alive());
        assert!(creature.composite_present(&eco.arena.physics));
    }
}

#[test]
fn test_advance_moves_time_and_ages() {
    let params = test_params();
    let mut eco = Ecosystem::new(params, 2);
    let mut sink = NullSink;

    eco.advance(FRAME, &mut sink);

    assert!(eco.time() > 0.0);
    for creature in eco.arena.creatures.iter().filter(|c| c.is_alive()) {
        assert!(creature.age > 0.0);
    }
}

#[test]
fn test_pause_stops_the_clock() {
    let params = test_params();
    let mut eco = Ecosystem::new(params, 3);
    let mut sink = NullSink;

    eco.pause();
    eco.advance(FRAME, &mut sink);
    assert_eq!(eco.time(), 0.0);

    eco.start();
    eco.advance(FRAME, &mut sink);
    assert!(eco.time() > 0.0);
}

#[test]
fn test_speed_and_population_controls_clamp() {
    let params = test_params();
    let mut eco = Ecosystem::new(params, 4);

    eco.set_speed(5000.0);
    assert_eq!(eco.speed(), 1000.0);
    eco.set_speed(0.01);
    assert_eq!(eco.speed(), 0.5);

    eco.set_population_size(100);
    assert_eq!(eco.params.population_size, 50);
    eco.set_population_size(1);
    assert_eq!(eco.params.population_size, 5);
}

#[test]
fn test_high_speed_uses_substeps() {
    let params = test_params();
    let mut eco = Ecosystem::new(params.clone(), 5);
    let mut sink = NullSink;

    eco.set_speed(10.0);
    eco.advance(FRAME, &mut sink);

    // Ten sub-steps, each capped; simulated time advances by roughly
    // frame x speed without any single step exceeding the cap.
    let expected = f64::from((FRAME * 10.0 / 10.0).min(params.max_substep)) * 10.0;
    assert!((eco.time() - expected).abs() < 1e-6);
}

#[test]
fn test_reproduction_spawns_child_at_midpoint() {
    let params = test_params();
    let mut eco = Ecosystem::new(params.clone(), 6);
    clear_creatures(&mut eco);

    let mut parent_a = Creature::spawn(
        1000,
        0,
        blob_genome(60),
        [400.0, 500.0],
        &params,
        &mut eco.arena.physics,
    );
    let mut parent_b = Creature::spawn(
        1001,
        1,
        blob_genome(61),
        [450.0, 500.0],
        &params,
        &mut eco.arena.physics,
    );
    for parent in [&mut parent_a, &mut parent_b] {
        parent.age = 40.0;
        parent.food = 60.0;
        parent.health = 60.0;
    }
    eco.arena.creatures.push(parent_a);
    eco.arena.creatures.push(parent_b);

    let mut sink = CaptureSink::default();
    eco.advance(FRAME, &mut sink);

    assert_eq!(eco.arena.creatures.len(), 3, "exactly one child expected");
    let child = &eco.arena.creatures[2];
    let position = child.last_centroid();
    assert!((position[0] - 425.0).abs() <= params.reproduction_jitter + 1.0);
    assert!((position[1] - 500.0).abs() <= params.reproduction_jitter + 1.0);

    // Both parents' cooldowns were stamped with the current time.
    let now = eco.time();
    assert_eq!(eco.arena.creatures[0].last_reproduction_time, now);
    assert_eq!(eco.arena.creatures[1].last_reproduction_time, now);

    assert!(sink.events.iter().any(|(_, e)| matches!(
        e,
        SimulationEvent::Birth {
            parents: Some((1000, 1001)),
            ..
        }
    )));
}

#[test]
fn test_underfed_pair_does_not_reproduce() {
    let params = test_params();
    let mut eco = Ecosystem::new(params.clone(), 7);
    clear_creatures(&mut eco);

    let mut parent_a = Creature::spawn(
        1000,
        0,
        blob_genome(70),
        [400.0, 500.0],
        &params,
        &mut eco.arena.physics,
    );
    let mut parent_b = Creature::spawn(
        1001,
        1,
        blob_genome(71),
        [450.0, 500.0],
        &params,
        &mut eco.arena.physics,
    );
    parent_a.age = 40.0;
    parent_b.age = 40.0;
    parent_a.food = 60.0;
    parent_a.health = 60.0;
    parent_b.food = 30.0; // below the threshold
    parent_b.health = 60.0;
    eco.arena.creatures.push(parent_a);
    eco.arena.creatures.push(parent_b);

    let mut sink = CaptureSink::default();
    eco.advance(FRAME, &mut sink);

    // No mid-generation birth happened.
    assert!(!sink.events.iter().any(|(_, e)| matches!(
        e,
        SimulationEvent::Birth {
            parents: Some(_),
            ..
        }
    )));
}

#[test]
fn test_turnover_on_population_collapse() {
    let params = test_params();
    let mut eco = Ecosystem::new(params.clone(), 8);
    let mut sink = CaptureSink::default();
    clear_creatures(&mut eco);

    for (slot, x) in [100.0f32, 300.0, 500.0].into_iter().enumerate() {
        let mut creature = Creature::spawn(
            1000 + slot as u64,
            slot,
            blob_genome(80 + slot as u64),
            [x, 100.0],
            &params,
            &mut eco.arena.physics,
        );
        creature.age = 10.0;
        eco.arena.creatures.push(creature);
    }
    // The third creature dies; two left alive triggers turnover.
    eco.arena.creatures[2].die(None, DeathCause::Combat);

    eco.advance(FRAME, &mut sink);

    assert_eq!(eco.generation(), 1);
    assert_eq!(eco.arena.creatures.len(), params.population_size);
    assert_eq!(eco.arena.living_count(), params.population_size);

    // The two survivors persist physically with their ids and accumulated
    // age, and pick up the new generation stamp.
    for id in [1000u64, 1001u64] {
        let elite = eco
            .arena
            .creatures
            .iter()
            .find(|c| c.id == id)
            .expect("elite creature was destroyed at turnover");
        assert!(elite.is_alive());
        assert_eq!(elite.genome.generation, 1);
        assert!(elite.age >= 10.0);
    }
    assert!(sink.events.iter().any(|(_, e)| matches!(
        e,
        SimulationEvent::GenerationTurnover {
            generation: 1,
            survivors: 2,
        }
    )));
}

#[test]
fn test_total_starvation_rolls_into_fresh_generation() {
    let params = test_params();
    let mut eco = Ecosystem::new(params.clone(), 9);
    let mut sink = CaptureSink::default();

    for creature in eco.arena.creatures.iter_mut() {
        creature.food = 0.0001;
    }
    eco.advance(FRAME, &mut sink);

    assert_eq!(eco.generation(), 1);
    assert_eq!(eco.arena.living_count(), params.population_size);
    assert!(sink
        .events
        .iter()
        .any(|(_, e)| matches!(e, SimulationEvent::Starved { .. })));
}

#[test]
fn test_stats_pushed_on_interval() {
    let params = test_params(); // stats every simulated second
    let mut eco = Ecosystem::new(params, 10);
    let mut sink = CaptureSink::default();

    for _ in 0..70 {
        eco.advance(FRAME, &mut sink);
    }
    assert!(!sink.stats.is_empty());
    assert!(sink.stats[0].sim_time > 0.0);
}

#[test]
fn test_export_import_round_trip() {
    let params = test_params();
    let eco = Ecosystem::new(params.clone(), 11);
    let document = eco.export_best().expect("export failed");

    let mut other = Ecosystem::new(params.clone(), 12);
    let mut sink = NullSink;
    other.import(&document, &mut sink).expect("import failed");

    assert_eq!(other.evolution.population().len(), params.population_size);
    assert_eq!(other.arena.creatures.len(), params.population_size);
    // One exact copy of the imported genome seeds the population.
    let imported: Genome = eco
        .evolution
        .population()
        .iter()
        .max_by(|a, b| a.fitness.partial_cmp(&b.fitness).unwrap())
        .unwrap()
        .clone();
    assert_eq!(other.evolution.population()[0], imported);
    assert_eq!(other.generation(), imported.generation);
}

#[test]
fn test_malformed_import_leaves_state_untouched() {
    let params = test_params();
    let mut eco = Ecosystem::new(params.clone(), 13);
    let mut sink = NullSink;

    let creatures_before = eco.arena.creatures.len();
    let generation_before = eco.generation();

    assert!(eco.import("{ this is not json", &mut sink).is_err());
    assert!(eco.import("{\"genome\": 42}", &mut sink).is_err());

    assert_eq!(eco.arena.creatures.len(), creatures_before);
    assert_eq!(eco.generation(), generation_before);
}

#[test]
fn test_import_rejects_inconsistent_genome() {
    let params = test_params();
    let mut eco = Ecosystem::new(params, 14);
    let mut sink = NullSink;

    // Structurally broken: a joint pointing at a missing segment.
    let mut genome = blob_genome(140);
    genome.joints.push(vivarium::simulation::genome::JointGene {
        seg_a: 0,
        seg_b: 42,
        attach_a: [0.0, 0.0],
        attach_b: [0.0, 0.0],
        rest_length: 10.0,
        min_length: 5.0,
        max_length: 20.0,
        stiffness: 0.5,
        motor: vivarium::simulation::genome::MotorPattern {
            amplitude: 1.0,
            frequency: 1.0,
            phase: 0.0,
        },
    });
    let document = format!(
        "{{\"genome\": {}}}",
        serde_json::to_string(&genome).unwrap()
    );
    assert!(eco.import(&document, &mut sink).is_err());
}

#[test]
fn test_reset_returns_to_generation_zero() {
    let params = test_params();
    let mut eco = Ecosystem::new(params.clone(), 15);
    let mut sink = NullSink;

    for creature in eco.arena.creatures.iter_mut().skip(2) {
        creature.die(None, DeathCause::Combat);
    }
    eco.advance(FRAME, &mut sink);
    assert_eq!(eco.generation(), 1);

    eco.reset(&mut sink);
    assert_eq!(eco.generation(), 0);
    assert_eq!(eco.arena.creatures.len(), params.population_size);
    assert!(eco.arena.creatures.iter().all(|c| c.is_alive()));
}

#[test]
fn test_event_log_collects_descriptions() {
    let params = test_params();
    let mut eco = Ecosystem::new(params, 16);
    let mut log = EventLog::new(10);

    for creature in eco.arena.creatures.iter_mut().skip(2) {
        creature.die(None, DeathCause::Combat);
    }
    eco.advance(FRAME, &mut log);

    assert!(!log.events().is_empty());
    assert!(log.events().len() <= 10);
}
