#![allow(missing_docs)]
#![allow(clippy::float_cmp)]

use rand::SeedableRng;
use rand::rngs::SmallRng;

use vivarium::simulation::creature::{Creature, DeathCause, LifeState};
use vivarium::simulation::genome::{Genome, MotorWeights};
use vivarium::simulation::params::Params;
use vivarium::simulation::physics::PhysicsState;

fn spawn_creature(seed: u64, physics: &mut PhysicsState, params: &Params) -> Creature {
    let mut rng = SmallRng::seed_from_u64(seed);
    let genome = Genome::random(&mut rng, params.memory_size);
    Creature::spawn(seed, 0, genome, [500.0, 500.0], params, physics)
}

#[test]
fn test_spawn_registers_composite() {
    let params = Params::default();
    let mut physics = PhysicsState::new();
    let creature = spawn_creature(1, &mut physics, &params);

    assert!(creature.is_alive());
    assert!(creature.composite_present(&physics));
    assert_eq!(creature.body_handles().len(), creature.genome.segments.len());
    assert_eq!(creature.food, params.spawn_pool);
    assert_eq!(creature.health, params.spawn_pool);
    assert_eq!(creature.age, 0.0);
}

#[test]
fn test_starvation_kills_on_the_emptying_tick() {
    let params = Params::default();
    let mut physics = PhysicsState::new();
    let mut creature = spawn_creature(2, &mut physics, &params);

    creature.food = 0.001;
    creature.update(0.1, &params, &mut physics).unwrap();

    assert!(!creature.is_alive());
    assert_eq!(creature.food, 0.0);
    assert!(matches!(
        creature.state(),
        LifeState::Dead {
            cause: DeathCause::Starvation,
            ..
        }
    ));
}

#[test]
fn test_food_decay_is_exactly_one_hour_from_100() {
    let params = Params::default();
    let mut physics = PhysicsState::new();
    let mut creature = spawn_creature(3, &mut physics, &params);

    assert_eq!(creature.food, 100.0);
    // One simulated hour in 1s ticks leaves the pool empty, not much
    // earlier and not much later (allow a little float drift).
    for _ in 0..3590 {
        creature.update(1.0, &params, &mut physics).unwrap();
        assert!(creature.is_alive(), "starved early at food {}", creature.food);
    }
    for _ in 0..20 {
        creature.update(1.0, &params, &mut physics).unwrap();
    }
    assert!(!creature.is_alive());
}

#[test]
fn test_take_damage_never_touches_food() {
    let params = Params::default();
    let mut physics = PhysicsState::new();
    let mut creature = spawn_creature(4, &mut physics, &params);

    let food_before = creature.food;
    creature.take_damage(30.0, None);
    assert_eq!(creature.health, 70.0);
    assert_eq!(creature.food, food_before);
    assert_eq!(creature.damage_taken, 30.0);
}

#[test]
fn test_restore_health_raises_both_pools_clamped() {
    let params = Params::default();
    let mut physics = PhysicsState::new();
    let mut creature = spawn_creature(5, &mut physics, &params);

    creature.restore_health(50.0);
    assert_eq!(creature.food, 150.0);
    assert_eq!(creature.health, 150.0);

    creature.restore_health(500.0);
    assert_eq!(creature.food, 200.0);
    assert_eq!(creature.health, 200.0);
}

#[test]
fn test_kill_reward_restores_killer_in_full() {
    let params = Params::default();
    let mut physics = PhysicsState::new();
    let mut killer = spawn_creature(6, &mut physics, &params);
    let mut victim = spawn_creature(7, &mut physics, &params);

    killer.food = 40.0;
    killer.health = 55.0;
    victim.die(Some(&mut killer), DeathCause::Eaten);

    assert_eq!(killer.health, 200.0);
    assert_eq!(killer.food, 200.0);
    assert_eq!(killer.kills, 1);
    assert!(!victim.is_alive());
    assert_eq!(victim.health, 0.0);
    assert_eq!(victim.food, 0.0);
}

#[test]
fn test_die_is_idempotent() {
    let params = Params::default();
    let mut physics = PhysicsState::new();
    let mut killer = spawn_creature(8, &mut physics, &params);
    let mut victim = spawn_creature(9, &mut physics, &params);

    victim.die(Some(&mut killer), DeathCause::Combat);
    victim.die(Some(&mut killer), DeathCause::Combat);
    assert_eq!(killer.kills, 1);
}

#[test]
fn test_lethal_damage_credits_the_attacker() {
    let params = Params::default();
    let mut physics = PhysicsState::new();
    let mut attacker = spawn_creature(10, &mut physics, &params);
    let mut victim = spawn_creature(11, &mut physics, &params);

    victim.health = 10.0;
    victim.take_damage(25.0, Some(&mut attacker));

    assert!(!victim.is_alive());
    assert_eq!(attacker.kills, 1);
    assert_eq!(attacker.damage_dealt, 25.0);
    // Kill reward: attacker restored in full.
    assert_eq!(attacker.health, 200.0);
    assert_eq!(attacker.food, 200.0);
}

#[test]
fn test_age_combat_scaling() {
    let params = Params::default();
    let mut physics = PhysicsState::new();
    let mut creature = spawn_creature(12, &mut physics, &params);

    assert_eq!(creature.attack_bonus(&params), 1.0);
    assert_eq!(creature.defense_factor(&params), 1.0);

    creature.age = 7200.0; // two hours: halfway to maturity
    assert!((creature.attack_bonus(&params) - 1.5).abs() < 1e-6);
    assert!((creature.defense_factor(&params) - 0.75).abs() < 1e-6);

    creature.age = 100_000.0; // far past maturity: capped
    assert_eq!(creature.attack_bonus(&params), 2.0);
    assert_eq!(creature.defense_factor(&params), 0.5);
}

#[test]
fn test_impact_damage_formula_at_age_zero() {
    // Relative speed 5, combined mass 2, both newborn: each side takes
    // 5 * 2 * 0.5 * 1.0 * 1.0 = 5 damage, food untouched.
    let params = Params::default();
    let mut physics = PhysicsState::new();
    let mut a = spawn_creature(13, &mut physics, &params);
    let mut b = spawn_creature(14, &mut physics, &params);

    let base = 5.0 * 2.0;
    let damage_to_b = base * 0.5 * a.attack_bonus(&params) * b.defense_factor(&params);
    let damage_to_a = base * 0.5 * b.attack_bonus(&params) * a.defense_factor(&params);
    assert_eq!(damage_to_a, 5.0);
    assert_eq!(damage_to_b, 5.0);

    b.take_damage(damage_to_b, Some(&mut a));
    a.take_damage(damage_to_a, Some(&mut b));
    assert_eq!(a.health, 95.0);
    assert_eq!(b.health, 95.0);
    assert_eq!(a.food, 100.0);
    assert_eq!(b.food, 100.0);
}

#[test]
fn test_corpse_holds_then_fades_then_is_removable() {
    let params = Params::default();
    let mut physics = PhysicsState::new();
    let mut creature = spawn_creature(15, &mut physics, &params);

    creature.die(None, DeathCause::Combat);
    assert_eq!(creature.fade_alpha, 1.0);

    // Hold phase: opacity stays at 1 for the first two seconds.
    creature.update(1.0, &params, &mut physics).unwrap();
    assert_eq!(creature.fade_alpha, 1.0);
    assert!(!creature.is_removable(&params));

    // Fade phase: linear to zero over the next two seconds.
    creature.update(2.0, &params, &mut physics).unwrap();
    assert!((creature.fade_alpha - 0.5).abs() < 1e-3);
    assert!(!creature.is_removable(&params));

    creature.update(1.5, &params, &mut physics).unwrap();
    assert_eq!(creature.fade_alpha, 0.0);
    assert!(creature.is_removable(&params));
}

#[test]
fn test_dead_creature_age_freezes() {
    let params = Params::default();
    let mut physics = PhysicsState::new();
    let mut creature = spawn_creature(16, &mut physics, &params);

    creature.update(1.0, &params, &mut physics).unwrap();
    let age_at_death = creature.age;
    creature.die(None, DeathCause::Combat);
    creature.update(5.0, &params, &mut physics).unwrap();
    assert_eq!(creature.age, age_at_death);
}

#[test]
fn test_despawn_clears_world() {
    let params = Params::default();
    let mut physics = PhysicsState::new();
    let mut creature = spawn_creature(17, &mut physics, &params);

    assert!(physics.bodies.len() > 0);
    creature.despawn(&mut physics);
    assert_eq!(physics.bodies.len(), 0);
    assert_eq!(physics.impulse_joints.len(), 0);
    assert!(!creature.composite_present(&physics));
}

#[test]
fn test_update_fails_cleanly_when_body_vanishes() {
    let params = Params::default();
    let mut physics = PhysicsState::new();
    let mut creature = spawn_creature(18, &mut physics, &params);

    // Remove one body out of band, as a confused collaborator might.
    let handle = creature.body_handles()[0];
    physics.remove_body(handle);

    let result = creature.update(0.05, &params, &mut physics);
    assert!(result.is_err());
}

#[test]
fn test_zero_joint_genome_degrades_to_noop_motion() {
    let params = Params::default();
    let mut physics = PhysicsState::new();
    let mut rng = SmallRng::seed_from_u64(19);
    let mut genome = Genome::random(&mut rng, params.memory_size);

    // Strip the genome down to a single segment: no joints, no sensors.
    genome.segments.truncate(1);
    genome.joints.clear();
    genome.sensors.clear();
    genome.sensor_motor_weights = ndarray::Array2::from_shape_fn((0, 0), |_| MotorWeights {
        amplitude: 0.0,
        frequency: 0.0,
        phase: 0.0,
    });

    let mut creature = Creature::spawn(19, 0, genome, [100.0, 100.0], &params, &mut physics);
    creature.update(0.05, &params, &mut physics).unwrap();
    assert!(creature.is_alive());
}
