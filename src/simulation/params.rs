use serde::{Deserialize, Serialize};

/// Simulation parameters that control arena, metabolism, combat,
/// reproduction, and evolution behavior.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Params {
    /// Simulation area width.
    pub arena_width: f32,
    /// Simulation area height.
    pub arena_height: f32,
    /// Half-thickness of the static boundary walls. Thick walls prevent
    /// fast bodies from tunneling out of the arena.
    pub wall_thickness: f32,
    /// Restitution of the boundary walls (bounce-back factor).
    pub wall_restitution: f32,
    /// Number of random static obstacles scattered in the arena.
    pub obstacle_count: usize,
    /// Minimum and maximum obstacle radius.
    pub obstacle_radius: (f32, f32),
    /// Number of power-ups kept in the arena.
    pub power_up_count: usize,
    /// Amount restored to both food and health when a power-up is collected.
    pub power_up_restore: f32,
    /// Seconds before a collected power-up respawns at a new position.
    pub power_up_respawn: f32,
    /// Target population size (genomes per generation). Clamped to 5..=50
    /// by the control surface.
    pub population_size: usize,
    /// Number of top-fitness genomes carried unchanged into the next
    /// generation.
    pub elite_count: usize,
    /// Tournament size for parent selection.
    pub tournament_size: usize,
    /// Probability that an offspring is produced by crossover rather than
    /// an asexual mutated clone.
    pub crossover_rate: f32,
    /// Mutation rate applied to every offspring at generation turnover.
    pub mutation_rate: f32,
    /// Mutation rate applied to children born from mid-generation
    /// reproduction.
    pub birth_mutation_rate: f32,
    /// Mutation rate applied to the seeded copies of an imported genome.
    pub import_mutation_rate: f32,
    /// Upper bound for both the food and health pools.
    pub max_pool: f32,
    /// Food and health a creature spawns with.
    pub spawn_pool: f32,
    /// Food drained per second. 100/3600 empties a full pool of 100 in
    /// exactly one hour, regardless of activity.
    pub starvation_rate: f32,
    /// Seconds a corpse holds at full opacity before fading.
    pub corpse_hold: f32,
    /// Seconds over which a corpse fades to invisible.
    pub corpse_fade: f32,
    /// Relative impact speed below which collisions deal no damage.
    pub impact_speed_threshold: f32,
    /// Distance between one creature's mouth and another's heart that
    /// triggers an instant kill.
    pub instant_kill_radius: f32,
    /// Age (seconds) at which the attack bonus and damage resistance reach
    /// their caps (2.0x attack, 0.5x damage taken).
    pub combat_maturity_age: f32,
    /// Minimum age (seconds) before a creature may reproduce.
    pub reproduction_min_age: f32,
    /// Minimum food and health required of both partners.
    pub reproduction_min_pool: f32,
    /// Maximum distance between partners.
    pub reproduction_radius: f32,
    /// Seconds a creature must wait between reproductions.
    pub reproduction_cooldown: f32,
    /// Positional jitter applied to the midpoint where a child spawns.
    pub reproduction_jitter: f32,
    /// Hard cap on the number of tracked creatures (alive or fading).
    pub max_creatures: usize,
    /// High friction applied to the gripping end segment.
    pub grip_friction_high: f32,
    /// Low friction applied to the sliding end segment.
    pub grip_friction_low: f32,
    /// Decay rate of the sensory memory vector (per second).
    pub memory_rate: f32,
    /// Number of memory cells per creature genome.
    pub memory_size: usize,
    /// Scale factor from genome joint stiffness (0.1..0.9) to spring
    /// stiffness in the physics world.
    pub joint_stiffness_scale: f32,
    /// Spring damping for body joints.
    pub joint_damping: f32,
    /// Linear damping applied to creature bodies (the world has no gravity
    /// or drag of its own).
    pub body_linear_damping: f32,
    /// Angular damping applied to creature bodies.
    pub body_angular_damping: f32,
    /// Impulse scale for the gripper-segment attraction hook.
    pub gripper_pull: f32,
    /// Range of the gripper attraction.
    pub gripper_range: f32,
    /// Maximum real time consumed per frame, in seconds. Larger elapsed
    /// times (a backgrounded host) are capped instead of integrated.
    pub max_frame_time: f32,
    /// Maximum duration of a single physics sub-step.
    pub max_substep: f32,
    /// Simulated seconds between stats snapshots pushed to the event sink.
    pub stats_interval: f64,
}

impl Default for Params {
    fn default() -> Self {
        Self {
            arena_width: 1000.0,
            arena_height: 1000.0,
            wall_thickness: 50.0,
            wall_restitution: 0.9,
            obstacle_count: 6,
            obstacle_radius: (15.0, 45.0),
            power_up_count: 5,
            power_up_restore: 50.0,
            power_up_respawn: 30.0,
            population_size: 20,
            elite_count: 2,
            tournament_size: 3,
            crossover_rate: 0.7,
            mutation_rate: 0.1,
            birth_mutation_rate: 0.1,
            import_mutation_rate: 0.2,
            max_pool: 200.0,
            spawn_pool: 100.0,
            starvation_rate: 100.0 / 3600.0,
            corpse_hold: 2.0,
            corpse_fade: 2.0,
            impact_speed_threshold: 3.0,
            instant_kill_radius: 12.0,
            combat_maturity_age: 14_400.0,
            reproduction_min_age: 30.0,
            reproduction_min_pool: 50.0,
            reproduction_radius: 80.0,
            reproduction_cooldown: 60.0,
            reproduction_jitter: 10.0,
            max_creatures: 100,
            grip_friction_high: 2.5,
            grip_friction_low: 0.05,
            memory_rate: 2.0,
            memory_size: 4,
            joint_stiffness_scale: 50.0,
            joint_damping: 2.0,
            body_linear_damping: 0.8,
            body_angular_damping: 0.8,
            gripper_pull: 0.4,
            gripper_range: 120.0,
            max_frame_time: 0.1,
            max_substep: 1.0 / 30.0,
            stats_interval: 5.0,
        }
    }
}

impl Params {
    /// Usable speed-multiplier range exposed by the controls.
    pub const SPEED_RANGE: (f32, f32) = (0.5, 1000.0);
    /// Usable population-size range exposed by the controls.
    pub const POPULATION_RANGE: (usize, usize) = (5, 50);
}
