//! Creature behavior, state, and lifecycle.
//!
//! A creature is a genome made flesh: one rigid body per segment and one
//! spring joint per joint gene, registered in the shared physics world and
//! tagged with the creature's id. The creature owns its runtime state
//! (food, health, age, memory, motor state) and fully deregisters its
//! bodies on despawn.

use ndarray::Array1;
use rapier2d::prelude::*;

use crate::simulation::arena::creature_tag;
use crate::simulation::error::CreatureError;
use crate::simulation::genome::{Genome, SegmentShape};
use crate::simulation::params::Params;
use crate::simulation::physics::PhysicsState;

use super::motor::JointMotor;
use super::senses::{self, VisibilitySnapshot};

/// Why a creature died.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeathCause {
    /// The food pool ran out.
    Starvation,
    /// Health was reduced to zero by impacts.
    Combat,
    /// The heart was eaten by another creature's mouth.
    Eaten,
    /// Removed defensively after a physics inconsistency.
    Culled,
}

/// Alive or dead; death is terminal and one-way.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum LifeState {
    /// Updating normally.
    Alive,
    /// Dead; `elapsed` counts seconds since death for the fade-out.
    Dead {
        /// What killed the creature.
        cause: DeathCause,
        /// Seconds since death.
        elapsed: f32,
    },
}

/// A live creature instance.
pub struct Creature {
    /// Unique instance id, never reused within a run.
    pub id: u64,
    /// The creature's own copy of its genome.
    pub genome: Genome,
    /// Index of this creature's genome in the population.
    pub population_slot: usize,
    bodies: Vec<RigidBodyHandle>,
    colliders: Vec<ColliderHandle>,
    joints: Vec<Option<ImpulseJointHandle>>,
    motors: Vec<JointMotor>,
    /// Starvation pool in 0..=200; decays independently of activity.
    pub food: f32,
    /// Combat pool in 0..=200; only damage drains it.
    pub health: f32,
    /// Seconds lived; monotonic, survives generation turnover for elites.
    pub age: f64,
    sim_time: f64,
    state: LifeState,
    /// Render opacity; 1 while alive, fades to 0 after death.
    pub fade_alpha: f32,
    /// Simulation time of the last reproduction, for the cooldown.
    pub last_reproduction_time: f64,
    /// Total damage dealt to others.
    pub damage_dealt: f32,
    /// Total damage taken.
    pub damage_taken: f32,
    /// Number of creatures this one killed.
    pub kills: u32,
    /// Leaky integrator over recent sensor activations.
    pub memory: Array1<f32>,
    /// Last computed activation per sensor, for modulation and rendering.
    pub sensor_activations: Vec<f32>,
    spawn_position: [f32; 2],
    last_centroid: [f32; 2],
    max_pool: f32,
}

impl Creature {
    /// Builds a creature from a genome at `position`, registering one body
    /// per segment and one spring joint per joint gene in the world.
    pub fn spawn(
        id: u64,
        population_slot: usize,
        genome: Genome,
        position: [f32; 2],
        params: &Params,
        physics: &mut PhysicsState,
    ) -> Self {
        let tag = creature_tag(id);
        let placements = segment_placements(&genome, position);

        let mut bodies = Vec::with_capacity(genome.segments.len());
        let mut colliders = Vec::with_capacity(genome.segments.len());
        for (segment, placement) in genome.segments.iter().zip(&placements) {
            let body = RigidBodyBuilder::dynamic()
                .translation(vector![placement.position[0], placement.position[1]])
                .rotation(placement.angle)
                .linear_damping(params.body_linear_damping)
                .angular_damping(params.body_angular_damping)
                .user_data(tag)
                .build();
            let handle = physics.bodies.insert(body);

            let shape = match segment.shape {
                SegmentShape::Circle { radius } => ColliderBuilder::ball(radius),
                SegmentShape::Rect { length, width } => {
                    ColliderBuilder::cuboid(length / 2.0, width / 2.0)
                }
            };
            let collider = shape
                .mass(segment.mass)
                .friction(0.8)
                .restitution(0.2)
                .active_events(ActiveEvents::COLLISION_EVENTS)
                .user_data(tag)
                .build();
            colliders.push(physics.colliders.insert_with_parent(
                collider,
                handle,
                &mut physics.bodies,
            ));
            bodies.push(handle);
        }

        let mut joints = Vec::with_capacity(genome.joints.len());
        for gene in &genome.joints {
            let mut spring = SpringJointBuilder::new(
                gene.rest_length,
                gene.stiffness * params.joint_stiffness_scale,
                params.joint_damping,
            )
            .local_anchor1(point![gene.attach_a[0], gene.attach_a[1]])
            .local_anchor2(point![gene.attach_b[0], gene.attach_b[1]])
            .build();
            // Neighboring segments overlap at their anchors; their contacts
            // would fight the spring.
            spring.data.set_contacts_enabled(false);
            let handle = physics.impulse_joints.insert(
                bodies[gene.seg_a],
                bodies[gene.seg_b],
                spring,
                true,
            );
            joints.push(Some(handle));
        }

        let motors = genome
            .joints
            .iter()
            .map(|gene| JointMotor::baseline(&gene.motor))
            .collect();
        let sensor_count = genome.sensors.len();
        let memory_size = genome.memory_size;

        Self {
            id,
            genome,
            population_slot,
            bodies,
            colliders,
            joints,
            motors,
            food: params.spawn_pool,
            health: params.spawn_pool,
            age: 0.0,
            sim_time: 0.0,
            state: LifeState::Alive,
            fade_alpha: 1.0,
            last_reproduction_time: f64::NEG_INFINITY,
            damage_dealt: 0.0,
            damage_taken: 0.0,
            kills: 0,
            memory: Array1::zeros(memory_size),
            sensor_activations: vec![0.0; sensor_count],
            spawn_position: position,
            last_centroid: position,
            max_pool: params.max_pool,
        }
    }

    /// Whether the creature is alive.
    pub fn is_alive(&self) -> bool {
        matches!(self.state, LifeState::Alive)
    }

    /// Current life state.
    pub fn state(&self) -> LifeState {
        self.state
    }

    /// Whether the death fade has completed and the instance can be
    /// removed from the world.
    pub fn is_removable(&self, params: &Params) -> bool {
        matches!(
            self.state,
            LifeState::Dead { elapsed, .. } if elapsed >= params.corpse_hold + params.corpse_fade
        )
    }

    /// Recomputes sensor activations from the per-frame visibility
    /// snapshot. Safe to call in parallel across creatures: reads the
    /// world, mutates only `self`.
    pub fn update_senses(&mut self, physics: &PhysicsState, snapshot: &VisibilitySnapshot) {
        self.sensor_activations
            .resize(self.genome.sensors.len(), 0.0);
        if !self.is_alive() {
            self.sensor_activations.fill(0.0);
            return;
        }
        for (i, sensor) in self.genome.sensors.iter().enumerate() {
            let body = self
                .bodies
                .get(sensor.segment)
                .and_then(|handle| physics.bodies.get(*handle));
            self.sensor_activations[i] = match body {
                Some(body) => {
                    let pos = [body.translation().x, body.translation().y];
                    let axis = body.rotation().angle() + sensor.angle;
                    senses::activation(sensor, pos, axis, self.id, snapshot)
                }
                None => 0.0,
            };
        }
    }

    /// Advances the creature by `dt` seconds.
    ///
    /// Dead creatures only advance their fade timer. Live creatures age,
    /// starve, modulate and drive their motors, update their grip pattern
    /// and memory. Returns an error when the physical composite turned out
    /// to be incomplete; the caller evicts the creature in that case.
    pub fn update(
        &mut self,
        dt: f32,
        params: &Params,
        physics: &mut PhysicsState,
    ) -> Result<(), CreatureError> {
        if let LifeState::Dead { elapsed, .. } = &mut self.state {
            *elapsed += dt;
            let past_hold = *elapsed - params.corpse_hold;
            self.fade_alpha = if past_hold <= 0.0 {
                1.0
            } else {
                (1.0 - past_hold / params.corpse_fade).max(0.0)
            };
            return Ok(());
        }

        self.age += f64::from(dt);
        self.sim_time += f64::from(dt);

        self.food -= params.starvation_rate * dt;
        if self.food <= 0.0 {
            self.food = 0.0;
            self.die(None, DeathCause::Starvation);
            return Ok(());
        }

        self.prune_invalid_joints(physics);
        for (segment, handle) in self.bodies.iter().enumerate() {
            if !physics.bodies.contains(*handle) {
                return Err(CreatureError::MissingBody {
                    id: self.id,
                    segment,
                });
            }
        }

        self.modulate_motors();
        self.drive_joints(params, physics);
        self.update_grip(params, physics);
        self.update_memory(params, dt);
        self.update_centroid(physics);
        Ok(())
    }

    /// Forgets joint handles the world no longer knows about.
    fn prune_invalid_joints(&mut self, physics: &PhysicsState) {
        for joint in &mut self.joints {
            if let Some(handle) = *joint {
                if physics.impulse_joints.get(handle).is_none() {
                    *joint = None;
                }
            }
        }
    }

    /// Combines each joint's genome baseline with the weighted sum of all
    /// sensor activations.
    fn modulate_motors(&mut self) {
        let weights = &self.genome.sensor_motor_weights;
        let activations = &self.sensor_activations;
        let motor_count = self.motors.len();
        for (j, gene) in self.genome.joints.iter().enumerate().take(motor_count) {
            let contributions = activations
                .iter()
                .enumerate()
                .filter(|&(s, _)| s < weights.nrows() && j < weights.ncols())
                .map(|(s, &activation)| (activation, &weights[[s, j]]));
            self.motors[j] = JointMotor::modulated(&gene.motor, contributions);
        }
    }

    /// Drives every spring joint toward its oscillator's target length.
    fn drive_joints(&mut self, params: &Params, physics: &mut PhysicsState) {
        for (j, gene) in self.genome.joints.iter().enumerate() {
            let Some(handle) = self.joints.get(j).copied().flatten() else {
                continue;
            };
            if let Some(joint) = physics.impulse_joints.get_mut(handle) {
                let target = self.motors[j].target_length(gene, self.sim_time);
                joint.data.set_motor_position(
                    JointAxis::X,
                    target,
                    gene.stiffness * params.joint_stiffness_scale,
                    params.joint_damping,
                );
            }
        }
    }

    /// Sticky-feet locomotion: the first and last segment alternate
    /// between gripping and sliding friction in anti-phase with the first
    /// joint's oscillator, so the body crawls without any applied force.
    fn update_grip(&mut self, params: &Params, physics: &mut PhysicsState) {
        let Some(motor) = self.motors.first() else {
            return;
        };
        let (first, last) = match (self.colliders.first(), self.colliders.last()) {
            (Some(&first), Some(&last)) if first != last => (first, last),
            _ => return,
        };
        let forward = motor.wave(self.sim_time) > 0.0;
        let (front_friction, back_friction) = if forward {
            (params.grip_friction_high, params.grip_friction_low)
        } else {
            (params.grip_friction_low, params.grip_friction_high)
        };
        if let Some(collider) = physics.colliders.get_mut(first) {
            collider.set_friction(front_friction);
        }
        if let Some(collider) = physics.colliders.get_mut(last) {
            collider.set_friction(back_friction);
        }
    }

    /// Leaky integration of sensor history into the memory vector.
    fn update_memory(&mut self, params: &Params, dt: f32) {
        if self.memory.is_empty() {
            return;
        }
        let blend = (params.memory_rate * dt).min(1.0);
        let sensors = &self.sensor_activations;
        for (i, cell) in self.memory.iter_mut().enumerate() {
            let input = if sensors.is_empty() {
                0.0
            } else {
                sensors[i % sensors.len()]
            };
            *cell = *cell * (1.0 - blend) + input * blend;
        }
    }

    fn update_centroid(&mut self, physics: &PhysicsState) {
        if let Some(centroid) = self.centroid(physics) {
            self.last_centroid = centroid;
        }
    }

    /// Mass-weighted centroid of all body segments, if any are present.
    pub fn centroid(&self, physics: &PhysicsState) -> Option<[f32; 2]> {
        let mut total_mass = 0.0;
        let mut weighted = [0.0f32; 2];
        for (segment, handle) in self.genome.segments.iter().zip(&self.bodies) {
            let body = physics.bodies.get(*handle)?;
            weighted[0] += body.translation().x * segment.mass;
            weighted[1] += body.translation().y * segment.mass;
            total_mass += segment.mass;
        }
        if total_mass <= 0.0 {
            return None;
        }
        Some([weighted[0] / total_mass, weighted[1] / total_mass])
    }

    /// Centroid as of the last completed update.
    pub fn last_centroid(&self) -> [f32; 2] {
        self.last_centroid
    }

    /// Body handle carrying the heart (combat target).
    pub fn heart_body(&self) -> Option<RigidBodyHandle> {
        self.bodies.get(self.genome.heart_index()).copied()
    }

    /// Body handle carrying the mouth (combat weapon).
    pub fn mouth_body(&self) -> Option<RigidBodyHandle> {
        self.bodies.get(self.genome.mouth_index()).copied()
    }

    /// Whether every segment body is still present in the world.
    pub fn composite_present(&self, physics: &PhysicsState) -> bool {
        self.bodies
            .iter()
            .all(|handle| physics.bodies.contains(*handle))
    }

    /// Reduces health only; food is never touched by combat. Records the
    /// damage on both sides and kills the creature at zero health.
    pub fn take_damage(&mut self, amount: f32, mut attacker: Option<&mut Creature>) {
        if !self.is_alive() || amount <= 0.0 {
            return;
        }
        self.health = (self.health - amount).max(0.0);
        self.damage_taken += amount;
        if let Some(other) = attacker.as_deref_mut() {
            other.damage_dealt += amount;
        }
        if self.health <= 0.0 {
            self.die(attacker, DeathCause::Combat);
        }
    }

    /// Raises both metabolic pools by the same amount, clamped to the cap.
    pub fn restore_health(&mut self, amount: f32) {
        if !self.is_alive() {
            return;
        }
        self.food = (self.food + amount).min(self.max_pool);
        self.health = (self.health + amount).min(self.max_pool);
    }

    /// Kills the creature. Idempotent: a second call is a no-op.
    ///
    /// Both pools drop to zero. A killer is rewarded with full health and
    /// food and an incremented kill count.
    pub fn die(&mut self, killer: Option<&mut Creature>, cause: DeathCause) {
        if !self.is_alive() {
            return;
        }
        self.food = 0.0;
        self.health = 0.0;
        self.state = LifeState::Dead { cause, elapsed: 0.0 };
        if let Some(other) = killer {
            other.health = other.max_pool;
            other.food = other.max_pool;
            other.kills += 1;
        }
    }

    /// Fitness: distance traveled from spawn, plus kills and damage dealt,
    /// minus damage taken. Never negative.
    pub fn fitness(&self) -> f32 {
        let dx = self.last_centroid[0] - self.spawn_position[0];
        let dy = self.last_centroid[1] - self.spawn_position[1];
        let distance = (dx * dx + dy * dy).sqrt();
        (distance + self.kills as f32 * 100.0 + self.damage_dealt * 0.5
            - self.damage_taken * 0.3)
            .max(0.0)
    }

    /// Attack multiplier: 1.0 at birth, rising linearly to 2.0 at the
    /// maturity age.
    pub fn attack_bonus(&self, params: &Params) -> f32 {
        1.0 + (self.age as f32 / params.combat_maturity_age).min(1.0)
    }

    /// Damage-taken multiplier: 1.0 at birth, falling linearly to 0.5 at
    /// the maturity age.
    pub fn defense_factor(&self, params: &Params) -> f32 {
        1.0 - 0.5 * (self.age as f32 / params.combat_maturity_age).min(1.0)
    }

    /// Whether this creature satisfies its own half of the reproduction
    /// eligibility rules at simulation time `now`.
    pub fn can_reproduce(&self, params: &Params, now: f64) -> bool {
        self.is_alive()
            && self.age >= f64::from(params.reproduction_min_age)
            && self.food >= params.reproduction_min_pool
            && self.health >= params.reproduction_min_pool
            && now - self.last_reproduction_time >= f64::from(params.reproduction_cooldown)
    }

    /// World transforms `(position, rotation)` of each segment body, in
    /// genome order; missing bodies are skipped.
    pub fn body_transforms(&self, physics: &PhysicsState) -> Vec<([f32; 2], f32)> {
        self.bodies
            .iter()
            .filter_map(|handle| physics.bodies.get(*handle))
            .map(|body| {
                (
                    [body.translation().x, body.translation().y],
                    body.rotation().angle(),
                )
            })
            .collect()
    }

    /// Handles of this creature's segment bodies, in genome order.
    pub fn body_handles(&self) -> &[RigidBodyHandle] {
        &self.bodies
    }

    /// Removes every body (and with them colliders and joints) this
    /// creature registered in the world.
    pub fn despawn(&mut self, physics: &mut PhysicsState) {
        for handle in self.bodies.drain(..) {
            if physics.bodies.contains(handle) {
                physics.remove_body(handle);
            }
        }
        self.colliders.clear();
        self.joints.clear();
    }

    /// Marks the creature dead without a cause attribution and makes it
    /// immediately removable. Used when the physics world lost parts of
    /// the composite.
    pub fn cull(&mut self) {
        if self.is_alive() {
            self.die(None, DeathCause::Culled);
        }
        if let LifeState::Dead { elapsed, .. } = &mut self.state {
            *elapsed = f32::MAX;
        }
        self.fade_alpha = 0.0;
    }
}

struct Placement {
    position: [f32; 2],
    angle: f32,
}

/// Lays the segment tree out in world space: each child sits at its
/// parent's attach angle, one joint rest-length away surface to surface.
fn segment_placements(genome: &Genome, origin: [f32; 2]) -> Vec<Placement> {
    let mut placements: Vec<Placement> = Vec::with_capacity(genome.segments.len());
    for segment in &genome.segments {
        let placement = match segment.parent {
            None => Placement {
                position: origin,
                angle: 0.0,
            },
            Some(parent) if parent < placements.len() => {
                let rest = genome
                    .joints
                    .iter()
                    .find(|j| j.seg_a == parent && j.seg_b == segment.id)
                    .map_or(20.0, |j| j.rest_length);
                let parent_placement = &placements[parent];
                let angle = parent_placement.angle + segment.attach_angle;
                let gap = genome.segments[parent].shape.half_extent()
                    + segment.shape.half_extent()
                    + rest;
                Placement {
                    position: [
                        parent_placement.position[0] + angle.cos() * gap,
                        parent_placement.position[1] + angle.sin() * gap,
                    ],
                    angle,
                }
            }
            // Orphaned parent reference; drop the segment at the origin.
            Some(_) => Placement {
                position: origin,
                angle: 0.0,
            },
        };
        placements.push(placement);
    }
    placements
}
