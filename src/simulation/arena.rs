//! Physics/combat coordinator.
//!
//! The arena owns the physics world, the static boundary walls, obstacles,
//! power-ups, and the registry of live creatures. It translates raw
//! collision events into domain events (damage, instant kills, power-up
//! collection), steps the engine defensively, and keeps the registry
//! consistent with a world that does not tolerate dangling references.

use rand::Rng;
use rapier2d::prelude::*;

use super::creature::{Creature, DeathCause, LifeState};
use super::events::{EventSink, SimulationEvent};
use super::params::Params;
use super::physics::{ContactStart, PhysicsState};

/// Collider tag marking a power-up.
pub(crate) const POWER_UP_TAG: u128 = u128::MAX;

/// Collider/body tag for a creature. Zero is reserved for static scenery.
pub(crate) fn creature_tag(id: u64) -> u128 {
    u128::from(id) + 1
}

/// Inverse of [`creature_tag`]; `None` for scenery and power-ups.
fn tagged_creature(tag: u128) -> Option<u64> {
    if tag == 0 || tag == POWER_UP_TAG {
        None
    } else {
        Some((tag - 1) as u64)
    }
}

struct PowerUp {
    body: Option<RigidBodyHandle>,
    collider: Option<ColliderHandle>,
    respawn_in: f32,
}

/// The physics world plus everything living inside it.
pub struct Arena {
    /// The wrapped physics engine state.
    pub physics: PhysicsState,
    /// All tracked creatures, alive and fading.
    pub creatures: Vec<Creature>,
    power_ups: Vec<PowerUp>,
    obstacles: Vec<RigidBodyHandle>,
}

impl Arena {
    /// Creates an arena with boundary walls, obstacles, and power-ups.
    pub fn new(params: &Params, rng: &mut impl Rng) -> Self {
        let mut arena = Self {
            physics: PhysicsState::new(),
            creatures: Vec::new(),
            power_ups: Vec::new(),
            obstacles: Vec::new(),
        };
        arena.build_walls(params);
        arena.reset_features(params, rng);
        arena
    }

    /// Four thick, bouncy walls enclosing the arena. Thickness guards
    /// against tunneling at high speed factors.
    fn build_walls(&mut self, params: &Params) {
        let (w, h, t) = (
            params.arena_width,
            params.arena_height,
            params.wall_thickness,
        );
        let walls = [
            ([w / 2.0, -t], [w / 2.0 + 2.0 * t, t]),
            ([w / 2.0, h + t], [w / 2.0 + 2.0 * t, t]),
            ([-t, h / 2.0], [t, h / 2.0 + 2.0 * t]),
            ([w + t, h / 2.0], [t, h / 2.0 + 2.0 * t]),
        ];
        for (center, half_extents) in walls {
            let body = RigidBodyBuilder::fixed()
                .translation(vector![center[0], center[1]])
                .build();
            let handle = self.physics.bodies.insert(body);
            let collider = ColliderBuilder::cuboid(half_extents[0], half_extents[1])
                .restitution(params.wall_restitution)
                .build();
            self.physics
                .colliders
                .insert_with_parent(collider, handle, &mut self.physics.bodies);
        }
    }

    /// Removes and regenerates obstacles and power-ups (used at generation
    /// turnover).
    pub fn reset_features(&mut self, params: &Params, rng: &mut impl Rng) {
        for handle in self.obstacles.drain(..) {
            self.physics.remove_body(handle);
        }
        for power_up in self.power_ups.drain(..) {
            if let Some(handle) = power_up.body {
                self.physics.remove_body(handle);
            }
        }

        for _ in 0..params.obstacle_count {
            let position = random_position(params, rng);
            let radius = rng.random_range(params.obstacle_radius.0..params.obstacle_radius.1);
            let body = RigidBodyBuilder::fixed()
                .translation(vector![position[0], position[1]])
                .build();
            let handle = self.physics.bodies.insert(body);
            let collider = ColliderBuilder::ball(radius).restitution(0.5).build();
            self.physics
                .colliders
                .insert_with_parent(collider, handle, &mut self.physics.bodies);
            self.obstacles.push(handle);
        }

        for _ in 0..params.power_up_count {
            let power_up = self.spawn_power_up(params, rng);
            self.power_ups.push(power_up);
        }
    }

    fn spawn_power_up(&mut self, params: &Params, rng: &mut impl Rng) -> PowerUp {
        let position = random_position(params, rng);
        let body = RigidBodyBuilder::fixed()
            .translation(vector![position[0], position[1]])
            .build();
        let handle = self.physics.bodies.insert(body);
        let collider = ColliderBuilder::ball(6.0)
            .sensor(true)
            .active_events(ActiveEvents::COLLISION_EVENTS)
            .user_data(POWER_UP_TAG)
            .build();
        let collider_handle =
            self.physics
                .colliders
                .insert_with_parent(collider, handle, &mut self.physics.bodies);
        PowerUp {
            body: Some(handle),
            collider: Some(collider_handle),
            respawn_in: 0.0,
        }
    }

    /// Advances the world by one sub-step: consistency pass, engine step,
    /// collision handling, power-up timers, creature updates, gripper
    /// pull, and corpse sweeping.
    pub fn step(
        &mut self,
        dt: f32,
        params: &Params,
        time: f64,
        rng: &mut impl Rng,
        sink: &mut dyn EventSink,
    ) {
        self.physics.consistency_pass();

        let contacts = match self.physics.step(dt) {
            Ok(contacts) => contacts,
            Err(message) => {
                log::error!("physics step failed: {message}; running recovery purge");
                self.recover();
                return;
            }
        };

        for contact in contacts {
            self.handle_contact(contact, params, time, sink);
        }

        self.tick_power_ups(dt, params, rng);
        self.update_creatures(dt, params, time, sink);
        self.apply_gripper_pull(params);
        self.sweep_removable(params);
    }

    /// Translates one collision-start event into domain behavior.
    fn handle_contact(
        &mut self,
        contact: ContactStart,
        params: &Params,
        time: f64,
        sink: &mut dyn EventSink,
    ) {
        let tag_a = self.physics.collider_tag(contact.collider_a);
        let tag_b = self.physics.collider_tag(contact.collider_b);

        if tag_a == POWER_UP_TAG || tag_b == POWER_UP_TAG {
            let (collider, other_tag) = if tag_a == POWER_UP_TAG {
                (contact.collider_a, tag_b)
            } else {
                (contact.collider_b, tag_a)
            };
            if let Some(creature_id) = tagged_creature(other_tag) {
                self.collect_power_up(collider, creature_id, params, time, sink);
            }
            return;
        }

        let (Some(id_a), Some(id_b)) = (tagged_creature(tag_a), tagged_creature(tag_b)) else {
            return;
        };
        if id_a == id_b {
            // Self-collisions between a creature's own segments are noise.
            return;
        }
        let (Some(index_a), Some(index_b)) = (self.index_of(id_a), self.index_of(id_b)) else {
            return;
        };
        if !self.creatures[index_a].is_alive() || !self.creatures[index_b].is_alive() {
            return;
        }

        if self.try_instant_kill(index_a, index_b, params, time, sink)
            || self.try_instant_kill(index_b, index_a, params, time, sink)
        {
            return;
        }

        if contact.relative_speed <= params.impact_speed_threshold {
            return;
        }
        let combined_mass = self.collider_body_mass(contact.collider_a)
            + self.collider_body_mass(contact.collider_b);
        let base_damage = contact.relative_speed * combined_mass;

        let (a, b) = pair_mut(&mut self.creatures, index_a, index_b);
        let (a_id, b_id) = (a.id, b.id);
        let damage_to_b = base_damage * 0.5 * a.attack_bonus(params) * b.defense_factor(params);
        let damage_to_a = base_damage * 0.5 * b.attack_bonus(params) * a.defense_factor(params);

        b.take_damage(damage_to_b, Some(&mut *a));
        a.take_damage(damage_to_a, Some(&mut *b));
        sink.record(
            time,
            SimulationEvent::Damage {
                attacker: a_id,
                victim: b_id,
                amount: damage_to_b,
            },
        );
        sink.record(
            time,
            SimulationEvent::Damage {
                attacker: b_id,
                victim: a_id,
                amount: damage_to_a,
            },
        );
        if !self.creatures[index_b].is_alive() {
            sink.record(
                time,
                SimulationEvent::Kill {
                    attacker: a_id,
                    victim: b_id,
                },
            );
        }
        if !self.creatures[index_a].is_alive() {
            sink.record(
                time,
                SimulationEvent::Kill {
                    attacker: b_id,
                    victim: a_id,
                },
            );
        }
    }

    /// Mouth-to-heart check in one direction. The attacker's mouth within
    /// the kill radius of the victim's heart eats the victim outright; the
    /// kill reward restores the attacker in full.
    fn try_instant_kill(
        &mut self,
        attacker: usize,
        victim: usize,
        params: &Params,
        time: f64,
        sink: &mut dyn EventSink,
    ) -> bool {
        let mouth = self.creatures[attacker]
            .mouth_body()
            .and_then(|h| self.physics.bodies.get(h))
            .map(|b| *b.translation());
        let heart = self.creatures[victim]
            .heart_body()
            .and_then(|h| self.physics.bodies.get(h))
            .map(|b| *b.translation());
        let (Some(mouth), Some(heart)) = (mouth, heart) else {
            return false;
        };
        if (mouth - heart).norm() > params.instant_kill_radius {
            return false;
        }

        let (attacker, victim) = pair_mut(&mut self.creatures, attacker, victim);
        let (attacker_id, victim_id) = (attacker.id, victim.id);
        victim.die(Some(attacker), DeathCause::Eaten);
        sink.record(
            time,
            SimulationEvent::Kill {
                attacker: attacker_id,
                victim: victim_id,
            },
        );
        true
    }

    fn collect_power_up(
        &mut self,
        collider: ColliderHandle,
        creature_id: u64,
        params: &Params,
        time: f64,
        sink: &mut dyn EventSink,
    ) {
        let Some(index) = self.index_of(creature_id) else {
            return;
        };
        if !self.creatures[index].is_alive() {
            return;
        }
        let Some(power_up) = self
            .power_ups
            .iter_mut()
            .find(|p| p.collider == Some(collider))
        else {
            return;
        };
        // take() makes collection idempotent: a second contact in the same
        // step finds the power-up already consumed.
        let Some(body) = power_up.body.take() else {
            return;
        };
        power_up.collider = None;
        power_up.respawn_in = params.power_up_respawn;
        self.physics.remove_body(body);

        self.creatures[index].restore_health(params.power_up_restore);
        sink.record(time, SimulationEvent::PowerUpCollected { id: creature_id });
    }

    fn tick_power_ups(&mut self, dt: f32, params: &Params, rng: &mut impl Rng) {
        for i in 0..self.power_ups.len() {
            if self.power_ups[i].body.is_some() {
                continue;
            }
            self.power_ups[i].respawn_in -= dt;
            if self.power_ups[i].respawn_in <= 0.0 {
                self.power_ups[i] = self.spawn_power_up(params, rng);
            }
        }
    }

    /// Updates every tracked creature, including fading corpses. A
    /// creature whose composite left the world, or whose update fails, is
    /// evicted; the rest of the frame continues.
    fn update_creatures(
        &mut self,
        dt: f32,
        params: &Params,
        time: f64,
        sink: &mut dyn EventSink,
    ) {
        let Self {
            creatures, physics, ..
        } = self;
        for creature in creatures.iter_mut() {
            let was_alive = creature.is_alive();
            if was_alive && !creature.composite_present(physics) {
                log::warn!("creature {} lost its body; evicting", creature.id);
                creature.cull();
                creature.despawn(physics);
                sink.record(time, SimulationEvent::Death { id: creature.id });
                continue;
            }
            if let Err(error) = creature.update(dt, params, physics) {
                log::warn!("creature update failed: {error}; evicting");
                creature.cull();
                creature.despawn(physics);
                sink.record(time, SimulationEvent::Death { id: creature.id });
                continue;
            }
            if was_alive && !creature.is_alive() {
                let event = match creature.state() {
                    LifeState::Dead {
                        cause: DeathCause::Starvation,
                        ..
                    } => SimulationEvent::Starved { id: creature.id },
                    _ => SimulationEvent::Death { id: creature.id },
                };
                sink.record(time, event);
            }
        }
    }

    /// Pulls gripper-flagged segments gently toward the nearest other
    /// creature.
    fn apply_gripper_pull(&mut self, params: &Params) {
        let centroids: Vec<(u64, [f32; 2])> = self
            .creatures
            .iter()
            .filter(|c| c.is_alive())
            .map(|c| (c.id, c.last_centroid()))
            .collect();
        let Self {
            creatures, physics, ..
        } = self;
        for creature in creatures.iter_mut().filter(|c| c.is_alive()) {
            for (i, segment) in creature.genome.segments.iter().enumerate() {
                if !segment.is_gripper {
                    continue;
                }
                let Some(&handle) = creature.body_handles().get(i) else {
                    continue;
                };
                let Some(body) = physics.bodies.get_mut(handle) else {
                    continue;
                };
                let position = *body.translation();
                let mut nearest: Option<(f32, [f32; 2])> = None;
                for &(other_id, centroid) in &centroids {
                    if other_id == creature.id {
                        continue;
                    }
                    let distance_sq = (centroid[0] - position.x).powi(2)
                        + (centroid[1] - position.y).powi(2);
                    if distance_sq <= params.gripper_range.powi(2)
                        && nearest.is_none_or(|(best, _)| distance_sq < best)
                    {
                        nearest = Some((distance_sq, centroid));
                    }
                }
                if let Some((_, target)) = nearest {
                    let pull = vector![target[0] - position.x, target[1] - position.y];
                    let length = pull.norm();
                    if length > 1.0 {
                        body.apply_impulse(pull / length * params.gripper_pull, true);
                    }
                }
            }
        }
    }

    /// Drops creatures whose death fade has completed.
    fn sweep_removable(&mut self, params: &Params) {
        let Self {
            creatures, physics, ..
        } = self;
        creatures.retain_mut(|creature| {
            if creature.is_removable(params) {
                creature.despawn(physics);
                false
            } else {
                true
            }
        });
    }

    /// Evicts every creature with an incomplete composite and prunes
    /// orphaned constraints; run after a contained engine failure so the
    /// next tick starts from a consistent world.
    fn recover(&mut self) {
        let Self {
            creatures, physics, ..
        } = self;
        for creature in creatures.iter_mut() {
            if !creature.composite_present(physics) {
                creature.cull();
                creature.despawn(physics);
            }
        }
        physics.consistency_pass();
    }

    /// Index of a creature by id.
    pub fn index_of(&self, id: u64) -> Option<usize> {
        self.creatures.iter().position(|c| c.id == id)
    }

    /// Number of living creatures.
    pub fn living_count(&self) -> usize {
        self.creatures.iter().filter(|c| c.is_alive()).count()
    }

    fn collider_body_mass(&self, collider: ColliderHandle) -> f32 {
        self.physics
            .colliders
            .get(collider)
            .and_then(|c| c.parent())
            .and_then(|b| self.physics.bodies.get(b))
            .map_or(0.0, rapier2d::dynamics::RigidBody::mass)
    }
}

/// Two distinct mutable references into the creature registry.
pub(crate) fn pair_mut(creatures: &mut [Creature], i: usize, j: usize) -> (&mut Creature, &mut Creature) {
    assert_ne!(i, j);
    if i < j {
        let (left, right) = creatures.split_at_mut(j);
        (&mut left[i], &mut right[0])
    } else {
        let (left, right) = creatures.split_at_mut(i);
        (&mut right[0], &mut left[j])
    }
}

/// A random position inside the arena, away from the walls.
pub fn random_position(params: &Params, rng: &mut impl Rng) -> [f32; 2] {
    let margin = 40.0;
    [
        rng.random_range(margin..params.arena_width - margin),
        rng.random_range(margin..params.arena_height - margin),
    ]
}
