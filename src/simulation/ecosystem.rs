//! Simulation orchestrator.
//!
//! Ties the arena, the evolution manager, and the event sink together:
//! drives the tick loop with an adjustable time scale and physics
//! sub-stepping, refreshes the visibility snapshot once per frame and runs
//! the sense phase in parallel, detects mid-generation reproduction and
//! generation-end conditions, and exposes the user-facing controls.

use rand::rngs::SmallRng;
use rand::{Rng, SeedableRng};
use rayon::prelude::*;

use super::arena::{self, Arena};
use super::creature::{Creature, CreatureObservation, VisibilitySnapshot};
use super::error::InterchangeError;
use super::events::{EventSink, SimulationEvent};
use super::evolution::EvolutionEngine;
use super::interchange;
use super::params::Params;
use super::stats::StatsSnapshot;

/// The running simulation.
pub struct Ecosystem {
    /// Configuration. Mutating it mid-run is allowed; structural fields
    /// (arena size, population size) take effect at the next reset.
    pub params: Params,
    /// Physics/combat coordinator.
    pub arena: Arena,
    /// Evolution manager.
    pub evolution: EvolutionEngine,
    time: f64,
    speed: f32,
    running: bool,
    next_creature_id: u64,
    next_stats_at: f64,
    rng: SmallRng,
}

impl Ecosystem {
    /// Creates a simulation with a random generation-0 population spawned
    /// at random positions.
    pub fn new(params: Params, seed: u64) -> Self {
        let mut rng = SmallRng::seed_from_u64(seed);
        let arena = Arena::new(&params, &mut rng);
        let mut evolution = EvolutionEngine::new(&params);
        evolution.initialize(&mut rng);

        let stats_interval = params.stats_interval;
        let mut ecosystem = Self {
            params,
            arena,
            evolution,
            time: 0.0,
            speed: 1.0,
            running: true,
            next_creature_id: 0,
            next_stats_at: stats_interval,
            rng,
        };
        ecosystem.spawn_missing_slots(&mut super::events::NullSink);
        ecosystem
    }

    /// Total simulated seconds; monotonic, never reset.
    pub fn time(&self) -> f64 {
        self.time
    }

    /// Current generation number.
    pub fn generation(&self) -> u32 {
        self.evolution.generation()
    }

    /// Resumes ticking.
    pub fn start(&mut self) {
        self.running = true;
    }

    /// Stops scheduling further ticks; nothing is cancelled or unwound.
    pub fn pause(&mut self) {
        self.running = false;
    }

    /// Whether the simulation is advancing.
    pub fn is_running(&self) -> bool {
        self.running
    }

    /// Sets the speed multiplier, clamped to the usable range.
    pub fn set_speed(&mut self, speed: f32) {
        self.speed = speed.clamp(Params::SPEED_RANGE.0, Params::SPEED_RANGE.1);
    }

    /// Current speed multiplier.
    pub fn speed(&self) -> f32 {
        self.speed
    }

    /// Sets the target population size, clamped to the usable range;
    /// applied when the population is next rebuilt.
    pub fn set_population_size(&mut self, size: usize) {
        let size = size.clamp(Params::POPULATION_RANGE.0, Params::POPULATION_RANGE.1);
        self.params.population_size = size;
        self.evolution.set_population_size(size);
    }

    /// Advances the simulation by one frame of `real_dt` elapsed seconds.
    ///
    /// The elapsed time is capped (a backgrounded host must not destabilize
    /// physics), scaled by the speed factor, and split into `ceil(speed)`
    /// sub-steps, each individually capped. The visibility snapshot and
    /// sensor activations refresh once per frame, not per sub-step.
    pub fn advance(&mut self, real_dt: f32, sink: &mut dyn EventSink) {
        if !self.running {
            return;
        }
        let capped = real_dt.min(self.params.max_frame_time).max(0.0);
        if capped <= 0.0 {
            return;
        }
        let scaled = capped * self.speed;
        let substeps = (self.speed.ceil() as usize).max(1);
        let sub_dt = (scaled / substeps as f32).min(self.params.max_substep);

        self.refresh_senses();

        for _ in 0..substeps {
            self.time += f64::from(sub_dt);
            self.arena
                .step(sub_dt, &self.params, self.time, &mut self.rng, sink);
        }

        self.check_reproduction(sink);
        self.check_turnover(sink);

        if self.time >= self.next_stats_at {
            sink.stats(&self.snapshot());
            self.next_stats_at = self.time + self.params.stats_interval;
        }
    }

    /// Rebuilds the visibility snapshot and recomputes every creature's
    /// sensor activations. Sensing only reads the snapshot and the world,
    /// so the per-creature work runs in parallel.
    fn refresh_senses(&mut self) {
        let observations: Vec<CreatureObservation> = self
            .arena
            .creatures
            .iter()
            .filter(|c| c.is_alive())
            .map(|c| CreatureObservation {
                id: c.id,
                centroid: c.last_centroid(),
                beauty: c.genome.beauty,
            })
            .collect();
        let snapshot = VisibilitySnapshot::build(observations);

        let Arena {
            creatures, physics, ..
        } = &mut self.arena;
        let physics = &*physics;
        creatures.par_iter_mut().for_each(|creature| {
            creature.update_senses(physics, &snapshot);
        });
    }

    /// Pairwise mate scan. A pair reproduces when both are old enough,
    /// fed, healthy, close, and off cooldown, and the creature cap has
    /// room. Each creature reproduces at most once per scan pass.
    fn check_reproduction(&mut self, sink: &mut dyn EventSink) {
        let now = self.time;
        let creatures = &self.arena.creatures;
        let mut used = vec![false; creatures.len()];
        let mut matings: Vec<(usize, usize)> = Vec::new();

        for i in 0..creatures.len() {
            if used[i] || !creatures[i].can_reproduce(&self.params, now) {
                continue;
            }
            for j in (i + 1)..creatures.len() {
                if used[j] || !creatures[j].can_reproduce(&self.params, now) {
                    continue;
                }
                let a = creatures[i].last_centroid();
                let b = creatures[j].last_centroid();
                let distance = ((a[0] - b[0]).powi(2) + (a[1] - b[1]).powi(2)).sqrt();
                if distance <= self.params.reproduction_radius {
                    used[i] = true;
                    used[j] = true;
                    matings.push((i, j));
                    break;
                }
            }
        }

        for (i, j) in matings {
            if self.arena.creatures.len() >= self.params.max_creatures {
                break;
            }
            let (parent_a, parent_b) = (&self.arena.creatures[i], &self.arena.creatures[j]);
            let (id_a, id_b) = (parent_a.id, parent_b.id);
            let genome = parent_a
                .genome
                .crossover(&parent_b.genome, &mut self.rng)
                .mutated(&mut self.rng, self.params.birth_mutation_rate);
            let (ca, cb) = (parent_a.last_centroid(), parent_b.last_centroid());
            let jitter = self.params.reproduction_jitter;
            let position = [
                ((ca[0] + cb[0]) / 2.0 + self.rng.random_range(-jitter..jitter))
                    .clamp(0.0, self.params.arena_width),
                ((ca[1] + cb[1]) / 2.0 + self.rng.random_range(-jitter..jitter))
                    .clamp(0.0, self.params.arena_height),
            ];

            let slot = self.evolution.add_genome(genome.clone());
            let id = self.next_id();
            let child = Creature::spawn(
                id,
                slot,
                genome,
                position,
                &self.params,
                &mut self.arena.physics,
            );
            self.arena.creatures.push(child);
            self.arena.creatures[i].last_reproduction_time = now;
            self.arena.creatures[j].last_reproduction_time = now;
            sink.record(
                now,
                SimulationEvent::Birth {
                    id,
                    parents: Some((id_a, id_b)),
                },
            );
        }
    }

    /// Generation turnover triggers on population collapse (at most two
    /// creatures left alive), not on elapsed time.
    fn check_turnover(&mut self, sink: &mut dyn EventSink) {
        if self.arena.living_count() <= 2 {
            self.turnover(sink);
        }
    }

    /// Evolves the population and rebuilds the arena around the surviving
    /// elites, which keep their live bodies and accumulated age.
    fn turnover(&mut self, sink: &mut dyn EventSink) {
        self.evolution.update_fitness(&self.arena.creatures);

        let mut survivor_ids: Vec<u64> = self
            .arena
            .creatures
            .iter()
            .filter(|c| c.is_alive())
            .map(|c| c.id)
            .collect();
        survivor_ids.sort_by(|&a, &b| {
            let fitness = |id| {
                self.arena
                    .creatures
                    .iter()
                    .find(|c| c.id == id)
                    .map_or(0.0, Creature::fitness)
            };
            fitness(b)
                .partial_cmp(&fitness(a))
                .unwrap_or(std::cmp::Ordering::Equal)
        });
        survivor_ids.truncate(2);

        {
            let Arena {
                creatures, physics, ..
            } = &mut self.arena;
            creatures.retain_mut(|creature| {
                if survivor_ids.contains(&creature.id) {
                    true
                } else {
                    creature.despawn(physics);
                    false
                }
            });
        }

        self.evolution.evolve_next_generation(&mut self.rng);
        let generation = self.evolution.generation();
        let elite_sources = self.evolution.elite_sources().to_vec();
        let population_len = self.evolution.population().len();

        // Re-point surviving creatures at their newly cloned elite genomes
        // so they pick up the incremented generation stamp while keeping
        // their bodies and ages. A survivor whose genome lost the fitness
        // sort still persists: it takes over an offspring slot instead.
        let mut taken: Vec<usize> = Vec::new();
        for index in 0..self.arena.creatures.len() {
            let old_slot = self.arena.creatures[index].population_slot;
            let new_slot = elite_sources
                .iter()
                .position(|&source| source == old_slot)
                .or_else(|| (0..population_len).rev().find(|slot| !taken.contains(slot)))
                .unwrap_or(0);
            if !elite_sources.contains(&old_slot) {
                let mut displaced = self.arena.creatures[index].genome.clone();
                displaced.generation = generation;
                displaced.fitness = 0.0;
                self.evolution.replace_genome(new_slot, displaced);
            }
            taken.push(new_slot);
            let creature = &mut self.arena.creatures[index];
            creature.population_slot = new_slot;
            if let Some(genome) = self.evolution.genome(new_slot) {
                creature.genome = genome.clone();
            }
        }

        self.arena.reset_features(&self.params, &mut self.rng);
        self.spawn_missing_slots(sink);

        sink.record(
            self.time,
            SimulationEvent::GenerationTurnover {
                generation,
                survivors: survivor_ids.len(),
            },
        );
    }

    /// Spawns a fresh creature at a random position for every population
    /// slot that has no live instance.
    fn spawn_missing_slots(&mut self, sink: &mut dyn EventSink) {
        let occupied: Vec<usize> = self
            .arena
            .creatures
            .iter()
            .map(|c| c.population_slot)
            .collect();
        for slot in 0..self.evolution.population().len() {
            if occupied.contains(&slot) {
                continue;
            }
            let Some(genome) = self.evolution.genome(slot).cloned() else {
                continue;
            };
            let position = arena::random_position(&self.params, &mut self.rng);
            let id = self.next_id();
            let creature = Creature::spawn(
                id,
                slot,
                genome,
                position,
                &self.params,
                &mut self.arena.physics,
            );
            self.arena.creatures.push(creature);
            sink.record(self.time, SimulationEvent::Birth { id, parents: None });
        }
    }

    /// Resets to a fresh generation-0 population. The simulation clock
    /// keeps running; it never resets.
    pub fn reset(&mut self, sink: &mut dyn EventSink) {
        self.despawn_all();
        self.evolution.initialize(&mut self.rng);
        self.arena.reset_features(&self.params, &mut self.rng);
        self.spawn_missing_slots(sink);
    }

    /// Exports the current best genome as a JSON document.
    pub fn export_best(&self) -> Result<String, InterchangeError> {
        let best = self
            .evolution
            .population()
            .iter()
            .max_by(|a, b| {
                a.fitness
                    .partial_cmp(&b.fitness)
                    .unwrap_or(std::cmp::Ordering::Equal)
            })
            .ok_or_else(|| InterchangeError::Invalid("population is empty".into()))?;
        interchange::export(best)
    }

    /// Imports a genome document and reseeds the population from it: one
    /// exact copy plus mutated copies, starting at the imported generation.
    ///
    /// On any error the running simulation is left untouched.
    pub fn import(&mut self, document: &str, sink: &mut dyn EventSink) -> Result<(), InterchangeError> {
        let genome = interchange::import(document)?;
        self.despawn_all();
        self.evolution
            .seed_from(genome, self.params.import_mutation_rate, &mut self.rng);
        self.arena.reset_features(&self.params, &mut self.rng);
        self.spawn_missing_slots(sink);
        Ok(())
    }

    fn despawn_all(&mut self) {
        let Arena {
            creatures, physics, ..
        } = &mut self.arena;
        for creature in creatures.iter_mut() {
            creature.despawn(physics);
        }
        creatures.clear();
    }

    /// Current aggregate statistics.
    pub fn snapshot(&self) -> StatsSnapshot {
        let oldest = self
            .arena
            .creatures
            .iter()
            .filter(|c| c.is_alive())
            .max_by(|a, b| a.age.partial_cmp(&b.age).unwrap_or(std::cmp::Ordering::Equal))
            .map(|c| (c.id, c.age));
        StatsSnapshot {
            generation: self.evolution.generation(),
            sim_time: self.time,
            living: self.arena.living_count(),
            best_fitness: self.evolution.best_fitness(),
            avg_fitness: self.evolution.avg_fitness(),
            oldest,
        }
    }

    fn next_id(&mut self) -> u64 {
        let id = self.next_creature_id;
        self.next_creature_id += 1;
        id
    }
}
