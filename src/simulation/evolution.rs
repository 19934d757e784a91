//! Evolution manager: the population of genomes across generations.
//!
//! Owns the genome array, the generation counter, and the fitness history.
//! Creatures reference their genome by population slot; fitness is written
//! back through that slot, and generation turnover rebuilds the array from
//! elites plus tournament-selected offspring.

use std::cmp::Ordering;

use rand::Rng;
use serde::{Deserialize, Serialize};

use super::creature::Creature;
use super::genome::Genome;
use super::params::Params;

/// Best and average fitness recorded at one fitness write-back.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct GenerationRecord {
    /// Generation the record belongs to.
    pub generation: u32,
    /// Best fitness in the population.
    pub best_fitness: f32,
    /// Mean fitness over the population.
    pub avg_fitness: f32,
}

/// Manages the population of genomes and its evolution.
pub struct EvolutionEngine {
    population: Vec<Genome>,
    generation: u32,
    population_size: usize,
    elite_count: usize,
    tournament_size: usize,
    crossover_rate: f32,
    mutation_rate: f32,
    memory_size: usize,
    history: Vec<GenerationRecord>,
    last_best: f32,
    last_avg: f32,
    last_elite_sources: Vec<usize>,
}

impl EvolutionEngine {
    /// Creates an engine configured from `params`, with an empty
    /// population; call [`initialize`](Self::initialize) or
    /// [`seed_from`](Self::seed_from) before use.
    pub fn new(params: &Params) -> Self {
        Self {
            population: Vec::new(),
            generation: 0,
            population_size: params.population_size,
            elite_count: params.elite_count,
            tournament_size: params.tournament_size,
            crossover_rate: params.crossover_rate,
            mutation_rate: params.mutation_rate,
            memory_size: params.memory_size,
            history: Vec::new(),
            last_best: 0.0,
            last_avg: 0.0,
            last_elite_sources: Vec::new(),
        }
    }

    /// Fills the population with independent random genomes at generation 0.
    pub fn initialize(&mut self, rng: &mut impl Rng) {
        self.population = (0..self.population_size)
            .map(|_| Genome::random(rng, self.memory_size))
            .collect();
        self.generation = 0;
        self.history.clear();
        self.last_best = 0.0;
        self.last_avg = 0.0;
        self.last_elite_sources.clear();
    }

    /// Seeds the population from an imported genome: one exact copy plus
    /// `population_size - 1` copies mutated at `mutation_rate`, starting at
    /// the imported genome's generation.
    pub fn seed_from(&mut self, genome: Genome, mutation_rate: f32, rng: &mut impl Rng) {
        self.generation = genome.generation;
        let mut population = Vec::with_capacity(self.population_size);
        population.push(genome.clone());
        while population.len() < self.population_size {
            let mut copy = genome.mutated(rng, mutation_rate);
            copy.generation = genome.generation;
            copy.fitness = 0.0;
            population.push(copy);
        }
        self.population = population;
        self.history.clear();
        self.last_elite_sources.clear();
    }

    /// The current population.
    pub fn population(&self) -> &[Genome] {
        &self.population
    }

    /// One genome by population slot.
    pub fn genome(&self, slot: usize) -> Option<&Genome> {
        self.population.get(slot)
    }

    /// Current generation number.
    pub fn generation(&self) -> u32 {
        self.generation
    }

    /// Best fitness as of the last write-back.
    pub fn best_fitness(&self) -> f32 {
        self.last_best
    }

    /// Average fitness as of the last write-back.
    pub fn avg_fitness(&self) -> f32 {
        self.last_avg
    }

    /// Fitness history, one record per write-back.
    pub fn history(&self) -> &[GenerationRecord] {
        &self.history
    }

    /// Population slots (pre-evolution indices) the current elite genomes
    /// were cloned from, in elite order.
    pub fn elite_sources(&self) -> &[usize] {
        &self.last_elite_sources
    }

    /// Changes the target population size for future generations.
    pub fn set_population_size(&mut self, size: usize) {
        self.population_size = size;
    }

    /// Target population size.
    pub fn population_size(&self) -> usize {
        self.population_size
    }

    /// Appends a genome mid-generation (a child of live reproduction) and
    /// returns its slot. The genome competes for elite status at the next
    /// turnover like any other.
    pub fn add_genome(&mut self, genome: Genome) -> usize {
        self.population.push(genome);
        self.population.len() - 1
    }

    /// Overwrites one population slot. Used at turnover when a surviving
    /// creature's genome was displaced from the elite set but the creature
    /// itself persists.
    pub fn replace_genome(&mut self, slot: usize, genome: Genome) {
        if let Some(existing) = self.population.get_mut(slot) {
            *existing = genome;
        }
    }

    /// Writes each living creature's fitness back into its population slot
    /// and records best/average over the whole population.
    pub fn update_fitness(&mut self, creatures: &[Creature]) -> (f32, f32) {
        for creature in creatures.iter().filter(|c| c.is_alive()) {
            if let Some(genome) = self.population.get_mut(creature.population_slot) {
                genome.fitness = creature.fitness();
            }
        }
        let best = self
            .population
            .iter()
            .map(|g| g.fitness)
            .fold(0.0f32, f32::max);
        let avg = if self.population.is_empty() {
            0.0
        } else {
            self.population.iter().map(|g| g.fitness).sum::<f32>() / self.population.len() as f32
        };
        self.last_best = best;
        self.last_avg = avg;
        self.history.push(GenerationRecord {
            generation: self.generation,
            best_fitness: best,
            avg_fitness: avg,
        });
        (best, avg)
    }

    /// Evolves the population into the next generation.
    ///
    /// The top `elite_count` genomes by fitness survive verbatim (fitness
    /// reset, generation incremented; the sort is stable so ties keep
    /// array order). The remaining slots are filled by tournament
    /// selection: with probability `crossover_rate` a crossover child of
    /// two independently selected parents, otherwise a clone of one
    /// parent. Every offspring is mutated. The new population has exactly
    /// `population_size` genomes.
    pub fn evolve_next_generation(&mut self, rng: &mut impl Rng) {
        if self.population.is_empty() {
            self.initialize(rng);
            return;
        }
        let next_generation = self.generation + 1;

        let mut order: Vec<usize> = (0..self.population.len()).collect();
        order.sort_by(|&a, &b| {
            self.population[b]
                .fitness
                .partial_cmp(&self.population[a].fitness)
                .unwrap_or(Ordering::Equal)
        });

        let elite_count = self
            .elite_count
            .min(self.population.len())
            .min(self.population_size);
        self.last_elite_sources = order[..elite_count].to_vec();

        let mut next: Vec<Genome> = self
            .last_elite_sources
            .iter()
            .map(|&slot| {
                let mut elite = self.population[slot].clone();
                elite.fitness = 0.0;
                elite.generation = next_generation;
                elite
            })
            .collect();

        while next.len() < self.population_size {
            let child = if rng.random::<f32>() < self.crossover_rate {
                let parent_a = select_parent(&self.population, self.tournament_size, rng);
                let parent_b = select_parent(&self.population, self.tournament_size, rng);
                parent_a.crossover(parent_b, rng)
            } else {
                select_parent(&self.population, self.tournament_size, rng).clone()
            };
            let mut child = child.mutated(rng, self.mutation_rate);
            child.generation = next_generation;
            child.fitness = 0.0;
            next.push(child);
        }

        self.population = next;
        self.generation = next_generation;
    }
}

/// Tournament selection: the best of `tournament_size` candidates drawn
/// with replacement.
///
/// # Panics
///
/// Panics if `population` is empty.
pub fn select_parent<'a>(
    population: &'a [Genome],
    tournament_size: usize,
    rng: &mut impl Rng,
) -> &'a Genome {
    let mut best = &population[rng.random_range(0..population.len())];
    for _ in 1..tournament_size.max(1) {
        let candidate = &population[rng.random_range(0..population.len())];
        if candidate.fitness > best.fitness {
            best = candidate;
        }
    }
    best
}
