//! Aggregate statistics pushed periodically to the event sink.

use serde::{Deserialize, Serialize};

/// A point-in-time summary of the simulation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StatsSnapshot {
    /// Current generation number.
    pub generation: u32,
    /// Total simulated seconds since the run began (never resets).
    pub sim_time: f64,
    /// Number of living creatures.
    pub living: usize,
    /// Best fitness in the population as of the last write-back.
    pub best_fitness: f32,
    /// Average fitness in the population as of the last write-back.
    pub avg_fitness: f32,
    /// Id and age of the oldest living creature, if any.
    pub oldest: Option<(u64, f64)>,
}
