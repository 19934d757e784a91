//! # Vivarium - Evolving Creature Simulation
//!
//! An artificial-life simulator: populations of procedurally generated,
//! physically simulated creatures move, sense, fight, starve, reproduce,
//! and evolve over unbounded continuous time.
//!
//! ## Features
//!
//! - Genomes encoding jointed bodies (circles and rectangles in a segment
//!   tree), spring joints with sinusoidal motors, and eye/feeler sensors
//! - A sensor-by-joint weight matrix coupling perception into motor
//!   modulation
//! - Sticky-feet locomotion through anti-phase friction modulation
//! - Starvation, impact combat, mouth-to-heart instant kills, power-ups
//! - Elitist evolution with tournament selection, crossover, and mutation
//! - Mid-generation reproduction between well-fed neighbors
//! - rapier2d rigid-body physics with defensive world-consistency checks
//! - JSON genome interchange for export and import
//!
//! ## Core Modules
//!
//! - [`simulation::genome`] - DNA model and genetic operators
//! - [`simulation::creature`] - live creature behavior and lifecycle
//! - [`simulation::arena`] - physics/combat coordination
//! - [`simulation::evolution`] - population-level evolutionary loop
//! - [`simulation::ecosystem`] - the orchestrating tick loop

/// Core simulation logic and data structures.
pub mod simulation {
    /// Physics/combat coordinator: world, walls, obstacles, power-ups,
    /// creature registry.
    pub mod arena;
    /// Live creature behavior, sensing, motors, and lifecycle.
    pub mod creature;
    /// The orchestrating tick loop and user-facing controls.
    pub mod ecosystem;
    /// Error types.
    pub mod error;
    /// Ring-buffer event log (bundled event sink).
    pub mod event_log;
    /// Domain events and the sink trait they are delivered to.
    pub mod events;
    /// Population management and genetic selection.
    pub mod evolution;
    /// DNA model and genetic operators.
    pub mod genome;
    /// Genome JSON export/import.
    pub mod interchange;
    /// Simulation parameters.
    pub mod params;
    /// Bundled rapier2d world state.
    pub mod physics;
    /// Pure-data views for an external renderer.
    pub mod render;
    /// KD-tree spatial queries.
    pub mod spatial;
    /// Aggregate statistics snapshots.
    pub mod stats;
}
