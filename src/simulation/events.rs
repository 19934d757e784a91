//! Domain events and the sink they are delivered to.
//!
//! The simulator never reaches into ambient global state to report what
//! happened: the coordinator and orchestrator are handed an [`EventSink`]
//! and forward discrete domain events (and periodic stats) to it as
//! fire-and-forget notifications.

use super::stats::StatsSnapshot;

/// Discrete domain events produced by the simulation.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum SimulationEvent {
    /// A creature was spawned; `parents` is set for mid-generation births.
    Birth {
        /// Id of the new creature.
        id: u64,
        /// Parent ids, for children of mid-generation reproduction.
        parents: Option<(u64, u64)>,
    },
    /// A creature ran out of food.
    Starved {
        /// Id of the creature that starved.
        id: u64,
    },
    /// One creature killed another.
    Kill {
        /// Id of the killer.
        attacker: u64,
        /// Id of the victim.
        victim: u64,
    },
    /// A creature died without a killer or starvation being responsible.
    Death {
        /// Id of the creature that died.
        id: u64,
    },
    /// Impact damage was dealt.
    Damage {
        /// Id of the creature dealing the damage.
        attacker: u64,
        /// Id of the creature taking the damage.
        victim: u64,
        /// Damage amount after age scaling.
        amount: f32,
    },
    /// A creature collected a power-up.
    PowerUpCollected {
        /// Id of the collecting creature.
        id: u64,
    },
    /// The population evolved into a new generation.
    GenerationTurnover {
        /// The new generation number.
        generation: u32,
        /// How many elite creatures crossed the boundary alive.
        survivors: usize,
    },
}

/// Receiver for domain events and periodic stats.
///
/// Implementations must not assume any delivery beyond "within the tick
/// that produced the event"; the simulation never waits on a sink.
pub trait EventSink {
    /// Delivers one event stamped with the total simulation time.
    fn record(&mut self, time: f64, event: SimulationEvent);

    /// Delivers a periodic aggregate snapshot. Default: ignored.
    fn stats(&mut self, _snapshot: &StatsSnapshot) {}
}

/// A sink that drops everything; useful for tests and headless batch runs.
pub struct NullSink;

impl EventSink for NullSink {
    fn record(&mut self, _time: f64, _event: SimulationEvent) {}
}
