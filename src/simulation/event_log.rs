//! Ring-buffer event log: the bundled [`EventSink`] implementation.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;

use super::events::{EventSink, SimulationEvent};
use super::stats::StatsSnapshot;

/// A logged event for display by a UI collaborator.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggedEvent {
    /// Simulation time when the event occurred.
    pub time: f64,
    /// Wall-clock time the event was recorded.
    pub recorded_at: DateTime<Utc>,
    /// Human-readable description of the event.
    pub description: String,
    /// Category hint for display.
    pub category: EventCategory,
}

/// Display categories for events.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum EventCategory {
    /// Births and reproduction.
    Reproduction,
    /// Combat: damage and kills.
    Combat,
    /// Deaths (starvation and other).
    Death,
    /// Power-up collection.
    Pickup,
    /// Generation turnover.
    Evolution,
}

/// Event log that keeps the most recent simulation events, newest first.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EventLog {
    events: VecDeque<LoggedEvent>,
    max_events: usize,
    /// Latest stats snapshot pushed by the simulation, if any.
    pub latest_stats: Option<StatsSnapshot>,
}

impl Default for EventLog {
    fn default() -> Self {
        Self::new(50)
    }
}

impl EventLog {
    /// Creates a new event log keeping up to `max_events` entries.
    pub fn new(max_events: usize) -> Self {
        Self {
            events: VecDeque::with_capacity(max_events),
            max_events,
            latest_stats: None,
        }
    }

    /// All retained events, newest first.
    pub fn events(&self) -> &VecDeque<LoggedEvent> {
        &self.events
    }

    /// Clears all events.
    pub fn clear(&mut self) {
        self.events.clear();
    }

    fn push(&mut self, time: f64, description: String, category: EventCategory) {
        self.events.push_front(LoggedEvent {
            time,
            recorded_at: Utc::now(),
            description,
            category,
        });
        while self.events.len() > self.max_events {
            self.events.pop_back();
        }
    }
}

impl EventSink for EventLog {
    fn record(&mut self, time: f64, event: SimulationEvent) {
        let (description, category) = match event {
            SimulationEvent::Birth { id, parents: None } => {
                (format!("creature {id} spawned"), EventCategory::Reproduction)
            }
            SimulationEvent::Birth {
                id,
                parents: Some((a, b)),
            } => (
                format!("creature {id} born to {a} and {b}"),
                EventCategory::Reproduction,
            ),
            SimulationEvent::Starved { id } => {
                (format!("creature {id} starved"), EventCategory::Death)
            }
            SimulationEvent::Kill { attacker, victim } => (
                format!("creature {attacker} killed {victim}"),
                EventCategory::Combat,
            ),
            SimulationEvent::Death { id } => {
                (format!("creature {id} died"), EventCategory::Death)
            }
            SimulationEvent::Damage {
                attacker,
                victim,
                amount,
            } => (
                format!("creature {attacker} hit {victim} for {amount:.1}"),
                EventCategory::Combat,
            ),
            SimulationEvent::PowerUpCollected { id } => (
                format!("creature {id} collected a power-up"),
                EventCategory::Pickup,
            ),
            SimulationEvent::GenerationTurnover {
                generation,
                survivors,
            } => (
                format!("generation {generation} begins, {survivors} elites carried over"),
                EventCategory::Evolution,
            ),
        };
        self.push(time, description, category);
    }

    fn stats(&mut self, snapshot: &StatsSnapshot) {
        self.latest_stats = Some(snapshot.clone());
    }
}
