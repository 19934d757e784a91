//! Creature module: live, physically simulated instances built from genomes.

mod creature;
mod motor;
mod senses;

pub use creature::{Creature, DeathCause, LifeState};
pub use motor::JointMotor;
pub use senses::{CreatureObservation, VisibilitySnapshot};
