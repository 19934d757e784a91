//! Error types for simulation control and genome interchange.

use thiserror::Error;

/// Errors raised when importing a genome document.
///
/// Import errors are recoverable: the running simulation is left untouched
/// until a valid document is supplied.
#[derive(Debug, Error)]
pub enum InterchangeError {
    /// The document could not be parsed as JSON.
    #[error("malformed genome document: {0}")]
    Parse(#[from] serde_json::Error),
    /// The document parsed but describes an inconsistent genome.
    #[error("invalid genome: {0}")]
    Invalid(String),
}

/// Errors raised while updating a single creature.
///
/// A per-creature failure never aborts the frame; the coordinator evicts
/// the offending creature and continues with the rest.
#[derive(Debug, Error)]
pub enum CreatureError {
    /// One of the creature's rigid bodies is no longer in the world.
    #[error("creature {id}: body for segment {segment} missing from world")]
    MissingBody {
        /// Creature id.
        id: u64,
        /// Segment index whose body vanished.
        segment: usize,
    },
}
