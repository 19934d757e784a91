//! Genome interchange: a plain JSON document mirroring the genome shape,
//! used for export and import.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::error::InterchangeError;
use super::genome::Genome;

/// The on-disk shape of an exported genome.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GenomeDocument {
    /// Wall-clock time of export; absent on hand-written documents.
    #[serde(default)]
    pub exported_at: Option<DateTime<Utc>>,
    /// The genome itself.
    pub genome: Genome,
}

/// Serializes a genome into a pretty-printed JSON document.
pub fn export(genome: &Genome) -> Result<String, InterchangeError> {
    let document = GenomeDocument {
        exported_at: Some(Utc::now()),
        genome: genome.clone(),
    };
    Ok(serde_json::to_string_pretty(&document)?)
}

/// Parses and validates a genome document.
///
/// Malformed JSON and structurally inconsistent genomes (weight-matrix
/// shape, out-of-range segment references) are both reported as
/// recoverable errors.
pub fn import(document: &str) -> Result<Genome, InterchangeError> {
    let document: GenomeDocument = serde_json::from_str(document)?;
    document
        .genome
        .validate()
        .map_err(InterchangeError::Invalid)?;
    Ok(document.genome)
}
