//! Record batch interchange
//!
//! Versioned JSON and bincode encodings of the raw record list. This is the
//! hand-off point with the storage layer: the engine never touches files.

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{GenealogyError, Result};
use crate::graph::GraphSnapshot;
use crate::person::RawPerson;

pub const BATCH_VERSION: u8 = 1;

/// Complete record list with a schema version for forward compatibility
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecordBatch {
    pub version: u8,
    pub people: Vec<RawPerson>,
}

impl RecordBatch {
    pub fn new(people: Vec<RawPerson>) -> Self {
        Self {
            version: BATCH_VERSION,
            people,
        }
    }

    fn into_people(self) -> Result<Vec<RawPerson>> {
        if self.version != BATCH_VERSION {
            return Err(GenealogyError::UnsupportedVersion(self.version));
        }
        Ok(self.people)
    }
}

/// Loaders may hand over a versioned batch or a bare array of records
#[derive(Deserialize)]
#[serde(untagged)]
enum JsonInput {
    Batch(RecordBatch),
    Bare(Vec<RawPerson>),
}

pub fn import_json(json: &str) -> Result<Vec<RawPerson>> {
    let people = match serde_json::from_str::<JsonInput>(json) {
        Ok(JsonInput::Batch(batch)) => batch.into_people()?,
        Ok(JsonInput::Bare(people)) => people,
        // Re-parse as a batch to surface a useful error message
        Err(_) => serde_json::from_str::<RecordBatch>(json)?.into_people()?,
    };
    debug!("Imported {} records from JSON", people.len());
    Ok(people)
}

pub fn export_json(records: &[RawPerson]) -> Result<String> {
    Ok(serde_json::to_string(&RecordBatch::new(records.to_vec()))?)
}

pub fn import_bincode(bytes: &[u8]) -> Result<Vec<RawPerson>> {
    let batch: RecordBatch = bincode::deserialize(bytes)?;
    let people = batch.into_people()?;
    debug!("Imported {} records from bincode ({} bytes)", people.len(), bytes.len());
    Ok(people)
}

pub fn export_bincode(records: &[RawPerson]) -> Result<Vec<u8>> {
    Ok(bincode::serialize(&RecordBatch::new(records.to_vec()))?)
}

impl GraphSnapshot {
    /// Export the records backing this snapshot
    pub fn export_json(&self) -> Result<String> {
        export_json(self.records())
    }
}
