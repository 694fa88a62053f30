//! Genealogy Engine
//!
//! In-memory family graph with kinship resolution, depth-bounded subtrees,
//! recurring event projection and population statistics. Readers work on
//! immutable snapshots; writers publish a new snapshot per mutation.

pub mod config;
pub mod date;
pub mod error;
pub mod graph;
pub mod names;
pub mod persistence;
pub mod person;
pub mod queries;
pub mod store;
pub mod synthetic;

pub use config::EngineConfig;
pub use date::{PartialDate, ZodiacSign};
pub use error::{GenealogyError, Result};
pub use graph::{build_snapshot, GraphSnapshot, IssueKind, ValidationIssue, ValidationReport};
pub use person::{Person, PersonId, RawPerson, Sex};
pub use queries::*;
pub use store::SnapshotStore;
pub use synthetic::{generate_population, PopulationSpec};
