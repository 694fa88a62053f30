//! Error types for engine operations

use thiserror::Error;

use crate::person::PersonId;

/// Errors that can leave the engine. Soft data problems are never errors;
/// they are collected into a `ValidationReport` instead.
#[derive(Error, Debug)]
pub enum GenealogyError {
    /// Two records share an id; the snapshot is rejected wholesale
    #[error("duplicate person id {0}")]
    DuplicateId(PersonId),

    /// A query referenced an id that is not in the snapshot
    #[error("person {0} not found")]
    NotFound(PersonId),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("binary encoding error: {0}")]
    Bincode(#[from] bincode::Error),

    #[error("unsupported record batch version: {0}")]
    UnsupportedVersion(u8),

    #[error("configuration error: {0}")]
    Config(String),
}

pub type Result<T> = std::result::Result<T, GenealogyError>;
