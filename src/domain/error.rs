//! Domain-level errors (no external dependencies)

use thiserror::Error;

use crate::domain::entities::RecordId;

/// A linking field that exists but cannot be read as a record id.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum FieldError {
    #[error("record is not an object")]
    NotAnObject,

    #[error("unsupported {kind} value")]
    Unsupported { kind: &'static str },
}

/// Domain errors represent rejected input.
///
/// Only strict mode raises them; the lenient builder absorbs every anomaly
/// into the shape of its output.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DomainError {
    #[error("record {index} has no id")]
    MissingId { index: usize },

    #[error("record {index}: field '{field}': {source}")]
    MalformedField {
        index: usize,
        field: String,
        #[source]
        source: FieldError,
    },

    #[error("duplicate id {id} at records {first} and {second}")]
    DuplicateId {
        id: RecordId,
        first: usize,
        second: usize,
    },

    #[error("cycle detected in hierarchy at id: {0}")]
    CycleDetected(RecordId),
}

/// Result type for domain operations.
pub type DomainResult<T> = Result<T, DomainError>;
