//! Error types for the DAG engine

use thiserror::Error;
use uuid::Uuid;

use crate::types::CType;

/// Result type alias using EngineError
pub type Result<T> = std::result::Result<T, EngineError>;

/// Contract violations of the type/value model
///
/// These are programming errors (building an untyped empty collection,
/// parsing into a type that has no raw form), not user input errors.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum TypeError {
    /// A list or map was built from zero elements without an explicit type
    #[error("{kind} cannot be empty")]
    EmptyCollection { kind: &'static str },

    /// An element does not match the collection's declared type
    #[error("Element type mismatch: expected {expected}, found {found}")]
    ElementTypeMismatch { expected: CType, found: CType },

    /// The type has no raw string form
    #[error("Unsupported type: {0}")]
    UnsupportedType(CType),

    /// A raw string could not be read as the requested primitive
    #[error("Invalid {ty} literal: '{raw}'")]
    InvalidLiteral { ty: CType, raw: String },
}

/// Errors reported by a backend collaborator
#[derive(Debug, Clone, Error)]
pub enum BackendError {
    /// The requested resource does not exist
    #[error("Not found: {0}")]
    NotFound(String),

    /// The backend could not be reached
    #[error("Transport error: {0}")]
    Transport(String),

    /// The backend answered with a non-success status
    #[error("Backend returned {code}: {message}")]
    Status { code: u16, message: String },

    /// The backend answer could not be decoded
    #[error("Decode error: {0}")]
    Decode(String),
}

/// Errors that can occur in the DAG engine
#[derive(Debug, Error)]
pub enum EngineError {
    /// Type/value contract violation
    #[error("Type error: {0}")]
    Type(#[from] TypeError),

    /// A rendered node id is missing from the projection (a defect)
    #[error("Node with id {0} not found, this is a bug and should never happen")]
    MissingNode(Uuid),

    /// Data node id not present in the DAG
    #[error("Unknown data node: {0}")]
    UnknownData(Uuid),

    /// No DAG has been loaded into the store yet
    #[error("No DAG loaded")]
    NoDagLoaded,

    /// A DAG name that sanitizes to nothing
    #[error("Invalid DAG name '{0}': DAG name cannot be empty")]
    InvalidDagName(String),

    /// Backend collaborator error
    #[error("Backend error: {0}")]
    Backend(#[from] BackendError),

    /// Serialization error
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}
