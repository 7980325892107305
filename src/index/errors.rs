//! Index error types
//!
//! Error codes:
//! - SCALAR_FIELD_NOT_REGISTERED: search referenced a field with no index
//! - SCALAR_FIELD_OUT_OF_RANGE: field id beyond the schema's slot table
//! - SCALAR_FIELD_ALREADY_REGISTERED
//! - SCALAR_UNSUPPORTED_TYPE
//! - SCALAR_INVALID_VALUE / SCALAR_INVALID_BOUNDARY: numeric width mismatch
//! - SCALAR_INDEX_WRITE_FAILED: store put/delete failed
//! - SCALAR_NAMESPACE_CREATE_FAILED
//! - SCALAR_INDEX_READ_FAILED: store scan failed
//! - SCALAR_CORRUPT_ROW: row value is not a decimal document id
//! - table errors keep their own codes

use thiserror::Error;

use super::field::DataType;
use crate::storage::StorageError;
use crate::table::{DocId, FieldId, TableError};

/// Result type for index operations
pub type IndexResult<T> = Result<T, IndexError>;

/// Scalar index errors
#[derive(Debug, Error)]
pub enum IndexError {
    #[error("Field {0} has no range index")]
    FieldNotRegistered(FieldId),

    #[error("Field {field} is outside the schema ({field_count} fields)")]
    FieldOutOfRange { field: FieldId, field_count: usize },

    #[error("Field {0} is already registered")]
    FieldAlreadyRegistered(FieldId),

    #[error("Field {field} has type {} which cannot be range indexed", .data_type.type_name())]
    UnsupportedType { field: FieldId, data_type: DataType },

    #[error("Document {doc_id} has a {len}-byte value for field {field}, expected {expected}")]
    InvalidValue {
        doc_id: DocId,
        field: FieldId,
        len: usize,
        expected: usize,
    },

    #[error("Filter on field {field} has a {len}-byte boundary, expected {expected}")]
    InvalidBoundary {
        field: FieldId,
        len: usize,
        expected: usize,
    },

    #[error("Index write failed for key {key}")]
    WriteFailed {
        key: String,
        #[source]
        source: StorageError,
    },

    #[error("Failed to create namespace {name}")]
    NamespaceCreation {
        name: String,
        #[source]
        source: StorageError,
    },

    #[error("Failed to scan field {field}")]
    ReadFailed {
        field: FieldId,
        #[source]
        source: StorageError,
    },

    #[error("Row {key} in field {field} does not hold a document id")]
    CorruptRow { field: FieldId, key: String },

    #[error(transparent)]
    Table(#[from] TableError),
}

impl IndexError {
    /// Stable error code
    pub fn code(&self) -> &'static str {
        match self {
            IndexError::FieldNotRegistered(_) => "SCALAR_FIELD_NOT_REGISTERED",
            IndexError::FieldOutOfRange { .. } => "SCALAR_FIELD_OUT_OF_RANGE",
            IndexError::FieldAlreadyRegistered(_) => "SCALAR_FIELD_ALREADY_REGISTERED",
            IndexError::UnsupportedType { .. } => "SCALAR_UNSUPPORTED_TYPE",
            IndexError::InvalidValue { .. } => "SCALAR_INVALID_VALUE",
            IndexError::InvalidBoundary { .. } => "SCALAR_INVALID_BOUNDARY",
            IndexError::WriteFailed { .. } => "SCALAR_INDEX_WRITE_FAILED",
            IndexError::NamespaceCreation { .. } => "SCALAR_NAMESPACE_CREATE_FAILED",
            IndexError::ReadFailed { .. } => "SCALAR_INDEX_READ_FAILED",
            IndexError::CorruptRow { .. } => "SCALAR_CORRUPT_ROW",
            IndexError::Table(e) => e.code(),
        }
    }
}

/// Renders a store key for logs and errors: printable ASCII verbatim, other
/// bytes as `\xNN`.
pub fn display_key(key: &[u8]) -> String {
    key.escape_ascii().to_string()
}
