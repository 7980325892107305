//! Table error types

use thiserror::Error;

use super::{DocId, FieldId};

/// Result type for table reads
pub type TableResult<T> = Result<T, TableError>;

/// Failures reported by a [`Table`](super::Table) implementation
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TableError {
    #[error("Document not found: {0}")]
    DocumentNotFound(DocId),

    #[error("Field {field} not found for document {doc_id}")]
    FieldNotFound { doc_id: DocId, field: FieldId },
}

impl TableError {
    /// Stable error code
    pub fn code(&self) -> &'static str {
        match self {
            TableError::DocumentNotFound(_) => "SCALAR_TABLE_DOCUMENT_NOT_FOUND",
            TableError::FieldNotFound { .. } => "SCALAR_TABLE_FIELD_NOT_FOUND",
        }
    }
}
