//! Document table collaborator
//!
//! The index never stores field values of its own; it asks the table for the
//! raw bytes of a field whenever a document is inserted or removed.

mod errors;
mod memory;

pub use errors::{TableError, TableResult};
pub use memory::MemoryTable;

/// Document identifier
pub type DocId = u64;

/// Field identifier: the field's position in the schema
pub type FieldId = usize;

/// Source of raw field values.
pub trait Table: Send + Sync {
    /// Total number of fields in the schema.
    fn field_count(&self) -> usize;

    /// Raw bytes of `field` for `doc_id`.
    fn raw_value(&self, doc_id: DocId, field: FieldId) -> TableResult<Vec<u8>>;
}
