//! Concurrent in-memory table
//!
//! Values are stored as the raw bytes the index reads: little-endian fixed
//! width for numeric fields, verbatim bytes for text.

use std::collections::HashMap;

use parking_lot::RwLock;

use super::errors::{TableError, TableResult};
use super::{DocId, FieldId, Table};

/// Row-oriented table kept in memory.
#[derive(Debug)]
pub struct MemoryTable {
    field_count: usize,
    rows: RwLock<HashMap<DocId, Vec<Option<Vec<u8>>>>>,
}

impl MemoryTable {
    /// Creates an empty table with `field_count` columns.
    pub fn new(field_count: usize) -> Self {
        Self {
            field_count,
            rows: RwLock::new(HashMap::new()),
        }
    }

    /// Stores raw bytes for one field of one document.
    pub fn set_raw(&self, doc_id: DocId, field: FieldId, raw: Vec<u8>) -> TableResult<()> {
        if field >= self.field_count {
            return Err(TableError::FieldNotFound { doc_id, field });
        }
        let mut rows = self.rows.write();
        let row = rows
            .entry(doc_id)
            .or_insert_with(|| vec![None; self.field_count]);
        row[field] = Some(raw);
        Ok(())
    }

    pub fn set_i32(&self, doc_id: DocId, field: FieldId, value: i32) -> TableResult<()> {
        self.set_raw(doc_id, field, value.to_le_bytes().to_vec())
    }

    pub fn set_i64(&self, doc_id: DocId, field: FieldId, value: i64) -> TableResult<()> {
        self.set_raw(doc_id, field, value.to_le_bytes().to_vec())
    }

    pub fn set_f32(&self, doc_id: DocId, field: FieldId, value: f32) -> TableResult<()> {
        self.set_raw(doc_id, field, value.to_le_bytes().to_vec())
    }

    pub fn set_f64(&self, doc_id: DocId, field: FieldId, value: f64) -> TableResult<()> {
        self.set_raw(doc_id, field, value.to_le_bytes().to_vec())
    }

    pub fn set_bool(&self, doc_id: DocId, field: FieldId, value: bool) -> TableResult<()> {
        self.set_raw(doc_id, field, vec![value as u8])
    }

    pub fn set_str(&self, doc_id: DocId, field: FieldId, value: &str) -> TableResult<()> {
        self.set_raw(doc_id, field, value.as_bytes().to_vec())
    }

    /// Stores a multi-valued text field joined by `delimiter`.
    pub fn set_strings(
        &self,
        doc_id: DocId,
        field: FieldId,
        values: &[&str],
        delimiter: u8,
    ) -> TableResult<()> {
        let joined = values
            .iter()
            .map(|v| v.as_bytes())
            .collect::<Vec<_>>()
            .join(&delimiter);
        self.set_raw(doc_id, field, joined)
    }

    /// Drops every value of a document. Returns whether it existed.
    pub fn remove_document(&self, doc_id: DocId) -> bool {
        self.rows.write().remove(&doc_id).is_some()
    }

    /// Number of documents with at least one stored value.
    pub fn document_count(&self) -> usize {
        self.rows.read().len()
    }

    /// Ids of every stored document, ascending.
    pub fn document_ids(&self) -> Vec<DocId> {
        let mut ids: Vec<DocId> = self.rows.read().keys().copied().collect();
        ids.sort_unstable();
        ids
    }
}

impl Table for MemoryTable {
    fn field_count(&self) -> usize {
        self.field_count
    }

    fn raw_value(&self, doc_id: DocId, field: FieldId) -> TableResult<Vec<u8>> {
        let rows = self.rows.read();
        let row = rows
            .get(&doc_id)
            .ok_or(TableError::DocumentNotFound(doc_id))?;
        row.get(field)
            .and_then(|value| value.clone())
            .ok_or(TableError::FieldNotFound { doc_id, field })
    }
}
