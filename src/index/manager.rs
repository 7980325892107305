//! Multi-field range index
//!
//! # API
//!
//! - `add_field(field, data_type, name)` - bind a field to its own namespace
//! - `add_doc(doc_id, field)` - index the document's current value
//! - `delete(doc_id, field)` - remove the rows written by `add_doc`
//! - `search(filters)` - evaluate filters into one polarized result
//!
//! # Locking
//!
//! One reader-writer lock per field slot. Mutations hold the slot exclusively
//! for the store write; a search holds it shared only while scanning that one
//! field, so a multi-field search is not a cross-field snapshot.

use std::ops::ControlFlow;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use parking_lot::RwLock;
use tracing::{debug, error, info};

use super::codec::{self, parse_doc_id, prefix_key, range_end_key, tokens};
use super::errors::{display_key, IndexError, IndexResult};
use super::field::{DataType, FieldDescriptor, ValueCategory};
use super::filter::{FilterInfo, FilterOperator};
use super::result::{MultiRangeQueryResults, RangeQueryResult};
use crate::config::IndexConfig;
use crate::storage::{NamespaceId, StorageManager};
use crate::table::{DocId, FieldId, Table};

/// Registered state of one field.
#[derive(Debug)]
struct FieldSlot {
    descriptor: FieldDescriptor,
    namespace: NamespaceId,
    added: AtomicU64,
    deleted: AtomicU64,
}

/// Counters for one registered field.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FieldStats {
    /// Successful `add_doc` calls
    pub added: u64,
    /// Successful `delete` calls
    pub deleted: u64,
    /// Rows currently stored in the field's namespace
    pub rows: usize,
}

/// Output of one search call.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SearchOutcome {
    /// Always exactly one combined result
    pub results: MultiRangeQueryResults,
    /// Rows visited while scanning, not the result cardinality
    pub scanned: u64,
}

/// A filter after token expansion and boundary preparation.
enum Scan {
    /// Numeric rows with `start <= key < end`
    Range {
        field: FieldId,
        start: Vec<u8>,
        end: Vec<u8>,
        exclude: bool,
    },
    /// Textual rows under each `token ":"` prefix
    Tokens {
        field: FieldId,
        tokens: Vec<Vec<u8>>,
        exclude: bool,
    },
    /// Boundary adjustment left the domain; nothing can match
    Empty,
}

/// Range index over every scalar field of one table.
pub struct MultiFieldRangeIndex {
    table: Arc<dyn Table>,
    storage: Arc<dyn StorageManager>,
    config: IndexConfig,
    slots: Vec<RwLock<Option<FieldSlot>>>,
}

impl MultiFieldRangeIndex {
    /// Creates an index with default settings and one slot per table field.
    pub fn new(table: Arc<dyn Table>, storage: Arc<dyn StorageManager>) -> Self {
        Self::with_config(table, storage, IndexConfig::default())
    }

    pub fn with_config(
        table: Arc<dyn Table>,
        storage: Arc<dyn StorageManager>,
        config: IndexConfig,
    ) -> Self {
        let slots = (0..table.field_count()).map(|_| RwLock::new(None)).collect();
        Self {
            table,
            storage,
            config,
            slots,
        }
    }

    /// Number of field slots.
    pub fn field_count(&self) -> usize {
        self.slots.len()
    }

    /// Registers `field` and binds it to namespace `"<prefix>:<field>"`.
    ///
    /// Returns the namespace id. A field can be registered once per index.
    pub fn add_field(
        &self,
        field: FieldId,
        data_type: DataType,
        name: &str,
    ) -> IndexResult<NamespaceId> {
        let slot = self
            .slots
            .get(field)
            .ok_or_else(|| IndexError::FieldOutOfRange {
                field,
                field_count: self.slots.len(),
            })?;
        let descriptor =
            FieldDescriptor::new(field, data_type, name, self.config.text_delimiter)
                .ok_or(IndexError::UnsupportedType { field, data_type })?;

        let mut slot = slot.write();
        if slot.is_some() {
            return Err(IndexError::FieldAlreadyRegistered(field));
        }

        let namespace_name = self.config.namespace_name(field);
        let namespace = self
            .storage
            .create_namespace(&namespace_name)
            .map_err(|source| {
                error!(field, namespace = %namespace_name, error = %source, "create namespace failed");
                IndexError::NamespaceCreation {
                    name: namespace_name.clone(),
                    source,
                }
            })?;

        info!(
            field,
            name,
            data_type = data_type.type_name(),
            namespace = %namespace_name,
            namespace_id = namespace,
            "registered scalar range index"
        );

        *slot = Some(FieldSlot {
            descriptor,
            namespace,
            added: AtomicU64::new(0),
            deleted: AtomicU64::new(0),
        });
        Ok(namespace)
    }

    /// Descriptor of a registered field.
    pub fn descriptor(&self, field: FieldId) -> Option<FieldDescriptor> {
        self.slots
            .get(field)?
            .read()
            .as_ref()
            .map(|slot| slot.descriptor.clone())
    }

    /// Ids of every registered field, ascending.
    pub fn registered_fields(&self) -> Vec<FieldId> {
        self.slots
            .iter()
            .enumerate()
            .filter(|(_, slot)| slot.read().is_some())
            .map(|(field, _)| field)
            .collect()
    }

    /// Counters of a registered field.
    pub fn field_stats(&self, field: FieldId) -> IndexResult<Option<FieldStats>> {
        let Some(slot) = self.slots.get(field) else {
            return Ok(None);
        };
        let slot = slot.read();
        let Some(slot) = slot.as_ref() else {
            return Ok(None);
        };
        let rows = self
            .storage
            .row_count(slot.namespace)
            .map_err(|source| IndexError::ReadFailed { field, source })?;
        Ok(Some(FieldStats {
            added: slot.added.load(Ordering::Relaxed),
            deleted: slot.deleted.load(Ordering::Relaxed),
            rows,
        }))
    }

    fn category(&self, field: FieldId) -> Option<ValueCategory> {
        self.slots
            .get(field)?
            .read()
            .as_ref()
            .map(|slot| slot.descriptor.category)
    }

    /// Row keys for the document's current value of `field`.
    fn document_keys(
        &self,
        doc_id: DocId,
        field: FieldId,
        category: &ValueCategory,
    ) -> IndexResult<Vec<Vec<u8>>> {
        let raw = self.table.raw_value(doc_id, field)?;
        codec::row_keys(category, &raw, doc_id).ok_or(IndexError::InvalidValue {
            doc_id,
            field,
            len: raw.len(),
            expected: category.width().unwrap_or(0),
        })
    }

    /// Indexes the document's current value of `field`.
    ///
    /// Unregistered fields are a successful no-op.
    pub fn add_doc(&self, doc_id: DocId, field: FieldId) -> IndexResult<()> {
        let Some(category) = self.category(field) else {
            return Ok(());
        };
        let keys = self.document_keys(doc_id, field, &category)?;
        let value = codec::row_value(doc_id);

        let slot = self.slots[field].write();
        let Some(slot) = slot.as_ref() else {
            return Ok(());
        };
        for key in &keys {
            self.storage
                .put(slot.namespace, key, &value)
                .map_err(|source| {
                    let key = display_key(key);
                    error!(field, doc_id, key = %key, error = %source, "scalar index put failed");
                    IndexError::WriteFailed { key, source }
                })?;
        }
        slot.added.fetch_add(1, Ordering::Relaxed);
        Ok(())
    }

    /// Removes the rows `add_doc` wrote for the document's current value.
    ///
    /// Must run before the table value changes: an update is delete, then
    /// table write, then `add_doc`. Unregistered fields are a successful
    /// no-op.
    pub fn delete(&self, doc_id: DocId, field: FieldId) -> IndexResult<()> {
        let Some(category) = self.category(field) else {
            return Ok(());
        };
        let keys = self.document_keys(doc_id, field, &category)?;

        let slot = self.slots[field].write();
        let Some(slot) = slot.as_ref() else {
            return Ok(());
        };
        for key in &keys {
            self.storage.delete(slot.namespace, key).map_err(|source| {
                let key = display_key(key);
                error!(field, doc_id, key = %key, error = %source, "scalar index delete failed");
                IndexError::WriteFailed { key, source }
            })?;
        }
        slot.deleted.fetch_add(1, Ordering::Relaxed);
        Ok(())
    }

    /// Indexes every registered field of a document, stopping at the first
    /// failure.
    pub fn index_document(&self, doc_id: DocId) -> IndexResult<()> {
        for field in self.registered_fields() {
            self.add_doc(doc_id, field)?;
        }
        Ok(())
    }

    /// Removes a document from every registered field, stopping at the first
    /// failure.
    pub fn remove_document(&self, doc_id: DocId) -> IndexResult<()> {
        for field in self.registered_fields() {
            self.delete(doc_id, field)?;
        }
        Ok(())
    }

    /// Evaluates `filters` into a single polarized result.
    pub fn search(&self, filters: &[FilterInfo]) -> IndexResult<SearchOutcome> {
        let mut results = MultiRangeQueryResults::new();
        let scanned = self.search_into(filters, &mut results)?;
        Ok(SearchOutcome { results, scanned })
    }

    /// Like [`search`](Self::search), writing into a caller-owned list.
    ///
    /// `out` is cleared first and stays empty on failure. Returns the number
    /// of rows visited.
    ///
    /// Every non-`Not` filter feeds one shared included set (a union); `Not`
    /// filters feed the excluded set. Intersection across fields is left to
    /// the caller, by combining separate search results.
    pub fn search_into(
        &self,
        filters: &[FilterInfo],
        out: &mut MultiRangeQueryResults,
    ) -> IndexResult<u64> {
        out.clear();

        let expanded = self.expand(filters)?;
        let scans = expanded
            .iter()
            .map(|(category, filter)| prepare(category, filter))
            .collect::<IndexResult<Vec<_>>>()?;

        let mut included = RangeQueryResult::new();
        let mut excluded = RangeQueryResult::not_in();
        let mut scanned = 0u64;

        for scan in &scans {
            match scan {
                Scan::Range {
                    field,
                    start,
                    end,
                    exclude,
                } => {
                    let target = if *exclude { &mut excluded } else { &mut included };
                    scanned += self.scan_range(*field, start, end, target)?;
                }
                Scan::Tokens {
                    field,
                    tokens,
                    exclude,
                } => {
                    let target = if *exclude { &mut excluded } else { &mut included };
                    scanned += self.scan_tokens(*field, tokens, target)?;
                }
                Scan::Empty => {}
            }
        }

        let result = match (included.is_empty(), excluded.is_empty()) {
            (false, false) => {
                included.intersection_with_not_in(&excluded);
                included
            }
            (true, false) => excluded,
            _ => included,
        };

        debug!(
            filters = filters.len(),
            scans = scans.len(),
            scanned,
            matched = result.len(),
            not_in = result.is_not_in(),
            "scalar range search"
        );

        out.add(result);
        Ok(scanned)
    }

    /// Resolves every filter's field and splits textual `And` filters into
    /// one filter per token. Fails before any scan if a field is unknown.
    fn expand(&self, filters: &[FilterInfo]) -> IndexResult<Vec<(ValueCategory, FilterInfo)>> {
        let mut expanded = Vec::with_capacity(filters.len());
        for filter in filters {
            let Some(category) = self.category(filter.field) else {
                debug!(field = filter.field, "search on unregistered field");
                return Err(IndexError::FieldNotRegistered(filter.field));
            };

            match category {
                ValueCategory::Textual { delimiter } if filter.operator == FilterOperator::And => {
                    for token in tokens(&filter.lower_value, delimiter) {
                        let mut split = filter.clone();
                        split.lower_value = token.to_vec();
                        expanded.push((category, split));
                    }
                }
                _ => expanded.push((category, filter.clone())),
            }
        }
        Ok(expanded)
    }

    fn scan_range(
        &self,
        field: FieldId,
        start: &[u8],
        end: &[u8],
        target: &mut RangeQueryResult,
    ) -> IndexResult<u64> {
        let slot = self.slots[field].read();
        let slot = slot.as_ref().ok_or(IndexError::FieldNotRegistered(field))?;

        let mut visited = 0u64;
        let mut corrupt = None;
        self.storage
            .scan_from(slot.namespace, start, &mut |key, value| {
                if key >= end {
                    return ControlFlow::Break(());
                }
                visited += 1;
                match parse_doc_id(value) {
                    Some(doc_id) => {
                        target.add(doc_id);
                        ControlFlow::Continue(())
                    }
                    None => {
                        corrupt = Some(display_key(key));
                        ControlFlow::Break(())
                    }
                }
            })
            .map_err(|source| IndexError::ReadFailed { field, source })?;

        match corrupt {
            Some(key) => Err(IndexError::CorruptRow { field, key }),
            None => Ok(visited),
        }
    }

    fn scan_tokens(
        &self,
        field: FieldId,
        tokens: &[Vec<u8>],
        target: &mut RangeQueryResult,
    ) -> IndexResult<u64> {
        let slot = self.slots[field].read();
        let slot = slot.as_ref().ok_or(IndexError::FieldNotRegistered(field))?;

        let mut visited = 0u64;
        let mut corrupt = None;
        for token in tokens {
            let prefix = prefix_key(token);
            self.storage
                .scan_from(slot.namespace, &prefix, &mut |key, value| {
                    if !key.starts_with(&prefix) {
                        return ControlFlow::Break(());
                    }
                    visited += 1;
                    // A longer token that itself contains ':' shares this prefix.
                    if parse_doc_id(&key[prefix.len()..]).is_none() {
                        return ControlFlow::Continue(());
                    }
                    match parse_doc_id(value) {
                        Some(doc_id) => {
                            target.add(doc_id);
                            ControlFlow::Continue(())
                        }
                        None => {
                            corrupt = Some(display_key(key));
                            ControlFlow::Break(())
                        }
                    }
                })
                .map_err(|source| IndexError::ReadFailed { field, source })?;

            if let Some(key) = corrupt.take() {
                return Err(IndexError::CorruptRow { field, key });
            }
        }
        Ok(visited)
    }
}

/// Turns one expanded filter into scan bounds.
fn prepare(category: &ValueCategory, filter: &FilterInfo) -> IndexResult<Scan> {
    let exclude = filter.operator == FilterOperator::Not;
    match *category {
        ValueCategory::Textual { delimiter } => Ok(Scan::Tokens {
            field: filter.field,
            tokens: tokens(&filter.lower_value, delimiter)
                .map(|t| t.to_vec())
                .collect(),
            exclude,
        }),
        _ => prepare_numeric(category, filter, exclude),
    }
}

/// Exclusive bounds are tightened on the raw value (lower + 1, upper - 1) so
/// both ends of the scan are inclusive.
fn prepare_numeric(
    category: &ValueCategory,
    filter: &FilterInfo,
    exclude: bool,
) -> IndexResult<Scan> {
    for bound in [&filter.lower_value, &filter.upper_value] {
        if !category.accepts(bound) {
            return Err(IndexError::InvalidBoundary {
                field: filter.field,
                len: bound.len(),
                expected: category.width().unwrap_or(0),
            });
        }
    }

    let lower = if filter.include_lower {
        Some(filter.lower_value.clone())
    } else {
        category.adjust_boundary(&filter.lower_value, 1)
    };
    let upper = if filter.include_upper {
        Some(filter.upper_value.clone())
    } else {
        category.adjust_boundary(&filter.upper_value, -1)
    };

    let encoded = lower
        .zip(upper)
        .and_then(|(lower, upper)| Some((category.encode(&lower)?, category.encode(&upper)?)));
    let Some((lower, upper)) = encoded else {
        return Ok(Scan::Empty);
    };

    let start = prefix_key(&lower);
    let end = range_end_key(&upper);
    if start >= end {
        return Ok(Scan::Empty);
    }
    Ok(Scan::Range {
        field: filter.field,
        start,
        end,
        exclude,
    })
}
