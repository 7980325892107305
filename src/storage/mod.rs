//! Storage Manager for the scalar index
//!
//! The index writes into a shared sorted key-value store partitioned into
//! namespaces. Each namespace is an independently ordered key space; keys are
//! compared as plain bytes.
//!
//! # Engines
//!
//! - [`MemoryStorage`]: `BTreeMap` per namespace, nothing persisted
//! - [`LogStorage`]: same ordering, every mutation appended to a
//!   checksummed log and replayed on open
//!
//! # Invariants
//!
//! - A single `put` or `delete` is atomic with respect to concurrent scans
//! - Namespace ids are stable for the life of the store
//! - Creating an existing namespace name returns the existing id

mod checksum;
mod durable;
mod errors;
mod memory;
mod record;

use std::ops::ControlFlow;

pub use checksum::{compute_checksum, verify_checksum};
pub use durable::{LogStorage, LOG_FILE};
pub use errors::{Severity, StorageError, StorageErrorCode, StorageResult};
pub use memory::MemoryStorage;
pub use record::LogRecord;

/// Identifier of a namespace inside one store
pub type NamespaceId = u32;

/// Sorted, namespaced key-value store shared by every indexed field.
pub trait StorageManager: Send + Sync {
    /// Creates (or returns the existing) namespace called `name`.
    fn create_namespace(&self, name: &str) -> StorageResult<NamespaceId>;

    /// Returns the name bound to `id`.
    fn namespace_name(&self, id: NamespaceId) -> StorageResult<String>;

    /// Lists every namespace in id order.
    fn namespaces(&self) -> Vec<(NamespaceId, String)>;

    /// Writes one row, replacing any previous value.
    fn put(&self, namespace: NamespaceId, key: &[u8], value: &[u8]) -> StorageResult<()>;

    /// Removes one row. Removing an absent key succeeds.
    fn delete(&self, namespace: NamespaceId, key: &[u8]) -> StorageResult<()>;

    /// Visits rows in ascending key order starting at the first key `>= start`
    /// until the visitor breaks or the namespace is exhausted.
    fn scan_from(
        &self,
        namespace: NamespaceId,
        start: &[u8],
        visit: &mut dyn FnMut(&[u8], &[u8]) -> ControlFlow<()>,
    ) -> StorageResult<()>;

    /// Number of rows currently in the namespace.
    fn row_count(&self, namespace: NamespaceId) -> StorageResult<usize>;
}
