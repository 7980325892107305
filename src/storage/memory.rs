//! In-memory sorted store
//!
//! One `BTreeMap` per namespace, each behind its own lock. The namespace list
//! lock is held only to look up or append a namespace, so a scan on one
//! namespace never blocks writes to another. Namespace ids are dense and
//! assigned in creation order, which the durable engine relies on during
//! replay.

use std::collections::BTreeMap;
use std::ops::{Bound, ControlFlow};
use std::sync::Arc;

use parking_lot::RwLock;

use super::errors::{StorageError, StorageResult};
use super::{NamespaceId, StorageManager};

type Rows = BTreeMap<Vec<u8>, Vec<u8>>;

#[derive(Debug)]
struct Namespace {
    name: String,
    rows: Arc<RwLock<Rows>>,
}

impl Namespace {
    fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            rows: Arc::new(RwLock::new(BTreeMap::new())),
        }
    }
}

/// Sorted key-value store held entirely in memory.
#[derive(Debug, Default)]
pub struct MemoryStorage {
    namespaces: RwLock<Vec<Namespace>>,
}

impl MemoryStorage {
    /// Creates an empty store
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the id bound to `name`, if any.
    pub fn lookup_namespace(&self, name: &str) -> Option<NamespaceId> {
        self.namespaces
            .read()
            .iter()
            .position(|ns| ns.name == name)
            .map(|pos| pos as NamespaceId)
    }

    /// Binds `name` to exactly `id`. Used by log replay, where ids must be
    /// reproduced as originally assigned.
    pub(crate) fn bind_namespace(&self, id: NamespaceId, name: &str) -> StorageResult<()> {
        let mut namespaces = self.namespaces.write();
        if id as usize != namespaces.len() {
            return Err(StorageError::data_corruption(format!(
                "Namespace '{}' replayed with id {} but next id is {}",
                name,
                id,
                namespaces.len()
            )));
        }
        namespaces.push(Namespace::new(name));
        Ok(())
    }

    /// Rows of one namespace. The list lock is released on return.
    fn rows(&self, namespace: NamespaceId) -> StorageResult<Arc<RwLock<Rows>>> {
        self.namespaces
            .read()
            .get(namespace as usize)
            .map(|ns| Arc::clone(&ns.rows))
            .ok_or_else(|| StorageError::unknown_namespace(namespace))
    }
}

impl StorageManager for MemoryStorage {
    fn create_namespace(&self, name: &str) -> StorageResult<NamespaceId> {
        let mut namespaces = self.namespaces.write();
        if let Some(pos) = namespaces.iter().position(|ns| ns.name == name) {
            return Ok(pos as NamespaceId);
        }
        namespaces.push(Namespace::new(name));
        Ok((namespaces.len() - 1) as NamespaceId)
    }

    fn namespace_name(&self, id: NamespaceId) -> StorageResult<String> {
        self.namespaces
            .read()
            .get(id as usize)
            .map(|ns| ns.name.clone())
            .ok_or_else(|| StorageError::unknown_namespace(id))
    }

    fn namespaces(&self) -> Vec<(NamespaceId, String)> {
        self.namespaces
            .read()
            .iter()
            .enumerate()
            .map(|(pos, ns)| (pos as NamespaceId, ns.name.clone()))
            .collect()
    }

    fn put(&self, namespace: NamespaceId, key: &[u8], value: &[u8]) -> StorageResult<()> {
        let rows = self.rows(namespace)?;
        rows.write().insert(key.to_vec(), value.to_vec());
        Ok(())
    }

    fn delete(&self, namespace: NamespaceId, key: &[u8]) -> StorageResult<()> {
        let rows = self.rows(namespace)?;
        rows.write().remove(key);
        Ok(())
    }

    fn scan_from(
        &self,
        namespace: NamespaceId,
        start: &[u8],
        visit: &mut dyn FnMut(&[u8], &[u8]) -> ControlFlow<()>,
    ) -> StorageResult<()> {
        let rows = self.rows(namespace)?;
        let rows = rows.read();
        for (key, value) in rows.range::<[u8], _>((Bound::Included(start), Bound::Unbounded)) {
            if visit(key, value).is_break() {
                break;
            }
        }
        Ok(())
    }

    fn row_count(&self, namespace: NamespaceId) -> StorageResult<usize> {
        let rows = self.rows(namespace)?;
        let count = rows.read().len();
        Ok(count)
    }
}
