//! Concurrent access tests
//!
//! Writers on one field and searches on another share the store without
//! waiting on each other. Each search observes a state where every document
//! is fully present or fully absent, because mutations hold the field lock
//! across all token rows.

use std::ops::ControlFlow;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{mpsc, Arc, Barrier};
use std::thread;
use std::time::Duration;

use scalar_index::index::{parse_doc_id, DEFAULT_DELIMITER};
use scalar_index::storage::{NamespaceId, StorageResult};
use scalar_index::{
    DataType, FilterInfo, MemoryStorage, MemoryTable, MultiFieldRangeIndex, StorageManager,
};

const NUM: usize = 0;
const TAGS: usize = 1;

fn shared_index() -> (Arc<MemoryTable>, Arc<MemoryStorage>, Arc<MultiFieldRangeIndex>) {
    let table = Arc::new(MemoryTable::new(2));
    let storage = Arc::new(MemoryStorage::new());
    let index = Arc::new(MultiFieldRangeIndex::new(table.clone(), storage.clone()));
    index.add_field(NUM, DataType::Long, "num").unwrap();
    index.add_field(TAGS, DataType::StringArray, "tags").unwrap();
    (table, storage, index)
}

#[test]
fn test_parallel_writers_on_disjoint_documents() {
    let (table, storage, index) = shared_index();

    let handles: Vec<_> = (0..4u64)
        .map(|t| {
            let table = table.clone();
            let index = index.clone();
            thread::spawn(move || {
                for i in 0..250u64 {
                    let doc = t * 1000 + i;
                    table.set_i64(doc, NUM, i as i64).unwrap();
                    index.add_doc(doc, NUM).unwrap();
                }
            })
        })
        .collect();
    for handle in handles {
        handle.join().unwrap();
    }

    let ns = storage.namespaces()[NUM].0;
    assert_eq!(storage.row_count(ns).unwrap(), 1000);
    let outcome = index.search(&[FilterInfo::range_i64(NUM, 0, 9)]).unwrap();
    assert_eq!(outcome.results.results()[0].len(), 40);
    assert_eq!(index.field_stats(NUM).unwrap().unwrap().added, 1000);
}

/// Both tokens of a document become visible together.
#[test]
fn test_search_sees_whole_documents() {
    let (table, _, index) = shared_index();

    let writer = {
        let table = table.clone();
        let index = index.clone();
        thread::spawn(move || {
            for doc in 0..300u64 {
                table
                    .set_strings(doc, TAGS, &["left", "right"], DEFAULT_DELIMITER)
                    .unwrap();
                index.add_doc(doc, TAGS).unwrap();
            }
        })
    };

    let readers: Vec<_> = (0..3)
        .map(|_| {
            let index = index.clone();
            thread::spawn(move || {
                for _ in 0..200 {
                    let left = index
                        .search(&[FilterInfo::terms(TAGS, &["left"], DEFAULT_DELIMITER)])
                        .unwrap();
                    let right = index
                        .search(&[FilterInfo::terms(TAGS, &["right"], DEFAULT_DELIMITER)])
                        .unwrap();
                    let left = &left.results.results()[0];
                    let right = &right.results.results()[0];
                    // Right is read after left, so it can only have grown.
                    assert!(left.bitmap().is_subset(right.bitmap()));
                }
            })
        })
        .collect();

    writer.join().unwrap();
    for reader in readers {
        reader.join().unwrap();
    }

    let both = index
        .search(&[FilterInfo::terms(TAGS, &["left", "right"], DEFAULT_DELIMITER)])
        .unwrap();
    assert_eq!(both.results.results()[0].len(), 300);
}

/// Searches on one field return stable results while another field churns.
#[test]
fn test_search_unaffected_by_other_field_churn() {
    let (table, _, index) = shared_index();
    table.set_i64(1, NUM, 7).unwrap();
    index.add_doc(1, NUM).unwrap();

    let writer = {
        let table = table.clone();
        let index = index.clone();
        thread::spawn(move || {
            for doc in 10..200u64 {
                table.set_str(doc, TAGS, "t").unwrap();
                index.add_doc(doc, TAGS).unwrap();
                index.delete(doc, TAGS).unwrap();
            }
        })
    };

    for _ in 0..100 {
        let outcome = index.search(&[FilterInfo::eq_i64(NUM, 7)]).unwrap();
        assert_eq!(outcome.results.results()[0].iter().collect::<Vec<_>>(), vec![1]);
    }
    writer.join().unwrap();
}

/// Store that parks the first scan of one namespace mid-visit until the
/// test releases it.
struct GatedStorage {
    inner: MemoryStorage,
    gated: NamespaceId,
    armed: AtomicBool,
    gate: Barrier,
}

impl StorageManager for GatedStorage {
    fn create_namespace(&self, name: &str) -> StorageResult<NamespaceId> {
        self.inner.create_namespace(name)
    }

    fn namespace_name(&self, id: NamespaceId) -> StorageResult<String> {
        self.inner.namespace_name(id)
    }

    fn namespaces(&self) -> Vec<(NamespaceId, String)> {
        self.inner.namespaces()
    }

    fn put(&self, namespace: NamespaceId, key: &[u8], value: &[u8]) -> StorageResult<()> {
        self.inner.put(namespace, key, value)
    }

    fn delete(&self, namespace: NamespaceId, key: &[u8]) -> StorageResult<()> {
        self.inner.delete(namespace, key)
    }

    fn scan_from(
        &self,
        namespace: NamespaceId,
        start: &[u8],
        visit: &mut dyn FnMut(&[u8], &[u8]) -> ControlFlow<()>,
    ) -> StorageResult<()> {
        self.inner.scan_from(namespace, start, &mut |key, value| {
            if namespace == self.gated && self.armed.swap(false, Ordering::SeqCst) {
                // Entered with the namespace read lock held.
                self.gate.wait();
                self.gate.wait();
            }
            visit(key, value)
        })
    }

    fn row_count(&self, namespace: NamespaceId) -> StorageResult<usize> {
        self.inner.row_count(namespace)
    }
}

/// A write on one field completes while a scan on another is in progress.
#[test]
fn test_open_scan_does_not_block_other_field_writes() {
    let table = Arc::new(MemoryTable::new(2));
    let storage = Arc::new(GatedStorage {
        inner: MemoryStorage::new(),
        gated: 0,
        armed: AtomicBool::new(false),
        gate: Barrier::new(2),
    });
    let index = Arc::new(MultiFieldRangeIndex::new(table.clone(), storage.clone()));
    assert_eq!(index.add_field(NUM, DataType::Long, "num").unwrap(), 0);
    index.add_field(TAGS, DataType::StringArray, "tags").unwrap();

    table.set_i64(1, NUM, 5).unwrap();
    index.add_doc(1, NUM).unwrap();
    storage.armed.store(true, Ordering::SeqCst);

    let searcher = {
        let index = index.clone();
        thread::spawn(move || index.search(&[FilterInfo::eq_i64(NUM, 5)]).unwrap())
    };
    storage.gate.wait();

    let (tx, rx) = mpsc::channel();
    let writer = {
        let table = table.clone();
        let index = index.clone();
        thread::spawn(move || {
            table.set_str(2, TAGS, "t").unwrap();
            index.add_doc(2, TAGS).unwrap();
            tx.send(()).unwrap();
        })
    };
    let finished = rx.recv_timeout(Duration::from_secs(5)).is_ok();

    storage.gate.wait();
    let outcome = searcher.join().unwrap();
    writer.join().unwrap();

    assert!(finished, "write on the tags field waited for a scan on num");
    assert_eq!(outcome.results.results()[0].iter().collect::<Vec<_>>(), vec![1]);
}

/// Every row seen by a concurrent scan carries its own document id as value.
#[test]
fn test_rows_never_torn_under_concurrent_writes() {
    let (table, storage, index) = shared_index();

    let writers: Vec<_> = (0..2u64)
        .map(|t| {
            let table = table.clone();
            let index = index.clone();
            thread::spawn(move || {
                for i in 0..300u64 {
                    let doc = t * 10_000 + i;
                    table.set_i64(doc, NUM, (i % 7) as i64).unwrap();
                    table
                        .set_strings(doc, TAGS, &["a", "b:c"], DEFAULT_DELIMITER)
                        .unwrap();
                    index.index_document(doc).unwrap();
                    if i % 3 == 0 {
                        index.remove_document(doc).unwrap();
                    }
                }
            })
        })
        .collect();

    for _ in 0..50 {
        for (ns, _) in storage.namespaces() {
            storage
                .scan_from(ns, b"", &mut |key, value| {
                    let suffix = &key[key.len() - value.len()..];
                    assert_eq!(key[key.len() - value.len() - 1], b':');
                    assert!(parse_doc_id(value).is_some());
                    assert_eq!(parse_doc_id(suffix), parse_doc_id(value));
                    ControlFlow::Continue(())
                })
                .unwrap();
        }
    }

    for writer in writers {
        writer.join().unwrap();
    }
    // 2 threads x 200 surviving docs x (1 numeric + 2 token rows)
    assert_eq!(
        storage
            .namespaces()
            .iter()
            .map(|(ns, _)| storage.row_count(*ns).unwrap())
            .sum::<usize>(),
        1200
    );
}
