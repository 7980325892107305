//! Durable store backed by an append-only log
//!
//! Every namespace creation, put and delete is appended to
//! `<data_dir>/index/scalar.log` before it becomes visible. Opening the store
//! replays the log into a [`MemoryStorage`]. Any framing or checksum failure
//! during replay is fatal; there is no partial recovery.

use std::fs::{self, File, OpenOptions};
use std::io::{self, Write};
use std::ops::ControlFlow;
use std::path::{Path, PathBuf};

use parking_lot::Mutex;
use tracing::{debug, info, warn};

use super::errors::{StorageError, StorageResult};
use super::memory::MemoryStorage;
use super::record::LogRecord;
use super::{NamespaceId, StorageManager};

/// Relative location of the log under the data directory.
pub const LOG_FILE: &str = "index/scalar.log";

/// Durable sorted store.
pub struct LogStorage {
    log_path: PathBuf,
    /// Serializes appends so log order matches visibility order
    file: Mutex<File>,
    sync_writes: bool,
    state: MemoryStorage,
}

impl LogStorage {
    /// Opens or creates the log under `data_dir` and replays it.
    ///
    /// With `sync_writes`, every append is fsynced before the mutation is
    /// applied.
    pub fn open(data_dir: &Path, sync_writes: bool) -> StorageResult<Self> {
        let log_path = data_dir.join(LOG_FILE);
        if let Some(parent) = log_path.parent() {
            fs::create_dir_all(parent).map_err(|e| {
                StorageError::io_error(
                    format!("Failed to create index directory: {}", parent.display()),
                    e,
                )
            })?;
        }

        let state = MemoryStorage::new();
        let replayed = Self::replay(&log_path, &state)?;

        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&log_path)
            .map_err(|e| {
                StorageError::io_error(
                    format!("Failed to open log file: {}", log_path.display()),
                    e,
                )
            })?;

        info!(
            path = %log_path.display(),
            records = replayed,
            namespaces = state.namespaces().len(),
            "opened scalar index log"
        );

        Ok(Self {
            log_path,
            file: Mutex::new(file),
            sync_writes,
            state,
        })
    }

    /// Returns the path to the log file.
    pub fn path(&self) -> &Path {
        &self.log_path
    }

    fn replay(log_path: &Path, state: &MemoryStorage) -> StorageResult<usize> {
        let data = match fs::read(log_path) {
            Ok(data) => data,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(0),
            Err(e) => {
                return Err(StorageError::io_error(
                    format!("Failed to read log file: {}", log_path.display()),
                    e,
                ))
            }
        };

        let mut offset = 0usize;
        let mut count = 0usize;
        while offset < data.len() {
            let (record, consumed) = LogRecord::deserialize(&data[offset..])
                .map_err(|e| StorageError::corruption_at_offset(offset as u64, e.to_string()))?;

            let applied = match record {
                LogRecord::CreateNamespace { id, name } => state.bind_namespace(id, &name),
                LogRecord::Put {
                    namespace,
                    key,
                    value,
                } => state.put(namespace, &key, &value),
                LogRecord::Delete { namespace, key } => state.delete(namespace, &key),
            };
            applied.map_err(|e| {
                StorageError::corruption_at_offset(offset as u64, e.message().to_string())
            })?;

            offset += consumed;
            count += 1;
        }

        debug!(records = count, "replayed scalar index log");
        Ok(count)
    }

    fn append(&self, file: &mut File, record: &LogRecord) -> StorageResult<()> {
        let bytes = record.serialize();
        let sync_writes = self.sync_writes;
        append_with_rollback(file, |file| {
            file.write_all(&bytes)?;
            if sync_writes {
                file.sync_data()?;
            }
            Ok(())
        })
    }

    fn ensure_namespace(&self, namespace: NamespaceId) -> StorageResult<()> {
        self.state.namespace_name(namespace).map(|_| ())
    }
}

/// Runs `write` against the end of the log. On failure the file is cut back
/// to its previous length, so a rejected mutation neither replays later nor
/// leaves a torn tail.
fn append_with_rollback(
    file: &mut File,
    write: impl FnOnce(&mut File) -> io::Result<()>,
) -> StorageResult<()> {
    let before = file
        .metadata()
        .map_err(|e| StorageError::io_error("Failed to stat log file", e))?
        .len();

    let Err(e) = write(file) else {
        return Ok(());
    };
    warn!(offset = before, error = %e, "log append failed, truncating");
    if let Err(rollback) = file.set_len(before).and_then(|_| file.sync_data()) {
        return Err(StorageError::io_error(
            format!(
                "Failed to append log record ({}); truncating to offset {} also failed",
                e, before
            ),
            rollback,
        ));
    }
    Err(StorageError::io_error("Failed to append log record", e))
}

impl StorageManager for LogStorage {
    fn create_namespace(&self, name: &str) -> StorageResult<NamespaceId> {
        let mut file = self.file.lock();
        if let Some(id) = self.state.lookup_namespace(name) {
            return Ok(id);
        }

        let id = self.state.namespaces().len() as NamespaceId;
        self.append(
            &mut file,
            &LogRecord::CreateNamespace {
                id,
                name: name.to_string(),
            },
        )?;
        self.state.bind_namespace(id, name)?;
        Ok(id)
    }

    fn namespace_name(&self, id: NamespaceId) -> StorageResult<String> {
        self.state.namespace_name(id)
    }

    fn namespaces(&self) -> Vec<(NamespaceId, String)> {
        self.state.namespaces()
    }

    fn put(&self, namespace: NamespaceId, key: &[u8], value: &[u8]) -> StorageResult<()> {
        self.ensure_namespace(namespace)?;
        let mut file = self.file.lock();
        self.append(
            &mut file,
            &LogRecord::Put {
                namespace,
                key: key.to_vec(),
                value: value.to_vec(),
            },
        )?;
        self.state.put(namespace, key, value)
    }

    fn delete(&self, namespace: NamespaceId, key: &[u8]) -> StorageResult<()> {
        self.ensure_namespace(namespace)?;
        let mut file = self.file.lock();
        self.append(
            &mut file,
            &LogRecord::Delete {
                namespace,
                key: key.to_vec(),
            },
        )?;
        self.state.delete(namespace, key)
    }

    fn scan_from(
        &self,
        namespace: NamespaceId,
        start: &[u8],
        visit: &mut dyn FnMut(&[u8], &[u8]) -> ControlFlow<()>,
    ) -> StorageResult<()> {
        self.state.scan_from(namespace, start, visit)
    }

    fn row_count(&self, namespace: NamespaceId) -> StorageResult<usize> {
        self.state.row_count(namespace)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn keys(store: &LogStorage, ns: NamespaceId) -> Vec<Vec<u8>> {
        let mut out = Vec::new();
        store
            .scan_from(ns, b"", &mut |key, _| {
                out.push(key.to_vec());
                ControlFlow::Continue(())
            })
            .unwrap();
        out
    }

    #[test]
    fn test_reopen_replays_rows_and_namespaces() {
        let dir = tempdir().unwrap();
        {
            let store = LogStorage::open(dir.path(), true).unwrap();
            let a = store.create_namespace("scalar:1").unwrap();
            let b = store.create_namespace("scalar:4").unwrap();
            store.put(a, b"x:1", b"1").unwrap();
            store.put(a, b"y:2", b"2").unwrap();
            store.put(b, b"z:3", b"3").unwrap();
            store.delete(a, b"x:1").unwrap();
        }

        let store = LogStorage::open(dir.path(), true).unwrap();
        assert_eq!(
            store.namespaces(),
            vec![(0, "scalar:1".to_string()), (1, "scalar:4".to_string())]
        );
        assert_eq!(keys(&store, 0), vec![b"y:2".to_vec()]);
        assert_eq!(keys(&store, 1), vec![b"z:3".to_vec()]);
        assert_eq!(store.create_namespace("scalar:4").unwrap(), 1);
    }

    #[test]
    fn test_corrupted_log_halts_open() {
        let dir = tempdir().unwrap();
        let path = {
            let store = LogStorage::open(dir.path(), false).unwrap();
            let ns = store.create_namespace("scalar:0").unwrap();
            store.put(ns, b"k:1", b"1").unwrap();
            store.path().to_path_buf()
        };

        let mut bytes = fs::read(&path).unwrap();
        let last = bytes.len() - 6;
        bytes[last] ^= 0xFF;
        fs::write(&path, bytes).unwrap();

        let err = LogStorage::open(dir.path(), false).err().unwrap();
        assert!(err.is_fatal());
        assert_eq!(err.code().code(), "SCALAR_DATA_CORRUPTION");
    }

    #[test]
    fn test_truncated_tail_halts_open() {
        let dir = tempdir().unwrap();
        let path = {
            let store = LogStorage::open(dir.path(), false).unwrap();
            let ns = store.create_namespace("scalar:0").unwrap();
            store.put(ns, b"k:1", b"1").unwrap();
            store.path().to_path_buf()
        };

        let bytes = fs::read(&path).unwrap();
        fs::write(&path, &bytes[..bytes.len() - 3]).unwrap();

        assert!(LogStorage::open(dir.path(), false).is_err());
    }

    #[test]
    fn test_failed_append_is_rolled_back() {
        let dir = tempdir().unwrap();
        let (path, len) = {
            let store = LogStorage::open(dir.path(), true).unwrap();
            let ns = store.create_namespace("scalar:0").unwrap();
            store.put(ns, b"k:1", b"1").unwrap();
            let len = fs::metadata(store.path()).unwrap().len();

            let record = LogRecord::Put {
                namespace: ns,
                key: b"k:2".to_vec(),
                value: b"2".to_vec(),
            }
            .serialize();
            let mut file = store.file.lock();
            let err = append_with_rollback(&mut file, |file| {
                file.write_all(&record[..record.len() / 2])?;
                Err(io::Error::new(io::ErrorKind::Other, "disk full"))
            })
            .unwrap_err();
            assert_eq!(err.code().code(), "SCALAR_STORAGE_IO_ERROR");
            (store.path().to_path_buf(), len)
        };

        assert_eq!(fs::metadata(&path).unwrap().len(), len);
        let store = LogStorage::open(dir.path(), true).unwrap();
        assert_eq!(keys(&store, 0), vec![b"k:1".to_vec()]);

        // Appends after the rollback land on a clean boundary.
        store.put(0, b"k:3", b"3").unwrap();
        drop(store);
        let store = LogStorage::open(dir.path(), true).unwrap();
        assert_eq!(keys(&store, 0), vec![b"k:1".to_vec(), b"k:3".to_vec()]);
    }

    #[test]
    fn test_put_to_unknown_namespace_writes_nothing() {
        let dir = tempdir().unwrap();
        let store = LogStorage::open(dir.path(), false).unwrap();
        assert!(store.put(3, b"k", b"v").is_err());
        assert_eq!(fs::metadata(store.path()).unwrap().len(), 0);
    }
}
