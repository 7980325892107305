//! CLI command implementations
//!
//! Both commands open the store read-mostly: the log is replayed but never
//! appended to. Output is one JSON object per line.

use std::io::Write;
use std::ops::ControlFlow;

use serde::Serialize;
use tracing::info;

use crate::config::IndexConfig;
use crate::storage::{LogStorage, StorageManager, LOG_FILE};

use super::args::Command;
use super::errors::{CliError, CliResult};

/// One line of `namespaces` output
#[derive(Debug, Serialize)]
struct NamespaceLine<'a> {
    id: u32,
    name: &'a str,
    rows: usize,
}

/// One line of `scan` output
#[derive(Debug, Serialize)]
struct RowLine {
    key: String,
    value: String,
}

/// Lowercase hex, two digits per byte.
fn hex(bytes: &[u8]) -> String {
    bytes.iter().map(|b| format!("{:02x}", b)).collect()
}

/// Opens the durable store named by `config`.
///
/// Refuses to create a new store: inspecting a missing directory is an error.
pub fn open_store(config: &IndexConfig) -> CliResult<LogStorage> {
    let log_path = config.data_dir.join(LOG_FILE);
    if !log_path.exists() {
        return Err(CliError::storage_error(format!(
            "No index log at {}",
            log_path.display()
        )));
    }
    let storage = LogStorage::open(&config.data_dir, config.sync_writes)?;
    info!(path = %log_path.display(), "opened index store");
    Ok(storage)
}

/// Runs one command against `config`, writing results to `out`.
pub fn run_command(command: &Command, config: &IndexConfig, out: &mut dyn Write) -> CliResult<()> {
    let storage = open_store(config)?;
    match command {
        Command::Namespaces => namespaces(&storage, out),
        Command::Scan { namespace, limit } => scan(&storage, namespace, *limit, out),
    }
}

/// Lists every namespace with its row count.
pub fn namespaces(storage: &dyn StorageManager, out: &mut dyn Write) -> CliResult<()> {
    for (id, name) in storage.namespaces() {
        let rows = storage.row_count(id)?;
        serde_json::to_writer(&mut *out, &NamespaceLine { id, name: &name, rows })?;
        writeln!(out)?;
    }
    out.flush()?;
    Ok(())
}

/// Prints the rows of `namespace` in key order, at most `limit` of them.
pub fn scan(
    storage: &dyn StorageManager,
    namespace: &str,
    limit: Option<usize>,
    out: &mut dyn Write,
) -> CliResult<()> {
    let id = storage
        .namespaces()
        .into_iter()
        .find(|(_, name)| name == namespace)
        .map(|(id, _)| id)
        .ok_or_else(|| CliError::unknown_namespace(namespace))?;

    let limit = limit.unwrap_or(usize::MAX);
    let mut printed = 0usize;
    let mut failure = None;
    storage.scan_from(id, &[], &mut |key, value| {
        if printed >= limit {
            return ControlFlow::Break(());
        }
        let line = RowLine {
            key: hex(key),
            value: String::from_utf8_lossy(value).into_owned(),
        };
        let written = serde_json::to_writer(&mut *out, &line)
            .map_err(CliError::from)
            .and_then(|_| writeln!(out).map_err(CliError::from));
        match written {
            Ok(()) => {
                printed += 1;
                ControlFlow::Continue(())
            }
            Err(e) => {
                failure = Some(e);
                ControlFlow::Break(())
            }
        }
    })?;

    if let Some(e) = failure {
        return Err(e);
    }
    out.flush()?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::MemoryStorage;
    use tempfile::tempdir;

    fn seeded() -> MemoryStorage {
        let storage = MemoryStorage::new();
        let a = storage.create_namespace("scalar:0").unwrap();
        storage.create_namespace("scalar:1").unwrap();
        storage.put(a, b"\x80:1", b"1").unwrap();
        storage.put(a, b"\x81:2", b"2").unwrap();
        storage
    }

    fn lines(out: Vec<u8>) -> Vec<serde_json::Value> {
        String::from_utf8(out)
            .unwrap()
            .lines()
            .map(|l| serde_json::from_str(l).unwrap())
            .collect()
    }

    #[test]
    fn test_namespaces_lists_row_counts() {
        let mut out = Vec::new();
        namespaces(&seeded(), &mut out).unwrap();
        let lines = lines(out);
        assert_eq!(lines.len(), 2);
        assert_eq!(lines[0]["name"], "scalar:0");
        assert_eq!(lines[0]["rows"], 2);
        assert_eq!(lines[1]["rows"], 0);
    }

    #[test]
    fn test_scan_prints_hex_keys_with_limit() {
        let mut out = Vec::new();
        scan(&seeded(), "scalar:0", Some(1), &mut out).unwrap();
        let lines = lines(out);
        assert_eq!(lines.len(), 1);
        assert_eq!(lines[0]["key"], "803a31");
        assert_eq!(lines[0]["value"], "1");
    }

    #[test]
    fn test_scan_unknown_namespace() {
        let mut out = Vec::new();
        let err = scan(&seeded(), "scalar:9", None, &mut out).unwrap_err();
        assert_eq!(err.code_str(), "SCALAR_CLI_UNKNOWN_NAMESPACE");
    }

    #[test]
    fn test_missing_store_is_not_created() {
        let dir = tempdir().unwrap();
        let config = IndexConfig::with_data_dir(dir.path());
        let mut out = Vec::new();
        let err = run_command(&Command::Namespaces, &config, &mut out).unwrap_err();
        assert_eq!(err.code_str(), "SCALAR_CLI_STORAGE_ERROR");
        assert!(!dir.path().join(LOG_FILE).exists());
    }

    #[test]
    fn test_run_against_durable_store() {
        let dir = tempdir().unwrap();
        {
            let storage = LogStorage::open(dir.path(), false).unwrap();
            let ns = storage.create_namespace("scalar:3").unwrap();
            storage.put(ns, b"k:5", b"5").unwrap();
        }
        let config = IndexConfig::with_data_dir(dir.path());
        let mut out = Vec::new();
        run_command(&Command::Namespaces, &config, &mut out).unwrap();
        let lines = lines(out);
        assert_eq!(lines[0]["name"], "scalar:3");
        assert_eq!(lines[0]["rows"], 1);
    }
}
