//! In-process table backend.
//!
//! All connections opened from one [`MemoryTable`] share the same ordered
//! rows. When opened with a path, the rows are persisted as a JSON snapshot
//! that is rewritten after each successful mutation. A snapshot is written
//! to a uniquely named file beside the target, synced, then renamed over it.

use std::collections::BTreeMap;
use std::fs;
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;

use parking_lot::RwLock;
use tempfile::NamedTempFile;
use tracing::{debug, info};

use super::{Connection, Connector, Record};
use crate::error::{StorageError, StorageResult};

#[derive(Debug)]
struct Table {
    rows: RwLock<BTreeMap<i64, String>>,
    path: Option<PathBuf>,
    online: AtomicBool,
    open_connections: AtomicUsize,
}

impl Table {
    fn check_online(&self) -> StorageResult<()> {
        if self.online.load(Ordering::Acquire) {
            Ok(())
        } else {
            Err(StorageError::Unavailable("table is offline".to_string()))
        }
    }

    /// Applies `change` to the rows, persisting first when file-backed.
    ///
    /// The in-memory rows only change once the snapshot is on disk.
    fn mutate<T>(&self, change: impl FnOnce(&mut BTreeMap<i64, String>) -> T) -> StorageResult<T> {
        let mut rows = self.rows.write();
        match &self.path {
            None => Ok(change(&mut *rows)),
            Some(path) => {
                let mut next = (*rows).clone();
                let out = change(&mut next);
                write_snapshot(path, &next)?;
                *rows = next;
                Ok(out)
            }
        }
    }
}

/// A shared in-process table acting as the durable store.
///
/// Cloning yields another handle to the same rows.
#[derive(Debug, Clone)]
pub struct MemoryTable {
    inner: Arc<Table>,
}

impl Default for MemoryTable {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryTable {
    /// Creates an empty, volatile table.
    pub fn new() -> Self {
        Self::with_rows(BTreeMap::new(), None)
    }

    /// Opens a table persisted at `path`, loading existing rows.
    ///
    /// A missing file is an empty table; it is created on the first write.
    pub fn open(path: impl AsRef<Path>) -> StorageResult<Self> {
        let path = path.as_ref().to_path_buf();
        let rows = read_snapshot(&path)?;
        info!(path = %path.display(), rows = rows.len(), "opened table");
        Ok(Self::with_rows(rows, Some(path)))
    }

    fn with_rows(rows: BTreeMap<i64, String>, path: Option<PathBuf>) -> Self {
        Self {
            inner: Arc::new(Table {
                rows: RwLock::new(rows),
                path,
                online: AtomicBool::new(true),
                open_connections: AtomicUsize::new(0),
            }),
        }
    }

    /// Takes the table on or offline. While offline, connecting and every
    /// connection operation fail with [`StorageError::Unavailable`].
    pub fn set_online(&self, online: bool) {
        self.inner.online.store(online, Ordering::Release);
    }

    pub fn is_online(&self) -> bool {
        self.inner.online.load(Ordering::Acquire)
    }

    /// Number of connections opened and not yet closed.
    pub fn open_connections(&self) -> usize {
        self.inner.open_connections.load(Ordering::Acquire)
    }

    pub fn len(&self) -> usize {
        self.inner.rows.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.rows.read().is_empty()
    }

    /// Reads a row directly, bypassing connections and availability.
    pub fn peek(&self, key: i64) -> Option<String> {
        self.inner.rows.read().get(&key).cloned()
    }
}

impl Connector for MemoryTable {
    type Connection = MemoryConnection;

    fn connect(&self) -> StorageResult<MemoryConnection> {
        self.inner.check_online()?;
        self.inner.open_connections.fetch_add(1, Ordering::AcqRel);
        Ok(MemoryConnection {
            table: Arc::clone(&self.inner),
            open: true,
        })
    }
}

/// A session on a [`MemoryTable`].
#[derive(Debug)]
pub struct MemoryConnection {
    table: Arc<Table>,
    open: bool,
}

impl MemoryConnection {
    fn table(&self) -> StorageResult<&Table> {
        if !self.open {
            return Err(StorageError::Closed);
        }
        self.table.check_online()?;
        Ok(&self.table)
    }
}

impl Connection for MemoryConnection {
    fn scan(&mut self, limit: usize) -> StorageResult<Vec<Record>> {
        let rows = self.table()?.rows.read();
        Ok(rows
            .iter()
            .take(limit)
            .map(|(key, value)| Record::new(*key, value.clone()))
            .collect())
    }

    fn lookup(&mut self, key: i64) -> StorageResult<Option<String>> {
        Ok(self.table()?.rows.read().get(&key).cloned())
    }

    fn upsert(&mut self, key: i64, value: &str) -> StorageResult<()> {
        self.table()?.mutate(|rows| {
            rows.insert(key, value.to_string());
        })
    }

    fn delete(&mut self, key: i64) -> StorageResult<bool> {
        self.table()?.mutate(|rows| rows.remove(&key).is_some())
    }

    fn close(&mut self) {
        if std::mem::replace(&mut self.open, false) {
            self.table.open_connections.fetch_sub(1, Ordering::AcqRel);
        }
    }
}

impl Drop for MemoryConnection {
    fn drop(&mut self) {
        self.close();
    }
}

fn read_snapshot(path: &Path) -> StorageResult<BTreeMap<i64, String>> {
    let bytes = match fs::read(path) {
        Ok(bytes) => bytes,
        Err(err) if err.kind() == ErrorKind::NotFound => return Ok(BTreeMap::new()),
        Err(err) => return Err(err.into()),
    };
    let records: Vec<Record> = serde_json::from_slice(&bytes)?;
    Ok(records.into_iter().map(|r| (r.key, r.value)).collect())
}

fn write_snapshot(path: &Path, rows: &BTreeMap<i64, String>) -> StorageResult<()> {
    let records: Vec<Record> = rows
        .iter()
        .map(|(key, value)| Record::new(*key, value.clone()))
        .collect();
    let dir = match path.parent() {
        Some(dir) if !dir.as_os_str().is_empty() => dir,
        _ => Path::new("."),
    };
    let mut tmp = NamedTempFile::new_in(dir)?;
    tmp.write_all(&serde_json::to_vec(&records)?)?;
    tmp.as_file().sync_all()?;
    tmp.persist(path).map_err(|err| err.error)?;
    debug!(path = %path.display(), rows = records.len(), "snapshot written");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_upsert_lookup_delete() {
        let table = MemoryTable::new();
        let mut conn = table.connect().unwrap();

        assert_eq!(conn.lookup(1).unwrap(), None);
        conn.upsert(1, "a").unwrap();
        conn.upsert(1, "b").unwrap();
        assert_eq!(conn.lookup(1).unwrap(), Some("b".to_string()));
        assert_eq!(table.len(), 1);

        assert!(conn.delete(1).unwrap());
        assert!(!conn.delete(1).unwrap());
        assert!(table.is_empty());
    }

    #[test]
    fn test_connections_share_rows() {
        let table = MemoryTable::new();
        let mut writer = table.connect().unwrap();
        let mut reader = table.connect().unwrap();

        writer.upsert(5, "five").unwrap();

        assert_eq!(reader.lookup(5).unwrap(), Some("five".to_string()));
    }

    #[test]
    fn test_scan_is_bounded_and_ordered() {
        let table = MemoryTable::new();
        let mut conn = table.connect().unwrap();
        for key in [3, -1, 7, 0] {
            conn.upsert(key, &format!("v{key}")).unwrap();
        }

        let records = conn.scan(3).unwrap();

        assert_eq!(
            records,
            vec![Record::new(-1, "v-1"), Record::new(0, "v0"), Record::new(3, "v3")]
        );
        assert_eq!(conn.scan(100).unwrap().len(), 4);
        assert!(conn.scan(0).unwrap().is_empty());
    }

    #[test]
    fn test_offline_table_fails_every_operation() {
        let table = MemoryTable::new();
        let mut conn = table.connect().unwrap();
        table.set_online(false);

        assert!(matches!(table.connect(), Err(StorageError::Unavailable(_))));
        assert!(matches!(conn.lookup(1), Err(StorageError::Unavailable(_))));
        assert!(matches!(conn.upsert(1, "a"), Err(StorageError::Unavailable(_))));
        assert!(matches!(conn.delete(1), Err(StorageError::Unavailable(_))));
        assert!(matches!(conn.scan(1), Err(StorageError::Unavailable(_))));

        table.set_online(true);
        assert!(conn.upsert(1, "a").is_ok());
    }

    #[test]
    fn test_close_tracks_open_connections() {
        let table = MemoryTable::new();
        let mut a = table.connect().unwrap();
        let b = table.connect().unwrap();
        assert_eq!(table.open_connections(), 2);

        a.close();
        a.close();
        assert_eq!(table.open_connections(), 1);
        assert!(matches!(a.lookup(1), Err(StorageError::Closed)));

        drop(b);
        assert_eq!(table.open_connections(), 0);
    }

    #[test]
    fn test_values_are_stored_verbatim() {
        let table = MemoryTable::new();
        let mut conn = table.connect().unwrap();
        let tricky = "x'); DROP TABLE kv_store; --";

        conn.upsert(1, tricky).unwrap();

        assert_eq!(conn.lookup(1).unwrap().as_deref(), Some(tricky));
    }

    #[test]
    fn test_snapshot_survives_reopen() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("table.json");
        {
            let table = MemoryTable::open(&path).unwrap();
            assert!(table.is_empty());
            let mut conn = table.connect().unwrap();
            conn.upsert(1, "one").unwrap();
            conn.upsert(2, "two").unwrap();
            conn.delete(1).unwrap();
        }

        let table = MemoryTable::open(&path).unwrap();
        assert_eq!(table.len(), 1);
        assert_eq!(table.peek(2), Some("two".to_string()));
    }

    #[test]
    fn test_snapshot_leaves_no_scratch_files() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("table.json");
        let table = MemoryTable::open(&path).unwrap();
        let mut conn = table.connect().unwrap();

        for key in 0..5 {
            conn.upsert(key, "v").unwrap();
        }

        let names: Vec<_> = fs::read_dir(dir.path())
            .unwrap()
            .map(|entry| entry.unwrap().file_name())
            .collect();
        assert_eq!(names, vec![std::ffi::OsString::from("table.json")]);
    }

    #[test]
    fn test_tmp_suffixed_data_file_round_trips() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("rows.tmp");
        {
            let table = MemoryTable::open(&path).unwrap();
            let mut conn = table.connect().unwrap();
            conn.upsert(1, "one").unwrap();
            conn.upsert(2, "two").unwrap();
        }

        let table = MemoryTable::open(&path).unwrap();
        assert_eq!(table.len(), 2);
        assert_eq!(table.peek(1), Some("one".to_string()));
    }

    #[test]
    fn test_corrupt_snapshot_is_rejected() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("table.json");
        fs::write(&path, b"not json").unwrap();

        assert!(matches!(MemoryTable::open(&path), Err(StorageError::Corrupt(_))));
    }

    #[test]
    fn test_failed_write_leaves_rows_unchanged() {
        let dir = TempDir::new().unwrap();
        let table = MemoryTable::open(dir.path().join("missing").join("table.json")).unwrap();
        let mut conn = table.connect().unwrap();

        assert!(matches!(conn.upsert(1, "a"), Err(StorageError::Io(_))));
        assert!(table.is_empty());
    }
}
