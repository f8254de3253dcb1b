//! Snapshot storage backends.
//!
//! RULE: Only store.rs touches the filesystem or the database.
//! The engine hands over encoded bytes and gets encoded bytes back; the
//! codec lives in snapshot.rs.
//!
//! Every backend replaces the stored state atomically. A save that fails
//! part-way leaves the previous state readable.

use crate::error::StoreResult;
use rusqlite::{params, Connection, OptionalExtension};
use std::fs::File;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

/// A sink holding exactly one encoded snapshot.
pub trait SnapshotStore: Send {
    /// Replace the stored snapshot with `bytes`.
    fn write(&mut self, bytes: &[u8]) -> StoreResult<()>;

    /// The stored snapshot, or `None` if nothing was ever written.
    fn read(&mut self) -> StoreResult<Option<Vec<u8>>>;

    /// Short label for log lines.
    fn describe(&self) -> String;
}

// ── JSON file ──────────────────────────────────────────────────

/// One human-readable JSON file, replaced via write-to-temp then rename.
#[derive(Debug)]
pub struct JsonFileStore {
    path: PathBuf,
}

impl JsonFileStore {
    /// Use `path` as the save file, creating its parent directory if needed.
    pub fn open(path: impl Into<PathBuf>) -> StoreResult<Self> {
        let path = path.into();
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }
        Ok(Self { path })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn dir(&self) -> &Path {
        match self.path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent,
            _ => Path::new("."),
        }
    }
}

impl SnapshotStore for JsonFileStore {
    fn write(&mut self, bytes: &[u8]) -> StoreResult<()> {
        replace_file(self.dir(), &self.path, |file| file.write_all(bytes))
    }

    fn read(&mut self) -> StoreResult<Option<Vec<u8>>> {
        match std::fs::read(&self.path) {
            Ok(bytes) => Ok(Some(bytes)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    fn describe(&self) -> String {
        format!("json:{}", self.path.display())
    }
}

/// Fill a temp file in `dir`, then rename it over `path`. If `fill` or any
/// later step fails the temp file is removed and `path` is left untouched.
fn replace_file(dir: &Path, path: &Path, fill: impl FnOnce(&mut File) -> io::Result<()>) -> StoreResult<()> {
    // Same directory as `path`, so the rename never crosses devices.
    let mut tmp = tempfile::NamedTempFile::new_in(dir)?;
    fill(tmp.as_file_mut())?;
    tmp.as_file().sync_all()?;
    tmp.persist(path).map_err(|e| e.error)?;
    Ok(())
}

// ── SQLite ─────────────────────────────────────────────────────

pub struct SqliteStore {
    conn: Connection,
}

impl SqliteStore {
    /// Open (or create) the snapshot database at `path`.
    pub fn open(path: impl AsRef<Path>) -> StoreResult<Self> {
        let conn = Connection::open(path)?;
        // WAL mode: a crashed writer never leaves a torn page behind.
        conn.execute_batch("PRAGMA journal_mode=WAL;")?;
        let store = Self { conn };
        store.migrate()?;
        Ok(store)
    }

    /// Open an in-memory database (used in tests).
    pub fn in_memory() -> StoreResult<Self> {
        let store = Self {
            conn: Connection::open_in_memory()?,
        };
        store.migrate()?;
        Ok(store)
    }

    fn migrate(&self) -> StoreResult<()> {
        self.conn.execute_batch(include_str!("../migrations/001_snapshot.sql"))?;
        Ok(())
    }
}

impl SnapshotStore for SqliteStore {
    fn write(&mut self, bytes: &[u8]) -> StoreResult<()> {
        let json = std::str::from_utf8(bytes).map_err(|_| crate::error::StoreError::Encoding)?;
        let saved_at = chrono::Utc::now().timestamp();
        let tx = self.conn.transaction()?;
        tx.execute(
            "INSERT INTO snapshot (slot, saved_at, state_json) VALUES (1, ?1, ?2)
             ON CONFLICT(slot) DO UPDATE SET saved_at = excluded.saved_at,
                                             state_json = excluded.state_json",
            params![saved_at, json],
        )?;
        tx.commit()?;
        Ok(())
    }

    fn read(&mut self) -> StoreResult<Option<Vec<u8>>> {
        let json = self
            .conn
            .query_row("SELECT state_json FROM snapshot WHERE slot = 1", [], |row| {
                row.get::<_, String>(0)
            })
            .optional()?;
        Ok(json.map(String::into_bytes))
    }

    fn describe(&self) -> String {
        match self.conn.path() {
            Some(path) if !path.is_empty() => format!("sqlite:{path}"),
            _ => "sqlite::memory:".to_string(),
        }
    }
}

// ── In-memory ──────────────────────────────────────────────────

#[derive(Debug, Default)]
struct MemorySlot {
    bytes: Option<Vec<u8>>,
    writes: u64,
    failing: bool,
}

/// Shared in-memory slot. Clones see the same contents, so a test can keep
/// one handle while the engine owns another.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    slot: Arc<Mutex<MemorySlot>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// A store that already holds `bytes`, valid or not.
    pub fn with_bytes(bytes: Vec<u8>) -> Self {
        let store = Self::default();
        store.lock().bytes = Some(bytes);
        store
    }

    /// Number of successful writes so far.
    pub fn write_count(&self) -> u64 {
        self.lock().writes
    }

    pub fn contents(&self) -> Option<Vec<u8>> {
        self.lock().bytes.clone()
    }

    /// While set, every write fails and leaves the contents untouched.
    pub fn set_failing(&self, failing: bool) {
        self.lock().failing = failing;
    }

    fn lock(&self) -> MutexGuard<'_, MemorySlot> {
        self.slot.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl SnapshotStore for MemoryStore {
    fn write(&mut self, bytes: &[u8]) -> StoreResult<()> {
        let mut slot = self.lock();
        if slot.failing {
            return Err(std::io::Error::new(std::io::ErrorKind::Other, "memory store set to fail").into());
        }
        slot.bytes = Some(bytes.to_vec());
        slot.writes += 1;
        Ok(())
    }

    fn read(&mut self) -> StoreResult<Option<Vec<u8>>> {
        Ok(self.lock().bytes.clone())
    }

    fn describe(&self) -> String {
        "memory".to_string()
    }
}
