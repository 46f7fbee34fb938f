//! Local History Store
//!
//! A capped, self-expiring log of completed downloads, persisted as a single
//! JSON value in a keyed SQLite table. History is a convenience feature,
//! never a hard dependency: every persistence failure degrades to an empty
//! store for reads and a silent no-op for writes.

use std::path::{Path, PathBuf};

use anyhow::{anyhow, Result};
use chrono::Utc;
use directories::ProjectDirs;
use rusqlite::{params, Connection, OptionalExtension};
use uuid::Uuid;

use crate::models::{DownloadRecord, NewDownloadRecord};

/// Maximum number of retained records; oldest evicted first.
pub const HISTORY_CAP: usize = 20;

const HISTORY_KEY: &str = "download_history";

/// Determines the per-user app data directory.
pub fn app_project_dirs() -> Result<ProjectDirs> {
    ProjectDirs::from("com", "audiotube", "AudioTube")
        .ok_or_else(|| anyhow!("failed to resolve per-user app data directory"))
}

/// Returns the default path of the history database file.
pub fn default_db_path() -> Result<PathBuf> {
    let dirs = app_project_dirs()?;
    std::fs::create_dir_all(dirs.data_dir())?;
    Ok(dirs.data_dir().join("audiotube.sqlite3"))
}

/// Persistent store for completed downloads.
///
/// When the backing connection cannot be opened the store runs disabled:
/// reads return empty, writes are no-ops. `rusqlite::Connection` is not
/// `Sync`; keep the store behind a single task or a mutex.
pub struct HistoryStore {
    conn: Option<Connection>,
}

impl HistoryStore {
    /// Open the store at the default per-user location.
    pub fn open_default() -> Self {
        match default_db_path() {
            Ok(path) => Self::open(&path),
            Err(e) => {
                log::warn!("history store unavailable: {e}");
                Self { conn: None }
            }
        }
    }

    /// Open the store at an explicit path. Failure disables the store.
    pub fn open(path: &Path) -> Self {
        let conn = Connection::open(path)
            .map_err(anyhow::Error::from)
            .and_then(|conn| {
                init_schema(&conn)?;
                Ok(conn)
            });

        match conn {
            Ok(conn) => Self { conn: Some(conn) },
            Err(e) => {
                log::warn!("history store unavailable at {}: {e}", path.display());
                Self { conn: None }
            }
        }
    }

    /// In-memory store, used by tests.
    pub fn open_in_memory() -> Self {
        let conn = Connection::open_in_memory()
            .map_err(anyhow::Error::from)
            .and_then(|conn| {
                init_schema(&conn)?;
                Ok(conn)
            });

        match conn {
            Ok(conn) => Self { conn: Some(conn) },
            Err(e) => {
                log::warn!("in-memory history store unavailable: {e}");
                Self { conn: None }
            }
        }
    }

    /// A store that persists nothing. Reads are empty, writes are no-ops.
    pub fn disabled() -> Self {
        Self { conn: None }
    }

    /// Assign an id and timestamp, prepend the record, truncate to the cap,
    /// and persist. Failures are swallowed.
    pub fn append(&self, new: NewDownloadRecord) -> DownloadRecord {
        let record = DownloadRecord {
            id: Uuid::new_v4(),
            title: new.title,
            download_url: new.download_url,
            format: new.format,
            mode: new.mode,
            timestamp: Utc::now(),
            expires_at: new.expires_at,
        };

        let mut list = self.load_raw();
        list.insert(0, record.clone());
        list.truncate(HISTORY_CAP);

        if let Err(e) = self.persist(&list) {
            log::warn!("failed to persist download history: {e}");
        }

        record
    }

    /// All still-valid records, most-recent-first. Expired entries are
    /// filtered out as a view; the persisted list is not rewritten on read.
    pub fn read_all(&self) -> Vec<DownloadRecord> {
        let now = Utc::now();
        self.load_raw()
            .into_iter()
            .filter(|r| !r.is_expired(now))
            .collect()
    }

    /// Delete all persisted entries unconditionally.
    pub fn clear(&self) {
        let Some(conn) = &self.conn else { return };
        if let Err(e) = conn.execute("DELETE FROM store WHERE key = ?1", params![HISTORY_KEY]) {
            log::warn!("failed to clear download history: {e}");
        }
    }

    fn load_raw(&self) -> Vec<DownloadRecord> {
        let Some(conn) = &self.conn else {
            return Vec::new();
        };

        let json: Option<String> = match conn
            .query_row(
                "SELECT value_json FROM store WHERE key = ?1",
                params![HISTORY_KEY],
                |row| row.get(0),
            )
            .optional()
        {
            Ok(v) => v,
            Err(e) => {
                log::warn!("failed to read download history: {e}");
                return Vec::new();
            }
        };

        match json {
            Some(json) => serde_json::from_str(&json).unwrap_or_else(|e| {
                log::warn!("corrupt download history, treating as empty: {e}");
                Vec::new()
            }),
            None => Vec::new(),
        }
    }

    fn persist(&self, list: &[DownloadRecord]) -> Result<()> {
        let Some(conn) = &self.conn else {
            return Ok(());
        };

        let json = serde_json::to_string(list)?;
        conn.execute(
            "INSERT INTO store (key, value_json) VALUES (?1, ?2)
             ON CONFLICT(key) DO UPDATE SET value_json = excluded.value_json",
            params![HISTORY_KEY, json],
        )?;
        Ok(())
    }
}

fn init_schema(conn: &Connection) -> Result<()> {
    conn.execute_batch(
        r#"
        CREATE TABLE IF NOT EXISTS store (
          key TEXT PRIMARY KEY,
          value_json TEXT NOT NULL
        );
        "#,
    )?;
    Ok(())
}
