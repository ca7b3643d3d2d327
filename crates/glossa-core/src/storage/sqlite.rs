//! SQLite entry store
//!
//! The authoritative record of entries (and, when star storage is durable,
//! of stars). The connection sits behind a mutex so a single store can be
//! shared by every request thread.
//!
//! ## Tables
//!
//! - `entries` - one row per keyword
//! - `stars` - endorsements, append-only

use std::path::Path;
use std::sync::{Mutex, MutexGuard};

use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, OptionalExtension, Row};
use tracing::{debug, info};

use super::error::{StorageError, StorageResult};
use super::schema::{get_schema_version, init_schema, needs_init, SCHEMA_VERSION};
use super::{EntryStore, Upserted};
use crate::cache::{CacheError, StarCache};
use crate::config::Config;
use crate::models::{Entry, Star};

const ENTRY_COLUMNS: &str = "id, keyword, description, author, created_at, updated_at";

/// SQLite-backed entry store
pub struct SqliteStore {
    conn: Mutex<Connection>,
}

impl SqliteStore {
    /// Open or create the database configured for this glossary
    pub fn open(config: &Config) -> StorageResult<Self> {
        Self::open_path(&config.sqlite_path())
    }

    /// Open or create the database at a specific path
    pub fn open_path(path: &Path) -> StorageResult<Self> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)
                .map_err(|e| StorageError::from_io(e, parent.to_path_buf()))?;
        }

        let conn = Connection::open(path).map_err(|source| StorageError::Open {
            path: path.to_path_buf(),
            source,
        })?;

        Self::prepare(conn)
    }

    /// Open an in-memory database (for testing)
    pub fn open_in_memory() -> StorageResult<Self> {
        Self::prepare(Connection::open_in_memory()?)
    }

    fn prepare(conn: Connection) -> StorageResult<Self> {
        if needs_init(&conn) {
            init_schema(&conn)?;
            info!("Initialized entry store schema v{}", SCHEMA_VERSION);
        } else if let Some(found) = get_schema_version(&conn)? {
            if found > SCHEMA_VERSION {
                return Err(StorageError::SchemaTooNew {
                    found,
                    supported: SCHEMA_VERSION,
                });
            }
        }

        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    fn conn(&self) -> MutexGuard<'_, Connection> {
        // A panic mid-statement leaves SQLite itself consistent
        self.conn.lock().unwrap_or_else(|e| e.into_inner())
    }
}

impl EntryStore for SqliteStore {
    fn list_keywords_by_descending_length(&self) -> StorageResult<Vec<String>> {
        let conn = self.conn();
        let mut stmt =
            conn.prepare("SELECT keyword FROM entries ORDER BY length(keyword) DESC, id ASC")?;
        let keywords = stmt
            .query_map([], |row| row.get(0))?
            .collect::<Result<Vec<String>, _>>()?;
        Ok(keywords)
    }

    fn upsert_entry(
        &self,
        keyword: &str,
        description: &str,
        author: &str,
    ) -> StorageResult<Upserted> {
        let mut conn = self.conn();
        let tx = conn.transaction()?;
        let now = Utc::now().timestamp_millis();

        let existed = tx
            .query_row(
                "SELECT 1 FROM entries WHERE keyword = ?",
                params![keyword],
                |_| Ok(()),
            )
            .optional()?
            .is_some();

        tx.execute(
            r#"
            INSERT INTO entries (keyword, description, author, created_at, updated_at)
            VALUES (?1, ?2, ?3, ?4, ?4)
            ON CONFLICT(keyword) DO UPDATE SET
                description = excluded.description,
                author = excluded.author,
                updated_at = excluded.updated_at
            "#,
            params![keyword, description, author, now],
        )?;

        let entry = tx.query_row(
            &format!("SELECT {} FROM entries WHERE keyword = ?", ENTRY_COLUMNS),
            params![keyword],
            entry_from_row,
        )?;
        tx.commit()?;

        debug!(
            "Upserted entry {:?} ({})",
            keyword,
            if existed { "updated" } else { "created" }
        );
        Ok(Upserted {
            entry,
            created: !existed,
        })
    }

    fn delete_entry(&self, keyword: &str) -> StorageResult<bool> {
        let deleted = self
            .conn()
            .execute("DELETE FROM entries WHERE keyword = ?", params![keyword])?;
        Ok(deleted > 0)
    }

    fn find_entry(&self, keyword: &str) -> StorageResult<Option<Entry>> {
        let conn = self.conn();
        let entry = conn
            .query_row(
                &format!("SELECT {} FROM entries WHERE keyword = ?", ENTRY_COLUMNS),
                params![keyword],
                entry_from_row,
            )
            .optional()?;
        Ok(entry)
    }

    fn list_entries(&self, limit: usize, offset: usize) -> StorageResult<Vec<Entry>> {
        let conn = self.conn();
        let mut stmt = conn.prepare(&format!(
            "SELECT {} FROM entries ORDER BY updated_at DESC, id DESC LIMIT ? OFFSET ?",
            ENTRY_COLUMNS
        ))?;
        let entries = stmt
            .query_map(params![limit as i64, offset as i64], entry_from_row)?
            .collect::<Result<Vec<Entry>, _>>()?;
        Ok(entries)
    }

    fn count_entries(&self) -> StorageResult<i64> {
        self.conn()
            .query_row("SELECT COUNT(*) FROM entries", [], |row| row.get(0))
            .map_err(Into::into)
    }
}

impl StarCache for SqliteStore {
    fn add(&self, keyword: &str, user_name: &str) -> Result<(), CacheError> {
        self.conn()
            .execute(
                "INSERT INTO stars (keyword, user_name, created_at) VALUES (?, ?, ?)",
                params![keyword, user_name, Utc::now().timestamp_millis()],
            )
            .map_err(StorageError::from)?;
        Ok(())
    }

    fn all_for(&self, keyword: &str) -> Result<Vec<Star>, CacheError> {
        let conn = self.conn();
        let mut stmt = conn
            .prepare("SELECT keyword, user_name FROM stars WHERE keyword = ? ORDER BY id")
            .map_err(StorageError::from)?;
        let stars = stmt
            .query_map(params![keyword], |row| {
                Ok(Star {
                    keyword: row.get(0)?,
                    user_name: row.get(1)?,
                })
            })
            .and_then(|rows| rows.collect::<Result<Vec<Star>, _>>())
            .map_err(StorageError::from)?;
        Ok(stars)
    }

    fn clear(&self) -> Result<(), CacheError> {
        self.conn()
            .execute("DELETE FROM stars", [])
            .map_err(StorageError::from)?;
        Ok(())
    }
}

fn entry_from_row(row: &Row<'_>) -> rusqlite::Result<Entry> {
    let created_at: i64 = row.get(4)?;
    let updated_at: i64 = row.get(5)?;

    Ok(Entry {
        id: row.get(0)?,
        keyword: row.get(1)?,
        description: row.get(2)?,
        author: row.get(3)?,
        created_at: DateTime::from_timestamp_millis(created_at).unwrap_or_else(Utc::now),
        updated_at: DateTime::from_timestamp_millis(updated_at).unwrap_or_else(Utc::now),
    })
}
