//! Storage layer
//!
//! Entries live in SQLite, which is the source of truth for every keyword,
//! description, and author. The in-memory vocabulary and the entry counter
//! are derived from it.
//!
//! The [`EntryStore`] trait is the seam the glossary talks to; [`SqliteStore`]
//! is the only production implementation.

pub mod error;
pub mod schema;
pub mod sqlite;

pub use error::{StorageError, StorageResult};
pub use schema::{init_schema, needs_init, SCHEMA_VERSION};
pub use sqlite::SqliteStore;

use crate::models::Entry;

/// Result of writing an entry
#[derive(Debug, Clone)]
pub struct Upserted {
    /// The row as stored after the write
    pub entry: Entry,
    /// True when no entry with this keyword existed before
    pub created: bool,
}

/// Persistent record of glossary entries
pub trait EntryStore: Send + Sync {
    /// Every keyword, longest first; ties keep creation order
    fn list_keywords_by_descending_length(&self) -> StorageResult<Vec<String>>;

    /// Create the entry or replace its description and author
    fn upsert_entry(&self, keyword: &str, description: &str, author: &str)
        -> StorageResult<Upserted>;

    /// Remove the entry; returns whether a row was deleted
    fn delete_entry(&self, keyword: &str) -> StorageResult<bool>;

    fn find_entry(&self, keyword: &str) -> StorageResult<Option<Entry>>;

    /// Entries ordered by most recently updated
    fn list_entries(&self, limit: usize, offset: usize) -> StorageResult<Vec<Entry>>;

    fn count_entries(&self) -> StorageResult<i64>;
}
