//! Caches mirroring store-derived state
//!
//! ## Entry count
//!
//! A single counter that mirrors the number of stored entries so the front
//! page does not need a full count. The write path bumps it once per
//! committed insert or delete; it is only reconciled with the store by a
//! full reinitialization, so a crash between a store write and the counter
//! update leaves it stale until then.
//!
//! ## Stars
//!
//! Who starred which keyword. The in-process variant is append-only and is
//! lost on restart; the SQLite store provides a durable variant.

pub mod memory;
pub mod remote;
pub mod retry;

use thiserror::Error;

use crate::models::Star;
use crate::storage::StorageError;

pub use self::memory::{MemoryEntryCount, MemoryStars};
pub use self::remote::RedisEntryCount;
pub use self::retry::{RetryPolicy, RetryingEntryCount};

/// Errors raised by cache backends
#[derive(Error, Debug)]
pub enum CacheError {
    /// Could not reach the cache server
    #[error("Cache connection failed: {source}")]
    Connection {
        #[source]
        source: ::redis::RedisError,
    },

    /// The cache server rejected or failed a command
    #[error("Cache command {command} failed: {source}")]
    Command {
        command: &'static str,
        #[source]
        source: ::redis::RedisError,
    },

    /// The counter was read before anything set it
    #[error("Entry count has not been initialized")]
    Uninitialized,

    /// Durable star storage failed
    #[error("Star storage failed: {0}")]
    Store(#[from] StorageError),
}

impl CacheError {
    /// Whether retrying the same operation may succeed
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            CacheError::Connection { .. } | CacheError::Command { .. }
        )
    }

    /// Whether the failure happened before any command reached the server
    ///
    /// Only these are safe to retry for `INCR`/`DECR`: a failed command may
    /// already have been applied.
    pub fn is_unsent(&self) -> bool {
        matches!(self, CacheError::Connection { .. })
    }
}

/// Counter mirroring the number of stored entries
pub trait EntryCountCache: Send + Sync {
    fn get(&self) -> Result<i64, CacheError>;

    fn set(&self, count: i64) -> Result<(), CacheError>;

    fn increment(&self) -> Result<(), CacheError>;

    fn decrement(&self) -> Result<(), CacheError>;

    /// Drop every cached key, then set the counter to `count`
    ///
    /// Administrative; only used by full reinitialization.
    fn flush_and_restore(&self, count: i64) -> Result<(), CacheError>;
}

/// Endorsements per keyword
///
/// `all_for` returns stars in the order they were added and keeps repeats
/// from the same user.
pub trait StarCache: Send + Sync {
    fn add(&self, keyword: &str, user_name: &str) -> Result<(), CacheError>;

    fn all_for(&self, keyword: &str) -> Result<Vec<Star>, CacheError>;

    fn clear(&self) -> Result<(), CacheError>;
}
