//! Redis-backed entry counter
//!
//! The counter is one string key holding an integer. Increments and
//! decrements use `INCR`/`DECR`, so concurrent writers never lose an update
//! to a read-modify-write race.
//!
//! A single connection is reused between calls. Any failed command drops it
//! and the next call reconnects; wrap this type in
//! [`RetryingEntryCount`](super::RetryingEntryCount) to retry transparently.

use std::sync::Mutex;
use std::time::Duration;

use redis::{Client, Commands, Connection};
use tracing::{debug, info};

use super::{CacheError, EntryCountCache};

/// Key the entry count lives under
pub const ENTRY_COUNT_KEY: &str = "glossa:entry_count";

/// Connect/read/write timeout for cache round-trips
const CACHE_TIMEOUT: Duration = Duration::from_millis(500);

pub struct RedisEntryCount {
    client: Client,
    conn: Mutex<Option<Connection>>,
}

impl RedisEntryCount {
    /// Prepare a counter against `redis_url`; connects lazily
    pub fn open(redis_url: &str) -> Result<Self, CacheError> {
        let client = Client::open(redis_url).map_err(|source| CacheError::Connection { source })?;
        Ok(Self {
            client,
            conn: Mutex::new(None),
        })
    }

    fn connect(&self) -> Result<Connection, CacheError> {
        let conn = self
            .client
            .get_connection_with_timeout(CACHE_TIMEOUT)
            .map_err(|source| CacheError::Connection { source })?;
        conn.set_read_timeout(Some(CACHE_TIMEOUT))
            .and_then(|_| conn.set_write_timeout(Some(CACHE_TIMEOUT)))
            .map_err(|source| CacheError::Connection { source })?;
        debug!("Connected to cache server");
        Ok(conn)
    }

    fn run<T>(
        &self,
        command: &'static str,
        f: impl FnOnce(&mut Connection, &str) -> redis::RedisResult<T>,
    ) -> Result<T, CacheError> {
        let mut slot = self.conn.lock().unwrap_or_else(|e| e.into_inner());
        let mut conn = match slot.take() {
            Some(conn) => conn,
            None => self.connect()?,
        };

        match f(&mut conn, ENTRY_COUNT_KEY) {
            Ok(value) => {
                *slot = Some(conn);
                Ok(value)
            }
            // The connection is dropped here; the next call reconnects
            Err(source) => Err(CacheError::Command { command, source }),
        }
    }
}

impl EntryCountCache for RedisEntryCount {
    fn get(&self) -> Result<i64, CacheError> {
        self.run("GET", |conn, key| conn.get::<_, Option<i64>>(key))?
            .ok_or(CacheError::Uninitialized)
    }

    fn set(&self, count: i64) -> Result<(), CacheError> {
        self.run("SET", |conn, key| conn.set::<_, _, ()>(key, count))
    }

    fn increment(&self) -> Result<(), CacheError> {
        let count = self.run("INCR", |conn, key| conn.incr::<_, _, i64>(key, 1))?;
        debug!("Entry count incremented to {}", count);
        Ok(())
    }

    fn decrement(&self) -> Result<(), CacheError> {
        let count = self.run("DECR", |conn, key| conn.decr::<_, _, i64>(key, 1))?;
        debug!("Entry count decremented to {}", count);
        Ok(())
    }

    /// `FLUSHDB` then `SET`, in one `MULTI`/`EXEC` block
    fn flush_and_restore(&self, count: i64) -> Result<(), CacheError> {
        self.run("FLUSHDB", |conn, key| {
            redis::pipe()
                .atomic()
                .cmd("FLUSHDB")
                .ignore()
                .set(key, count)
                .ignore()
                .query::<()>(conn)
        })?;
        info!("Cache flushed, entry count restored to {}", count);
        Ok(())
    }
}
