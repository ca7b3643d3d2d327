//! In-process cache backends

use std::collections::HashMap;
use std::sync::{Mutex, RwLock};

use super::{CacheError, EntryCountCache, StarCache};
use crate::models::Star;

/// Entry counter held in process memory
#[derive(Debug, Default)]
pub struct MemoryEntryCount {
    count: Mutex<Option<i64>>,
}

impl MemoryEntryCount {
    pub fn new() -> Self {
        Self::default()
    }

    fn update(&self, f: impl FnOnce(&mut Option<i64>)) {
        let mut count = self.count.lock().unwrap_or_else(|e| e.into_inner());
        f(&mut count);
    }
}

impl EntryCountCache for MemoryEntryCount {
    fn get(&self) -> Result<i64, CacheError> {
        let count = self.count.lock().unwrap_or_else(|e| e.into_inner());
        count.ok_or(CacheError::Uninitialized)
    }

    fn set(&self, count: i64) -> Result<(), CacheError> {
        self.update(|c| *c = Some(count));
        Ok(())
    }

    // A missing counter starts from zero, like INCR on an absent key
    fn increment(&self) -> Result<(), CacheError> {
        self.update(|c| *c = Some(c.unwrap_or(0) + 1));
        Ok(())
    }

    fn decrement(&self) -> Result<(), CacheError> {
        self.update(|c| *c = Some(c.unwrap_or(0) - 1));
        Ok(())
    }

    fn flush_and_restore(&self, count: i64) -> Result<(), CacheError> {
        self.set(count)
    }
}

/// Stars held in process memory, lost on restart
#[derive(Debug, Default)]
pub struct MemoryStars {
    by_keyword: RwLock<HashMap<String, Vec<String>>>,
}

impl MemoryStars {
    pub fn new() -> Self {
        Self::default()
    }
}

impl StarCache for MemoryStars {
    fn add(&self, keyword: &str, user_name: &str) -> Result<(), CacheError> {
        let mut stars = self.by_keyword.write().unwrap_or_else(|e| e.into_inner());
        stars
            .entry(keyword.to_string())
            .or_default()
            .push(user_name.to_string());
        Ok(())
    }

    fn all_for(&self, keyword: &str) -> Result<Vec<Star>, CacheError> {
        let stars = self.by_keyword.read().unwrap_or_else(|e| e.into_inner());
        Ok(stars
            .get(keyword)
            .map(|users| users.iter().map(|u| Star::new(keyword, u.as_str())).collect())
            .unwrap_or_default())
    }

    fn clear(&self) -> Result<(), CacheError> {
        self.by_keyword
            .write()
            .unwrap_or_else(|e| e.into_inner())
            .clear();
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::thread;

    #[test]
    fn test_count_uninitialized() {
        let count = MemoryEntryCount::new();
        assert!(matches!(count.get(), Err(CacheError::Uninitialized)));
    }

    #[test]
    fn test_count_set_increment_decrement() {
        let count = MemoryEntryCount::new();
        count.set(10).unwrap();
        count.increment().unwrap();
        count.increment().unwrap();
        count.decrement().unwrap();
        assert_eq!(count.get().unwrap(), 11);

        count.flush_and_restore(3).unwrap();
        assert_eq!(count.get().unwrap(), 3);
    }

    #[test]
    fn test_count_concurrent_updates() {
        let count = Arc::new(MemoryEntryCount::new());
        count.set(100).unwrap();

        let handles: Vec<_> = (0..8)
            .map(|t| {
                let count = Arc::clone(&count);
                thread::spawn(move || {
                    for _ in 0..50 {
                        if t % 2 == 0 {
                            count.increment().unwrap();
                        } else {
                            count.increment().unwrap();
                            count.decrement().unwrap();
                        }
                    }
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }

        // 4 threads * 50 net increments
        assert_eq!(count.get().unwrap(), 300);
    }

    #[test]
    fn test_stars_keep_duplicates_and_order() {
        let stars = MemoryStars::new();
        stars.add("Rust", "alice").unwrap();
        stars.add("Rust", "bob").unwrap();
        stars.add("Rust", "alice").unwrap();
        stars.add("Go", "carol").unwrap();

        let users: Vec<String> = stars
            .all_for("Rust")
            .unwrap()
            .into_iter()
            .map(|s| s.user_name)
            .collect();
        assert_eq!(users, vec!["alice", "bob", "alice"]);
        assert!(stars.all_for("Zig").unwrap().is_empty());
    }

    #[test]
    fn test_stars_clear() {
        let stars = MemoryStars::new();
        stars.add("Rust", "alice").unwrap();
        stars.clear().unwrap();
        assert!(stars.all_for("Rust").unwrap().is_empty());
    }

    #[test]
    fn test_stars_concurrent_appends_not_lost() {
        let stars = Arc::new(MemoryStars::new());
        let handles: Vec<_> = (0..8)
            .map(|t| {
                let stars = Arc::clone(&stars);
                thread::spawn(move || {
                    for i in 0..25 {
                        stars.add("Rust", &format!("user{}-{}", t, i)).unwrap();
                    }
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }

        assert_eq!(stars.all_for("Rust").unwrap().len(), 200);
    }
}
