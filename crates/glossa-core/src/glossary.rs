//! Glossary service
//!
//! [`Glossary`] owns every piece of shared state the glossary needs: the
//! entry store, the vocabulary index, the entry counter, the star cache, the
//! spam check and the link builder. It is `Send + Sync`; wrap it in an `Arc`
//! and call it from as many threads as needed.
//!
//! ## Write path
//!
//! - `submit` screens the keyword and description, upserts the entry, patches
//!   the vocabulary and bumps the counter once for a newly created row.
//! - `delete` removes the row, patches the vocabulary and drops the counter.
//!
//! Both hold one write lock from the store write through the counter update,
//! so the vocabulary always ends in the state of the last committed write.
//! Spam screening runs before the lock is taken. Reads never take it.
//!
//! The counter is updated only after the store write has committed, and never
//! when it failed. A counter failure after a committed write is surfaced to
//! the caller; the counter stays stale until [`Glossary::initialize`].

use std::sync::{Arc, Mutex, MutexGuard};

use serde::Serialize;
use tracing::{debug, info, warn};

use crate::annotate::annotate;
use crate::cache::{
    CacheError, EntryCountCache, MemoryEntryCount, MemoryStars, RedisEntryCount,
    RetryingEntryCount, StarCache,
};
use crate::config::{Config, StarStorage};
use crate::error::{GlossaryError, GlossaryResult};
use crate::link::{KeywordLinks, LinkBuilder};
use crate::models::{Entry, Page, RenderedEntry, Star};
use crate::spam::{HttpSpamCheck, PermissiveSpamCheck, SpamCheck};
use crate::storage::{EntryStore, SqliteStore, Upserted};
use crate::vocabulary::{Vocabulary, VocabularyIndex};

/// How many page numbers to offer on each side of the current page
const PAGE_WINDOW: usize = 5;

/// Outcome of a full reinitialization
#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq)]
pub struct InitSummary {
    /// Entries counted in the store, now held by the counter
    pub entries: i64,
    /// Keywords in the rebuilt vocabulary
    pub keywords: usize,
}

/// The glossary and everything it shares between callers
pub struct Glossary {
    store: Arc<dyn EntryStore>,
    vocabulary: Arc<VocabularyIndex>,
    entry_count: Arc<dyn EntryCountCache>,
    stars: Arc<dyn StarCache>,
    spam_check: Arc<dyn SpamCheck>,
    links: Arc<dyn LinkBuilder>,
    per_page: usize,
    writes: Mutex<()>,
}

impl Glossary {
    /// Build a glossary from configuration
    ///
    /// Opens the SQLite store, picks the counter (Redis when `redis_url` is
    /// set), the star cache and the spam check, then seeds the vocabulary
    /// from the store.
    pub fn open(config: &Config) -> GlossaryResult<Self> {
        let store = Arc::new(SqliteStore::open(config)?);

        let stars: Arc<dyn StarCache> = match config.star_storage {
            StarStorage::Memory => Arc::new(MemoryStars::new()),
            StarStorage::Store => store.clone(),
        };

        let entry_count: Arc<dyn EntryCountCache> = match config.redis_url.as_deref() {
            Some(url) => Arc::new(RetryingEntryCount::new(
                RedisEntryCount::open(url)?,
                config.cache_retry,
            )),
            None => Arc::new(MemoryEntryCount::new()),
        };

        let spam_check: Arc<dyn SpamCheck> = if config.spam_check_url.is_empty() {
            Arc::new(PermissiveSpamCheck)
        } else {
            Arc::new(HttpSpamCheck::new(&config.spam_check_url)?)
        };

        Glossary::builder(store)
            .entry_count(entry_count)
            .stars(stars)
            .spam_check(spam_check)
            .links(Arc::new(KeywordLinks::new(&config.base_url)?))
            .per_page(config.per_page)
            .build()
    }

    /// Start assembling a glossary over `store` with in-process defaults
    pub fn builder(store: Arc<dyn EntryStore>) -> GlossaryBuilder {
        GlossaryBuilder::new(store)
    }

    /// Full reinitialization
    ///
    /// Recounts the store, flushes the cache and restores the counter with
    /// the recount, clears the stars and rebuilds the vocabulary. This is the
    /// only point where the counter is reconciled with the store.
    pub fn initialize(&self) -> GlossaryResult<InitSummary> {
        let _writes = self.lock_writes();
        let entries = self.store.count_entries()?;
        self.entry_count.flush_and_restore(entries)?;
        self.stars.clear()?;

        let keywords = self.store.list_keywords_by_descending_length()?;
        self.vocabulary.rebuild(keywords);

        let summary = InitSummary {
            entries,
            keywords: self.vocabulary.len(),
        };
        info!(
            "Glossary initialized: {} entries, {} keywords",
            summary.entries, summary.keywords
        );
        Ok(summary)
    }

    /// Create or update the entry for `keyword`
    pub fn submit(
        &self,
        keyword: &str,
        description: &str,
        author: &str,
    ) -> GlossaryResult<Upserted> {
        if keyword.is_empty() {
            return Err(GlossaryError::EmptyKeyword);
        }
        if keyword.chars().all(|c| c == '.') {
            return Err(GlossaryError::UnlinkableKeyword(keyword.to_string()));
        }

        if self.spam_check.is_spam(description)? || self.spam_check.is_spam(keyword)? {
            warn!("Rejected spam submission for keyword {:?} by {}", keyword, author);
            return Err(GlossaryError::Spam);
        }

        let _writes = self.lock_writes();
        let upserted = self.store.upsert_entry(keyword, description, author)?;
        self.vocabulary.add(keyword);
        if upserted.created {
            self.entry_count.increment()?;
        }

        debug!(
            "Submitted {:?} (created: {}, vocabulary: {})",
            keyword,
            upserted.created,
            self.vocabulary.len()
        );
        Ok(upserted)
    }

    /// Delete the entry for `keyword`
    pub fn delete(&self, keyword: &str) -> GlossaryResult<()> {
        let _writes = self.lock_writes();
        if !self.store.delete_entry(keyword)? {
            return Err(GlossaryError::NotFound(keyword.to_string()));
        }

        self.vocabulary.remove(keyword);
        self.entry_count.decrement()?;

        debug!("Deleted {:?}", keyword);
        Ok(())
    }

    /// The entry page for `keyword`: annotated description plus stars
    pub fn entry(&self, keyword: &str) -> GlossaryResult<RenderedEntry> {
        let entry = self.find(keyword)?;
        self.render(entry, &self.vocabulary.snapshot())
    }

    /// One page of the front listing, most recently updated first
    ///
    /// Page numbers start at 1; smaller values are treated as 1. The number
    /// of pages comes from the entry counter, not from a recount.
    pub fn page(&self, page: usize) -> GlossaryResult<Page> {
        let page = page.max(1);
        let per_page = self.per_page.max(1);

        let entries = self
            .store
            .list_entries(per_page, (page - 1).saturating_mul(per_page))?;

        let snapshot = self.vocabulary.snapshot();
        let entries = entries
            .into_iter()
            .map(|entry| self.render(entry, &snapshot))
            .collect::<GlossaryResult<Vec<_>>>()?;

        let total = usize::try_from(self.entry_count.get()?).unwrap_or(0);
        let last_page = total.div_ceil(per_page);
        let first = page.saturating_sub(PAGE_WINDOW).max(1);
        let last = last_page.min(page.saturating_add(PAGE_WINDOW));

        Ok(Page {
            page,
            last_page,
            pages: (first..=last).collect(),
            entries,
        })
    }

    /// Record that `user_name` starred `keyword`
    pub fn star(&self, keyword: &str, user_name: &str) -> GlossaryResult<Star> {
        self.find(keyword)?;
        self.stars.add(keyword, user_name)?;
        Ok(Star::new(keyword, user_name))
    }

    /// Stars recorded for `keyword`, oldest first
    pub fn stars(&self, keyword: &str) -> GlossaryResult<Vec<Star>> {
        Ok(self.stars.all_for(keyword)?)
    }

    /// Annotate arbitrary text against the current vocabulary
    pub fn annotate(&self, text: &str) -> GlossaryResult<String> {
        let snapshot = self.vocabulary.snapshot();
        Ok(annotate(text, &snapshot, self.links.as_ref())?)
    }

    pub fn vocabulary(&self) -> &Arc<VocabularyIndex> {
        &self.vocabulary
    }

    /// Entry count as held by the counter
    pub fn entry_count(&self) -> GlossaryResult<i64> {
        Ok(self.entry_count.get()?)
    }

    pub fn per_page(&self) -> usize {
        self.per_page
    }

    fn lock_writes(&self) -> MutexGuard<'_, ()> {
        self.writes.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn find(&self, keyword: &str) -> GlossaryResult<Entry> {
        self.store
            .find_entry(keyword)?
            .ok_or_else(|| GlossaryError::NotFound(keyword.to_string()))
    }

    fn render(&self, entry: Entry, vocabulary: &Vocabulary) -> GlossaryResult<RenderedEntry> {
        let html = annotate(&entry.description, vocabulary, self.links.as_ref())?;
        let stars = self.stars.all_for(&entry.keyword)?;
        Ok(RenderedEntry { entry, html, stars })
    }
}

/// Assembles a [`Glossary`] from its collaborators
///
/// Anything not supplied falls back to an in-process implementation:
/// in-memory counter and stars, no spam screening, links under
/// `http://localhost:5000`.
pub struct GlossaryBuilder {
    store: Arc<dyn EntryStore>,
    vocabulary: Option<Arc<VocabularyIndex>>,
    entry_count: Option<Arc<dyn EntryCountCache>>,
    stars: Option<Arc<dyn StarCache>>,
    spam_check: Option<Arc<dyn SpamCheck>>,
    links: Option<Arc<dyn LinkBuilder>>,
    per_page: usize,
}

impl GlossaryBuilder {
    fn new(store: Arc<dyn EntryStore>) -> Self {
        Self {
            store,
            vocabulary: None,
            entry_count: None,
            stars: None,
            spam_check: None,
            links: None,
            per_page: 10,
        }
    }

    pub fn vocabulary(mut self, vocabulary: Arc<VocabularyIndex>) -> Self {
        self.vocabulary = Some(vocabulary);
        self
    }

    pub fn entry_count(mut self, entry_count: Arc<dyn EntryCountCache>) -> Self {
        self.entry_count = Some(entry_count);
        self
    }

    pub fn stars(mut self, stars: Arc<dyn StarCache>) -> Self {
        self.stars = Some(stars);
        self
    }

    pub fn spam_check(mut self, spam_check: Arc<dyn SpamCheck>) -> Self {
        self.spam_check = Some(spam_check);
        self
    }

    pub fn links(mut self, links: Arc<dyn LinkBuilder>) -> Self {
        self.links = Some(links);
        self
    }

    pub fn per_page(mut self, per_page: usize) -> Self {
        self.per_page = per_page;
        self
    }

    /// Seed the vocabulary and, if it has never been set, the counter
    pub fn build(self) -> GlossaryResult<Glossary> {
        let links: Arc<dyn LinkBuilder> = match self.links {
            Some(links) => links,
            None => Arc::new(KeywordLinks::new("http://localhost:5000")?),
        };

        let glossary = Glossary {
            vocabulary: self.vocabulary.unwrap_or_default(),
            entry_count: self
                .entry_count
                .unwrap_or_else(|| Arc::new(MemoryEntryCount::new())),
            stars: self.stars.unwrap_or_else(|| Arc::new(MemoryStars::new())),
            spam_check: self
                .spam_check
                .unwrap_or_else(|| Arc::new(PermissiveSpamCheck)),
            store: self.store,
            links,
            per_page: self.per_page,
            writes: Mutex::new(()),
        };

        let keywords = glossary.store.list_keywords_by_descending_length()?;
        glossary.vocabulary.rebuild(keywords);

        match glossary.entry_count.get() {
            Ok(_) => {}
            Err(CacheError::Uninitialized) => {
                let entries = glossary.store.count_entries()?;
                glossary.entry_count.set(entries)?;
                debug!("Entry count seeded with {}", entries);
            }
            Err(e) => return Err(e.into()),
        }

        Ok(glossary)
    }
}
