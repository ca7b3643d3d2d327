//! Vocabulary index
//!
//! Holds every known keyword in match-priority order (longest first) together
//! with the opaque token each keyword is substituted with while a text block
//! is being annotated.
//!
//! ## Concurrency
//!
//! The index publishes immutable [`Vocabulary`] snapshots through an
//! [`ArcSwap`]:
//!
//! - Readers call [`VocabularyIndex::snapshot`] and annotate against that
//!   `Arc<Vocabulary>`. A snapshot never changes, so an in-flight annotation
//!   keeps a consistent keyword/token/matcher triple even if the index is
//!   patched meanwhile.
//! - Writers (`rebuild`, `add`, `remove`) are serialized by a mutex, build a
//!   complete replacement snapshot off to the side and publish it with a
//!   single atomic store. A reader sees either the old or the new snapshot,
//!   never a half-sorted sequence.

use std::cmp::Reverse;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use arc_swap::ArcSwap;
use regex::{Regex, RegexBuilder};
use tracing::{debug, info, warn};

use crate::annotate::AnnotateError;

/// Prefix shared by every substitution token
pub const TOKEN_PREFIX: &str = "glossa_";

/// Compiled-program ceiling for the keyword matcher. Large glossaries produce
/// a single alternation with thousands of branches.
const MATCHER_SIZE_LIMIT: usize = 1 << 28;

/// Token a keyword is replaced with during substitution
///
/// A content hash of the keyword, so distinct keywords never share a token and
/// the token is vanishingly unlikely to occur in user text on its own.
pub fn token_for(keyword: &str) -> String {
    format!("{}{}", TOKEN_PREFIX, blake3::hash(keyword.as_bytes()).to_hex())
}

#[derive(Debug)]
enum Matcher {
    /// No matchable keyword
    Empty,
    Ready(Regex),
    /// The alternation could not be compiled; annotation reports it
    Unavailable(String),
}

impl Matcher {
    fn compile(keywords: &[String]) -> Self {
        let alternatives: Vec<String> = keywords
            .iter()
            .filter(|k| !k.is_empty())
            .map(|k| regex::escape(k))
            .collect();

        if alternatives.is_empty() {
            return Matcher::Empty;
        }

        // Leftmost-first semantics: at a given position the earliest
        // alternative wins, and alternatives are ordered longest first.
        match RegexBuilder::new(&alternatives.join("|"))
            .size_limit(MATCHER_SIZE_LIMIT)
            .dfa_size_limit(MATCHER_SIZE_LIMIT)
            .build()
        {
            Ok(re) => Matcher::Ready(re),
            Err(e) => {
                warn!(
                    "Failed to compile matcher for {} keywords: {}",
                    alternatives.len(),
                    e
                );
                Matcher::Unavailable(e.to_string())
            }
        }
    }
}

/// An immutable view of the vocabulary
#[derive(Debug)]
pub struct Vocabulary {
    /// Keywords, longest first
    keywords: Vec<String>,
    /// keyword -> token
    tokens: HashMap<String, String>,
    /// token -> keyword
    by_token: HashMap<String, String>,
    matcher: Matcher,
}

impl Vocabulary {
    /// Build a snapshot from keywords that are already in priority order
    fn from_ordered(keywords: Vec<String>) -> Self {
        let mut tokens = HashMap::with_capacity(keywords.len());
        let mut by_token = HashMap::with_capacity(keywords.len());
        for keyword in &keywords {
            let token = token_for(keyword);
            by_token.insert(token.clone(), keyword.clone());
            tokens.insert(keyword.clone(), token);
        }
        let matcher = Matcher::compile(&keywords);

        Self {
            keywords,
            tokens,
            by_token,
            matcher,
        }
    }

    fn empty() -> Self {
        Self::from_ordered(Vec::new())
    }

    /// Keywords in match-priority order
    pub fn keywords(&self) -> &[String] {
        &self.keywords
    }

    pub fn len(&self) -> usize {
        self.keywords.len()
    }

    pub fn is_empty(&self) -> bool {
        self.keywords.is_empty()
    }

    pub fn contains(&self, keyword: &str) -> bool {
        self.tokens.contains_key(keyword)
    }

    /// Token assigned to a keyword in this snapshot
    pub fn token(&self, keyword: &str) -> Option<&str> {
        self.tokens.get(keyword).map(String::as_str)
    }

    /// Keyword a token stands for in this snapshot
    pub fn keyword_for_token(&self, token: &str) -> Option<&str> {
        self.by_token.get(token).map(String::as_str)
    }

    /// The keyword matcher, or `None` when nothing can match
    pub(crate) fn matcher(&self) -> Result<Option<&Regex>, AnnotateError> {
        match &self.matcher {
            Matcher::Empty => Ok(None),
            Matcher::Ready(re) => Ok(Some(re)),
            Matcher::Unavailable(reason) => Err(AnnotateError::MatcherUnavailable {
                keywords: self.keywords.len(),
                reason: reason.clone(),
            }),
        }
    }
}

/// Shared, concurrently readable keyword index
pub struct VocabularyIndex {
    current: ArcSwap<Vocabulary>,
    writer: Mutex<()>,
}

impl Default for VocabularyIndex {
    fn default() -> Self {
        Self::new()
    }
}

impl VocabularyIndex {
    /// Create an empty index
    pub fn new() -> Self {
        Self {
            current: ArcSwap::from_pointee(Vocabulary::empty()),
            writer: Mutex::new(()),
        }
    }

    /// Create an index seeded with the given keywords
    pub fn with_keywords<I, S>(keywords: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let index = Self::new();
        index.rebuild(keywords);
        index
    }

    /// Pin the current snapshot
    pub fn snapshot(&self) -> Arc<Vocabulary> {
        self.current.load_full()
    }

    /// Number of keywords in the current snapshot
    pub fn len(&self) -> usize {
        self.current.load().len()
    }

    pub fn is_empty(&self) -> bool {
        self.current.load().is_empty()
    }

    /// Replace the index wholesale
    ///
    /// Keywords are ordered by descending character length; ties keep the
    /// order they were supplied in. Repeated keywords keep their first
    /// occurrence.
    pub fn rebuild<I, S>(&self, keywords: I)
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let _guard = self.lock_writer();

        let mut seen = std::collections::HashSet::new();
        let mut ordered: Vec<String> = keywords
            .into_iter()
            .map(Into::into)
            .filter(|k| seen.insert(k.clone()))
            .collect();
        ordered.sort_by_key(|k| Reverse(k.chars().count()));

        let vocabulary = Vocabulary::from_ordered(ordered);
        info!("Vocabulary rebuilt with {} keywords", vocabulary.len());
        self.current.store(Arc::new(vocabulary));
    }

    /// Insert a keyword at its length-sorted position
    ///
    /// The keyword goes ahead of any existing keyword of the same length, so
    /// the most recently added keyword wins ties. Adding a keyword that is
    /// already present moves it to that position.
    pub fn add(&self, keyword: &str) {
        let _guard = self.lock_writer();
        let current = self.current.load_full();

        let length = keyword.chars().count();
        let mut keywords: Vec<String> = current
            .keywords
            .iter()
            .filter(|k| k.as_str() != keyword)
            .cloned()
            .collect();
        let position = keywords
            .iter()
            .position(|k| k.chars().count() <= length)
            .unwrap_or(keywords.len());
        keywords.insert(position, keyword.to_string());

        debug!("Vocabulary add {:?} at position {}", keyword, position);
        self.current
            .store(Arc::new(Vocabulary::from_ordered(keywords)));
    }

    /// Remove a keyword; returns false when it was not present
    pub fn remove(&self, keyword: &str) -> bool {
        let _guard = self.lock_writer();
        let current = self.current.load_full();

        if !current.contains(keyword) {
            debug!("Vocabulary remove {:?}: not present", keyword);
            return false;
        }

        let keywords: Vec<String> = current
            .keywords
            .iter()
            .filter(|k| k.as_str() != keyword)
            .cloned()
            .collect();

        debug!("Vocabulary remove {:?}", keyword);
        self.current
            .store(Arc::new(Vocabulary::from_ordered(keywords)));
        true
    }

    fn lock_writer(&self) -> std::sync::MutexGuard<'_, ()> {
        // The guarded value is `()`, so a poisoned lock carries no broken state
        self.writer.lock().unwrap_or_else(|e| e.into_inner())
    }
}
