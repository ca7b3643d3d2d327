//! Data models for Glossa
//!
//! Defines the records the glossary works with: Entry and Star.
//! The store owns entries; the vocabulary index and the caches only hold
//! derived copies of their keywords.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A glossary entry: one keyword and its description
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Entry {
    /// Row identifier assigned by the store
    pub id: i64,
    /// The keyword (unique across the glossary)
    pub keyword: String,
    /// Free-text description, annotated on render
    pub description: String,
    /// Name of the user who last wrote this entry
    pub author: String,
    /// When this entry was created
    pub created_at: DateTime<Utc>,
    /// When this entry was last updated
    pub updated_at: DateTime<Utc>,
}

/// An endorsement of a keyword by a named user
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub struct Star {
    pub keyword: String,
    pub user_name: String,
}

impl Star {
    pub fn new(keyword: impl Into<String>, user_name: impl Into<String>) -> Self {
        Self {
            keyword: keyword.into(),
            user_name: user_name.into(),
        }
    }
}

/// An entry whose description has been annotated into HTML
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct RenderedEntry {
    #[serde(flatten)]
    pub entry: Entry,
    /// Escaped description with keyword occurrences linked
    pub html: String,
    /// Users who starred this keyword, duplicates included
    pub stars: Vec<Star>,
}

/// One page of the front listing
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct Page {
    /// Requested page number (1-based)
    pub page: usize,
    /// Last page according to the cached entry count
    pub last_page: usize,
    /// Page numbers to offer as navigation
    pub pages: Vec<usize>,
    /// Entries on this page, newest update first
    pub entries: Vec<RenderedEntry>,
}
