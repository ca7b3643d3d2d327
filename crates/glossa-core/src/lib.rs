//! Glossa Core Library
//!
//! This crate provides the core functionality for Glossa, a collaborative
//! glossary where every known keyword that appears in any description is
//! linked to that keyword's entry.
//!
//! # Architecture
//!
//! - **SQLite**: Source of truth for entries (and optionally stars)
//! - **Vocabulary index**: In-memory, longest-first keyword order, published
//!   as immutable snapshots
//! - **Annotator**: Escapes a description and links every keyword occurrence
//! - **Caches**: Entry counter (in-process or Redis) and star cache
//!
//! # Quick Start
//!
//! ```text
//! let config = Config::load()?;
//! let glossary = Glossary::open(&config)?;
//!
//! glossary.submit("Rust", "A systems language", "alice")?;
//! glossary.submit("Cargo", "The Rust package manager", "bob")?;
//!
//! let page = glossary.entry("Cargo")?;
//! // page.html links "Rust" to {base_url}/keyword/Rust
//! ```
//!
//! # Modules
//!
//! - `glossary`: The service owning all shared state (main entry point)
//! - `vocabulary`: Keyword index and substitution tokens
//! - `annotate`: Text to linked HTML
//! - `link`: Link targets for keywords
//! - `cache`: Entry counter and star caches
//! - `storage`: SQLite entry store
//! - `spam`: Spam screening client
//! - `config`: Application configuration

pub mod annotate;
pub mod cache;
pub mod config;
pub mod error;
pub mod glossary;
pub mod link;
pub mod models;
pub mod spam;
pub mod storage;
pub mod vocabulary;

pub use annotate::{annotate, escape_html, AnnotateError};
pub use cache::{CacheError, EntryCountCache, RetryPolicy, StarCache};
pub use config::{Config, StarStorage};
pub use error::{GlossaryError, GlossaryResult};
pub use glossary::{Glossary, GlossaryBuilder, InitSummary};
pub use link::{KeywordLinks, LinkBuilder};
pub use models::{Entry, Page, RenderedEntry, Star};
pub use spam::{HttpSpamCheck, PermissiveSpamCheck, SpamCheck, SpamCheckError};
pub use storage::{EntryStore, SqliteStore, StorageError, Upserted};
pub use vocabulary::{Vocabulary, VocabularyIndex};
