pub mod sqlite;

pub use sqlite::SqliteStore;

use chrono::NaiveDate;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),
    /// Uniqueness conflict on create. The collection manager treats this as
    /// "someone else created it first" and re-resolves by name.
    #[error("already exists: {0}")]
    AlreadyExists(String),
    #[error("Migration failed: {0}")]
    Migration(String),
}

pub type Result<T> = std::result::Result<T, StoreError>;

/// A media item as the host store exposes it.
///
/// The id is absent until the host has persisted the item; membership adds
/// for id-less items are advisory no-ops retried later by the deferred
/// processing path.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Item {
    pub id: Option<i64>,
    pub name: String,
    /// Observed event date.
    pub date: Option<NaiveDate>,
    pub overview: Option<String>,
}

/// A named logical grouping of items.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Collection {
    pub id: i64,
    pub name: String,
}

/// The seam to the host media catalog. The engine needs only name lookup,
/// conflict-tolerant creation, idempotent membership, and a date-window scan.
pub trait ItemStore {
    /// Deterministic name lookup; at most one match.
    fn find_collection(&self, name: &str) -> Result<Option<Collection>>;

    /// Create a collection with this exact name. On a name conflict a
    /// conforming implementation either returns the existing collection or
    /// `StoreError::AlreadyExists` — never a duplicate row.
    fn create_collection(&self, name: &str) -> Result<Collection>;

    /// Add an item to a collection. Returns false when the pair already
    /// exists.
    fn add_to_collection(&self, collection_id: i64, item_id: i64) -> Result<bool>;

    /// All persisted items whose observed date falls in `[start, end]`.
    fn items_in_date_range(&self, start: NaiveDate, end: NaiveDate) -> Result<Vec<Item>>;
}
