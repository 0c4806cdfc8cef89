use std::path::Path;

use chrono::NaiveDate;
use rusqlite::{Connection, OptionalExtension, params};

use super::{Collection, Item, ItemStore, Result, StoreError};

/// SQLite-backed item store. Collections carry a UNIQUE(name) constraint,
/// which is what makes concurrent first-member creation converge.
pub struct SqliteStore {
    pub conn: Connection,
}

impl SqliteStore {
    pub fn open(path: &Path) -> Result<Self> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).ok();
        }
        let conn = Connection::open(path)?;
        let store = Self { conn };
        store.init()?;
        Ok(store)
    }

    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        let store = Self { conn };
        store.init()?;
        Ok(store)
    }

    fn init(&self) -> Result<()> {
        // WAL mode for better concurrent read performance
        self.conn.pragma_update(None, "journal_mode", "WAL")?;
        self.conn.pragma_update(None, "synchronous", "NORMAL")?;
        self.conn.pragma_update(None, "foreign_keys", "ON")?;
        self.migrate()?;
        Ok(())
    }

    fn migrate(&self) -> Result<()> {
        let version: i32 = self
            .conn
            .pragma_query_value(None, "user_version", |row| row.get(0))
            .unwrap_or(0);

        if version < 1 {
            self.migrate_v1()?;
        }

        self.conn.pragma_update(None, "user_version", 1)?;
        Ok(())
    }

    fn migrate_v1(&self) -> Result<()> {
        self.conn.execute_batch(
            "
            CREATE TABLE IF NOT EXISTS items (
                id          INTEGER PRIMARY KEY AUTOINCREMENT,
                name        TEXT NOT NULL,
                date        TEXT,
                overview    TEXT,
                created_at  TEXT NOT NULL DEFAULT (datetime('now'))
            );
            CREATE INDEX IF NOT EXISTS idx_items_date ON items(date);

            CREATE TABLE IF NOT EXISTS collections (
                id          INTEGER PRIMARY KEY AUTOINCREMENT,
                name        TEXT NOT NULL UNIQUE,
                created_at  TEXT NOT NULL DEFAULT (datetime('now'))
            );

            CREATE TABLE IF NOT EXISTS collection_members (
                collection_id INTEGER NOT NULL REFERENCES collections(id) ON DELETE CASCADE,
                item_id       INTEGER NOT NULL REFERENCES items(id) ON DELETE CASCADE,
                added_at      TEXT NOT NULL DEFAULT (datetime('now')),
                UNIQUE(collection_id, item_id)
            );
            CREATE INDEX IF NOT EXISTS idx_members_item ON collection_members(item_id);
            ",
        )?;
        Ok(())
    }

    /// Persist an item, assigning it a durable id. Host-side helper.
    pub fn insert_item(&self, item: &Item) -> Result<i64> {
        self.conn.execute(
            "INSERT INTO items (name, date, overview) VALUES (?1, ?2, ?3)",
            params![
                item.name,
                item.date.map(|d| d.to_string()),
                item.overview,
            ],
        )?;
        Ok(self.conn.last_insert_rowid())
    }

    /// Item ids belonging to a collection, in insertion order.
    pub fn members(&self, collection_id: i64) -> Result<Vec<i64>> {
        let mut stmt = self.conn.prepare(
            "SELECT item_id FROM collection_members
             WHERE collection_id = ?1 ORDER BY added_at, item_id",
        )?;
        let ids = stmt
            .query_map(params![collection_id], |row| row.get(0))?
            .collect::<std::result::Result<Vec<i64>, _>>()?;
        Ok(ids)
    }

    pub fn collection_count(&self) -> Result<i64> {
        let count =
            self.conn
                .query_row("SELECT COUNT(*) FROM collections", [], |row| row.get(0))?;
        Ok(count)
    }
}

impl ItemStore for SqliteStore {
    fn find_collection(&self, name: &str) -> Result<Option<Collection>> {
        let found = self
            .conn
            .query_row(
                "SELECT id, name FROM collections WHERE name = ?1",
                params![name],
                |row| {
                    Ok(Collection {
                        id: row.get(0)?,
                        name: row.get(1)?,
                    })
                },
            )
            .optional()?;
        Ok(found)
    }

    fn create_collection(&self, name: &str) -> Result<Collection> {
        // Find-or-create under the UNIQUE constraint: a concurrent creator
        // wins the insert and we read their row back.
        self.conn.execute(
            "INSERT OR IGNORE INTO collections (name) VALUES (?1)",
            params![name],
        )?;
        self.find_collection(name)?
            .ok_or_else(|| StoreError::AlreadyExists(name.to_string()))
    }

    fn add_to_collection(&self, collection_id: i64, item_id: i64) -> Result<bool> {
        let inserted = self.conn.execute(
            "INSERT OR IGNORE INTO collection_members (collection_id, item_id) VALUES (?1, ?2)",
            params![collection_id, item_id],
        )?;
        Ok(inserted > 0)
    }

    fn items_in_date_range(&self, start: NaiveDate, end: NaiveDate) -> Result<Vec<Item>> {
        let mut stmt = self.conn.prepare(
            "SELECT id, name, date, overview FROM items
             WHERE date IS NOT NULL AND date >= ?1 AND date <= ?2
             ORDER BY date, id",
        )?;
        let items = stmt
            .query_map(params![start.to_string(), end.to_string()], |row| {
                let date: Option<String> = row.get(2)?;
                Ok(Item {
                    id: Some(row.get(0)?),
                    name: row.get(1)?,
                    date: date.and_then(|d| NaiveDate::parse_from_str(&d, "%Y-%m-%d").ok()),
                    overview: row.get(3)?,
                })
            })?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(items)
    }
}
