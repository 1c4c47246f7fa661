//! The catalog store: one connection to a validated database file.

use std::path::Path;

use reelvault_catalog::{Collection, Item};
use rusqlite::{Connection, OpenFlags, params};
use thiserror::Error;

use crate::schema::{self, SchemaError};

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),
    #[error("item with hash '{0}' already exists in the catalog")]
    Duplicate(String),
}

/// A handle to an open, schema-validated catalog database.
///
/// The connection is not safe for concurrent use; callers that share a
/// `CatalogDb` across tasks must serialize access (the server wraps it in a
/// mutex).
#[derive(Debug)]
pub struct CatalogDb {
    conn: Connection,
}

impl CatalogDb {
    /// Open the catalog at `path`, creating it when absent.
    ///
    /// A missing file is created with the full schema and returned directly.
    /// An existing file is opened without the create flag and must pass the
    /// structural validation gate; on `SchemaError::Corrupt` the file is
    /// left untouched (validation only reads).
    pub fn connect(path: &Path) -> Result<Self, SchemaError> {
        let conn = if path.exists() {
            let conn = Connection::open_with_flags(
                path,
                OpenFlags::SQLITE_OPEN_READ_WRITE | OpenFlags::SQLITE_OPEN_NO_MUTEX,
            )?;
            schema::validate_schema(&conn)?;
            conn
        } else {
            let conn = Connection::open(path)?;
            schema::create_schema(&conn)?;
            conn
        };
        conn.execute_batch("PRAGMA foreign_keys=ON;")?;
        Ok(Self { conn })
    }

    /// Fetch every collection with its items, in collection-id order.
    ///
    /// Runs inside a single read transaction so the collection pass and the
    /// per-collection item passes see one snapshot even with a concurrent
    /// writer.
    pub fn get_collections(&mut self) -> Result<Vec<Collection>, StoreError> {
        let tx = self.conn.transaction()?;
        let mut collections = Vec::new();
        {
            let mut collections_stmt = tx.prepare(
                "SELECT collection_id, title FROM collections ORDER BY collection_id",
            )?;
            let mut items_stmt = tx.prepare(
                "SELECT hash, ext FROM items WHERE collection_id = ?1 ORDER BY item_id",
            )?;

            let rows = collections_stmt
                .query_map([], |row| Ok((row.get::<_, i64>(0)?, row.get::<_, String>(1)?)))?;
            for row in rows {
                let (id, title) = row?;
                let items: Vec<Item> = items_stmt
                    .query_map([id], |row| {
                        Ok(Item::new(row.get::<_, String>(0)?, row.get::<_, String>(1)?))
                    })?
                    .collect::<Result<_, _>>()?;
                collections.push(Collection::new(id, title, items));
            }
        }
        tx.commit()?;
        Ok(collections)
    }

    /// Insert a new collection with its items in one transaction.
    ///
    /// Returns the new collection id. Fails with `StoreError::Duplicate`
    /// when any item's hash already exists (hash_index is unique), rolling
    /// the whole insert back.
    pub fn insert_collection(
        &mut self,
        title: &str,
        items: &[Item],
    ) -> Result<i64, StoreError> {
        let tx = self.conn.transaction()?;
        tx.execute(
            "INSERT INTO collections (title) VALUES (?1)",
            params![title],
        )?;
        let collection_id = tx.last_insert_rowid();
        for item in items {
            tx.execute(
                "INSERT INTO items (collection_id, hash, ext) VALUES (?1, ?2, ?3)",
                params![collection_id, item.hash(), item.ext()],
            )
            .map_err(|err| map_unique_violation(err, item.hash()))?;
        }
        tx.commit()?;
        Ok(collection_id)
    }

    /// Get or create a tag by name, returning its id.
    pub fn ensure_tag(&self, name: &str) -> Result<i64, StoreError> {
        self.conn
            .execute("INSERT OR IGNORE INTO tags (name) VALUES (?1)", params![name])?;
        let tag_id = self.conn.query_row(
            "SELECT tag_id FROM tags WHERE name = ?1",
            params![name],
            |row| row.get(0),
        )?;
        Ok(tag_id)
    }

    /// Attach a tag to a collection (no-op when already attached).
    pub fn tag_collection(&self, collection_id: i64, tag_id: i64) -> Result<(), StoreError> {
        self.conn.execute(
            "INSERT OR IGNORE INTO collection_tag (collection_id, tag_id) VALUES (?1, ?2)",
            params![collection_id, tag_id],
        )?;
        Ok(())
    }

    /// Whether an item with this content hash is already cataloged.
    pub fn contains_hash(&self, hash: &str) -> Result<bool, StoreError> {
        let exists: bool = self.conn.query_row(
            "SELECT EXISTS(SELECT 1 FROM items WHERE hash = ?1)",
            params![hash],
            |row| row.get(0),
        )?;
        Ok(exists)
    }

    /// Every cataloged item ordered by hash, the shape the integrity check
    /// diffs against the store tree.
    pub fn all_items(&self) -> Result<Vec<Item>, StoreError> {
        let mut stmt = self.conn.prepare("SELECT hash, ext FROM items ORDER BY hash")?;
        let items = stmt
            .query_map([], |row| {
                Ok(Item::new(row.get::<_, String>(0)?, row.get::<_, String>(1)?))
            })?
            .collect::<Result<_, _>>()?;
        Ok(items)
    }
}

/// Surface a unique-constraint failure on the hash index as a duplicate.
fn map_unique_violation(err: rusqlite::Error, hash: &str) -> StoreError {
    if let rusqlite::Error::SqliteFailure(failure, _) = &err {
        if failure.code == rusqlite::ErrorCode::ConstraintViolation {
            return StoreError::Duplicate(hash.to_string());
        }
    }
    StoreError::Sqlite(err)
}
