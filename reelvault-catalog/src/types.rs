//! Catalog value types.
//!
//! `Item` and `Collection` are immutable once constructed: the store builds
//! them when reconstructing rows, the import pipeline builds them for new
//! entries, and nothing mutates them afterwards.

use std::path::MAIN_SEPARATOR;

use serde_json::{Value, json};

// ── Item ────────────────────────────────────────────────────────────────────

/// A content-addressed media item: hex content digest plus file extension.
///
/// Identity originates from the content hash; two items are equal when both
/// hash and extension match.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Item {
    hash: String,
    ext: String,
}

impl Item {
    /// Create an item from a hex digest and an extension (no leading dot).
    ///
    /// The digest must be at least two characters long; `store_path` shards
    /// on its first two characters.
    pub fn new(hash: impl Into<String>, ext: impl Into<String>) -> Self {
        Self {
            hash: hash.into(),
            ext: ext.into(),
        }
    }

    pub fn hash(&self) -> &str {
        &self.hash
    }

    pub fn ext(&self) -> &str {
        &self.ext
    }

    /// Relative path of this item's blob inside a store tree.
    ///
    /// The first two hex characters form a 256-way shard directory, the rest
    /// of the digest plus the extension form the file name:
    /// `a0/d2139f....mp4`.
    pub fn store_path(&self) -> String {
        format!(
            "{}{}{}.{}",
            &self.hash[..2],
            MAIN_SEPARATOR,
            &self.hash[2..],
            self.ext
        )
    }

    /// JSON projection served by the HTTP layer.
    pub fn to_json(&self) -> Value {
        json!({ "path": self.store_path() })
    }
}

// ── Collection ──────────────────────────────────────────────────────────────

/// A named, ordered collection of items.
///
/// Equality is by id, title, and the full item sequence (order-sensitive).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Collection {
    id: i64,
    title: String,
    items: Vec<Item>,
}

impl Collection {
    pub fn new(id: i64, title: impl Into<String>, items: Vec<Item>) -> Self {
        Self {
            id,
            title: title.into(),
            items,
        }
    }

    pub fn id(&self) -> i64 {
        self.id
    }

    pub fn title(&self) -> &str {
        &self.title
    }

    pub fn items(&self) -> &[Item] {
        &self.items
    }

    /// JSON projection served by the HTTP layer.
    pub fn to_json(&self) -> Value {
        json!({
            "id": self.id,
            "title": self.title,
            "items": self.items.iter().map(Item::to_json).collect::<Vec<_>>(),
        })
    }
}
