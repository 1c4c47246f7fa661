//! Repository layer: a catalog database plus a content-addressed blob store.
//!
//! A repository directory holds `catalog.db` and a `store/` tree sharded on
//! the first two hex characters of each item's content hash. Import moves
//! media files into the store and catalogs them; the integrity check diffs
//! the catalog against what the store tree actually holds.

pub mod hasher;
pub mod repo;

pub use repo::{IntegrityIssue, Repo, RepoError};
