//! SQLite persistence layer for the media catalog.
//!
//! A catalog database is never queried blindly: `CatalogDb::connect` either
//! authors a fresh schema or structurally validates an existing file against
//! the expected schema before returning a handle. The expected schema lives
//! in one place (`expected`) and feeds both creation and validation.

pub mod expected;
pub mod schema;
pub mod store;

pub use schema::SchemaError;
pub use store::{CatalogDb, StoreError};
