//! Domain model for the reelvault media catalog.
//!
//! Value types shared by the store, the repository layer, and the HTTP
//! handlers: content-addressed items and the collections that own them.

pub mod types;

pub use types::{Collection, Item};
