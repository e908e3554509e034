//! Queue persistence: SQLite-backed store for queue entries.
//!
//! - `model`: query criteria and view models returned by the store.
//! - `repo`: pool bootstrap and the `QueueStore` SQL operations.
//!
//! The store enforces the one-active-entry-per-key rule with a partial unique
//! index; `QueueStore::enqueue` is the compare-and-insert callers should use.

pub mod model;
pub mod repo;

pub use model::{QueueCriteria, StatusCount};
pub use repo::*;
