//! SQLite backend for the Mull schedule store.
//!
//! Wraps [`tokio_rusqlite`] so all database access runs on a dedicated thread
//! without blocking the async runtime. Compound writes (review completion,
//! tier reconciliation) execute inside a single transaction on that thread,
//! which is what serialises concurrent mutations of the same schedule pair.

mod encode;
mod schema;
mod store;

pub mod error;

pub use error::{Error, Result};
pub use store::SqliteStore;
