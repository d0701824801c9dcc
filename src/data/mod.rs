//! Data layer module
//!
//! The three keyed stores behind the timeline service:
//! - Follow graph (follower sets)
//! - Tweets (expiring after 24h)
//! - Timelines (bounded newest-first ID lists)
//!
//! Two backends implement all of them: an in-memory store and SQLite.

mod cache;
mod database;
mod models;
mod store;

pub use cache::MemoryStore;
pub use database::SqliteStore;
pub use models::*;
pub use store::*;
