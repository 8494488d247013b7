//! Progress Store implementations (C5): an in-memory store for tests and
//! short-lived demos, and a sqlite-backed store for durable resume across
//! process restarts.

pub mod memory_progress_store;
pub mod sqlite_progress_store;

pub use memory_progress_store::InMemoryProgressStore;
pub use sqlite_progress_store::SqliteProgressStore;
