//! `MetadataStore` implementations (C10).

pub mod memory;
pub mod sqlite;

pub use memory::InMemoryMetadataStore;
pub use sqlite::SqliteMetadataStore;
