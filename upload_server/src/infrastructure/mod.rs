//! Infrastructure layer: storage port implementations (C10) and the HTTP
//! wire surface (§6).

pub mod blob_store;
pub mod http;
pub mod metadata_store;
