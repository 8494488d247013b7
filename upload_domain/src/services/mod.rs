//! Port traits (capability interfaces) that the domain depends on but does
//! not implement.
//!
//! Mirrors the reference architecture's `services` module: the domain
//! defines the contract, infrastructure crates (`upload_engine`,
//! `upload_server`) provide concrete adapters selected at construction.
//! Per the design notes, there is no dynamic plugin registry here — just
//! small capability traits wired up by the caller.

pub mod blob_store;
pub mod metadata_store;
pub mod progress_store;
pub mod request_adapter;

pub use blob_store::BlobStore;
pub use metadata_store::MetadataStore;
pub use progress_store::ProgressStore;
pub use request_adapter::{
    CreateFileResponse, MergeFileResponse, RequestAdapter, UploadChunkResponse, VerifyHashResponse,
};
