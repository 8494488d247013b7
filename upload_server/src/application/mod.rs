//! Application layer: the `UploadService` use case (C11), the only thing
//! that orchestrates the storage ports into a session-scoped upload
//! protocol.

pub mod upload_service;

pub use upload_service::{FileStream, UploadService, UploadServiceConfig};
