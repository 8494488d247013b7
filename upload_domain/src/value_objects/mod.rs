//! Value objects and small typed identifiers shared across the upload
//! engine and the upload server.
//!
//! Following the domain's value-object discipline, every type here is
//! immutable once constructed (construction validates its invariants and
//! returns `Result<Self, UploadError>` where a bad input is possible) and
//! carries no I/O.

pub mod chunk_info;
pub mod chunk_size;
pub mod digest;
pub mod event;
pub mod file_info;
pub mod manifest;
pub mod task_status;
pub mod upload_record;
pub mod upload_token;

pub use chunk_info::ChunkInfo;
pub use chunk_size::ChunkSizeAdjuster;
pub use digest::Digest;
pub use event::UploadEvent;
pub use file_info::FileInfo;
pub use manifest::{Manifest, ManifestStatus, StoredChunk};
pub use task_status::TaskStatus;
pub use upload_record::UploadRecord;
pub use upload_token::UploadToken;
