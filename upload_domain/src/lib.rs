// /////////////////////////////////////////////////////////////////////////////
// Chunked Upload Platform
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! # upload-domain
//!
//! The pure business-logic layer of the chunked upload platform: value
//! objects, the error hierarchy, and the port traits (`RequestAdapter`,
//! `ProgressStore`, `BlobStore`, `MetadataStore`) that infrastructure
//! crates implement.
//!
//! Nothing in this crate performs I/O or holds a runtime handle. Domain
//! traits that cross an I/O boundary (the four port traits) are declared
//! `async` because the boundary itself is inherently asynchronous, but
//! this crate never drives an executor — that is `upload_engine` and
//! `upload_server`'s job.

pub mod error;
pub mod services;
pub mod value_objects;

pub use error::UploadError;
pub use services::{BlobStore, MetadataStore, ProgressStore, RequestAdapter};
pub use value_objects::{ChunkInfo, ChunkSizeAdjuster, Digest, FileInfo, Manifest, TaskStatus, UploadEvent, UploadRecord, UploadToken};
