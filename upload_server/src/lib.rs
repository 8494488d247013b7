//! # Upload Server
//!
//! The content-addressed chunk store and upload service (C9-C11):
//! dedup-by-hash chunk storage, logical file assembly without physical
//! concatenation, and the HTTP surface that a `RequestAdapter`
//! implementation on the client side talks to.
//!
//! ## Module Structure
//!
//! - `application` - the `UploadService` use case (C11)
//! - `infrastructure` - `BlobStore`/`MetadataStore` implementations (C10)
//!   and the axum HTTP surface (§6)

pub mod application;
pub mod infrastructure;
