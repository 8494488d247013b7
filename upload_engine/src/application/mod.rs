//! Application layer: the task state machine (C7), its supporting
//! services (digest/slicer glue, concurrency limiter, event bus, chunk
//! size adjuster access), and the `UploadManager` (C8) that owns a
//! registry of tasks plus the plugin system.

pub mod plugins;
pub mod services;
pub mod upload_manager;

pub use upload_manager::{ManagerStatistics, Plugin, UploadManager, UploadManagerOptions};
