//! Supporting services driven by `UploadTask`: bounded concurrency
//! (C3), pub/sub (C4), file access (C1 boundary), and the task itself
//! (C7).

pub mod concurrency_limiter;
pub mod event_bus;
pub mod file_source;
pub mod upload_task;

pub use concurrency_limiter::ConcurrencyLimiter;
pub use event_bus::{EventBus, SubscriptionId};
pub use file_source::{FileSource, LocalFileSource};
pub use upload_task::{UploadTask, UploadTaskOptions};
