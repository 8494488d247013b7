//! Lifecycle events emitted by an `UploadTask` (C4 Event Bus payloads).
//!
//! These are plain data; the pub/sub mechanism (topic registration,
//! synchronous dispatch, wildcard subscription) lives in `upload_engine`
//! since it is an infrastructure/orchestration concern, not a value
//! object. Keeping the event payloads here lets both the engine and any
//! downstream consumer (plugins, a UI adapter) depend on one definition.

use serde::{Deserialize, Serialize};

/// A snapshot of upload progress, as reported by `getProgress` and carried
/// on the `progress` event.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ProgressSnapshot {
    pub uploaded_bytes: u64,
    pub total_bytes: u64,
    pub percentage: f64,
    /// Bytes/second, smoothed over the task's recent chunk completions.
    pub speed: f64,
    /// Estimated seconds remaining at the current speed; `None` if speed
    /// is not yet known (e.g. before the first chunk completes).
    pub remaining_time: Option<f64>,
    pub uploaded_chunks: u32,
    pub total_chunks: u32,
}

/// Every lifecycle event an `UploadTask` can emit. Variant names match the
/// topic names used by `EventBus::emit` one-to-one.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum UploadEvent {
    Start,
    Progress(ProgressSnapshot),
    ChunkSuccess { chunk_index: u32 },
    ChunkError { chunk_index: u32, error: String },
    HashProgress { percentage: f64 },
    HashComplete { hash: String },
    Success { file_url: String },
    Error { error: String },
    Pause,
    Resume,
    Cancel,
}

impl UploadEvent {
    /// The topic name this event is delivered under, matching the names
    /// in the component's lifecycle-event list.
    pub fn topic(&self) -> &'static str {
        match self {
            UploadEvent::Start => "start",
            UploadEvent::Progress(_) => "progress",
            UploadEvent::ChunkSuccess { .. } => "chunkSuccess",
            UploadEvent::ChunkError { .. } => "chunkError",
            UploadEvent::HashProgress { .. } => "hashProgress",
            UploadEvent::HashComplete { .. } => "hashComplete",
            UploadEvent::Success { .. } => "success",
            UploadEvent::Error { .. } => "error",
            UploadEvent::Pause => "pause",
            UploadEvent::Resume => "resume",
            UploadEvent::Cancel => "cancel",
        }
    }

    /// Whether this event is one of the fire-once terminal transitions.
    pub fn is_terminal(&self) -> bool {
        matches!(self, UploadEvent::Success { .. } | UploadEvent::Error { .. } | UploadEvent::Cancel)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn topic_names_match_lifecycle_vocabulary() {
        assert_eq!(UploadEvent::Start.topic(), "start");
        assert_eq!(UploadEvent::ChunkSuccess { chunk_index: 0 }.topic(), "chunkSuccess");
        assert_eq!(
            UploadEvent::ChunkError {
                chunk_index: 0,
                error: "x".into()
            }
            .topic(),
            "chunkError"
        );
        assert_eq!(UploadEvent::Cancel.topic(), "cancel");
    }

    #[test]
    fn only_success_error_cancel_are_terminal() {
        assert!(UploadEvent::Success { file_url: "u".into() }.is_terminal());
        assert!(UploadEvent::Error { error: "e".into() }.is_terminal());
        assert!(UploadEvent::Cancel.is_terminal());
        assert!(!UploadEvent::Start.is_terminal());
        assert!(!UploadEvent::Pause.is_terminal());
    }
}
