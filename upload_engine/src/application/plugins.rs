//! Reference plugins (C12): a structured logger and a statistics
//! aggregator. Both are ordinary `Plugin` implementations — nothing in
//! `UploadManager` privileges them.
//!
//! Both tolerate events arriving out of the usual lifecycle order (a
//! `progress` event before a `start`, for instance): neither hook reads
//! any state the other hooks are responsible for initializing, so there
//! is nothing to miss.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};

use parking_lot::Mutex;
use tracing::{error, info, warn};

use upload_domain::value_objects::event::ProgressSnapshot;

use crate::application::upload_manager::Plugin;

/// Which lifecycle events to emit a log line for. Defaults to every kind;
/// construct with `LoggerPlugin::new` and toggle fields to narrow it.
#[derive(Debug, Clone, Copy)]
pub struct LoggerPluginConfig {
    pub log_created: bool,
    pub log_start: bool,
    pub log_progress: bool,
    pub log_success: bool,
    pub log_error: bool,
    pub log_pause: bool,
    pub log_resume: bool,
    pub log_cancel: bool,
}

impl Default for LoggerPluginConfig {
    fn default() -> Self {
        Self {
            log_created: true,
            log_start: true,
            log_progress: false,
            log_success: true,
            log_error: true,
            log_pause: true,
            log_resume: true,
            log_cancel: true,
        }
    }
}

/// Emits one structured log line per configured lifecycle event.
pub struct LoggerPlugin {
    config: LoggerPluginConfig,
}

impl LoggerPlugin {
    pub fn new(config: LoggerPluginConfig) -> Self {
        Self { config }
    }
}

impl Default for LoggerPlugin {
    fn default() -> Self {
        Self::new(LoggerPluginConfig::default())
    }
}

impl Plugin for LoggerPlugin {
    fn name(&self) -> &str {
        "logger"
    }

    fn on_task_created(&self, task_id: &str) {
        if self.config.log_created {
            info!(task_id, "task created");
        }
    }

    fn on_task_start(&self, task_id: &str) {
        if self.config.log_start {
            info!(task_id, "task started");
        }
    }

    fn on_task_progress(&self, task_id: &str, progress: &ProgressSnapshot) {
        if self.config.log_progress {
            info!(task_id, percentage = progress.percentage, uploaded_chunks = progress.uploaded_chunks, total_chunks = progress.total_chunks, "task progress");
        }
    }

    fn on_task_success(&self, task_id: &str, file_url: &str) {
        if self.config.log_success {
            info!(task_id, file_url, "task succeeded");
        }
    }

    fn on_task_error(&self, task_id: &str, error: &str) {
        if self.config.log_error {
            error!(task_id, error, "task failed");
        }
    }

    fn on_task_pause(&self, task_id: &str) {
        if self.config.log_pause {
            warn!(task_id, "task paused");
        }
    }

    fn on_task_resume(&self, task_id: &str) {
        if self.config.log_resume {
            info!(task_id, "task resumed");
        }
    }

    fn on_task_cancel(&self, task_id: &str) {
        if self.config.log_cancel {
            warn!(task_id, "task cancelled");
        }
    }
}

/// A point-in-time read of `StatisticsPlugin`'s counters.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct AggregatedStatistics {
    pub total_tasks: u64,
    pub successes: u64,
    pub errors: u64,
    pub cancellations: u64,
    pub total_bytes: u64,
    /// Sum of per-task elapsed time, in milliseconds, across every
    /// terminal task observed so far — not wall-clock time, since tasks
    /// run concurrently.
    pub total_time_ms: u64,
}

impl AggregatedStatistics {
    /// `totalBytes / totalTime`, in bytes/second. `0.0` until at least
    /// one task has completed (avoids a division by zero).
    pub fn average_speed(&self) -> f64 {
        if self.total_time_ms == 0 {
            0.0
        } else {
            self.total_bytes as f64 / (self.total_time_ms as f64 / 1000.0)
        }
    }

    /// `successes / (successes + errors + cancellations)`. `0.0` if no
    /// task has reached a terminal state yet.
    pub fn success_rate(&self) -> f64 {
        let terminal = self.successes + self.errors + self.cancellations;
        if terminal == 0 {
            0.0
        } else {
            self.successes as f64 / terminal as f64
        }
    }
}

/// Counts lifecycle totals and derives `averageSpeed`/`successRate`.
/// Each counter is an independent atomic, so concurrent tasks updating
/// it never need a shared lock.
#[derive(Default)]
pub struct StatisticsPlugin {
    total_tasks: AtomicU64,
    successes: AtomicU64,
    errors: AtomicU64,
    cancellations: AtomicU64,
    total_bytes: AtomicU64,
    total_time_ms: AtomicU64,
    started_at_ms: AtomicU64,
    /// Last-seen `uploadedBytes` per task id, so concurrent tasks'
    /// progress events sum correctly instead of colliding on one shared
    /// counter.
    last_bytes_by_task: Mutex<HashMap<String, u64>>,
}

impl StatisticsPlugin {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn snapshot(&self) -> AggregatedStatistics {
        AggregatedStatistics {
            total_tasks: self.total_tasks.load(Ordering::Relaxed),
            successes: self.successes.load(Ordering::Relaxed),
            errors: self.errors.load(Ordering::Relaxed),
            cancellations: self.cancellations.load(Ordering::Relaxed),
            total_bytes: self.total_bytes.load(Ordering::Relaxed),
            total_time_ms: self.total_time_ms.load(Ordering::Relaxed),
        }
    }
}

impl Plugin for StatisticsPlugin {
    fn name(&self) -> &str {
        "statistics"
    }

    fn on_task_created(&self, _task_id: &str) {
        self.total_tasks.fetch_add(1, Ordering::Relaxed);
    }

    fn on_task_start(&self, _task_id: &str) {
        self.started_at_ms.store(now_ms(), Ordering::Relaxed);
    }

    fn on_task_success(&self, _task_id: &str, _file_url: &str) {
        self.successes.fetch_add(1, Ordering::Relaxed);
        self.accumulate_elapsed();
    }

    fn on_task_error(&self, _task_id: &str, _error: &str) {
        self.errors.fetch_add(1, Ordering::Relaxed);
        self.accumulate_elapsed();
    }

    fn on_task_cancel(&self, _task_id: &str) {
        self.cancellations.fetch_add(1, Ordering::Relaxed);
        self.accumulate_elapsed();
    }

    fn on_task_progress(&self, task_id: &str, progress: &ProgressSnapshot) {
        let mut last_seen = self.last_bytes_by_task.lock();
        let previous = last_seen.insert(task_id.to_string(), progress.uploaded_bytes).unwrap_or(0);
        let delta = progress.uploaded_bytes.saturating_sub(previous);
        self.total_bytes.fetch_add(delta, Ordering::Relaxed);
    }
}

impl StatisticsPlugin {
    fn accumulate_elapsed(&self) {
        let started = self.started_at_ms.load(Ordering::Relaxed);
        if started == 0 {
            return; // a terminal event arrived before `start` (out-of-order); nothing to add.
        }
        let elapsed = now_ms().saturating_sub(started);
        self.total_time_ms.fetch_add(elapsed.max(0) as u64, Ordering::Relaxed);
    }
}

fn now_ms() -> u64 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or(0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn average_speed_is_zero_before_any_completion() {
        let stats = AggregatedStatistics::default();
        assert_eq!(stats.average_speed(), 0.0);
    }

    #[test]
    fn success_rate_divides_by_terminal_count_only() {
        let stats = AggregatedStatistics {
            successes: 3,
            errors: 1,
            cancellations: 0,
            ..Default::default()
        };
        assert_eq!(stats.success_rate(), 0.75);
    }

    #[test]
    fn progress_before_start_does_not_panic() {
        let plugin = StatisticsPlugin::new();
        plugin.on_task_progress("t", &ProgressSnapshot {
            uploaded_bytes: 10,
            total_bytes: 100,
            percentage: 10.0,
            speed: 0.0,
            remaining_time: None,
            uploaded_chunks: 1,
            total_chunks: 10,
        });
        assert_eq!(plugin.snapshot().total_bytes, 10);
    }

    #[test]
    fn error_before_start_does_not_add_negative_elapsed() {
        let plugin = StatisticsPlugin::new();
        plugin.on_task_error("t", "boom");
        assert_eq!(plugin.snapshot().total_time_ms, 0);
        assert_eq!(plugin.snapshot().errors, 1);
    }
}
