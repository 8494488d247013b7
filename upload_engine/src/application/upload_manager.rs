//! Upload Manager (C8): a registry of `taskId` → `UploadTask`, the resume
//! workflow, and the plugin system.
//!
//! Follows the same exception-isolation discipline as `EventBus`
//! (`application/services/event_bus.rs`): every plugin hook call is
//! wrapped in `catch_unwind` so one misbehaving plugin cannot take down
//! dispatch to the next, or to the task that triggered it.

use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::Arc;

use parking_lot::Mutex;
use rand::Rng;
use tracing::warn;

use upload_domain::value_objects::event::{ProgressSnapshot, UploadEvent};
use upload_domain::value_objects::file_info::FileInfo;
use upload_domain::value_objects::task_status::TaskStatus;
use upload_domain::value_objects::upload_record::UploadRecord;
use upload_domain::{ProgressStore, RequestAdapter, UploadError};

use crate::application::services::file_source::FileSource;
use crate::application::services::upload_task::{UploadTask, UploadTaskOptions};

/// Per-status task counts, as returned by `get_statistics`. `Hashing` has
/// no dedicated bucket — a task mid-hash is still "busy" from an
/// operator's point of view, so it is folded into `uploading`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ManagerStatistics {
    pub total: usize,
    pub idle: usize,
    pub uploading: usize,
    pub paused: usize,
    pub success: usize,
    pub error: usize,
    pub cancelled: usize,
}

/// A bundle of lifecycle hooks invoked as the manager's tasks progress.
/// Every method has a no-op default so a plugin need only override the
/// hooks it cares about. Hooks receive plain data, not the task itself,
/// so a plugin cannot reach back into task internals.
pub trait Plugin: Send + Sync {
    fn name(&self) -> &str;

    /// Called once, synchronously, when `UploadManager::use_plugin`
    /// registers this plugin.
    fn install(&self) {}

    fn on_task_created(&self, _task_id: &str) {}
    fn on_task_start(&self, _task_id: &str) {}
    fn on_task_progress(&self, _task_id: &str, _progress: &ProgressSnapshot) {}
    fn on_task_success(&self, _task_id: &str, _file_url: &str) {}
    fn on_task_error(&self, _task_id: &str, _error: &str) {}
    fn on_task_pause(&self, _task_id: &str) {}
    fn on_task_resume(&self, _task_id: &str) {}
    fn on_task_cancel(&self, _task_id: &str) {}
}

/// Shared, construction-time configuration for every task the manager
/// creates: the adapter and progress store are capabilities injected
/// once and reused across all tasks; `default_task_options` seeds
/// per-task tuning that `create_task`/`resume_task` may override.
pub struct UploadManagerOptions {
    pub adapter: Arc<dyn RequestAdapter>,
    pub progress_store: Arc<dyn ProgressStore>,
}

struct Entry {
    id: String,
    task: Arc<UploadTask>,
}

/// Registry of in-flight and completed upload tasks, plus the plugin
/// system (C12). `get_all_tasks` preserves insertion order; deletion
/// removes an entry from that order rather than leaving a tombstone.
pub struct UploadManager {
    adapter: Arc<dyn RequestAdapter>,
    progress_store: Arc<dyn ProgressStore>,
    tasks: Mutex<Vec<Entry>>,
    plugins: Arc<Mutex<Vec<Arc<dyn Plugin>>>>,
}

impl UploadManager {
    pub fn new(options: UploadManagerOptions) -> Self {
        Self {
            adapter: options.adapter,
            progress_store: options.progress_store,
            tasks: Mutex::new(Vec::new()),
            plugins: Arc::new(Mutex::new(Vec::new())),
        }
    }

    /// Opens the progress store. Call once before `create_task`/`resume_task`.
    pub async fn init(&self) -> Result<(), UploadError> {
        self.progress_store.init().await
    }

    /// Registers a plugin and invokes its `install` hook immediately.
    /// Duplicate plugin names are permitted — the manager does not
    /// dedup by name, mirroring the reference behavior.
    pub fn use_plugin(&self, plugin: Arc<dyn Plugin>) {
        guarded_call(&plugin, "install", |p| p.install());
        self.plugins.lock().push(plugin);
    }

    /// Creates and registers a new task. The task is not started;
    /// callers invoke `UploadTask::start` explicitly.
    pub fn create_task(
        &self,
        file_info: FileInfo,
        file_source: Arc<dyn FileSource>,
        options: UploadTaskOptions,
    ) -> Result<Arc<UploadTask>, UploadError> {
        let id = random_task_id();
        let task = UploadTask::new(id.clone(), file_info, file_source, self.adapter.clone(), self.progress_store.clone(), options)?;
        self.wire_plugins(&task, &id);
        self.tasks.lock().push(Entry { id: id.clone(), task: task.clone() });

        dispatch(&self.plugins, |p| p.on_task_created(&id));
        Ok(task)
    }

    pub fn get_task(&self, task_id: &str) -> Option<Arc<UploadTask>> {
        self.tasks.lock().iter().find(|e| e.id == task_id).map(|e| e.task.clone())
    }

    /// All registered tasks, in the order they were created.
    pub fn get_all_tasks(&self) -> Vec<Arc<UploadTask>> {
        self.tasks.lock().iter().map(|e| e.task.clone()).collect()
    }

    /// Removes a task from the registry, cancelling it first if it is
    /// still active. Progress-record cleanup is best-effort: a failure
    /// to delete the record is logged and otherwise ignored.
    pub async fn delete_task(&self, task_id: &str) -> Result<(), UploadError> {
        let task = self.get_task(task_id);
        if let Some(task) = task {
            if !task.get_status().is_terminal() {
                let _ = task.cancel().await;
            }
            if let Err(e) = self.progress_store.delete_record(task_id).await {
                warn!(task_id, error = %e, "best-effort progress record cleanup failed");
            }
        }
        self.tasks.lock().retain(|e| e.id != task_id);
        Ok(())
    }

    /// Pauses every non-terminal task. Invalid-transition errors (e.g. a
    /// task still hashing) are logged and skipped rather than propagated.
    pub fn pause_all(&self) {
        for task in self.get_all_tasks() {
            if let Err(e) = task.pause() {
                warn!(task_id = task.id(), error = %e, "pause_all: skipping task");
            }
        }
    }

    pub fn resume_all(&self) {
        for task in self.get_all_tasks() {
            if let Err(e) = task.resume() {
                warn!(task_id = task.id(), error = %e, "resume_all: skipping task");
            }
        }
    }

    pub async fn cancel_all(&self) {
        for task in self.get_all_tasks() {
            if let Err(e) = task.cancel().await {
                warn!(task_id = task.id(), error = %e, "cancel_all: skipping task");
            }
        }
    }

    /// Drops every task whose status is terminal (`success`, `error`, or
    /// `cancelled`) from the registry. Progress records for those tasks
    /// were already cleared on the transition itself (see `UploadTask`);
    /// this only forgets the in-memory handle.
    pub fn clear_completed_tasks(&self) {
        self.tasks.lock().retain(|e| !e.task.get_status().is_terminal());
    }

    pub fn get_statistics(&self) -> ManagerStatistics {
        let tasks = self.tasks.lock();
        let mut stats = ManagerStatistics { total: tasks.len(), ..Default::default() };
        for entry in tasks.iter() {
            match entry.task.get_status() {
                TaskStatus::Idle => stats.idle += 1,
                TaskStatus::Hashing | TaskStatus::Uploading => stats.uploading += 1,
                TaskStatus::Paused => stats.paused += 1,
                TaskStatus::Success => stats.success += 1,
                TaskStatus::Error => stats.error += 1,
                TaskStatus::Cancelled => stats.cancelled += 1,
            }
        }
        stats
    }

    /// Cancels every task, closes the progress store, and empties the
    /// registry. Idempotent.
    pub async fn close(&self) -> Result<(), UploadError> {
        self.cancel_all().await;
        self.progress_store.close().await?;
        self.tasks.lock().clear();
        Ok(())
    }

    /// Persisted records for tasks that did not reach a terminal state
    /// before the process last exited. The caller (a UI, typically) must
    /// re-select the underlying file before calling `resume_task`, since
    /// file bytes themselves are never persisted.
    pub async fn get_unfinished_tasks_info(&self) -> Result<Vec<UploadRecord>, UploadError> {
        self.progress_store.get_all_records().await
    }

    /// Resumes a persisted task. `file_info` must match the stored
    /// record's `name`/`size`/`mime_type` exactly (`last_modified` is
    /// informational only); a mismatch returns `UploadError::FileMismatch`
    /// synchronously and registers no task.
    pub async fn resume_task(
        &self,
        task_id: &str,
        file_info: FileInfo,
        file_source: Arc<dyn FileSource>,
        mut options: UploadTaskOptions,
    ) -> Result<Arc<UploadTask>, UploadError> {
        let record = self
            .progress_store
            .get_record(task_id)
            .await?
            .ok_or_else(|| UploadError::NotFound(format!("no persisted record for task {task_id}")))?;
        file_info.matches_for_resume(record.file_info())?;

        options.resume_task_id = Some(task_id.to_string());
        options.resume_upload_token = Some(record.upload_token().to_string());
        options.resume_uploaded_chunks = Some(record.uploaded_chunks().clone());

        let task = UploadTask::new(
            task_id.to_string(),
            file_info,
            file_source,
            self.adapter.clone(),
            self.progress_store.clone(),
            options,
        )?;
        self.wire_plugins(&task, task_id);

        self.progress_store.delete_record(task_id).await?;
        self.tasks.lock().retain(|e| e.id != task_id);
        self.tasks.lock().push(Entry { id: task_id.to_string(), task: task.clone() });

        dispatch(&self.plugins, |p| p.on_task_created(task_id));
        Ok(task)
    }

    /// Subscribes a wildcard handler that fans each task event out to
    /// every registered plugin's matching hook, in registration order.
    fn wire_plugins(&self, task: &Arc<UploadTask>, task_id: &str) {
        let plugins = self.plugins.clone();
        let task_id = task_id.to_string();
        task.on(None, move |event: &UploadEvent| {
            dispatch(&plugins, |p| apply(p.as_ref(), &task_id, event));
        });
    }
}

fn apply(plugin: &dyn Plugin, task_id: &str, event: &UploadEvent) {
    match event {
        UploadEvent::Start => plugin.on_task_start(task_id),
        UploadEvent::Progress(snapshot) => plugin.on_task_progress(task_id, snapshot),
        UploadEvent::Success { file_url } => plugin.on_task_success(task_id, file_url),
        UploadEvent::Error { error } => plugin.on_task_error(task_id, error),
        UploadEvent::Pause => plugin.on_task_pause(task_id),
        UploadEvent::Resume => plugin.on_task_resume(task_id),
        UploadEvent::Cancel => plugin.on_task_cancel(task_id),
        UploadEvent::ChunkSuccess { .. } | UploadEvent::ChunkError { .. } | UploadEvent::HashProgress { .. } | UploadEvent::HashComplete { .. } => {}
    }
}

/// Invokes `f` for every registered plugin, isolating panics the same
/// way `EventBus::emit` isolates a handler panic.
fn dispatch(plugins: &Mutex<Vec<Arc<dyn Plugin>>>, f: impl Fn(&dyn Plugin)) {
    let snapshot: Vec<Arc<dyn Plugin>> = plugins.lock().clone();
    for plugin in &snapshot {
        let plugin_ref = plugin.as_ref();
        let outcome = catch_unwind(AssertUnwindSafe(|| f(plugin_ref)));
        if outcome.is_err() {
            warn!(plugin = plugin.name(), "plugin hook panicked; isolated and continuing");
        }
    }
}

fn guarded_call(plugin: &Arc<dyn Plugin>, hook: &str, f: impl FnOnce(&dyn Plugin)) {
    let plugin_ref = plugin.as_ref();
    let outcome = catch_unwind(AssertUnwindSafe(|| f(plugin_ref)));
    if outcome.is_err() {
        warn!(plugin = plugin.name(), hook, "plugin hook panicked; isolated and continuing");
    }
}

fn random_task_id() -> String {
    let mut rng = rand::rng();
    let bytes: [u8; 16] = rng.random();
    hex::encode(bytes)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::services::file_source::InMemoryFileSource;
    use crate::infrastructure::adapters::local_adapter::LocalAdapter;
    use crate::infrastructure::repositories::memory_progress_store::InMemoryProgressStore;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use upload_server::application::upload_service::UploadService;
    use upload_server::infrastructure::blob_store::memory::InMemoryBlobStore;
    use upload_server::infrastructure::metadata_store::memory::InMemoryMetadataStore;

    struct CountingPlugin {
        created: AtomicUsize,
        successes: AtomicUsize,
    }

    impl Plugin for CountingPlugin {
        fn name(&self) -> &str {
            "counting"
        }
        fn on_task_created(&self, _task_id: &str) {
            self.created.fetch_add(1, Ordering::SeqCst);
        }
        fn on_task_success(&self, _task_id: &str, _file_url: &str) {
            self.successes.fetch_add(1, Ordering::SeqCst);
        }
    }

    struct PanickingPlugin;
    impl Plugin for PanickingPlugin {
        fn name(&self) -> &str {
            "panicker"
        }
        fn on_task_created(&self, _task_id: &str) {
            panic!("boom");
        }
    }

    fn build_manager() -> UploadManager {
        let service = Arc::new(UploadService::new(
            Arc::new(InMemoryBlobStore::default()),
            Arc::new(InMemoryMetadataStore::default()),
            Default::default(),
        ));
        let adapter: Arc<dyn RequestAdapter> = Arc::new(LocalAdapter::new(service));
        let progress_store: Arc<dyn ProgressStore> = Arc::new(InMemoryProgressStore::default());
        UploadManager::new(UploadManagerOptions { adapter, progress_store })
    }

    #[tokio::test]
    async fn create_task_registers_and_notifies_plugins() {
        let manager = build_manager();
        manager.init().await.unwrap();
        let plugin = Arc::new(CountingPlugin { created: AtomicUsize::new(0), successes: AtomicUsize::new(0) });
        manager.use_plugin(plugin.clone());

        let file_info = FileInfo::new("a.bin", 10, "application/octet-stream", 0).unwrap();
        let source = Arc::new(InMemoryFileSource::new(vec![1u8; 10]));
        manager.create_task(file_info, source, UploadTaskOptions::default()).unwrap();

        assert_eq!(manager.get_all_tasks().len(), 1);
        assert_eq!(plugin.created.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn a_panicking_plugin_does_not_stop_a_later_plugin() {
        let manager = build_manager();
        manager.init().await.unwrap();
        manager.use_plugin(Arc::new(PanickingPlugin));
        let plugin = Arc::new(CountingPlugin { created: AtomicUsize::new(0), successes: AtomicUsize::new(0) });
        manager.use_plugin(plugin.clone());

        let file_info = FileInfo::new("a.bin", 10, "application/octet-stream", 0).unwrap();
        let source = Arc::new(InMemoryFileSource::new(vec![1u8; 10]));
        manager.create_task(file_info, source, UploadTaskOptions::default()).unwrap();

        assert_eq!(plugin.created.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn get_statistics_counts_by_status() {
        let manager = build_manager();
        manager.init().await.unwrap();
        let file_info = FileInfo::new("a.bin", 10, "application/octet-stream", 0).unwrap();
        let source = Arc::new(InMemoryFileSource::new(vec![1u8; 10]));
        manager.create_task(file_info, source, UploadTaskOptions::default()).unwrap();

        let stats = manager.get_statistics();
        assert_eq!(stats.total, 1);
        assert_eq!(stats.idle, 1);
    }

    #[tokio::test]
    async fn resume_task_rejects_a_size_mismatch() {
        let manager = build_manager();
        manager.init().await.unwrap();

        let original = FileInfo::new("a.bin", 10, "application/octet-stream", 0).unwrap();
        manager
            .progress_store
            .save_record(&UploadRecord::new("task-1", original, "tok", 0))
            .await
            .unwrap();

        let mismatched = FileInfo::new("a.bin", 99, "application/octet-stream", 0).unwrap();
        let source = Arc::new(InMemoryFileSource::new(vec![1u8; 99]));
        let err = manager
            .resume_task("task-1", mismatched, source, UploadTaskOptions::default())
            .await
            .unwrap_err();
        assert!(matches!(err, UploadError::FileMismatch(_)));
    }

    #[tokio::test]
    async fn clear_completed_tasks_removes_cancelled_entries() {
        let manager = build_manager();
        manager.init().await.unwrap();
        let file_info = FileInfo::new("a.bin", 10, "application/octet-stream", 0).unwrap();
        let source = Arc::new(InMemoryFileSource::new(vec![1u8; 10]));
        let task = manager.create_task(file_info, source, UploadTaskOptions::default()).unwrap();
        task.cancel().await.unwrap();

        manager.clear_completed_tasks();
        assert_eq!(manager.get_all_tasks().len(), 0);
    }
}
