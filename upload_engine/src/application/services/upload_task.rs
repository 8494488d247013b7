//! Upload Task (C7): the per-file state machine, hash/upload scheduler,
//! retry policy, and progress emission.
//!
//! This is the heaviest component in the platform. Shared state lives
//! behind a single mutex and is driven from tasks spawned onto the
//! runtime, rather than from a stage pipeline over one file at a time.

use std::collections::{BTreeSet, VecDeque};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Instant;

use parking_lot::Mutex;
use tokio::sync::Notify;
use tokio::task::JoinSet;
use tracing::{debug, error, info, warn};

use upload_domain::value_objects::chunk_info::{build_plan, ChunkInfo};
use upload_domain::value_objects::chunk_size::ChunkSizeAdjuster;
use upload_domain::value_objects::digest::Digest;
use upload_domain::value_objects::event::{ProgressSnapshot, UploadEvent};
use upload_domain::value_objects::file_info::FileInfo;
use upload_domain::value_objects::task_status::TaskStatus;
use upload_domain::value_objects::upload_record::{UploadRecord, UploadRecordPatch};
use upload_domain::{ProgressStore, RequestAdapter, UploadError};

use crate::application::services::concurrency_limiter::ConcurrencyLimiter;
use crate::application::services::event_bus::{EventBus, SubscriptionId};
use crate::application::services::file_source::FileSource;

/// Default per-chunk retry count (§4.7).
pub const DEFAULT_RETRY_COUNT: u32 = 3;
/// Default exponential-backoff base delay, milliseconds.
pub const DEFAULT_RETRY_DELAY_MS: u64 = 1000;
/// Default client-side chunk concurrency.
pub const DEFAULT_CONCURRENCY: usize = 3;

/// Construction-time configuration and optional resume seed for an
/// [`UploadTask`].
pub struct UploadTaskOptions {
    pub preferred_chunk_size: Option<u64>,
    pub concurrency: usize,
    pub retry_count: u32,
    pub retry_delay_ms: u64,
    pub target_time_ms: u64,
    pub resume_task_id: Option<String>,
    pub resume_upload_token: Option<String>,
    pub resume_uploaded_chunks: Option<BTreeSet<u32>>,
}

impl Default for UploadTaskOptions {
    fn default() -> Self {
        Self {
            preferred_chunk_size: None,
            concurrency: DEFAULT_CONCURRENCY,
            retry_count: DEFAULT_RETRY_COUNT,
            retry_delay_ms: DEFAULT_RETRY_DELAY_MS,
            target_time_ms: ChunkSizeAdjuster::with_defaults().target_time_ms(),
            resume_task_id: None,
            resume_upload_token: None,
            resume_uploaded_chunks: None,
        }
    }
}

struct SharedState {
    status: TaskStatus,
    file_info: FileInfo,
    chunks: Vec<ChunkInfo>,
    /// Per-index content digest, filled in as each chunk is hashed —
    /// independent of whether that chunk still needs an `uploadChunk`
    /// round trip.
    chunk_hashes: Vec<Option<Digest>>,
    uploaded: BTreeSet<u32>,
    /// Indices the task already knows are present server-side (from a
    /// resume seed); these are hashed locally for the merge list but never
    /// re-uploaded.
    known_present: BTreeSet<u32>,
    pending: VecDeque<u32>,
    token: Option<String>,
    file_id: Option<String>,
    file_url: Option<String>,
    bytes_uploaded: u64,
    last_chunk_completed_at: Option<Instant>,
    speed_bps: f64,
}

/// Per-file upload state machine.
///
/// Cloned handles (`Arc<UploadTask>`) share the same state; `start`
/// spawns the driving work onto the runtime and returns immediately, the
/// same as the reference JS engine's non-blocking `start()`.
pub struct UploadTask {
    id: String,
    state: Mutex<SharedState>,
    adjuster: Mutex<ChunkSizeAdjuster>,
    limiter: ConcurrencyLimiter,
    event_bus: EventBus,
    adapter: Arc<dyn RequestAdapter>,
    progress_store: Arc<dyn ProgressStore>,
    file_source: Arc<dyn FileSource>,
    retry_count: u32,
    retry_delay_ms: u64,
    preferred_chunk_size: Option<u64>,
    cancelled: AtomicBool,
    paused: AtomicBool,
    terminal_notify: Notify,
    /// Wakes the `drive` loop on any status transition or file-hash
    /// completion, so it can resume after a pause/cancel without polling.
    wake: Notify,
}

impl UploadTask {
    /// Builds a new task. `id` is typically a random hex string generated
    /// by the caller (`UploadManager`); pass `options.resume_task_id` to
    /// preserve an id across a resumed session.
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        id: String,
        file_info: FileInfo,
        file_source: Arc<dyn FileSource>,
        adapter: Arc<dyn RequestAdapter>,
        progress_store: Arc<dyn ProgressStore>,
        options: UploadTaskOptions,
    ) -> Result<Arc<Self>, UploadError> {
        let limiter = ConcurrencyLimiter::new(options.concurrency)?;
        let adjuster = ChunkSizeAdjuster::new(
            options.preferred_chunk_size.unwrap_or(ChunkSizeAdjuster::with_defaults().current_size() as u64) as usize,
            upload_domain::value_objects::chunk_size::MIN_SIZE,
            upload_domain::value_objects::chunk_size::MAX_SIZE,
            options.target_time_ms,
        )?;

        Ok(Arc::new(Self {
            id,
            state: Mutex::new(SharedState {
                status: TaskStatus::Idle,
                file_info,
                chunks: Vec::new(),
                chunk_hashes: Vec::new(),
                uploaded: options.resume_uploaded_chunks.clone().unwrap_or_default(),
                known_present: options.resume_uploaded_chunks.unwrap_or_default(),
                pending: VecDeque::new(),
                token: options.resume_upload_token,
                file_id: None,
                file_url: None,
                bytes_uploaded: 0,
                last_chunk_completed_at: None,
                speed_bps: 0.0,
            }),
            adjuster: Mutex::new(adjuster),
            limiter,
            event_bus: EventBus::new(),
            adapter,
            progress_store,
            file_source,
            retry_count: options.retry_count,
            retry_delay_ms: options.retry_delay_ms,
            preferred_chunk_size: options.preferred_chunk_size,
            cancelled: AtomicBool::new(false),
            paused: AtomicBool::new(false),
            terminal_notify: Notify::new(),
            wake: Notify::new(),
        }))
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn get_status(&self) -> TaskStatus {
        self.state.lock().status
    }

    pub fn on<F>(&self, topic: Option<&str>, handler: F) -> SubscriptionId
    where
        F: Fn(&UploadEvent) + Send + Sync + 'static,
    {
        self.event_bus.on(topic, handler)
    }

    pub fn off(&self, id: SubscriptionId) {
        self.event_bus.off(id)
    }

    pub fn get_progress(&self) -> ProgressSnapshot {
        let state = self.state.lock();
        let total_bytes = state.file_info.size();
        let percentage = if total_bytes == 0 { 100.0 } else { (state.bytes_uploaded as f64 / total_bytes as f64) * 100.0 };
        let remaining_time = if state.speed_bps > 0.0 {
            Some((total_bytes.saturating_sub(state.bytes_uploaded)) as f64 / state.speed_bps)
        } else {
            None
        };
        ProgressSnapshot {
            uploaded_bytes: state.bytes_uploaded,
            total_bytes,
            percentage,
            speed: state.speed_bps,
            remaining_time,
            uploaded_chunks: state.uploaded.len() as u32,
            total_chunks: state.chunks.len() as u32,
        }
    }

    /// Blocks until the task reaches a terminal status. Test/demo helper —
    /// production callers should subscribe via `on` instead of polling.
    pub async fn wait_for_terminal(&self) {
        loop {
            if self.get_status().is_terminal() {
                return;
            }
            self.terminal_notify.notified().await;
        }
    }

    fn transition(&self, next: TaskStatus) -> Result<(), UploadError> {
        let mut state = self.state.lock();
        TaskStatus::validate_transition(state.status, next)?;
        state.status = next;
        if next.is_terminal() {
            self.terminal_notify.notify_waiters();
        }
        self.wake.notify_one();
        Ok(())
    }

    /// Blocks until `cond` returns `false`, re-evaluating it each time
    /// `wake` fires (status transition or file-hash completion). Uses the
    /// create-then-check-then-await pattern so a `notify_one` that lands
    /// between the check and the await is not lost.
    async fn wait_while<F: Fn() -> bool>(&self, cond: F) {
        loop {
            let notified = self.wake.notified();
            if !cond() {
                return;
            }
            notified.await;
        }
    }

    /// Starts (or, for a resumed task, re-enters) the upload. Returns once
    /// the background drive has been scheduled; it does not wait for
    /// completion.
    pub async fn start(self: &Arc<Self>) -> Result<(), UploadError> {
        {
            let current = self.get_status();
            if current != TaskStatus::Idle {
                return Err(UploadError::InvalidTransition(format!("start from {current:?}")));
            }
        }
        self.transition(TaskStatus::Hashing)?;
        self.event_bus.emit(UploadEvent::Start);

        let (name, size, mime) = {
            let state = self.state.lock();
            (state.file_info.name().to_string(), state.file_info.size(), state.file_info.mime_type().to_string())
        };

        let create = self
            .adapter
            .create_file(&name, size, &mime, self.preferred_chunk_size)
            .await;
        let create = match create {
            Ok(c) => c,
            Err(e) => return self.fail(e).await,
        };

        let plan = match build_plan(size, create.negotiated_chunk_size) {
            Ok(p) => p,
            Err(e) => return self.fail(e).await,
        };

        {
            let mut state = self.state.lock();
            state.chunk_hashes = vec![None; plan.len()];
            let already_known = state.known_present.clone();
            state.pending = (0..plan.len() as u32).filter(|i| !already_known.contains(i)).collect();
            state.chunks = plan;
            state.token = Some(create.upload_token.clone());
        }

        if let Err(e) = self.discover_existing_chunks(&create.upload_token).await {
            return self.fail(e).await;
        }

        let record = UploadRecord::new(&self.id, self.state.lock().file_info.clone(), create.upload_token.clone(), now_ms());
        if let Err(e) = self.progress_store.save_record(&record).await {
            warn!(task_id = %self.id, error = %e, "progress store save failed; continuing in-memory");
        }

        self.transition(TaskStatus::Uploading)?;

        let this = self.clone();
        tokio::spawn(async move {
            this.drive().await;
        });
        Ok(())
    }

    async fn fail(self: &Arc<Self>, err: UploadError) -> Result<(), UploadError> {
        error!(task_id = %self.id, error = %err, "task failed");
        let _ = self.transition(TaskStatus::Error);
        self.event_bus.emit(UploadEvent::Error { error: err.to_string() });
        Err(err)
    }

    /// Hashes every still-pending chunk and asks `verifyHash` which of
    /// them the server already has by content, before any upload is
    /// scheduled (§4.7 step 3). Indices it reports as existing are moved
    /// from `pending` into `known_present`, the same set a resumed task
    /// seeds from its persisted record — `chunk_worker` hashes them for
    /// the merge list without re-uploading.
    async fn discover_existing_chunks(&self, token: &str) -> Result<(), UploadError> {
        let to_check: Vec<(u32, u64, u64)> = {
            let state = self.state.lock();
            state
                .pending
                .iter()
                .map(|&i| {
                    let chunk = &state.chunks[i as usize];
                    (i, chunk.start(), chunk.end())
                })
                .collect()
        };
        if to_check.is_empty() {
            return Ok(());
        }

        let mut chunk_hashes = Vec::with_capacity(to_check.len());
        for &(_, start, end) in &to_check {
            let bytes = self.file_source.read_range(start, end).await?;
            chunk_hashes.push(Digest::of_bytes(&bytes).to_string());
        }

        let verify = self.adapter.verify_hash(token, None, Some(&chunk_hashes)).await?;
        if verify.existing_chunks.is_empty() {
            return Ok(());
        }

        let mut state = self.state.lock();
        for local_idx in verify.existing_chunks {
            if let Some(&(chunk_index, _, _)) = to_check.get(local_idx as usize) {
                state.known_present.insert(chunk_index);
                state.pending.retain(|&p| p != chunk_index);
            }
        }
        Ok(())
    }

    /// Drives hashing and chunk upload concurrently, then merges. Runs on
    /// a spawned task; all errors terminate via `error` events rather than
    /// propagating to a caller.
    ///
    /// `chunk_worker` is re-entered in a loop rather than once: a `pause`
    /// makes it return early with chunks still pending, and this loop
    /// blocks on `wake` until `resume` (or `cancel`) rather than falling
    /// through to `finalize` with an incomplete chunk plan.
    async fn drive(self: Arc<Self>) {
        let this = self.clone();
        tokio::spawn(async move {
            let worker = this.clone();
            if let Err(e) = worker.hash_worker().await {
                let _ = this.fail(e).await;
            }
        });

        loop {
            self.chunk_worker().await;

            let status = self.get_status();
            if status.is_terminal() {
                return; // short-circuited by instant upload, cancel, or failure
            }
            if status == TaskStatus::Paused {
                self.wait_while(|| self.get_status() == TaskStatus::Paused).await;
                if self.get_status().is_terminal() {
                    return; // woken by cancel while paused
                }
                continue;
            }
            break; // Uploading, and chunk_worker drained its pending queue
        }

        self.wait_while(|| self.state.lock().file_info.file_hash().is_none() && !self.get_status().is_terminal())
            .await;

        if self.get_status().is_terminal() {
            return;
        }

        let file_hash = self.state.lock().file_info.file_hash().cloned();
        match file_hash {
            Some(hash) => self.finalize(hash).await,
            None => {
                let _ = self.fail(UploadError::internal("merge requested before every chunk was hashed")).await;
            }
        }
    }

    async fn hash_worker(self: Arc<Self>) -> Result<(), UploadError> {
        let bus = self.event_bus.clone();
        let on_progress: Arc<dyn Fn(f64) + Send + Sync> = {
            let bus = bus.clone();
            Arc::new(move |pct| bus.emit(UploadEvent::HashProgress { percentage: pct }))
        };
        let hash = self.file_source.compute_hash(on_progress).await?;
        self.event_bus.emit(UploadEvent::HashComplete { hash: hash.to_string() });
        {
            let mut state = self.state.lock();
            state.file_info.set_file_hash(hash.clone());
        }
        self.wake.notify_one();

        let token = self.state.lock().token.clone().unwrap_or_default();
        let verify = self.adapter.verify_hash(&token, Some(hash.as_str()), None).await?;
        if verify.file_exists {
            let file_url = verify.file_url.unwrap_or_default();
            self.limiter.clear_queue();
            self.cancelled.store(true, Ordering::SeqCst);
            let _ = self.transition(TaskStatus::Success);
            self.event_bus.emit(UploadEvent::Success { file_url });
            let _ = self.progress_store.delete_record(&self.id).await;
        }
        Ok(())
    }

    async fn chunk_worker(self: &Arc<Self>) {
        let total = self.state.lock().chunks.len();
        let mut join_set = JoinSet::new();

        // Hash (but do not upload) chunks already known present — from a
        // resume seed or from `discover_existing_chunks` — that this task
        // has not yet recorded as done. `chunk_worker` can re-enter after
        // a pause/resume cycle, so this excludes indices `uploaded`
        // already covers to avoid double-counting progress.
        let known_present: Vec<u32> = {
            let state = self.state.lock();
            state.known_present.iter().copied().filter(|i| !state.uploaded.contains(i)).collect()
        };
        for idx in known_present {
            let this = self.clone();
            join_set.spawn(async move { this.hash_only(idx).await });
        }

        loop {
            tokio::task::yield_now().await;
            if self.cancelled.load(Ordering::SeqCst) || self.get_status().is_terminal() {
                break;
            }
            if self.paused.load(Ordering::SeqCst) {
                break;
            }
            let idx = self.state.lock().pending.pop_front();
            match idx {
                Some(idx) => {
                    let this = self.clone();
                    join_set.spawn(async move { this.upload_one(idx).await });
                }
                None => break,
            }
        }

        while let Some(result) = join_set.join_next().await {
            match result {
                Ok(Ok(())) => {}
                Ok(Err(e)) if e.category() == "cancelled" => {}
                Ok(Err(e)) => {
                    let _ = self.fail(e).await;
                }
                Err(join_err) => {
                    let _ = self.fail(UploadError::internal(join_err.to_string())).await;
                }
            }
            if self.get_status() == TaskStatus::Error {
                break;
            }
        }

        debug!(task_id = %self.id, total, "chunk worker drained");
    }

    async fn hash_only(self: Arc<Self>, index: u32) -> Result<(), UploadError> {
        let (start, end) = {
            let state = self.state.lock();
            let chunk = &state.chunks[index as usize];
            (chunk.start(), chunk.end())
        };
        let bytes = self.file_source.read_range(start, end).await?;
        let hash = Digest::of_bytes(&bytes);
        self.record_chunk_hash(index, hash);
        self.record_chunk_done(index, end - start, now_ms()).await;
        Ok(())
    }

    async fn upload_one(self: Arc<Self>, index: u32) -> Result<(), UploadError> {
        if self.cancelled.load(Ordering::SeqCst) {
            return Err(UploadError::Cancelled(format!("chunk {index} discarded")));
        }
        let (start, end) = {
            let state = self.state.lock();
            let chunk = &state.chunks[index as usize];
            (chunk.start(), chunk.end())
        };
        let bytes = self.file_source.read_range(start, end).await?;
        let hash = Digest::of_bytes(&bytes);
        self.record_chunk_hash(index, hash.clone());

        let token = self.state.lock().token.clone().unwrap_or_default();
        let mut attempt = 0u32;
        loop {
            let started = Instant::now();
            let limiter = self.limiter.clone();
            let adapter = self.adapter.clone();
            let token = token.clone();
            let hash_str = hash.to_string();
            let bytes = bytes.clone();
            let result = limiter
                .run(move || async move { adapter.upload_chunk(&token, index, &hash_str, bytes).await })
                .await;

            match result {
                Ok(_) => {
                    let elapsed_ms = started.elapsed().as_millis() as u64;
                    self.adjuster.lock().adjust(elapsed_ms);
                    self.record_chunk_done(index, end - start, elapsed_ms).await;
                    return Ok(());
                }
                Err(e) if !e.is_recoverable() => {
                    self.event_bus.emit(UploadEvent::ChunkError { chunk_index: index, error: e.to_string() });
                    return Err(e);
                }
                Err(e) => {
                    self.event_bus.emit(UploadEvent::ChunkError { chunk_index: index, error: e.to_string() });
                    if attempt >= self.retry_count {
                        return Err(e);
                    }
                    let delay_ms = self.retry_delay_ms * 2u64.saturating_pow(attempt);
                    tokio::time::sleep(std::time::Duration::from_millis(delay_ms)).await;
                    attempt += 1;
                }
            }
        }
    }

    fn record_chunk_hash(&self, index: u32, hash: Digest) {
        let mut state = self.state.lock();
        if let Some(slot) = state.chunk_hashes.get_mut(index as usize) {
            *slot = Some(hash.clone());
        }
        if let Some(chunk) = state.chunks.get_mut(index as usize) {
            chunk.set_hash(hash);
        }
    }

    async fn record_chunk_done(&self, index: u32, chunk_len: u64, elapsed_ms: u64) {
        if self.cancelled.load(Ordering::SeqCst) {
            return;
        }
        let (uploaded_snapshot, token, bytes_uploaded) = {
            let mut state = self.state.lock();
            state.uploaded.insert(index);
            state.bytes_uploaded += chunk_len;
            let now = Instant::now();
            if let Some(prev) = state.last_chunk_completed_at {
                let dt = now.duration_since(prev).as_secs_f64().max(0.001);
                let instantaneous = chunk_len as f64 / (elapsed_ms as f64 / 1000.0).max(0.001);
                state.speed_bps = state.speed_bps * 0.5 + instantaneous * 0.5;
                let _ = dt;
            } else {
                state.speed_bps = chunk_len as f64 / (elapsed_ms as f64 / 1000.0).max(0.001);
            }
            state.last_chunk_completed_at = Some(now);
            (state.uploaded.clone(), state.token.clone().unwrap_or_default(), state.bytes_uploaded)
        };

        let patch = UploadRecordPatch {
            uploaded_chunks: Some(uploaded_snapshot),
            upload_token: Some(token),
        };
        if let Err(e) = self.progress_store.update_record(&self.id, patch).await {
            warn!(task_id = %self.id, error = %e, "progress record update failed");
        }

        self.event_bus.emit(UploadEvent::ChunkSuccess { chunk_index: index });
        self.event_bus.emit(UploadEvent::Progress(self.get_progress()));
        let _ = bytes_uploaded;
    }

    async fn finalize(self: Arc<Self>, file_hash: Digest) {
        let (token, ordered_hashes) = {
            let state = self.state.lock();
            let ordered: Option<Vec<String>> = state.chunk_hashes.iter().map(|h| h.as_ref().map(|d| d.to_string())).collect();
            (state.token.clone().unwrap_or_default(), ordered)
        };

        let Some(ordered_hashes) = ordered_hashes else {
            let _ = self.fail(UploadError::internal("merge requested before every chunk was hashed")).await;
            return;
        };

        match self.adapter.merge_file(&token, file_hash.as_str(), &ordered_hashes).await {
            Ok(resp) => {
                let _ = self.transition(TaskStatus::Success);
                self.event_bus.emit(UploadEvent::Success { file_url: resp.file_url.clone() });
                self.state.lock().file_url = Some(resp.file_url);
                let _ = self.progress_store.delete_record(&self.id).await;
                info!(task_id = %self.id, file_id = %resp.file_id, "upload merged");
            }
            Err(e) => {
                let _ = self.fail(e).await;
            }
        }
    }

    /// Marks the task paused; already-running chunk uploads finish, but no
    /// new ones are submitted until `resume`. The `drive` loop blocks
    /// rather than proceeding to `mergeFile` while paused.
    pub fn pause(&self) -> Result<(), UploadError> {
        self.transition(TaskStatus::Paused)?;
        self.paused.store(true, Ordering::SeqCst);
        self.event_bus.emit(UploadEvent::Pause);
        Ok(())
    }

    /// Resumes a paused task. `transition` wakes the blocked `drive` loop,
    /// which resubmits remaining pending chunks itself and then proceeds
    /// to hash-completion and merge once they are all done.
    pub fn resume(&self) -> Result<(), UploadError> {
        self.transition(TaskStatus::Uploading)?;
        self.paused.store(false, Ordering::SeqCst);
        self.event_bus.emit(UploadEvent::Resume);
        Ok(())
    }

    /// Cancels the task: clears pending chunk-upload queue synchronously,
    /// lets already-running uploads complete with their results discarded,
    /// and deletes the progress record.
    pub async fn cancel(&self) -> Result<(), UploadError> {
        let current = self.get_status();
        if current.is_terminal() {
            return Ok(());
        }
        self.cancelled.store(true, Ordering::SeqCst);
        self.limiter.clear_queue();
        self.transition(TaskStatus::Cancelled)?;
        self.event_bus.emit(UploadEvent::Cancel);
        let _ = self.progress_store.delete_record(&self.id).await;
        Ok(())
    }
}

fn now_ms() -> i64 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .map(|d| d.as_millis() as i64)
        .unwrap_or(0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::services::file_source::InMemoryFileSource;
    use crate::infrastructure::adapters::local_adapter::LocalAdapter;
    use crate::infrastructure::repositories::memory_progress_store::InMemoryProgressStore;
    use upload_server::application::upload_service::UploadService;
    use upload_server::infrastructure::blob_store::memory::InMemoryBlobStore;
    use upload_server::infrastructure::metadata_store::memory::InMemoryMetadataStore;

    fn build_task(data: Vec<u8>) -> Arc<UploadTask> {
        let service = Arc::new(UploadService::new(
            Arc::new(InMemoryBlobStore::default()),
            Arc::new(InMemoryMetadataStore::default()),
            Default::default(),
        ));
        let adapter: Arc<dyn RequestAdapter> = Arc::new(LocalAdapter::new(service));
        let progress_store: Arc<dyn ProgressStore> = Arc::new(InMemoryProgressStore::default());
        let file_info = FileInfo::new("a.bin", data.len() as u64, "application/octet-stream", 0).unwrap();
        let file_source = Arc::new(InMemoryFileSource::new(data));
        UploadTask::new(
            "task-1".into(),
            file_info,
            file_source,
            adapter,
            progress_store,
            UploadTaskOptions {
                preferred_chunk_size: Some(upload_domain::value_objects::chunk_size::MIN_SIZE as u64),
                ..Default::default()
            },
        )
        .unwrap()
    }

    #[tokio::test]
    async fn fresh_upload_reaches_success() {
        let data = vec![9u8; upload_domain::value_objects::chunk_size::MIN_SIZE * 2 + 100];
        let task = build_task(data);
        task.start().await.unwrap();
        task.wait_for_terminal().await;
        assert_eq!(task.get_status(), TaskStatus::Success);
        assert_eq!(task.get_progress().percentage, 100.0);
    }

    #[tokio::test]
    async fn cancel_before_start_completes_is_a_terminal_transition() {
        let data = vec![1u8; 10];
        let task = build_task(data);
        task.start().await.unwrap();
        task.cancel().await.unwrap();
        assert!(task.get_status().is_terminal());
    }

    #[tokio::test]
    async fn pause_mid_upload_then_resume_reaches_success() {
        let chunk = upload_domain::value_objects::chunk_size::MIN_SIZE;
        let data = vec![3u8; chunk * 6];
        let task = build_task(data);
        task.start().await.unwrap();

        // Give the chunk worker a moment to start uploading before pausing.
        for _ in 0..50 {
            if task.get_status() == TaskStatus::Uploading {
                break;
            }
            tokio::time::sleep(std::time::Duration::from_millis(1)).await;
        }
        task.pause().unwrap();

        // Paused must never surface a spurious error event.
        tokio::time::sleep(std::time::Duration::from_millis(20)).await;
        assert_eq!(task.get_status(), TaskStatus::Paused);

        task.resume().unwrap();
        task.wait_for_terminal().await;

        assert_eq!(task.get_status(), TaskStatus::Success);
        assert_eq!(task.get_progress().percentage, 100.0);
    }

    #[tokio::test]
    async fn verify_hash_discovers_chunks_already_present_server_side() {
        let chunk = upload_domain::value_objects::chunk_size::MIN_SIZE;
        let data = vec![5u8; chunk * 2];

        let service = Arc::new(UploadService::new(
            Arc::new(InMemoryBlobStore::default()),
            Arc::new(InMemoryMetadataStore::default()),
            Default::default(),
        ));

        // First task uploads the file in full, seeding the blob store with
        // both chunks' content.
        let adapter_one: Arc<dyn RequestAdapter> = Arc::new(LocalAdapter::new(service.clone()));
        let file_info_one = FileInfo::new("a.bin", data.len() as u64, "application/octet-stream", 0).unwrap();
        let task_one = UploadTask::new(
            "task-1".into(),
            file_info_one,
            Arc::new(InMemoryFileSource::new(data.clone())),
            adapter_one,
            Arc::new(InMemoryProgressStore::default()),
            UploadTaskOptions { preferred_chunk_size: Some(chunk as u64), ..Default::default() },
        )
        .unwrap();
        task_one.start().await.unwrap();
        task_one.wait_for_terminal().await;
        assert_eq!(task_one.get_status(), TaskStatus::Success);

        // Second task uploads an identical second file under a different
        // name; every chunk's content already lives in the blob store, so
        // discover_existing_chunks should mark both as known-present and
        // chunk_worker never needs to call upload_chunk for them.
        let adapter_two: Arc<dyn RequestAdapter> = Arc::new(LocalAdapter::new(service));
        let file_info_two = FileInfo::new("b.bin", data.len() as u64, "application/octet-stream", 0).unwrap();
        let task_two = UploadTask::new(
            "task-2".into(),
            file_info_two,
            Arc::new(InMemoryFileSource::new(data)),
            adapter_two,
            Arc::new(InMemoryProgressStore::default()),
            UploadTaskOptions { preferred_chunk_size: Some(chunk as u64), ..Default::default() },
        )
        .unwrap();
        task_two.start().await.unwrap();
        task_two.wait_for_terminal().await;

        assert_eq!(task_two.get_status(), TaskStatus::Success);
        assert_eq!(task_two.get_progress().percentage, 100.0);
    }
}
