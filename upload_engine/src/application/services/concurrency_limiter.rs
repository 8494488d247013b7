//! Concurrency Limiter (C3): bounded-parallelism scheduler over
//! asynchronous work units.
//!
//! Built from a FIFO wait queue of one-shot wake channels rather than a
//! raw `tokio::sync::Semaphore`, so that `clear_queue` can discard
//! pending (not-yet-started) units directly rather than only by permit
//! count.

use std::collections::VecDeque;
use std::future::Future;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use parking_lot::Mutex;
use tokio::sync::oneshot;

use upload_domain::UploadError;

struct Inner {
    limit: usize,
    active: usize,
    queue: VecDeque<oneshot::Sender<()>>,
}

/// A bounded-parallelism scheduler. Cloning shares the same underlying
/// queue and counters (it is an `Arc` internally); a task owns one
/// instance and clones it into each spawned chunk-upload future.
#[derive(Clone)]
pub struct ConcurrencyLimiter {
    inner: Arc<Mutex<Inner>>,
    pending: Arc<AtomicUsize>,
}

/// RAII guard released when a scheduled unit finishes, making room for the
/// next queued waiter.
struct Slot {
    inner: Arc<Mutex<Inner>>,
}

impl Drop for Slot {
    fn drop(&mut self) {
        let mut inner = self.inner.lock();
        inner.active = inner.active.saturating_sub(1);
        while inner.active < inner.limit {
            match inner.queue.pop_front() {
                Some(waiter) => {
                    if waiter.send(()).is_ok() {
                        inner.active += 1;
                    }
                    // if send failed the waiter was dropped (clear_queue or
                    // cancellation) - try the next one without consuming a slot
                }
                None => break,
            }
        }
    }
}

impl ConcurrencyLimiter {
    /// Builds a limiter with an initial concurrency `limit`.
    ///
    /// # Errors
    /// `UploadError::InvalidArgument` if `limit == 0`.
    pub fn new(limit: usize) -> Result<Self, UploadError> {
        if limit == 0 {
            return Err(UploadError::invalid_argument("concurrency limit must be > 0"));
        }
        Ok(Self {
            inner: Arc::new(Mutex::new(Inner {
                limit,
                active: 0,
                queue: VecDeque::new(),
            })),
            pending: Arc::new(AtomicUsize::new(0)),
        })
    }

    /// Runs `f`, waiting in FIFO order until the active count is below the
    /// configured limit. A failing `f` does not cancel other waiters or
    /// active units; its error is returned directly to this call's caller.
    pub async fn run<F, Fut, T>(&self, f: F) -> Result<T, UploadError>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T, UploadError>>,
    {
        let _slot = self.acquire().await?;
        f().await
    }

    async fn acquire(&self) -> Result<Slot, UploadError> {
        let rx = {
            let mut inner = self.inner.lock();
            if inner.active < inner.limit {
                inner.active += 1;
                None
            } else {
                let (tx, rx) = oneshot::channel();
                inner.queue.push_back(tx);
                self.pending.fetch_add(1, Ordering::SeqCst);
                Some(rx)
            }
        };

        if let Some(rx) = rx {
            let result = rx.await;
            self.pending.fetch_sub(1, Ordering::SeqCst);
            result.map_err(|_| UploadError::Cancelled("queue slot discarded".into()))?;
        }

        Ok(Slot { inner: self.inner.clone() })
    }

    /// Changes the limit for subsequent acquisitions. Already-active units
    /// continue under the old discipline; they are never pre-empted.
    pub fn update_limit(&self, new_limit: usize) -> Result<(), UploadError> {
        if new_limit == 0 {
            return Err(UploadError::invalid_argument("concurrency limit must be > 0"));
        }
        let mut inner = self.inner.lock();
        inner.limit = new_limit;
        while inner.active < inner.limit {
            match inner.queue.pop_front() {
                Some(waiter) => {
                    if waiter.send(()).is_ok() {
                        inner.active += 1;
                    }
                }
                None => break,
            }
        }
        Ok(())
    }

    pub fn get_limit(&self) -> usize {
        self.inner.lock().limit
    }

    pub fn active_count(&self) -> usize {
        self.inner.lock().active
    }

    pub fn pending_count(&self) -> usize {
        self.pending.load(Ordering::SeqCst)
    }

    /// Discards pending-but-not-started units; units already running are
    /// unaffected.
    pub fn clear_queue(&self) {
        let mut inner = self.inner.lock();
        inner.queue.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[tokio::test]
    async fn respects_the_configured_limit() {
        let limiter = ConcurrencyLimiter::new(2).unwrap();
        let peak = Arc::new(AtomicUsize::new(0));

        let mut handles = Vec::new();
        for _ in 0..5 {
            let limiter = limiter.clone();
            let peak = peak.clone();
            handles.push(tokio::spawn(async move {
                limiter
                    .run(|| async {
                        let current = limiter.active_count();
                        peak.fetch_max(current, Ordering::SeqCst);
                        tokio::time::sleep(Duration::from_millis(5)).await;
                        Ok::<_, UploadError>(())
                    })
                    .await
            }));
        }
        for h in handles {
            h.await.unwrap().unwrap();
        }
        assert!(peak.load(Ordering::SeqCst) <= 2);
    }

    #[tokio::test]
    async fn update_limit_rejects_zero() {
        let limiter = ConcurrencyLimiter::new(2).unwrap();
        assert!(limiter.update_limit(0).is_err());
    }

    #[tokio::test]
    async fn clear_queue_drops_pending_units_only() {
        let limiter = ConcurrencyLimiter::new(1).unwrap();
        let _slot = limiter.acquire().await.unwrap();

        let limiter2 = limiter.clone();
        let queued = tokio::spawn(async move { limiter2.run(|| async { Ok::<_, UploadError>(()) }).await });

        tokio::time::sleep(Duration::from_millis(10)).await;
        assert_eq!(limiter.pending_count(), 1);
        limiter.clear_queue();

        // dropping _slot releases capacity, but the queued waiter was
        // discarded and should observe cancellation rather than running.
        drop(_slot);
        let result = queued.await.unwrap();
        assert!(result.is_err());
    }

    #[tokio::test]
    async fn a_failing_unit_does_not_cancel_peers() {
        let limiter = ConcurrencyLimiter::new(2).unwrap();
        let first = limiter.run(|| async { Err::<(), _>(UploadError::network("boom")) }).await;
        let second = limiter.run(|| async { Ok::<_, UploadError>(42) }).await;
        assert!(first.is_err());
        assert_eq!(second.unwrap(), 42);
    }
}
