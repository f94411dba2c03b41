//! A thin counting semaphore over `tokio::sync::Semaphore`, generalizing the
//! concurrency-limiting pattern `parallel.rs`'s `ParallelConfig`/compression
//! pool already used (`Arc<Semaphore>` guarding a bounded number of
//! in-flight tasks), plus `tokio_util::sync::CancellationToken`-based abort
//! so a caller can unblock every waiter at once instead of waiting out each
//! permit acquisition.

use crate::error::{Result, SZipError};
use std::future::Future;
use std::sync::Arc;
use tokio::sync::Semaphore as TokioSemaphore;
use tokio_util::sync::CancellationToken;

/// A counting semaphore that can be cancelled, unblocking every pending
/// `acquire` with `SZipError::BufferAborted` instead of letting them wait
/// forever for a permit that will never free up.
pub struct Semaphore {
    inner: Arc<TokioSemaphore>,
    cancel: CancellationToken,
}

impl Semaphore {
    /// Create a semaphore with `permits` concurrent slots.
    pub fn new(permits: usize) -> Self {
        Self {
            inner: Arc::new(TokioSemaphore::new(permits)),
            cancel: CancellationToken::new(),
        }
    }

    /// Run `task` once a permit is available, releasing it when `task`
    /// completes. Returns `BufferAborted` if `cancel()` fires before a
    /// permit is acquired.
    pub async fn run<F, T>(&self, task: F) -> Result<T>
    where
        F: Future<Output = T>,
    {
        let permit = tokio::select! {
            biased;
            _ = self.cancel.cancelled() => {
                return Err(SZipError::BufferAborted(
                    "semaphore was cancelled before a permit became available".to_string(),
                ))
            }
            permit = self.inner.acquire() => permit,
        };
        let _permit = permit.map_err(|_| {
            SZipError::BufferAborted("semaphore was closed while waiting for a permit".to_string())
        })?;
        Ok(task.await)
    }

    /// Wait until every outstanding permit has been returned, i.e. every
    /// task started via `run` has completed. Used to drain in-flight work
    /// before a writer finalizes its archive.
    pub async fn synchronize(&self, total_permits: usize) -> Result<()> {
        let permit = tokio::select! {
            biased;
            _ = self.cancel.cancelled() => {
                return Err(SZipError::BufferAborted(
                    "semaphore was cancelled while synchronizing".to_string(),
                ))
            }
            permit = self.inner.acquire_many(total_permits as u32) => permit,
        };
        let permit = permit.map_err(|_| {
            SZipError::BufferAborted("semaphore was closed while synchronizing".to_string())
        })?;
        drop(permit);
        Ok(())
    }

    /// Unblock every pending and future `run`/`synchronize` call with
    /// `BufferAborted`.
    pub fn cancel(&self) {
        self.cancel.cancel();
        self.inner.close();
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancel.is_cancelled()
    }

    pub fn available_permits(&self) -> usize {
        self.inner.available_permits()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[tokio::test]
    async fn run_limits_concurrency() {
        let sem = Arc::new(Semaphore::new(2));
        let active = Arc::new(AtomicUsize::new(0));
        let max_seen = Arc::new(AtomicUsize::new(0));

        let mut handles = Vec::new();
        for _ in 0..6 {
            let sem = sem.clone();
            let active = active.clone();
            let max_seen = max_seen.clone();
            handles.push(tokio::spawn(async move {
                sem.run(async {
                    let now = active.fetch_add(1, Ordering::SeqCst) + 1;
                    max_seen.fetch_max(now, Ordering::SeqCst);
                    tokio::time::sleep(std::time::Duration::from_millis(10)).await;
                    active.fetch_sub(1, Ordering::SeqCst);
                })
                .await
                .unwrap();
            }));
        }
        for h in handles {
            h.await.unwrap();
        }
        assert!(max_seen.load(Ordering::SeqCst) <= 2);
    }

    #[tokio::test]
    async fn cancel_unblocks_pending_run() {
        let sem = Arc::new(Semaphore::new(1));
        let _held = sem.inner.acquire().await.unwrap();
        let sem2 = sem.clone();
        let waiter = tokio::spawn(async move { sem2.run(async { 1 }).await });
        tokio::time::sleep(std::time::Duration::from_millis(10)).await;
        sem.cancel();
        assert!(waiter.await.unwrap().is_err());
    }

    #[tokio::test]
    async fn synchronize_waits_for_all_permits_free() {
        let sem = Semaphore::new(3);
        assert!(sem.synchronize(3).await.is_ok());
    }
}
