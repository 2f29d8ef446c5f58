//! Bounded worker pool for ingestion jobs.

use std::future::Future;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use tokio::sync::{Notify, Semaphore};
use tokio::task::JoinHandle;

/// Default pool size: available parallelism, never below 2.
pub fn default_pool_size() -> usize {
    std::thread::available_parallelism()
        .map_or(2, |n| n.get())
        .max(2)
}

/// Runs spawned jobs with at most `size` in flight.
///
/// [`spawn`](Self::spawn) returns immediately; the job waits for a permit
/// inside its own task. Clones share the same permits.
#[derive(Clone)]
pub struct WorkerPool {
    permits: Arc<Semaphore>,
    size: usize,
    pending: Arc<AtomicUsize>,
    idle: Arc<Notify>,
}

struct PendingGuard {
    pending: Arc<AtomicUsize>,
    idle: Arc<Notify>,
}

impl Drop for PendingGuard {
    fn drop(&mut self) {
        if self.pending.fetch_sub(1, Ordering::AcqRel) == 1 {
            self.idle.notify_waiters();
        }
    }
}

impl WorkerPool {
    pub fn new(size: usize) -> Self {
        let size = size.max(1);
        Self {
            permits: Arc::new(Semaphore::new(size)),
            size,
            pending: Arc::new(AtomicUsize::new(0)),
            idle: Arc::new(Notify::new()),
        }
    }

    pub fn size(&self) -> usize {
        self.size
    }

    /// Jobs spawned and not yet finished, queued ones included.
    pub fn pending(&self) -> usize {
        self.pending.load(Ordering::Acquire)
    }

    pub fn spawn<F>(&self, job: F) -> JoinHandle<()>
    where
        F: Future<Output = ()> + Send + 'static,
    {
        self.pending.fetch_add(1, Ordering::AcqRel);
        let guard = PendingGuard {
            pending: self.pending.clone(),
            idle: self.idle.clone(),
        };
        let permits = self.permits.clone();
        tokio::spawn(async move {
            let _guard = guard;
            // The semaphore is never closed, so acquiring only fails on a bug.
            let Ok(_permit) = permits.acquire_owned().await else {
                return;
            };
            job.await;
        })
    }

    /// Resolves once every spawned job has finished.
    pub async fn wait_idle(&self) {
        loop {
            let notified = self.idle.notified();
            tokio::pin!(notified);
            notified.as_mut().enable();
            if self.pending() == 0 {
                return;
            }
            notified.await;
        }
    }
}

impl Default for WorkerPool {
    fn default() -> Self {
        Self::new(default_pool_size())
    }
}

impl std::fmt::Debug for WorkerPool {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WorkerPool")
            .field("size", &self.size)
            .field("pending", &self.pending())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn default_size_is_at_least_two() {
        assert!(default_pool_size() >= 2);
        assert!(WorkerPool::default().size() >= 2);
        assert_eq!(WorkerPool::new(0).size(), 1);
    }

    #[tokio::test]
    async fn never_exceeds_pool_size() {
        let pool = WorkerPool::new(2);
        let running = Arc::new(AtomicUsize::new(0));
        let peak = Arc::new(AtomicUsize::new(0));

        for _ in 0..8 {
            let running = running.clone();
            let peak = peak.clone();
            pool.spawn(async move {
                let now = running.fetch_add(1, Ordering::SeqCst) + 1;
                peak.fetch_max(now, Ordering::SeqCst);
                tokio::time::sleep(Duration::from_millis(10)).await;
                running.fetch_sub(1, Ordering::SeqCst);
            });
        }
        pool.wait_idle().await;

        assert_eq!(pool.pending(), 0);
        assert!(peak.load(Ordering::SeqCst) <= 2);
        assert!(peak.load(Ordering::SeqCst) >= 1);
    }

    #[tokio::test]
    async fn wait_idle_returns_immediately_when_empty() {
        let pool = WorkerPool::new(1);
        tokio::time::timeout(Duration::from_millis(100), pool.wait_idle())
            .await
            .unwrap();
    }
}
