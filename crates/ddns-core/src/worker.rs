//! Bounded-concurrency task submission
//!
//! [`WorkerPool::submit`] spawns the task and returns at once with a
//! [`Completion`]: a one-shot handle the caller consumes exactly once,
//! usually through a [`TimeoutGate`](crate::gate::TimeoutGate). Tasks are
//! never aborted; if the caller stops waiting, the task's result is dropped
//! when it tries to report.

use std::future::Future;
use std::sync::Arc;
use tokio::sync::{Semaphore, oneshot};

/// Runs submitted tasks with at most `size` of them executing at once
#[derive(Debug, Clone)]
pub struct WorkerPool {
    permits: Arc<Semaphore>,
    size: usize,
}

impl WorkerPool {
    /// Create a pool allowing `size` concurrent tasks (at least one)
    pub fn new(size: usize) -> Self {
        let size = size.max(1);
        Self {
            permits: Arc::new(Semaphore::new(size)),
            size,
        }
    }

    /// Configured concurrency limit
    pub fn size(&self) -> usize {
        self.size
    }

    /// Tasks currently holding a slot
    pub fn running(&self) -> usize {
        self.size - self.permits.available_permits()
    }

    /// Schedule `task` and return its completion handle immediately
    ///
    /// Must be called from within a tokio runtime.
    pub fn submit<F, T>(&self, task: F) -> Completion<T>
    where
        F: Future<Output = T> + Send + 'static,
        T: Send + 'static,
    {
        let (tx, rx) = oneshot::channel();
        let permits = Arc::clone(&self.permits);

        tokio::spawn(async move {
            let Ok(_permit) = permits.acquire_owned().await else {
                // closed semaphore: dropping `tx` reports the task as abandoned
                return;
            };
            let output = task.await;
            if tx.send(output).is_err() {
                tracing::debug!("worker result discarded: caller stopped waiting");
            }
        });

        Completion { rx }
    }
}

/// One-shot completion notification of a submitted task
#[derive(Debug)]
pub struct Completion<T> {
    pub(crate) rx: oneshot::Receiver<T>,
}

impl<T> Completion<T> {
    /// Wait without a deadline; `None` if the task ended without reporting
    pub async fn wait(self) -> Option<T> {
        self.rx.await.ok()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    #[tokio::test]
    async fn submit_returns_immediately_and_delivers_result() {
        let pool = WorkerPool::new(2);
        let (release_tx, release_rx) = oneshot::channel::<()>();

        let completion = pool.submit(async move {
            let _ = release_rx.await;
            42
        });

        // the task is blocked, yet submit already returned
        release_tx.send(()).unwrap();
        assert_eq!(completion.wait().await, Some(42));
    }

    #[tokio::test]
    async fn concurrency_is_bounded() {
        let pool = WorkerPool::new(2);
        let active = Arc::new(AtomicUsize::new(0));
        let peak = Arc::new(AtomicUsize::new(0));

        let completions: Vec<_> = (0..6)
            .map(|_| {
                let active = Arc::clone(&active);
                let peak = Arc::clone(&peak);
                pool.submit(async move {
                    let now = active.fetch_add(1, Ordering::SeqCst) + 1;
                    peak.fetch_max(now, Ordering::SeqCst);
                    tokio::time::sleep(Duration::from_millis(20)).await;
                    active.fetch_sub(1, Ordering::SeqCst);
                })
            })
            .collect();

        for c in completions {
            assert!(c.wait().await.is_some());
        }
        assert!(peak.load(Ordering::SeqCst) <= 2);
        assert_eq!(pool.running(), 0);
    }

    #[tokio::test]
    async fn panicking_task_is_reported_as_abandoned() {
        let pool = WorkerPool::new(1);
        let completion: Completion<()> = pool.submit(async { panic!("task blew up") });
        assert_eq!(completion.wait().await, None);
    }

    #[test]
    fn zero_size_is_clamped() {
        assert_eq!(WorkerPool::new(0).size(), 1);
    }
}
