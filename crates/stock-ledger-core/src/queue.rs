//! Bounded-concurrency work queue.
//!
//! Webhook handlers run *after* the HTTP response is acknowledged, so the
//! intake endpoint pushes a job here and returns. The queue admits jobs
//! FIFO into a bounded set of concurrently running tasks; excess jobs
//! wait in memory without bound (the upstream source already got its 200,
//! so there is no backpressure to signal).
//!
//! The queue is the outermost error boundary: a job's failure is caught
//! and logged with enough context to support replay, and never crashes
//! the scheduler or blocks other jobs. No ordering is guaranteed between
//! jobs; per-item consistency is the delta applier's transaction, not
//! queue order.

use futures::FutureExt;
use std::future::Future;
use std::panic::AssertUnwindSafe;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tokio::sync::{Notify, Semaphore};
use tracing::{debug, error};

/// Default number of concurrently running jobs
pub const DEFAULT_CONCURRENCY: usize = 8;

/// Bounded-concurrency task runner for deferred webhook processing
///
/// # Examples
///
/// ```rust
/// use stock_ledger_core::queue::WorkQueue;
///
/// # async fn example() {
/// let queue = WorkQueue::new(4);
/// queue.push("demo", async { Ok(()) });
/// queue.drain().await;
/// # }
/// ```
#[derive(Clone)]
pub struct WorkQueue {
    semaphore: Arc<Semaphore>,
    concurrency: usize,
    in_flight: Arc<AtomicUsize>,
    idle: Arc<Notify>,
}

impl WorkQueue {
    /// Create a queue running at most `concurrency` jobs at once
    pub fn new(concurrency: usize) -> Self {
        assert!(concurrency > 0, "concurrency must be at least 1");
        Self {
            semaphore: Arc::new(Semaphore::new(concurrency)),
            concurrency,
            in_flight: Arc::new(AtomicUsize::new(0)),
            idle: Arc::new(Notify::new()),
        }
    }

    /// Enqueue a job.
    ///
    /// Returns immediately; the job starts once a concurrency slot frees
    /// up (permits are granted in FIFO order). Errors and panics are
    /// logged under `label` and swallowed.
    pub fn push<F>(&self, label: &str, job: F)
    where
        F: Future<Output = anyhow::Result<()>> + Send + 'static,
    {
        let semaphore = Arc::clone(&self.semaphore);
        let in_flight = Arc::clone(&self.in_flight);
        let idle = Arc::clone(&self.idle);
        let label = label.to_string();

        in_flight.fetch_add(1, Ordering::SeqCst);

        tokio::spawn(async move {
            // Never closed while the queue lives; an Err here means the
            // runtime is shutting down and the job is moot.
            let Ok(_permit) = semaphore.acquire_owned().await else {
                finish(&in_flight, &idle);
                return;
            };

            debug!(job = %label, "Job started");
            match AssertUnwindSafe(job).catch_unwind().await {
                Ok(Ok(())) => debug!(job = %label, "Job finished"),
                Ok(Err(e)) => error!(job = %label, error = %e, "Job failed"),
                Err(_) => error!(job = %label, "Job panicked"),
            }

            finish(&in_flight, &idle);
        });
    }

    /// Number of jobs enqueued or running
    pub fn in_flight(&self) -> usize {
        self.in_flight.load(Ordering::SeqCst)
    }

    /// Configured concurrency cap
    pub fn concurrency(&self) -> usize {
        self.concurrency
    }

    /// Wait until every enqueued job has finished.
    ///
    /// Used by graceful shutdown and tests; new jobs pushed while
    /// draining extend the wait.
    pub async fn drain(&self) {
        loop {
            let notified = self.idle.notified();
            if self.in_flight.load(Ordering::SeqCst) == 0 {
                return;
            }
            notified.await;
        }
    }
}

fn finish(in_flight: &AtomicUsize, idle: &Notify) {
    if in_flight.fetch_sub(1, Ordering::SeqCst) == 1 {
        idle.notify_waiters();
    }
}

#[cfg(test)]
#[path = "queue_tests.rs"]
mod tests;
