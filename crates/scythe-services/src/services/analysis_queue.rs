//! Single-worker queue serializing heavy analysis runs.
//!
//! The external tool is resource-intensive and unsafe to run in parallel
//! instances, so all analysis jobs across all inspections funnel through
//! one dedicated worker. The queue is bounded: submission never blocks,
//! and a full queue rejects the job instead of growing without limit.

use futures::FutureExt;
use std::future::Future;
use std::panic::AssertUnwindSafe;
use std::pin::Pin;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, error};

use scythe_foundation::{ScytheError, ScytheResult};

type AnalysisJob = Pin<Box<dyn Future<Output = ()> + Send + 'static>>;

/// FIFO queue with a single worker task.
pub struct AnalysisQueue {
    tx: mpsc::Sender<AnalysisJob>,
    worker: JoinHandle<()>,
}

impl AnalysisQueue {
    /// Start the worker and return the queue handle.
    ///
    /// `capacity` bounds the number of jobs waiting for the worker.
    pub fn start(capacity: usize) -> Self {
        let (tx, mut rx) = mpsc::channel::<AnalysisJob>(capacity);
        let worker = tokio::spawn(async move {
            while let Some(job) = rx.recv().await {
                // a panicking job must not take the worker down with it
                if AssertUnwindSafe(job).catch_unwind().await.is_err() {
                    error!("Analysis job panicked; worker continues with next job");
                }
            }
            debug!("Analysis queue worker stopped");
        });
        Self { tx, worker }
    }

    /// Enqueue a job without blocking.
    ///
    /// Jobs run strictly in submission order, one at a time. A job is
    /// responsible for its own error handling; the queue only isolates
    /// failures. Returns `QueueFull` when the capacity is exhausted.
    pub fn submit<F>(&self, job: F) -> ScytheResult<()>
    where
        F: Future<Output = ()> + Send + 'static,
    {
        self.tx
            .try_send(Box::pin(job))
            .map_err(|send_error| match send_error {
                mpsc::error::TrySendError::Full(_) => ScytheError::QueueFull,
                mpsc::error::TrySendError::Closed(_) => {
                    ScytheError::io("Analysis queue worker is not running")
                }
            })
    }

    /// Close the queue and wait for the worker to drain remaining jobs.
    pub async fn shutdown(self) {
        drop(self.tx);
        if self.worker.await.is_err() {
            error!("Analysis queue worker panicked during shutdown");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;
    use std::time::Duration;
    use tokio::sync::Mutex;

    #[tokio::test]
    async fn jobs_run_in_submission_order() {
        let queue = AnalysisQueue::start(16);
        let order = Arc::new(Mutex::new(Vec::new()));
        for i in 0..5 {
            let order = order.clone();
            queue
                .submit(async move {
                    order.lock().await.push(i);
                })
                .unwrap();
        }
        queue.shutdown().await;
        assert_eq!(*order.lock().await, vec![0, 1, 2, 3, 4]);
    }

    #[tokio::test]
    async fn at_most_one_job_runs_at_a_time() {
        let queue = AnalysisQueue::start(16);
        let running = Arc::new(AtomicUsize::new(0));
        let max_seen = Arc::new(AtomicUsize::new(0));
        for _ in 0..4 {
            let running = running.clone();
            let max_seen = max_seen.clone();
            queue
                .submit(async move {
                    let now = running.fetch_add(1, Ordering::SeqCst) + 1;
                    max_seen.fetch_max(now, Ordering::SeqCst);
                    tokio::time::sleep(Duration::from_millis(10)).await;
                    running.fetch_sub(1, Ordering::SeqCst);
                })
                .unwrap();
        }
        queue.shutdown().await;
        assert_eq!(max_seen.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn full_queue_rejects_submission() {
        let queue = AnalysisQueue::start(1);
        // park the worker on a long job so the channel backs up
        queue
            .submit(async {
                tokio::time::sleep(Duration::from_secs(5)).await;
            })
            .unwrap();
        // give the worker a moment to pick up the first job
        tokio::time::sleep(Duration::from_millis(50)).await;
        queue.submit(async {}).unwrap();
        assert!(matches!(
            queue.submit(async {}),
            Err(ScytheError::QueueFull)
        ));
    }

    #[tokio::test]
    async fn panicking_job_does_not_kill_the_worker() {
        let queue = AnalysisQueue::start(16);
        let survived = Arc::new(AtomicUsize::new(0));
        queue
            .submit(async {
                panic!("job blew up");
            })
            .unwrap();
        let survived_clone = survived.clone();
        queue
            .submit(async move {
                survived_clone.fetch_add(1, Ordering::SeqCst);
            })
            .unwrap();
        queue.shutdown().await;
        assert_eq!(survived.load(Ordering::SeqCst), 1);
    }
}
