use async_trait::async_trait;
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Semaphore;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tokio_util::task::TaskTracker;
use tracing::{error, warn};
use traffic_router_domain::DnsConfig;

/// One unit of protocol work: a datagram to answer or a connection to serve.
#[async_trait]
pub trait ProtocolTask: Send + 'static {
    async fn run(&mut self);

    /// Releases the task's resources. Runs exactly once, whether the task
    /// completed, was cancelled or was never admitted.
    fn cleanup(&mut self) {}
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TaskOutcome {
    Completed,
    Cancelled,
    TimedOut,
    Panicked,
}

pub enum Submission {
    /// The watchdog resolves once the task finished or was cancelled.
    Accepted { watchdog: JoinHandle<TaskOutcome> },
    Rejected,
}

impl Submission {
    pub fn is_accepted(&self) -> bool {
        matches!(self, Submission::Accepted { .. })
    }
}

struct CleanupGuard<T: ProtocolTask>(T);

impl<T: ProtocolTask> Drop for CleanupGuard<T> {
    fn drop(&mut self) {
        self.0.cleanup();
    }
}

struct QueueSlot(Arc<AtomicUsize>);

impl Drop for QueueSlot {
    fn drop(&mut self) {
        self.0.fetch_sub(1, Ordering::AcqRel);
    }
}

/// Bounded worker pool with admission control and per-task deadlines.
///
/// A task runs at once when a worker permit is free. Otherwise it waits in
/// the queue unless `queue_depth` tasks are already pending, in which case it
/// is rejected. A queue depth of zero rejects whenever any task is pending.
pub struct ProtocolExecutor {
    workers: Arc<Semaphore>,
    queued: Arc<AtomicUsize>,
    queue_depth: usize,
    task_timeout: Duration,
    tracker: TaskTracker,
    shutdown: CancellationToken,
    rejected: AtomicU64,
    timed_out: Arc<AtomicU64>,
}

impl ProtocolExecutor {
    pub fn new(worker_threads: usize, queue_depth: usize, task_timeout: Duration) -> Self {
        Self {
            workers: Arc::new(Semaphore::new(worker_threads.max(1))),
            queued: Arc::new(AtomicUsize::new(0)),
            queue_depth,
            task_timeout,
            tracker: TaskTracker::new(),
            shutdown: CancellationToken::new(),
            rejected: AtomicU64::new(0),
            timed_out: Arc::new(AtomicU64::new(0)),
        }
    }

    pub fn from_config(config: &DnsConfig) -> Self {
        Self::new(
            config.worker_threads,
            config.queue_depth,
            config.task_timeout(),
        )
    }

    pub fn submit<T: ProtocolTask>(&self, task: T) -> Submission {
        let mut guard = CleanupGuard(task);

        if self.shutdown.is_cancelled() {
            return Submission::Rejected;
        }

        let permit = self.workers.clone().try_acquire_owned().ok();
        let slot = match permit {
            Some(_) => None,
            None => match self.reserve_queue_slot() {
                Some(slot) => Some(slot),
                None => {
                    let rejected = self.rejected.fetch_add(1, Ordering::Relaxed) + 1;
                    warn!(
                        queue_depth = self.queue_depth,
                        queued = self.queued.load(Ordering::Acquire),
                        rejected,
                        "Rejected DNS task, executor saturated"
                    );
                    return Submission::Rejected;
                }
            },
        };

        let workers = self.workers.clone();
        let shutdown = self.shutdown.clone();
        let handle = self.tracker.spawn(async move {
            let _permit = match permit {
                Some(permit) => permit,
                None => {
                    let acquired = tokio::select! {
                        _ = shutdown.cancelled() => return TaskOutcome::Cancelled,
                        acquired = workers.acquire_owned() => acquired,
                    };
                    drop(slot);
                    match acquired {
                        Ok(permit) => permit,
                        Err(_) => return TaskOutcome::Cancelled,
                    }
                }
            };

            tokio::select! {
                _ = shutdown.cancelled() => TaskOutcome::Cancelled,
                _ = guard.0.run() => TaskOutcome::Completed,
            }
        });

        let task_timeout = self.task_timeout;
        let timed_out = self.timed_out.clone();
        let watchdog = self.tracker.spawn(async move {
            let abort = handle.abort_handle();
            match tokio::time::timeout(task_timeout, handle).await {
                Ok(Ok(outcome)) => outcome,
                Ok(Err(e)) if e.is_panic() => {
                    error!(error = %e, "DNS task panicked");
                    TaskOutcome::Panicked
                }
                Ok(Err(_)) => TaskOutcome::Cancelled,
                Err(_) => {
                    abort.abort();
                    timed_out.fetch_add(1, Ordering::Relaxed);
                    warn!(
                        timeout_ms = task_timeout.as_millis() as u64,
                        "DNS task cancelled at deadline"
                    );
                    TaskOutcome::TimedOut
                }
            }
        });

        Submission::Accepted { watchdog }
    }

    fn reserve_queue_slot(&self) -> Option<QueueSlot> {
        let limit = self.queue_depth.max(1);
        self.queued
            .fetch_update(Ordering::AcqRel, Ordering::Acquire, |queued| {
                (queued < limit).then_some(queued + 1)
            })
            .ok()
            .map(|_| QueueSlot(self.queued.clone()))
    }

    pub fn queued(&self) -> usize {
        self.queued.load(Ordering::Acquire)
    }

    pub fn rejected_count(&self) -> u64 {
        self.rejected.load(Ordering::Relaxed)
    }

    pub fn timed_out_count(&self) -> u64 {
        self.timed_out.load(Ordering::Relaxed)
    }

    pub fn is_shutdown(&self) -> bool {
        self.shutdown.is_cancelled()
    }

    /// Cancels queued and running tasks and waits for their cleanup.
    pub async fn shutdown(&self) {
        self.shutdown.cancel();
        self.tracker.close();
        self.tracker.wait().await;
    }
}
