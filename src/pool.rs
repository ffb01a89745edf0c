//! Worker Pool - Bounded Background Propagation
//!
//! Remote writes and deletes are fire-and-forget. Rather than spawning a task
//! per call, they are queued to a fixed set of workers, each draining its own
//! bounded channel. A full queue drops the task instead of blocking the caller.
//!
//! Remote operations are routed by storage key, so every operation on one key
//! lands on the same worker and runs in submission order: a `set` followed by
//! a `delete` can never reach the store reversed.

use std::future::Future;
use std::hash::{BuildHasher, RandomState};
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use futures_util::FutureExt;
use futures_util::future::BoxFuture;
use parking_lot::Mutex;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{Instrument, Span, debug, warn};

use crate::config::PoolConfig;
use crate::error::{CacheError, Result};
use crate::stats::Counter;

type Task = BoxFuture<'static, ()>;

/// Fixed set of workers running queued background tasks
pub struct WorkerPool {
    senders: Mutex<Option<Vec<mpsc::Sender<Task>>>>,
    workers: Mutex<Vec<JoinHandle<()>>>,
    routing: RandomState,
    next: AtomicUsize,
    dropped: Counter,
    span: Span,
}

impl WorkerPool {
    /// Start the workers on the current tokio runtime
    ///
    /// `queue_size` is shared out evenly, each worker queueing at least one task.
    ///
    /// # Errors
    ///
    /// Returns `CacheError::Config` when called outside a tokio runtime.
    pub fn new(config: PoolConfig, span: Span) -> Result<Self> {
        let handle = tokio::runtime::Handle::try_current().map_err(|e| {
            CacheError::Config(format!("worker pool requires a tokio runtime: {e}"))
        })?;

        let worker_count = config.workers.max(1);
        let per_worker = config.queue_size.div_ceil(worker_count).max(1);

        let (senders, workers): (Vec<_>, Vec<_>) = (0..worker_count)
            .map(|worker| {
                let (sender, mut receiver) = mpsc::channel::<Task>(per_worker);
                let join = handle.spawn(
                    async move {
                        while let Some(task) = receiver.recv().await {
                            if AssertUnwindSafe(task).catch_unwind().await.is_err() {
                                warn!(worker, "[Pool] Background task panicked");
                            }
                        }
                        debug!(worker, "[Pool] Worker stopped");
                    }
                    .instrument(span.clone()),
                );
                (sender, join)
            })
            .unzip();

        Ok(Self {
            senders: Mutex::new(Some(senders)),
            workers: Mutex::new(workers),
            routing: RandomState::new(),
            next: AtomicUsize::new(0),
            dropped: Counter::default(),
            span,
        })
    }

    /// Queue `task` on the next worker without waiting. Returns `false` if it
    /// was dropped because the queue is full or the pool is shut down.
    pub fn submit<F>(&self, task: F) -> bool
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let slot = self.next.fetch_add(1, Ordering::Relaxed);
        self.submit_to(slot, task.boxed())
    }

    fn submit_to(&self, slot: usize, task: Task) -> bool {
        let guard = self.senders.lock();
        let Some(senders) = guard.as_ref() else {
            self.dropped.incr();
            warn!(parent: &self.span, "[Pool] Pool is shut down, dropping background task");
            return false;
        };
        let Some(sender) = senders.get(slot % senders.len().max(1)) else {
            self.dropped.incr();
            return false;
        };
        match sender.try_send(task) {
            Ok(()) => true,
            Err(mpsc::error::TrySendError::Full(_)) => {
                self.dropped.incr();
                warn!(parent: &self.span, "[Pool] Queue full, dropping background task");
                false
            }
            Err(mpsc::error::TrySendError::Closed(_)) => {
                self.dropped.incr();
                warn!(parent: &self.span, "[Pool] Workers gone, dropping background task");
                false
            }
        }
    }

    /// Queue a remote operation bounded by `timeout` on the worker owning `key`
    ///
    /// The outcome is never returned: failures, timeouts and dropped tasks
    /// are logged and counted in `failures`.
    pub(crate) fn submit_remote<F>(
        &self,
        op: &'static str,
        key: String,
        timeout: Duration,
        failures: &Arc<Counter>,
        remote_op: F,
    ) where
        F: Future<Output = Result<()>> + Send + 'static,
    {
        #[allow(clippy::cast_possible_truncation)]
        let slot = self.routing.hash_one(&key) as usize;
        let task_failures = Arc::clone(failures);
        let task = async move {
            let outcome = tokio::time::timeout(timeout, remote_op)
                .await
                .unwrap_or(Err(CacheError::Timeout(timeout)));
            match outcome {
                Ok(()) => debug!(op, key = %key, "[Pool] Remote propagation done"),
                Err(e) => {
                    task_failures.incr();
                    warn!(op, key = %key, error = %e, "[Pool] Remote propagation failed");
                }
            }
        }
        .instrument(self.span.clone());

        if !self.submit_to(slot, task.boxed()) {
            failures.incr();
        }
    }

    /// Tasks queued but not yet picked up
    pub fn pending(&self) -> usize {
        self.senders.lock().as_ref().map_or(0, |senders| {
            senders
                .iter()
                .map(|s| s.max_capacity() - s.capacity())
                .sum()
        })
    }

    /// Tasks dropped since creation
    pub fn dropped(&self) -> u64 {
        self.dropped.get()
    }

    /// Stop accepting tasks and wait for queued ones to finish
    pub async fn shutdown(&self) {
        self.senders.lock().take();
        let workers = std::mem::take(&mut *self.workers.lock());
        for (worker, handle) in workers.into_iter().enumerate() {
            if let Err(e) = handle.await {
                warn!(parent: &self.span, worker, error = %e, "[Pool] Worker ended abnormally");
            }
        }
    }
}
