//! Avatar/Cover Fetch Queue
//!
//! Strictly sequential task queue for thumbnail/avatar resolution. The
//! gateway bridge tolerates little concurrency, so tasks run one at a
//! time in FIFO order; a key already pending or executing makes a second
//! push a no-op, letting many views ask for the same image without
//! duplicating work.
//!
//! Operations are `()` futures that handle their own errors and deliver
//! results through shared state (typically the cover cache). The queue
//! itself never inspects outcomes; it only guarantees ordering, dedup,
//! and that a panicking operation cannot stall the worker.

use std::collections::HashSet;
use std::panic::AssertUnwindSafe;
use std::sync::{Arc, Mutex};

use futures::future::BoxFuture;
use futures::FutureExt;
use tokio::sync::{mpsc, oneshot};
use tracing::{trace, warn};

struct QueueTask {
    key: String,
    operation: BoxFuture<'static, ()>,
    done: oneshot::Sender<()>,
}

/// Completion handle for a successfully enqueued task
///
/// Awaiting it resolves once the operation has settled, whatever the
/// outcome. Dropping it does not cancel the task.
pub struct TaskHandle {
    done: oneshot::Receiver<()>,
}

impl TaskHandle {
    /// Wait for the task's operation to settle
    pub async fn wait(self) {
        let _ = self.done.await;
    }
}

/// Keyed, deduplicating FIFO queue with a single worker
pub struct FetchQueue {
    tx: mpsc::UnboundedSender<QueueTask>,
    pending: Arc<Mutex<HashSet<String>>>,
}

impl FetchQueue {
    /// Create the queue and spawn its worker loop
    ///
    /// Must be called from within a Tokio runtime. The worker exits when
    /// the queue is dropped and the last queued task has settled.
    pub fn new() -> Self {
        let (tx, mut rx) = mpsc::unbounded_channel::<QueueTask>();
        let pending = Arc::new(Mutex::new(HashSet::new()));
        let worker_pending = Arc::clone(&pending);

        tokio::spawn(async move {
            // One task at a time: the next recv does not happen until the
            // current operation has settled.
            while let Some(task) = rx.recv().await {
                trace!(key = %task.key, "Fetch queue task starting");
                if AssertUnwindSafe(task.operation)
                    .catch_unwind()
                    .await
                    .is_err()
                {
                    warn!(key = %task.key, "Fetch queue operation panicked");
                }
                worker_pending.lock().unwrap().remove(&task.key);
                trace!(key = %task.key, "Fetch queue task settled");
                let _ = task.done.send(());
            }
        });

        Self { tx, pending }
    }

    /// Enqueue `operation` under `key`
    ///
    /// Returns `None` when a task with the same key is already pending or
    /// executing — the duplicate is dropped, not merged or restarted.
    /// Otherwise returns a handle that resolves when the operation
    /// settles.
    pub fn push<F>(&self, key: &str, operation: F) -> Option<TaskHandle>
    where
        F: std::future::Future<Output = ()> + Send + 'static,
    {
        {
            let mut pending = self.pending.lock().unwrap();
            if !pending.insert(key.to_string()) {
                trace!(key = key, "Duplicate fetch dropped");
                return None;
            }
        }

        let (done_tx, done_rx) = oneshot::channel();
        let task = QueueTask {
            key: key.to_string(),
            operation: operation.boxed(),
            done: done_tx,
        };

        if self.tx.send(task).is_err() {
            // Worker is gone (runtime shutting down); release the key so
            // a later push is not permanently blocked.
            self.pending.lock().unwrap().remove(key);
            return None;
        }

        Some(TaskHandle { done: done_rx })
    }

    /// Number of tasks pending or executing
    pub fn len(&self) -> usize {
        self.pending.lock().unwrap().len()
    }

    /// True when no task is pending or executing
    pub fn is_idle(&self) -> bool {
        self.len() == 0
    }
}

impl Default for FetchQueue {
    fn default() -> Self {
        Self::new()
    }
}
