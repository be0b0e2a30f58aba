use futures_util::FutureExt;
use log::{debug, info, warn};
use std::panic::AssertUnwindSafe;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio::task::JoinHandle;

use super::pool::ConnectionPool;
use super::queue::{Task, TaskQueue};
use super::transport::TransferSink;
use super::types::{Request, Response};

/// Counters shared between the engine and its dispatcher
#[derive(Debug, Default)]
pub struct EngineCounters {
    pub submitted: AtomicU64,
    pub completed: AtomicU64,
    pub pool_exhausted: AtomicU64,
    pub transport_failures: AtomicU64,
}

/// The single consumer of the task queue.
///
/// Tasks run one at a time to completion, so at most one transfer is in flight
/// per engine and tasks complete in the order they were enqueued.
pub struct Dispatcher {
    queue: Arc<TaskQueue>,
    pool: ConnectionPool,
    counters: Arc<EngineCounters>,
}

impl Dispatcher {
    pub fn new(queue: Arc<TaskQueue>, pool: ConnectionPool, counters: Arc<EngineCounters>) -> Self {
        Self {
            queue,
            pool,
            counters,
        }
    }

    /// Start the worker loop on the given runtime
    pub fn spawn(self, runtime: &tokio::runtime::Handle) -> JoinHandle<()> {
        runtime.spawn(self.run())
    }

    async fn run(self) {
        info!(
            "HTTP dispatcher started ({} pooled connections)",
            self.pool.created()
        );

        while let Some(task) = self.queue.next().await {
            self.execute(task).await;
        }

        info!("HTTP dispatcher stopped");
    }

    async fn execute(&self, task: Task) {
        let Task {
            id,
            request,
            completer,
            enqueued_at,
        } = task;

        debug!(
            "Task {} {} {} dequeued after {:?}",
            id,
            request.method,
            request.url,
            enqueued_at.elapsed()
        );

        let response = self.transfer(id, &request).await;
        self.counters.completed.fetch_add(1, Ordering::Relaxed);
        completer.complete(Ok(response));
    }

    /// Run one request on a pooled connection. The connection is back in the
    /// pool before this returns, on every path.
    async fn transfer(&self, id: u64, request: &Request) -> Response {
        let mut lease = match self.pool.acquire() {
            Some(lease) => lease,
            None => {
                self.counters.pool_exhausted.fetch_add(1, Ordering::Relaxed);
                warn!("Task {}: no pooled connection available", id);
                return Response::pool_exhausted();
            }
        };

        let mut sink = TransferSink::new();
        let outcome = AssertUnwindSafe(lease.perform(request, &mut sink))
            .catch_unwind()
            .await;
        // Transports keep no per-transfer state, so a connection whose transfer
        // panicked is as reusable as one that failed normally
        self.pool.release(lease);

        match outcome {
            Ok(Ok(status)) => {
                debug!("Task {} completed with status {}", id, status);
                sink.into_response(status)
            }
            Ok(Err(e)) => {
                self.counters
                    .transport_failures
                    .fetch_add(1, Ordering::Relaxed);
                debug!("Task {} transport failure: {}", id, e);
                Response::transport_failure(e.message())
            }
            Err(_) => {
                self.counters
                    .transport_failures
                    .fetch_add(1, Ordering::Relaxed);
                warn!("Task {}: transfer panicked", id);
                Response::transport_failure("transfer panicked")
            }
        }
    }
}
