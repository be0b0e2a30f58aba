use log::{debug, error, info, warn};
use serde::de::DeserializeOwned;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tokio::runtime::Handle;
use tokio::task::JoinHandle;

use super::decode::decode_response;
use super::deferred::{deferred, Deferred};
use super::dispatcher::{Dispatcher, EngineCounters};
use super::error::EngineError;
use super::pool::ConnectionPool;
use super::queue::{Task, TaskQueue};
use super::transport::{HttpTransportFactory, TransportFactory};
use super::types::{Headers, Request, Response};

/// Point-in-time view of engine activity
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct EngineStats {
    pub submitted: u64,
    pub completed: u64,
    pub pool_exhausted: u64,
    pub transport_failures: u64,
    pub queued: usize,
    pub available_connections: usize,
}

/// What `shutdown` released
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ShutdownReport {
    /// Connections built at `initialize`
    pub created: usize,
    /// Connections released by the pool
    pub destroyed: usize,
    /// Tasks still queued when the dispatcher stopped
    pub abandoned: usize,
}

struct Running {
    queue: Arc<TaskQueue>,
    pool: ConnectionPool,
    dispatcher: JoinHandle<()>,
    runtime: Handle,
}

enum Lifecycle {
    Idle,
    Running(Running),
    ShutDown,
}

/// Asynchronous HTTP engine: a fixed connection pool drained by one dispatcher.
///
/// Submissions return a [`Deferred`] immediately and never block. Every outcome,
/// failures included, is delivered through that handle.
pub struct AsyncHttpEngine {
    factory: Arc<dyn TransportFactory>,
    lifecycle: Mutex<Lifecycle>,
    counters: Arc<EngineCounters>,
    next_task_id: AtomicU64,
}

impl AsyncHttpEngine {
    /// Engine backed by real HTTP connections
    pub fn new() -> Self {
        Self::with_factory(HttpTransportFactory::shared())
    }

    /// Engine whose connections come from `factory`
    pub fn with_factory(factory: Arc<dyn TransportFactory>) -> Self {
        Self {
            factory,
            lifecycle: Mutex::new(Lifecycle::Idle),
            counters: Arc::new(EngineCounters::default()),
            next_task_id: AtomicU64::new(1),
        }
    }

    fn lifecycle(&self) -> MutexGuard<'_, Lifecycle> {
        self.lifecycle.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Build `pool_size` connections and start the dispatcher on the current
    /// tokio runtime
    pub fn initialize(&self, pool_size: usize) -> Result<(), EngineError> {
        let mut lifecycle = self.lifecycle();
        match *lifecycle {
            Lifecycle::Running(_) => return Err(EngineError::AlreadyInitialized),
            Lifecycle::ShutDown => return Err(EngineError::ShutDown),
            Lifecycle::Idle => {}
        }

        let runtime = Handle::try_current().map_err(|_| EngineError::NoRuntime)?;
        let pool = ConnectionPool::new(pool_size, self.factory.as_ref());
        let queue = Arc::new(TaskQueue::new());
        let dispatcher =
            Dispatcher::new(queue.clone(), pool.clone(), self.counters.clone()).spawn(&runtime);

        info!("HTTP engine initialized with pool size {}", pool_size);
        *lifecycle = Lifecycle::Running(Running {
            queue,
            pool,
            dispatcher,
            runtime,
        });
        Ok(())
    }

    pub fn is_running(&self) -> bool {
        matches!(*self.lifecycle(), Lifecycle::Running(_))
    }

    /// Queue a GET request
    pub fn submit_get(&self, url: impl Into<String>, headers: Headers) -> Deferred<Response> {
        self.submit(Request::get(url, headers))
    }

    /// Queue a POST request with a JSON body
    pub fn submit_post(
        &self,
        url: impl Into<String>,
        json_body: &serde_json::Value,
        headers: Headers,
    ) -> Deferred<Response> {
        self.submit(Request::post_json(url, json_body, headers))
    }

    /// Queue a GET request and decode a 2xx body into `T`
    pub fn submit_get_typed<T>(&self, url: impl Into<String>, headers: Headers) -> Deferred<T>
    where
        T: DeserializeOwned + Clone + Send + 'static,
    {
        let (raw, runtime) = self.enqueue(Request::get(url, headers));
        decode_later(raw, runtime)
    }

    /// Queue a POST request and decode a 2xx body into `T`
    pub fn submit_post_typed<T>(
        &self,
        url: impl Into<String>,
        json_body: &serde_json::Value,
        headers: Headers,
    ) -> Deferred<T>
    where
        T: DeserializeOwned + Clone + Send + 'static,
    {
        let (raw, runtime) = self.enqueue(Request::post_json(url, json_body, headers));
        decode_later(raw, runtime)
    }

    /// Queue an arbitrary request
    pub fn submit(&self, request: Request) -> Deferred<Response> {
        self.enqueue(request).0
    }

    /// Push a task and hand back the runtime that was current under the same
    /// lock, so a typed continuation never observes a later lifecycle state.
    /// The runtime is `None` only when the returned handle is already complete.
    fn enqueue(&self, request: Request) -> (Deferred<Response>, Option<Handle>) {
        let (queue, runtime) = match &*self.lifecycle() {
            Lifecycle::Running(running) => (running.queue.clone(), running.runtime.clone()),
            Lifecycle::Idle => return (Deferred::ready(Err(EngineError::NotInitialized)), None),
            Lifecycle::ShutDown => return (Deferred::ready(Err(EngineError::ShutDown)), None),
        };

        let id = self.next_task_id.fetch_add(1, Ordering::Relaxed);
        let (completer, handle) = deferred();

        match queue.push(Task::new(id, request, completer)) {
            Ok(()) => {
                self.counters.submitted.fetch_add(1, Ordering::Relaxed);
            }
            Err(task) => {
                // Raced with shutdown
                task.completer.complete(Err(EngineError::ShutDown));
            }
        }
        (handle, Some(runtime))
    }

    /// Stop the dispatcher, wait for it, then release every connection.
    ///
    /// The task in flight (if any) finishes; tasks still queued are abandoned.
    /// Calling this again, or before `initialize`, returns an empty report.
    pub async fn shutdown(&self) -> ShutdownReport {
        let running = {
            let mut lifecycle = self.lifecycle();
            match std::mem::replace(&mut *lifecycle, Lifecycle::ShutDown) {
                Lifecycle::Running(running) => running,
                Lifecycle::Idle => {
                    *lifecycle = Lifecycle::Idle;
                    return ShutdownReport::default();
                }
                Lifecycle::ShutDown => return ShutdownReport::default(),
            }
        };

        info!("HTTP engine shutting down");
        running.queue.stop();

        if let Err(e) = running.dispatcher.await {
            error!("HTTP dispatcher terminated abnormally: {}", e);
        }

        let abandoned = running.queue.drain();
        if !abandoned.is_empty() {
            warn!("{} queued request(s) abandoned at shutdown", abandoned.len());
        }
        let abandoned_count = abandoned.len();
        drop(abandoned);

        let pool_report = running.pool.destroy();
        debug!("HTTP engine shutdown complete: {:?}", pool_report);

        ShutdownReport {
            created: pool_report.created,
            destroyed: pool_report.destroyed,
            abandoned: abandoned_count,
        }
    }

    pub fn stats(&self) -> EngineStats {
        let (queued, available_connections) = match &*self.lifecycle() {
            Lifecycle::Running(running) => (running.queue.len(), running.pool.available()),
            _ => (0, 0),
        };

        EngineStats {
            submitted: self.counters.submitted.load(Ordering::Relaxed),
            completed: self.counters.completed.load(Ordering::Relaxed),
            pool_exhausted: self.counters.pool_exhausted.load(Ordering::Relaxed),
            transport_failures: self.counters.transport_failures.load(Ordering::Relaxed),
            queued,
            available_connections,
        }
    }
}

/// Attach the typed continuation. It runs as its own task so decoding never
/// occupies the dispatcher.
fn decode_later<T>(raw: Deferred<Response>, runtime: Option<Handle>) -> Deferred<T>
where
    T: DeserializeOwned + Clone + Send + 'static,
{
    let (completer, typed) = deferred();
    match runtime {
        Some(runtime) => {
            runtime.spawn(async move {
                let outcome = match raw.wait().await {
                    Ok(response) => decode_response::<T>(&response),
                    Err(e) => Err(e),
                };
                completer.complete(outcome);
            });
        }
        None => {
            // Rejected at submission, so the raw handle is already complete
            let outcome = match raw.try_get() {
                Some(Ok(response)) => decode_response::<T>(&response),
                Some(Err(e)) => Err(e),
                None => Err(EngineError::Abandoned),
            };
            completer.complete(outcome);
        }
    }
    typed
}

impl Default for AsyncHttpEngine {
    fn default() -> Self {
        Self::new()
    }
}

impl Drop for AsyncHttpEngine {
    fn drop(&mut self) {
        if let Lifecycle::Running(running) = &*self.lifecycle() {
            // Cannot join from here; the dispatcher exits after its current task
            warn!("HTTP engine dropped without shutdown; dispatcher not joined");
            running.queue.stop();
        }
    }
}
