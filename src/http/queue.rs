use std::collections::VecDeque;
use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::Instant;
use tokio::sync::Notify;

use super::deferred::Completer;
use super::types::{Request, Response};

/// A request waiting for the dispatcher, together with its completion sink
#[derive(Debug)]
pub struct Task {
    pub id: u64,
    pub request: Request,
    pub completer: Completer<Response>,
    pub enqueued_at: Instant,
}

impl Task {
    pub fn new(id: u64, request: Request, completer: Completer<Response>) -> Self {
        Self {
            id,
            request,
            completer,
            enqueued_at: Instant::now(),
        }
    }
}

struct QueueState {
    tasks: VecDeque<Task>,
    stopped: bool,
}

/// FIFO task buffer with a wake signal for the single consumer
pub struct TaskQueue {
    state: Mutex<QueueState>,
    wake: Notify,
}

impl TaskQueue {
    pub fn new() -> Self {
        Self {
            state: Mutex::new(QueueState {
                tasks: VecDeque::new(),
                stopped: false,
            }),
            wake: Notify::new(),
        }
    }

    fn lock(&self) -> MutexGuard<'_, QueueState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Append a task and wake the consumer.
    /// Hands the task back if the queue has been stopped.
    pub fn push(&self, task: Task) -> Result<(), Task> {
        {
            let mut state = self.lock();
            if state.stopped {
                return Err(task);
            }
            state.tasks.push_back(task);
        }
        self.wake.notify_one();
        Ok(())
    }

    /// Wait for the next task. Returns `None` once the queue is stopped,
    /// even if tasks remain buffered.
    pub async fn next(&self) -> Option<Task> {
        loop {
            let notified = self.wake.notified();
            tokio::pin!(notified);
            notified.as_mut().enable();

            {
                let mut state = self.lock();
                if state.stopped {
                    return None;
                }
                if let Some(task) = state.tasks.pop_front() {
                    return Some(task);
                }
            }

            notified.await;
        }
    }

    /// Set the stop flag and wake the consumer
    pub fn stop(&self) {
        self.lock().stopped = true;
        self.wake.notify_one();
    }

    /// Remove every buffered task
    pub fn drain(&self) -> Vec<Task> {
        self.lock().tasks.drain(..).collect()
    }

    pub fn len(&self) -> usize {
        self.lock().tasks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn is_stopped(&self) -> bool {
        self.lock().stopped
    }
}

impl Default for TaskQueue {
    fn default() -> Self {
        Self::new()
    }
}
