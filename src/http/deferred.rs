//! Single-assignment result slot shared between the engine and its callers.
//!
//! [`deferred`] returns a [`Completer`], held by whoever produces the value, and a
//! [`Deferred`] handle for the consumer. The completer is consumed by
//! [`Completer::complete`], so a slot can be filled at most once. A completer that is
//! dropped without completing fills the slot with [`EngineError::Abandoned`], which
//! means no handle is ever left pending forever.

use std::sync::{Arc, Condvar, Mutex, MutexGuard, PoisonError};
use std::time::Duration;
use tokio::sync::Notify;

use super::error::EngineError;

type Outcome<T> = Result<T, EngineError>;

struct Slot<T> {
    value: Mutex<Option<Outcome<T>>>,
    ready: Condvar,
    notify: Notify,
}

impl<T> Slot<T> {
    fn new(value: Option<Outcome<T>>) -> Self {
        Self {
            value: Mutex::new(value),
            ready: Condvar::new(),
            notify: Notify::new(),
        }
    }

    fn lock(&self) -> MutexGuard<'_, Option<Outcome<T>>> {
        self.value.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn fill(&self, outcome: Outcome<T>) {
        {
            let mut value = self.lock();
            debug_assert!(value.is_none(), "deferred result completed twice");
            if value.is_some() {
                return;
            }
            *value = Some(outcome);
        }
        self.ready.notify_all();
        self.notify.notify_waiters();
    }
}

/// Create a connected completer / handle pair
pub fn deferred<T>() -> (Completer<T>, Deferred<T>) {
    let slot = Arc::new(Slot::new(None));
    (
        Completer {
            slot: Some(slot.clone()),
        },
        Deferred { slot },
    )
}

/// Producer side of a deferred result
pub struct Completer<T> {
    slot: Option<Arc<Slot<T>>>,
}

impl<T> Completer<T> {
    /// Store the outcome and wake every waiter
    pub fn complete(mut self, outcome: Outcome<T>) {
        if let Some(slot) = self.slot.take() {
            slot.fill(outcome);
        }
    }
}

impl<T> Drop for Completer<T> {
    fn drop(&mut self) {
        if let Some(slot) = self.slot.take() {
            slot.fill(Err(EngineError::Abandoned));
        }
    }
}

impl<T> std::fmt::Debug for Completer<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Completer").finish_non_exhaustive()
    }
}

/// Consumer side of a deferred result.
///
/// Cloning shares the same slot; once completed the outcome can be read any
/// number of times from any clone.
pub struct Deferred<T> {
    slot: Arc<Slot<T>>,
}

impl<T> Clone for Deferred<T> {
    fn clone(&self) -> Self {
        Self {
            slot: self.slot.clone(),
        }
    }
}

impl<T> std::fmt::Debug for Deferred<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Deferred")
            .field("ready", &self.is_ready())
            .finish()
    }
}

impl<T> Deferred<T> {
    /// Handle that is already completed
    pub fn ready(outcome: Outcome<T>) -> Self {
        Self {
            slot: Arc::new(Slot::new(Some(outcome))),
        }
    }

    /// Whether the outcome is available
    pub fn is_ready(&self) -> bool {
        self.slot.lock().is_some()
    }
}

impl<T: Clone> Deferred<T> {
    /// Non-blocking poll
    pub fn try_get(&self) -> Option<Outcome<T>> {
        self.slot.lock().clone()
    }

    /// Wait asynchronously for the outcome
    pub async fn wait(&self) -> Outcome<T> {
        loop {
            let notified = self.slot.notify.notified();
            tokio::pin!(notified);
            // Register before checking so a completion in between is not missed
            notified.as_mut().enable();

            if let Some(outcome) = self.try_get() {
                return outcome;
            }
            notified.await;
        }
    }

    /// Block the current thread until the outcome is available.
    ///
    /// Must not be called from inside an async task; use [`Deferred::wait`] there.
    pub fn wait_blocking(&self) -> Outcome<T> {
        let mut value = self.slot.lock();
        loop {
            if let Some(outcome) = value.as_ref() {
                return outcome.clone();
            }
            value = self
                .slot
                .ready
                .wait(value)
                .unwrap_or_else(PoisonError::into_inner);
        }
    }

    /// Block for at most `timeout`; `None` if still pending afterwards
    pub fn wait_blocking_timeout(&self, timeout: Duration) -> Option<Outcome<T>> {
        let value = self.slot.lock();
        let (value, _) = self
            .slot
            .ready
            .wait_timeout_while(value, timeout, |value| value.is_none())
            .unwrap_or_else(PoisonError::into_inner);
        value.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::thread;

    #[tokio::test]
    async fn test_complete_then_wait() {
        let (completer, handle) = deferred::<u32>();
        assert!(!handle.is_ready());
        assert!(handle.try_get().is_none());

        completer.complete(Ok(7));

        assert!(handle.is_ready());
        assert_eq!(handle.wait().await, Ok(7));
        // observable any number of times
        assert_eq!(handle.wait().await, Ok(7));
        assert_eq!(handle.clone().try_get(), Some(Ok(7)));
    }

    #[tokio::test]
    async fn test_waiter_woken_by_completion() {
        let (completer, handle) = deferred::<String>();
        let waiter = {
            let handle = handle.clone();
            tokio::spawn(async move { handle.wait().await })
        };

        tokio::task::yield_now().await;
        completer.complete(Ok("done".to_string()));

        let outcome = waiter.await.unwrap();
        assert_eq!(outcome, Ok("done".to_string()));
    }

    #[tokio::test]
    async fn test_dropped_completer_abandons() {
        let (completer, handle) = deferred::<u8>();
        drop(completer);
        assert_eq!(handle.wait().await, Err(EngineError::Abandoned));
    }

    #[test]
    fn test_blocking_wait_across_threads() {
        let (completer, handle) = deferred::<Vec<u8>>();
        let producer = thread::spawn(move || {
            thread::sleep(Duration::from_millis(20));
            completer.complete(Ok(vec![1, 2, 3]));
        });

        assert_eq!(handle.wait_blocking(), Ok(vec![1, 2, 3]));
        producer.join().unwrap();
    }

    #[test]
    fn test_blocking_wait_timeout_pending() {
        let (_completer, handle) = deferred::<u8>();
        assert!(handle
            .wait_blocking_timeout(Duration::from_millis(10))
            .is_none());
    }

    #[test]
    fn test_ready_handle() {
        let handle = Deferred::<u8>::ready(Err(EngineError::NotInitialized));
        assert!(handle.is_ready());
        assert_eq!(handle.wait_blocking(), Err(EngineError::NotInitialized));
    }

    #[test]
    fn test_wait_is_pending_until_completed() {
        let (completer, handle) = deferred::<u32>();
        let mut waiter = tokio_test::task::spawn(handle.wait());

        tokio_test::assert_pending!(waiter.poll());
        completer.complete(Ok(11));

        assert!(waiter.is_woken());
        tokio_test::assert_ready_eq!(waiter.poll(), Ok(11));
    }
}
