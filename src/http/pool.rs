use log::{debug, info, warn};
use std::ops::{Deref, DerefMut};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use super::transport::{Transport, TransportFactory};

/// Connection counts reported when the pool is destroyed
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PoolReport {
    pub created: usize,
    pub destroyed: usize,
}

struct PoolState {
    idle: Vec<Box<dyn Transport>>,
    created: usize,
    destroyed: usize,
    closed: bool,
}

struct PoolInner {
    capacity: usize,
    state: Mutex<PoolState>,
}

impl PoolInner {
    fn lock(&self) -> MutexGuard<'_, PoolState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn put_back(&self, conn: Box<dyn Transport>) {
        let mut state = self.lock();
        if state.closed {
            // Lent out while the pool was destroyed: release it now instead
            state.destroyed += 1;
            drop(state);
            drop(conn);
            debug!("Connection returned after pool close, released");
            return;
        }
        state.idle.push(conn);
    }
}

/// Fixed-size pool of reusable connections.
///
/// All connections are created up front. `acquire` never waits: when every
/// connection is lent out it returns `None` and the caller fails the task.
#[derive(Clone)]
pub struct ConnectionPool {
    inner: Arc<PoolInner>,
}

impl ConnectionPool {
    /// Pre-create up to `capacity` connections from `factory`.
    /// Connections that fail to build are skipped, leaving a smaller pool.
    pub fn new(capacity: usize, factory: &dyn TransportFactory) -> Self {
        let mut idle = Vec::with_capacity(capacity);
        for slot in 0..capacity {
            match factory.create() {
                Ok(conn) => idle.push(conn),
                Err(e) => warn!("Failed to create pooled connection {}: {}", slot, e),
            }
        }

        let created = idle.len();
        info!("Connection pool ready: {}/{} connections", created, capacity);

        Self {
            inner: Arc::new(PoolInner {
                capacity,
                state: Mutex::new(PoolState {
                    idle,
                    created,
                    destroyed: 0,
                    closed: false,
                }),
            }),
        }
    }

    /// Borrow a connection, or `None` if none is free or the pool is closed
    pub fn acquire(&self) -> Option<Lease> {
        let conn = {
            let mut state = self.inner.lock();
            if state.closed {
                return None;
            }
            state.idle.pop()?
        };

        Some(Lease {
            conn: Some(conn),
            pool: self.inner.clone(),
        })
    }

    /// Return a borrowed connection; equivalent to dropping the lease
    pub fn release(&self, lease: Lease) {
        drop(lease);
    }

    /// Configured capacity
    pub fn capacity(&self) -> usize {
        self.inner.capacity
    }

    /// Connections created at initialization
    pub fn created(&self) -> usize {
        self.inner.lock().created
    }

    /// Connections currently idle
    pub fn available(&self) -> usize {
        self.inner.lock().idle.len()
    }

    pub fn is_closed(&self) -> bool {
        self.inner.lock().closed
    }

    /// Release every idle connection. Connections still lent out are released
    /// when their lease ends. Calling this again is a no-op.
    pub fn destroy(&self) -> PoolReport {
        let idle = {
            let mut state = self.inner.lock();
            if state.closed {
                return PoolReport::default();
            }
            state.closed = true;
            std::mem::take(&mut state.idle)
        };

        let released = idle.len();
        drop(idle);

        let mut state = self.inner.lock();
        state.destroyed += released;
        info!(
            "Connection pool destroyed: {}/{} connections released",
            state.destroyed, state.created
        );
        PoolReport {
            created: state.created,
            destroyed: state.destroyed,
        }
    }
}

impl std::fmt::Debug for ConnectionPool {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let state = self.inner.lock();
        f.debug_struct("ConnectionPool")
            .field("capacity", &self.inner.capacity)
            .field("created", &state.created)
            .field("available", &state.idle.len())
            .field("closed", &state.closed)
            .finish()
    }
}

/// A connection borrowed from the pool; returned when dropped
pub struct Lease {
    conn: Option<Box<dyn Transport>>,
    pool: Arc<PoolInner>,
}

impl Deref for Lease {
    type Target = dyn Transport;

    fn deref(&self) -> &Self::Target {
        match self.conn.as_deref() {
            Some(conn) => conn,
            None => unreachable!("lease used after release"),
        }
    }
}

impl DerefMut for Lease {
    fn deref_mut(&mut self) -> &mut Self::Target {
        match self.conn.as_deref_mut() {
            Some(conn) => conn,
            None => unreachable!("lease used after release"),
        }
    }
}

impl Drop for Lease {
    fn drop(&mut self) {
        if let Some(conn) = self.conn.take() {
            self.pool.put_back(conn);
        }
    }
}
