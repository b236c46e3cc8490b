//! Connection Pool Module
//!
//! Fixed-size pool of durable-store connections with blocking checkout.

use std::fmt;
use std::ops::{Deref, DerefMut};
use std::time::{Duration, Instant};

use parking_lot::{Condvar, Mutex};
use serde::Serialize;
use tracing::{debug, info, warn};

use crate::error::PoolError;
use crate::storage::{Connection, Connector};

#[derive(Debug)]
struct PoolState<C> {
    idle: Vec<C>,
    /// Threads parked in `acquire`
    waiters: usize,
}

/// Occupancy snapshot of a [`ConnectionPool`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct PoolStats {
    pub size: usize,
    pub available: usize,
    pub in_use: usize,
    pub waiters: usize,
}

// == Connection Pool ==
/// A bounded set of connections shared by worker threads.
///
/// Connections are opened eagerly and all at once. Callers check one out
/// with [`acquire`](Self::acquire) and get it back into the pool by dropping
/// the returned guard (or passing it to [`release`](Self::release)).
/// `available + in_use == size` at all times.
pub struct ConnectionPool<C: Connection> {
    state: Mutex<PoolState<C>>,
    available: Condvar,
    size: usize,
}

impl<C: Connection> fmt::Debug for ConnectionPool<C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConnectionPool")
            .field("stats", &self.stats())
            .finish()
    }
}

impl<C: Connection> ConnectionPool<C> {
    // == Constructor ==
    /// Opens `size` connections through `connector`.
    ///
    /// Construction is all-or-nothing: if any connection fails, the ones
    /// already opened are closed and the error is returned.
    ///
    /// # Panics
    /// Panics if `size` is 0.
    pub fn new<K>(connector: &K, size: usize) -> Result<Self, PoolError>
    where
        K: Connector<Connection = C>,
    {
        assert!(size > 0, "pool size must be at least 1");

        let mut idle = Vec::with_capacity(size);
        for index in 0..size {
            match connector.connect() {
                Ok(conn) => idle.push(conn),
                Err(source) => {
                    for mut conn in idle {
                        conn.close();
                    }
                    return Err(PoolError::Connect {
                        index,
                        size,
                        source,
                    });
                }
            }
        }

        info!(size, "connection pool created");
        Ok(Self {
            state: Mutex::new(PoolState { idle, waiters: 0 }),
            available: Condvar::new(),
            size,
        })
    }

    // == Acquire ==
    /// Checks out a connection, blocking until one is available.
    pub fn acquire(&self) -> PooledConnection<'_, C> {
        let mut state = self.state.lock();
        loop {
            if let Some(conn) = state.idle.pop() {
                return self.checked_out(conn);
            }
            state.waiters += 1;
            self.available.wait(&mut state);
            state.waiters -= 1;
        }
    }

    /// Checks out a connection, giving up after `timeout`.
    pub fn acquire_timeout(&self, timeout: Duration) -> Result<PooledConnection<'_, C>, PoolError> {
        let deadline = Instant::now() + timeout;
        let mut state = self.state.lock();
        loop {
            if let Some(conn) = state.idle.pop() {
                return Ok(self.checked_out(conn));
            }
            state.waiters += 1;
            let timed_out = self.available.wait_until(&mut state, deadline).timed_out();
            state.waiters -= 1;
            if timed_out && state.idle.is_empty() {
                warn!(?timeout, "connection pool exhausted");
                return Err(PoolError::Timeout(timeout));
            }
        }
    }

    // == Release ==
    /// Returns a checked-out connection to the pool.
    ///
    /// Same as dropping the guard.
    pub fn release(&self, conn: PooledConnection<'_, C>) {
        debug_assert!(std::ptr::eq(self, conn.pool), "released into a foreign pool");
        drop(conn);
    }

    fn checked_out(&self, conn: C) -> PooledConnection<'_, C> {
        PooledConnection {
            pool: self,
            conn: Some(conn),
        }
    }

    fn put_back(&self, conn: C) {
        let mut state = self.state.lock();
        state.idle.push(conn);
        let wake = state.waiters > 0;
        drop(state);
        if wake {
            self.available.notify_one();
        }
    }

    // == Shutdown ==
    /// Closes every connection.
    ///
    /// Takes the pool by value, so no connection can still be checked out.
    pub fn close(mut self) {
        self.close_idle();
    }

    fn close_idle(&mut self) {
        let idle = std::mem::take(&mut self.state.get_mut().idle);
        if idle.is_empty() {
            return;
        }
        let count = idle.len();
        for mut conn in idle {
            conn.close();
        }
        debug!(count, "closed pooled connections");
    }

    pub fn size(&self) -> usize {
        self.size
    }

    /// Number of idle connections.
    pub fn available(&self) -> usize {
        self.state.lock().idle.len()
    }

    /// Number of threads blocked waiting for a connection.
    pub fn waiters(&self) -> usize {
        self.state.lock().waiters
    }

    pub fn stats(&self) -> PoolStats {
        let state = self.state.lock();
        PoolStats {
            size: self.size,
            available: state.idle.len(),
            in_use: self.size - state.idle.len(),
            waiters: state.waiters,
        }
    }
}

impl<C: Connection> Drop for ConnectionPool<C> {
    fn drop(&mut self) {
        self.close_idle();
    }
}

// == Pooled Connection ==
/// A connection checked out of a [`ConnectionPool`].
///
/// Returns to the pool when dropped.
pub struct PooledConnection<'a, C: Connection> {
    pool: &'a ConnectionPool<C>,
    conn: Option<C>,
}

impl<C: Connection> fmt::Debug for PooledConnection<'_, C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PooledConnection")
            .field("pool", self.pool)
            .finish_non_exhaustive()
    }
}

impl<C: Connection> Deref for PooledConnection<'_, C> {
    type Target = C;

    fn deref(&self) -> &C {
        self.conn.as_ref().expect("connection present until drop")
    }
}

impl<C: Connection> DerefMut for PooledConnection<'_, C> {
    fn deref_mut(&mut self) -> &mut C {
        self.conn.as_mut().expect("connection present until drop")
    }
}

impl<C: Connection> Drop for PooledConnection<'_, C> {
    fn drop(&mut self) {
        if let Some(conn) = self.conn.take() {
            self.pool.put_back(conn);
        }
    }
}
