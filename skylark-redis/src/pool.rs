//! Bounded connection pool.
//!
//! Checkout is LIFO so a small working set of connections stays warm.
//! Acquisition is bounded by the caller's deadline; the pool never
//! constructs connections outside its own factory.

use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::{OwnedSemaphorePermit, Semaphore};
use tokio::time::timeout;

use skylark_core::FeedError;
use skylark_store::batch::Deadline;

use crate::conn::Connection;

#[derive(Debug, Clone)]
pub struct PoolConfig {
    /// `host:port` of the backing keyspace (or a sharding proxy).
    pub addr: String,
    /// Maximum live connections; also bounds batched-call parallelism.
    pub max_size: usize,
    /// Budget for establishing one new connection.
    pub connect_timeout: Duration,
}

impl Default for PoolConfig {
    fn default() -> Self {
        Self {
            addr: "127.0.0.1:6379".to_string(),
            max_size: 8,
            connect_timeout: Duration::from_secs(2),
        }
    }
}

impl PoolConfig {
    pub fn new(addr: impl Into<String>) -> Self {
        Self {
            addr: addr.into(),
            ..Default::default()
        }
    }

    pub fn with_max_size(mut self, max_size: usize) -> Self {
        self.max_size = max_size;
        self
    }

    pub fn with_connect_timeout(mut self, connect_timeout: Duration) -> Self {
        self.connect_timeout = connect_timeout;
        self
    }
}

/// Point-in-time pool introspection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PoolStats {
    /// Configured capacity.
    pub size: usize,
    /// Connections parked and ready for checkout.
    pub idle: usize,
    /// Checkout permits currently available.
    pub available: usize,
}

struct PoolInner {
    config: PoolConfig,
    idle: Mutex<Vec<Connection>>,
    permits: Arc<Semaphore>,
}

/// Shared, bounded pool of [`Connection`]s.
#[derive(Clone)]
pub struct ConnectionPool {
    inner: Arc<PoolInner>,
}

impl ConnectionPool {
    pub fn new(config: PoolConfig) -> Self {
        let permits = Arc::new(Semaphore::new(config.max_size.max(1)));
        Self {
            inner: Arc::new(PoolInner {
                config,
                idle: Mutex::new(Vec::new()),
                permits,
            }),
        }
    }

    /// Check out a connection within the call's deadline.
    ///
    /// Deadline exhaustion while waiting for a permit surfaces as
    /// `Timeout`; a failed dial surfaces as `Transport`.
    pub async fn acquire(&self, deadline: &Deadline) -> Result<PooledConn, FeedError> {
        let permit = timeout(
            deadline.remaining(),
            self.inner.permits.clone().acquire_owned(),
        )
        .await
        .map_err(|_| deadline.error())?
        .map_err(|_| FeedError::transport("connection pool closed"))?;

        let parked = self.inner.idle.lock().unwrap_or_else(|e| e.into_inner()).pop();
        let conn = match parked {
            Some(conn) => conn,
            None => {
                let budget = self.inner.config.connect_timeout.min(deadline.remaining());
                timeout(budget, Connection::connect(&self.inner.config.addr))
                    .await
                    .map_err(|_| deadline.error())??
            }
        };

        Ok(PooledConn {
            conn: Some(conn),
            inner: self.inner.clone(),
            _permit: permit,
        })
    }

    pub fn stats(&self) -> PoolStats {
        PoolStats {
            size: self.inner.config.max_size.max(1),
            idle: self.inner.idle.lock().unwrap_or_else(|e| e.into_inner()).len(),
            available: self.inner.permits.available_permits(),
        }
    }
}

/// A checked-out connection; parks itself back in the pool on drop.
pub struct PooledConn {
    conn: Option<Connection>,
    inner: Arc<PoolInner>,
    _permit: OwnedSemaphorePermit,
}

impl PooledConn {
    /// Drop the underlying connection instead of parking it. Call this
    /// after a transport failure so a broken stream is never reused.
    pub fn discard(mut self) {
        self.conn = None;
    }
}

impl std::ops::Deref for PooledConn {
    type Target = Connection;

    fn deref(&self) -> &Connection {
        self.conn.as_ref().expect("connection already discarded")
    }
}

impl std::ops::DerefMut for PooledConn {
    fn deref_mut(&mut self) -> &mut Connection {
        self.conn.as_mut().expect("connection already discarded")
    }
}

impl Drop for PooledConn {
    fn drop(&mut self) {
        if let Some(conn) = self.conn.take() {
            self.inner
                .idle
                .lock()
                .unwrap_or_else(|e| e.into_inner())
                .push(conn);
        }
    }
}
