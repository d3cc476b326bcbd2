//! Connection lifecycle tracking.
//!
//! # Responsibilities
//! - Generate unique connection IDs for tracing
//! - Own every connection task so shutdown can drain or abort them
//! - Count in-flight requests per connection to detect idle keep-alives

use std::future::Future;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::watch;
use tokio::task::{JoinError, JoinSet};

/// Relaxed ordering is enough, IDs only need to be unique.
static CONNECTION_ID_COUNTER: AtomicU64 = AtomicU64::new(1);

/// Unique identifier for a connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ConnectionId(u64);

impl ConnectionId {
    /// Generate a new unique connection ID.
    pub fn next() -> Self {
        Self(CONNECTION_ID_COUNTER.fetch_add(1, Ordering::Relaxed))
    }

    pub fn as_u64(&self) -> u64 {
        self.0
    }
}

impl std::fmt::Display for ConnectionId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "conn-{}", self.0)
    }
}

/// Owns the tasks serving accepted connections.
///
/// Dropping the tracker aborts every connection it still owns.
#[derive(Debug, Default)]
pub struct ConnectionTracker {
    tasks: JoinSet<()>,
}

impl ConnectionTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Run `connection` on its own task.
    pub fn spawn<F>(&mut self, id: ConnectionId, connection: F)
    where
        F: Future<Output = ()> + Send + 'static,
    {
        self.tasks.spawn(async move {
            connection.await;
            tracing::trace!(connection_id = %id, "Connection closed");
        });
    }

    /// Connections not yet reaped.
    pub fn active_count(&self) -> usize {
        self.tasks.len()
    }

    /// Forget connections that have already finished.
    pub fn reap(&mut self) {
        while let Some(result) = self.tasks.try_join_next() {
            log_join(result);
        }
    }

    /// Wait until every connection has finished on its own.
    ///
    /// Cancel safe: dropping the future leaves unfinished connections tracked.
    pub async fn drained(&mut self) {
        while let Some(result) = self.tasks.join_next().await {
            log_join(result);
        }
    }

    /// Abort every connection and wait for the tasks to unwind.
    /// Returns how many connections were still open.
    pub async fn abort_all(&mut self) -> usize {
        let open = self.tasks.len();
        self.tasks.abort_all();
        while self.tasks.join_next().await.is_some() {}
        open
    }
}

fn log_join(result: Result<(), JoinError>) {
    if let Err(error) = result {
        if error.is_panic() {
            tracing::error!(error = %error, "Connection task panicked");
        }
    }
}

/// In-flight request count for one connection.
#[derive(Debug, Clone)]
pub struct RequestActivity {
    in_flight: Arc<watch::Sender<usize>>,
}

impl RequestActivity {
    pub fn new() -> Self {
        let (tx, _) = watch::channel(0);
        Self {
            in_flight: Arc::new(tx),
        }
    }

    /// Mark a request as started. It ends when the guard is dropped.
    pub fn begin(&self) -> RequestGuard {
        self.in_flight.send_modify(|n| *n += 1);
        RequestGuard {
            in_flight: Arc::clone(&self.in_flight),
        }
    }

    pub fn in_flight(&self) -> usize {
        *self.in_flight.borrow()
    }

    /// Resolve once no request has been in flight for `timeout`.
    pub async fn idle_for(&self, timeout: Duration) {
        let mut rx = self.in_flight.subscribe();
        loop {
            if rx.wait_for(|n| *n == 0).await.is_err() {
                return;
            }
            if tokio::time::timeout(timeout, rx.changed()).await.is_err() {
                return;
            }
        }
    }
}

impl Default for RequestActivity {
    fn default() -> Self {
        Self::new()
    }
}

/// Ends a request on drop.
#[derive(Debug)]
pub struct RequestGuard {
    in_flight: Arc<watch::Sender<usize>>,
}

impl Drop for RequestGuard {
    fn drop(&mut self) {
        self.in_flight.send_modify(|n| *n = n.saturating_sub(1));
    }
}
