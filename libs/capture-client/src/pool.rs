use crate::config::Endpoint;
use crate::error::Error;
use bytes::Bytes;
use http::Request;
use http_body_util::Full;
use hyper::body::Incoming;
use hyper::client::conn::http1::SendRequest;
use hyper_util::rt::TokioIo;
use std::collections::VecDeque;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::{Duration, Instant};
use tokio::net::TcpStream;
use tokio::sync::{OwnedSemaphorePermit, Semaphore};
use tokio::task::JoinHandle;

/// A live HTTP/1.1 connection: the hyper send handle plus the spawned
/// driver task that pumps the socket.
pub(crate) struct PooledConn {
    sender: SendRequest<Full<Bytes>>,
    driver: JoinHandle<()>,
}

impl PooledConn {
    fn is_closed(&self) -> bool {
        self.sender.is_closed()
    }

    fn discard(self) {
        // Dropping the sender shuts the connection down; aborting the
        // driver keeps teardown prompt during sweeps and shutdown.
        drop(self.sender);
        self.driver.abort();
    }
}

struct IdleConn {
    conn: PooledConn,
    last_used: Instant,
    expires_at: Instant,
}

struct PoolState {
    idle: VecDeque<IdleConn>,
    closed: bool,
}

/// An exclusive borrow of one pooled connection.
///
/// The owned semaphore permit travels with the lease, so the
/// concurrently-leased bound holds even when a lease is dropped on an
/// error path: the connection is discarded and the slot is freed, never
/// leaked and never double-released.
pub(crate) struct Lease {
    conn: PooledConn,
    _permit: OwnedSemaphorePermit,
}

impl Lease {
    /// Send one request on the leased connection.
    ///
    /// The caller must read the returned body to completion before the
    /// connection can be released for reuse.
    pub(crate) async fn send_request(
        &mut self,
        request: Request<Full<Bytes>>,
    ) -> Result<http::Response<Incoming>, hyper::Error> {
        self.conn.sender.ready().await?;
        self.conn.sender.send_request(request).await
    }
}

/// Bounded pool of reusable connections to a single `host:port`.
///
/// At most `max_connections` leases exist at any moment; `acquire` queues
/// when the pool is at capacity. Connections are dialed lazily, reused in
/// FIFO order and dropped once past their negotiated keep-alive expiry or
/// idle for too long. Exactly one pool exists per client, created with the
/// reaper and torn down with it.
pub(crate) struct ConnectionPool {
    endpoint: Endpoint,
    permits: Arc<Semaphore>,
    state: Mutex<PoolState>,
}

impl ConnectionPool {
    pub(crate) fn new(endpoint: Endpoint, max_connections: usize) -> Self {
        Self {
            endpoint,
            permits: Arc::new(Semaphore::new(max_connections)),
            state: Mutex::new(PoolState {
                idle: VecDeque::new(),
                closed: false,
            }),
        }
    }

    fn lock(&self) -> MutexGuard<'_, PoolState> {
        // A poisoned mutex only means a panic while sweeping; the pool
        // state itself stays consistent.
        match self.state.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }

    /// Borrow a connection, waiting for a free slot when at capacity.
    ///
    /// Expired or closed idle connections encountered on the way are
    /// dropped and replaced with a fresh dial.
    pub(crate) async fn acquire(&self) -> Result<Lease, Error> {
        let permit = Arc::clone(&self.permits)
            .acquire_owned()
            .await
            .map_err(|_| Error::PoolClosed)?;

        loop {
            let candidate = {
                let mut state = self.lock();
                if state.closed {
                    return Err(Error::PoolClosed);
                }
                state.idle.pop_front()
            };

            let Some(idle) = candidate else { break };

            if idle.expires_at <= Instant::now() || idle.conn.is_closed() {
                idle.conn.discard();
                continue;
            }

            return Ok(Lease {
                conn: idle.conn,
                _permit: permit,
            });
        }

        let conn = self.dial().await?;
        Ok(Lease {
            conn,
            _permit: permit,
        })
    }

    /// Return a leased connection.
    ///
    /// `keep_alive` is the lifetime negotiated from the response; a
    /// non-reusable connection (server sent `Connection: close`, or the
    /// transport already failed) is discarded instead of pooled.
    pub(crate) fn release(&self, lease: Lease, keep_alive: Duration, reusable: bool) {
        let Lease { conn, _permit } = lease;

        if !reusable || conn.is_closed() {
            conn.discard();
            return;
        }

        let now = Instant::now();
        let rejected = {
            let mut state = self.lock();
            if state.closed {
                Some(conn)
            } else {
                state.idle.push_back(IdleConn {
                    conn,
                    last_used: now,
                    expires_at: now + keep_alive,
                });
                None
            }
        };
        if let Some(conn) = rejected {
            conn.discard();
        }
        // The permit drops here, freeing the slot.
    }

    /// Drop idle connections past their negotiated keep-alive expiry.
    pub(crate) fn close_expired(&self) {
        let now = Instant::now();
        self.sweep(|idle| idle.expires_at <= now);
    }

    /// Drop idle connections unused for longer than `threshold`.
    pub(crate) fn close_idle(&self, threshold: Duration) {
        let now = Instant::now();
        self.sweep(|idle| now.duration_since(idle.last_used) >= threshold);
    }

    fn sweep(&self, mut dead: impl FnMut(&IdleConn) -> bool) {
        let mut dropped = Vec::new();
        {
            let mut state = self.lock();
            let mut kept = VecDeque::with_capacity(state.idle.len());
            while let Some(idle) = state.idle.pop_front() {
                if dead(&idle) {
                    dropped.push(idle);
                } else {
                    kept.push_back(idle);
                }
            }
            state.idle = kept;
        }

        if !dropped.is_empty() {
            tracing::trace!(count = dropped.len(), "reaped pooled connections");
        }
        for idle in dropped {
            idle.conn.discard();
        }
    }

    /// Close all idle connections and fail every pending and future
    /// `acquire`. In-flight leases finish independently; their connections
    /// are discarded on release. Idempotent.
    pub(crate) fn shutdown(&self) {
        let drained: Vec<IdleConn> = {
            let mut state = self.lock();
            if state.closed {
                return;
            }
            state.closed = true;
            state.idle.drain(..).collect()
        };

        self.permits.close();
        for idle in drained {
            idle.conn.discard();
        }
        tracing::debug!("connection pool shut down");
    }

    async fn dial(&self) -> Result<PooledConn, Error> {
        let stream = TcpStream::connect((self.endpoint.host(), self.endpoint.port())).await?;
        let io = TokioIo::new(stream);
        let (sender, connection) = hyper::client::conn::http1::handshake(io).await?;

        let authority = self.endpoint.authority();
        let driver = tokio::spawn(async move {
            if let Err(err) = connection.await {
                tracing::debug!(error = %err, "connection driver terminated");
            }
        });
        tracing::debug!(endpoint = %authority, "opened new connection");

        Ok(PooledConn { sender, driver })
    }

    #[cfg(test)]
    fn idle_len(&self) -> usize {
        self.lock().idle.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use httpmock::MockServer;
    use std::time::Duration;

    fn pool_for(server: &MockServer, max_connections: usize) -> ConnectionPool {
        ConnectionPool::new(
            Endpoint::new(server.host(), server.port()),
            max_connections,
        )
    }

    #[tokio::test]
    async fn acquire_dials_and_release_pools_the_connection() {
        let server = MockServer::start_async().await;
        let pool = pool_for(&server, 2);

        let lease = pool.acquire().await.unwrap();
        assert_eq!(pool.idle_len(), 0);

        pool.release(lease, Duration::from_secs(30), true);
        assert_eq!(pool.idle_len(), 1);

        // The pooled connection is handed out again instead of a new dial.
        let _lease = pool.acquire().await.unwrap();
        assert_eq!(pool.idle_len(), 0);
    }

    #[tokio::test]
    async fn non_reusable_connection_is_discarded() {
        let server = MockServer::start_async().await;
        let pool = pool_for(&server, 2);

        let lease = pool.acquire().await.unwrap();
        pool.release(lease, Duration::from_secs(30), false);
        assert_eq!(pool.idle_len(), 0);
    }

    #[tokio::test]
    async fn capacity_blocks_the_extra_acquire_until_release() {
        let server = MockServer::start_async().await;
        let pool = pool_for(&server, 2);

        let first = pool.acquire().await.unwrap();
        let _second = pool.acquire().await.unwrap();

        // Third acquire must queue: no slot within the grace period.
        let blocked =
            tokio::time::timeout(Duration::from_millis(100), pool.acquire()).await;
        assert!(blocked.is_err(), "third lease must not be granted at cap 2");

        pool.release(first, Duration::from_secs(30), true);
        let third = tokio::time::timeout(Duration::from_millis(500), pool.acquire())
            .await
            .expect("slot must free up after release");
        assert!(third.is_ok());
    }

    #[tokio::test]
    async fn expired_connections_are_swept() {
        let server = MockServer::start_async().await;
        let pool = pool_for(&server, 2);

        let lease = pool.acquire().await.unwrap();
        pool.release(lease, Duration::from_millis(0), true);
        assert_eq!(pool.idle_len(), 1);

        pool.close_expired();
        assert_eq!(pool.idle_len(), 0);
    }

    #[tokio::test]
    async fn idle_connections_are_swept_past_the_threshold() {
        let server = MockServer::start_async().await;
        let pool = pool_for(&server, 2);

        let lease = pool.acquire().await.unwrap();
        pool.release(lease, Duration::from_secs(30), true);

        // A generous threshold keeps the connection...
        pool.close_idle(Duration::from_secs(30));
        assert_eq!(pool.idle_len(), 1);

        // ...a zero threshold reaps it.
        pool.close_idle(Duration::from_millis(0));
        assert_eq!(pool.idle_len(), 0);
    }

    #[tokio::test]
    async fn expired_idle_connection_is_replaced_on_acquire() {
        let server = MockServer::start_async().await;
        let pool = pool_for(&server, 1);

        let lease = pool.acquire().await.unwrap();
        pool.release(lease, Duration::from_millis(0), true);
        assert_eq!(pool.idle_len(), 1);

        // The expired candidate is dropped on the way; a fresh connection
        // is dialed without exceeding the cap.
        let lease = pool.acquire().await.unwrap();
        assert_eq!(pool.idle_len(), 0);
        pool.release(lease, Duration::from_secs(30), true);
    }

    #[tokio::test]
    async fn shutdown_rejects_further_acquisition() {
        let server = MockServer::start_async().await;
        let pool = pool_for(&server, 2);

        let lease = pool.acquire().await.unwrap();
        pool.release(lease, Duration::from_secs(30), true);

        pool.shutdown();
        assert_eq!(pool.idle_len(), 0);

        let result = pool.acquire().await;
        assert!(matches!(result, Err(Error::PoolClosed)));

        // Idempotent.
        pool.shutdown();
    }

    #[tokio::test]
    async fn release_after_shutdown_discards_the_connection() {
        let server = MockServer::start_async().await;
        let pool = pool_for(&server, 2);

        let lease = pool.acquire().await.unwrap();
        pool.shutdown();
        pool.release(lease, Duration::from_secs(30), true);
        assert_eq!(pool.idle_len(), 0);
    }
}
