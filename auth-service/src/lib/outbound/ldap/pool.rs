use std::collections::VecDeque;
use std::sync::atomic::AtomicBool;
use std::sync::atomic::Ordering;

use async_trait::async_trait;
use parking_lot::Mutex;
use thiserror::Error;

use crate::user::errors::StoreError;

/// Error for connection pool operations.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum PoolError {
    #[error("pool is closed")]
    Closed,

    #[error("failed to dial directory: {0}")]
    Dial(String),
}

impl From<PoolError> for StoreError {
    fn from(err: PoolError) -> Self {
        match err {
            PoolError::Closed => StoreError::PoolClosed,
            PoolError::Dial(reason) => StoreError::Unavailable(reason),
        }
    }
}

/// Live connection that can be parked in a pool.
#[async_trait]
pub trait Connection: Send + Sized + 'static {
    /// Cheap round trip proving the connection still works.
    async fn is_alive(&mut self) -> bool;

    async fn close(self);
}

/// Opens new connections for a pool.
#[async_trait]
pub trait Dialer: Send + Sync + 'static {
    type Connection: Connection;

    async fn dial(&self) -> Result<Self::Connection, PoolError>;
}

/// Pool of directory connections.
///
/// A positive capacity gives a [`BoundedPool`]; zero gives a [`DialingPool`]
/// that dials on every acquire and closes on every release.
pub enum ConnectionPool<D: Dialer> {
    Bounded(BoundedPool<D>),
    Dialing(DialingPool<D>),
}

impl<D: Dialer> ConnectionPool<D> {
    pub fn new(capacity: usize, dialer: D) -> Self {
        if capacity == 0 {
            Self::Dialing(DialingPool::new(dialer))
        } else {
            Self::Bounded(BoundedPool::new(capacity, dialer))
        }
    }

    /// Take a connection, reusing a healthy idle one when possible.
    ///
    /// # Errors
    /// * `Closed` - Pool has been closed
    /// * `Dial` - A new connection was needed and could not be opened
    pub async fn acquire(&self) -> Result<D::Connection, PoolError> {
        match self {
            Self::Bounded(pool) => pool.acquire().await,
            Self::Dialing(pool) => pool.acquire().await,
        }
    }

    /// Hand a connection back. Never blocks on capacity.
    pub async fn release(&self, conn: D::Connection) {
        match self {
            Self::Bounded(pool) => pool.release(conn).await,
            Self::Dialing(pool) => pool.release(conn).await,
        }
    }

    /// Close the pool and every idle connection. Idempotent.
    pub async fn close(&self) {
        match self {
            Self::Bounded(pool) => pool.close().await,
            Self::Dialing(pool) => pool.close(),
        }
    }

    pub fn idle_count(&self) -> usize {
        match self {
            Self::Bounded(pool) => pool.idle_count(),
            Self::Dialing(_) => 0,
        }
    }

    pub fn is_closed(&self) -> bool {
        match self {
            Self::Bounded(pool) => pool.is_closed(),
            Self::Dialing(pool) => pool.is_closed(),
        }
    }
}

/// Fixed-capacity pool.
///
/// Idle connections sit in a FIFO queue guarded by a mutex; `None` marks the
/// pool closed. The lock is never held across an await, so probing and
/// dialing do not serialize callers.
pub struct BoundedPool<D: Dialer> {
    dialer: D,
    capacity: usize,
    idle: Mutex<Option<VecDeque<D::Connection>>>,
}

impl<D: Dialer> BoundedPool<D> {
    pub fn new(capacity: usize, dialer: D) -> Self {
        Self {
            dialer,
            capacity,
            idle: Mutex::new(Some(VecDeque::with_capacity(capacity))),
        }
    }

    pub async fn acquire(&self) -> Result<D::Connection, PoolError> {
        let parked = {
            let mut idle = self.idle.lock();
            let Some(conns) = idle.as_mut() else {
                return Err(PoolError::Closed);
            };
            conns.pop_front()
        };

        if let Some(mut conn) = parked {
            if conn.is_alive().await {
                return Ok(conn);
            }
            tracing::warn!("Discarding dead directory connection");
            conn.close().await;
        }

        tracing::debug!("Dialing new directory connection");
        self.dialer.dial().await
    }

    pub async fn release(&self, conn: D::Connection) {
        let surplus = {
            let mut idle = self.idle.lock();
            match idle.as_mut() {
                Some(conns) if conns.len() < self.capacity => {
                    conns.push_back(conn);
                    None
                }
                // closed or full
                _ => Some(conn),
            }
        };

        if let Some(conn) = surplus {
            tracing::debug!(closed = self.is_closed(), "Closing released directory connection");
            conn.close().await;
        }
    }

    pub async fn close(&self) {
        let drained = self.idle.lock().take();

        if let Some(conns) = drained {
            tracing::debug!(idle = conns.len(), "Closing directory connection pool");
            for conn in conns {
                conn.close().await;
            }
        }
    }

    pub fn idle_count(&self) -> usize {
        self.idle.lock().as_ref().map_or(0, VecDeque::len)
    }

    pub fn is_closed(&self) -> bool {
        self.idle.lock().is_none()
    }
}

/// Pool without storage.
pub struct DialingPool<D: Dialer> {
    dialer: D,
    closed: AtomicBool,
}

impl<D: Dialer> DialingPool<D> {
    pub fn new(dialer: D) -> Self {
        Self {
            dialer,
            closed: AtomicBool::new(false),
        }
    }

    pub async fn acquire(&self) -> Result<D::Connection, PoolError> {
        if self.is_closed() {
            return Err(PoolError::Closed);
        }
        self.dialer.dial().await
    }

    pub async fn release(&self, conn: D::Connection) {
        conn.close().await;
    }

    pub fn close(&self) {
        self.closed.store(true, Ordering::SeqCst);
    }

    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashSet;
    use std::sync::atomic::AtomicUsize;
    use std::sync::Arc;

    use super::*;

    #[derive(Default)]
    struct Log {
        dialed: AtomicUsize,
        closed: Mutex<Vec<usize>>,
        failed_probes: Mutex<HashSet<usize>>,
    }

    struct TestConnection {
        id: usize,
        healthy: bool,
        log: Arc<Log>,
    }

    #[async_trait]
    impl Connection for TestConnection {
        async fn is_alive(&mut self) -> bool {
            tokio::task::yield_now().await;
            if !self.healthy {
                self.log.failed_probes.lock().insert(self.id);
            }
            self.healthy
        }

        async fn close(self) {
            self.log.closed.lock().push(self.id);
        }
    }

    /// Every `unhealthy_every`-th connection fails its probe.
    struct TestDialer {
        log: Arc<Log>,
        unhealthy_every: usize,
    }

    impl TestDialer {
        fn new(log: &Arc<Log>) -> Self {
            Self {
                log: Arc::clone(log),
                unhealthy_every: 0,
            }
        }
    }

    #[async_trait]
    impl Dialer for TestDialer {
        type Connection = TestConnection;

        async fn dial(&self) -> Result<TestConnection, PoolError> {
            let id = self.log.dialed.fetch_add(1, Ordering::SeqCst) + 1;
            let healthy = self.unhealthy_every == 0 || id % self.unhealthy_every != 0;
            Ok(TestConnection {
                id,
                healthy,
                log: Arc::clone(&self.log),
            })
        }
    }

    struct FailingDialer;

    #[async_trait]
    impl Dialer for FailingDialer {
        type Connection = TestConnection;

        async fn dial(&self) -> Result<TestConnection, PoolError> {
            Err(PoolError::Dial("connection refused".to_string()))
        }
    }

    #[tokio::test]
    async fn test_acquire_dials_when_empty() {
        let log = Arc::new(Log::default());
        let pool = ConnectionPool::new(2, TestDialer::new(&log));

        let conn = pool.acquire().await.unwrap();
        assert_eq!(conn.id, 1);
        assert_eq!(log.dialed.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_released_connection_is_reused() {
        let log = Arc::new(Log::default());
        let pool = ConnectionPool::new(2, TestDialer::new(&log));

        let conn = pool.acquire().await.unwrap();
        pool.release(conn).await;
        assert_eq!(pool.idle_count(), 1);

        let again = pool.acquire().await.unwrap();
        assert_eq!(again.id, 1);
        assert_eq!(log.dialed.load(Ordering::SeqCst), 1);
        assert_eq!(pool.idle_count(), 0);
    }

    #[tokio::test]
    async fn test_dead_connection_is_replaced() {
        let log = Arc::new(Log::default());
        let dialer = TestDialer {
            log: Arc::clone(&log),
            unhealthy_every: 1,
        };
        let pool = ConnectionPool::new(2, dialer);

        let conn = pool.acquire().await.unwrap();
        pool.release(conn).await;

        let replacement = pool.acquire().await.unwrap();
        assert_eq!(replacement.id, 2);
        assert_eq!(*log.closed.lock(), vec![1]);
        assert!(log.failed_probes.lock().contains(&1));
    }

    #[tokio::test]
    async fn test_release_beyond_capacity_closes_surplus() {
        let log = Arc::new(Log::default());
        let pool = ConnectionPool::new(1, TestDialer::new(&log));

        let first = pool.acquire().await.unwrap();
        let second = pool.acquire().await.unwrap();
        pool.release(first).await;
        pool.release(second).await;

        assert_eq!(pool.idle_count(), 1);
        assert_eq!(*log.closed.lock(), vec![2]);
    }

    #[tokio::test]
    async fn test_close_drains_idle_connections() {
        let log = Arc::new(Log::default());
        let pool = ConnectionPool::new(3, TestDialer::new(&log));

        let first = pool.acquire().await.unwrap();
        let second = pool.acquire().await.unwrap();
        pool.release(first).await;
        pool.release(second).await;

        pool.close().await;

        assert!(pool.is_closed());
        assert_eq!(pool.idle_count(), 0);
        assert_eq!(log.closed.lock().len(), 2);
        assert_eq!(pool.acquire().await.err(), Some(PoolError::Closed));
    }

    #[tokio::test]
    async fn test_release_after_close_closes_connection() {
        let log = Arc::new(Log::default());
        let pool = ConnectionPool::new(3, TestDialer::new(&log));

        let conn = pool.acquire().await.unwrap();
        pool.close().await;
        pool.release(conn).await;

        assert_eq!(pool.idle_count(), 0);
        assert_eq!(*log.closed.lock(), vec![1]);
    }

    #[tokio::test]
    async fn test_close_is_idempotent() {
        let log = Arc::new(Log::default());
        let pool = ConnectionPool::new(1, TestDialer::new(&log));

        let conn = pool.acquire().await.unwrap();
        pool.release(conn).await;

        pool.close().await;
        pool.close().await;

        assert_eq!(*log.closed.lock(), vec![1]);
        assert_eq!(pool.acquire().await.err(), Some(PoolError::Closed));
    }

    #[tokio::test]
    async fn test_dial_failure_is_reported() {
        let pool = ConnectionPool::new(1, FailingDialer);

        let err = pool.acquire().await.err().expect("dial should fail");
        assert!(matches!(err, PoolError::Dial(_)));
        assert_eq!(
            StoreError::from(err),
            StoreError::Unavailable("connection refused".to_string())
        );
    }

    #[tokio::test]
    async fn test_dialing_pool_never_stores() {
        let log = Arc::new(Log::default());
        let pool = ConnectionPool::new(0, TestDialer::new(&log));
        assert!(matches!(pool, ConnectionPool::Dialing(_)));

        let conn = pool.acquire().await.unwrap();
        pool.release(conn).await;
        let conn = pool.acquire().await.unwrap();

        assert_eq!(conn.id, 2);
        assert_eq!(pool.idle_count(), 0);
        assert_eq!(*log.closed.lock(), vec![1]);

        pool.close().await;
        assert_eq!(pool.acquire().await.err(), Some(PoolError::Closed));
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_cycles_respect_capacity() {
        const CAPACITY: usize = 3;
        const WORKERS: usize = 24;

        let log = Arc::new(Log::default());
        let dialer = TestDialer {
            log: Arc::clone(&log),
            unhealthy_every: 4,
        };
        let pool = Arc::new(ConnectionPool::new(CAPACITY, dialer));

        let tasks: Vec<_> = (0..WORKERS)
            .map(|_| {
                let pool = Arc::clone(&pool);
                let log = Arc::clone(&log);
                tokio::spawn(async move {
                    for _ in 0..5 {
                        let conn = pool.acquire().await.expect("acquire failed");
                        assert!(
                            !log.failed_probes.lock().contains(&conn.id),
                            "pool handed out a connection that failed its probe"
                        );
                        tokio::task::yield_now().await;
                        pool.release(conn).await;
                        assert!(pool.idle_count() <= CAPACITY);
                    }
                })
            })
            .collect();

        for result in futures::future::join_all(tasks).await {
            result.expect("worker panicked");
        }

        assert!(pool.idle_count() <= CAPACITY);

        pool.close().await;
        let dialed = log.dialed.load(Ordering::SeqCst);
        assert_eq!(log.closed.lock().len(), dialed);
    }
}
