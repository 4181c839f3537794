//! Bounded pool of pre-allocated, fixed-capacity buffers.
//!
//! This module provides the [`BufferPool`] and [`BufferPoolBuilder`] types. All
//! buffers are allocated when the pool is built; acquisition never allocates.
//!
//! The free list is a bounded channel holding the available buffers, so one
//! primitive provides both mutual exclusion and wake-up: a blocked acquirer
//! sleeps in a channel receive and is woken by the next release. Pool closure
//! and caller cancellation are modelled as channels that disconnect when fired
//! and are waited on in the same `select`.

use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use crossbeam_channel::{Receiver, Select, Sender, TrySendError};
use tokio::sync::oneshot;
use tokio::task::JoinHandle;
use tracing::{debug, trace, warn};

use crate::buffer::Buffer;
use crate::error::AcquireError;
use crate::signal::{CancellationToken, Signal};

/// Default capacity of each buffer (4 KiB).
pub const DEFAULT_BUFFER_CAPACITY: usize = 4096;

/// Default number of buffers in a pool.
pub const DEFAULT_BUFFER_COUNT: usize = 5;

/// Builder for creating a [`BufferPool`] with custom configuration.
///
/// # Example
///
/// ```rust
/// use ruapc_pools::BufferPoolBuilder;
///
/// let pool = BufferPoolBuilder::new()
///     .buffer_capacity(64 * 1024)
///     .buffer_count(16)
///     .build();
/// assert_eq!(pool.available(), 16);
/// ```
#[derive(Debug, Clone)]
pub struct BufferPoolBuilder {
    buffer_capacity: usize,
    buffer_count: usize,
}

impl Default for BufferPoolBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl BufferPoolBuilder {
    /// Creates a new builder with default settings.
    ///
    /// Default settings:
    /// - Buffer capacity: [`DEFAULT_BUFFER_CAPACITY`]
    /// - Buffer count: [`DEFAULT_BUFFER_COUNT`]
    #[must_use]
    pub const fn new() -> Self {
        Self {
            buffer_capacity: DEFAULT_BUFFER_CAPACITY,
            buffer_count: DEFAULT_BUFFER_COUNT,
        }
    }

    /// Sets the fixed capacity of every buffer, in bytes.
    #[must_use]
    pub const fn buffer_capacity(mut self, buffer_capacity: usize) -> Self {
        self.buffer_capacity = buffer_capacity;
        self
    }

    /// Sets the number of buffers. Values below 1 are raised to 1.
    #[must_use]
    pub const fn buffer_count(mut self, buffer_count: usize) -> Self {
        self.buffer_count = if buffer_count == 0 { 1 } else { buffer_count };
        self
    }

    /// Builds the pool, allocating every buffer up front.
    #[must_use]
    pub fn build(self) -> BufferPool {
        let (free_tx, free_rx) = crossbeam_channel::bounded(self.buffer_count);
        for _ in 0..self.buffer_count {
            // Cannot fail: the channel holds exactly `buffer_count` items.
            let _ = free_tx.try_send(Buffer::new(self.buffer_capacity));
        }

        debug!(
            buffer_capacity = self.buffer_capacity,
            buffer_count = self.buffer_count,
            "buffer pool built"
        );

        BufferPool {
            shared: Arc::new(PoolShared {
                buffer_capacity: self.buffer_capacity,
                buffer_count: self.buffer_count,
                free_tx,
                free_rx,
                closed: Signal::new(),
                acquisitions: AtomicU64::new(0),
                releases: AtomicU64::new(0),
                timeouts: AtomicU64::new(0),
            }),
        }
    }
}

/// Snapshot of a pool's counters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PoolStats {
    /// Successful acquisitions since creation or the last reset.
    pub acquisitions: u64,
    /// Buffers returned to the free list since creation or the last reset.
    pub releases: u64,
    /// Timed acquisitions that gave up since creation or the last reset.
    pub timeouts: u64,
    /// Buffers currently available.
    pub available: usize,
}

/// A bounded pool of fixed-capacity [`Buffer`]s with exclusive checkout.
///
/// A buffer is either checked out (owned by exactly one caller) or available
/// (owned by the pool). Checkout transfers ownership, so a buffer cannot be
/// used after it has been released.
///
/// # Thread Safety
///
/// `BufferPool` is a cheap handle around shared state; clones refer to the
/// same pool and may be used from any number of threads. Counters are atomics
/// independent of the free list.
///
/// # Example
///
/// ```rust
/// use std::time::Duration;
/// use ruapc_pools::BufferPoolBuilder;
///
/// let pool = BufferPoolBuilder::new().buffer_count(2).build();
///
/// let mut buffer = pool.acquire(Duration::from_millis(100)).unwrap();
/// buffer.append(b"request bytes");
///
/// // Returned buffers are reset.
/// pool.release(buffer);
/// assert_eq!(pool.try_acquire().unwrap().len(), 0);
/// ```
#[derive(Clone)]
pub struct BufferPool {
    shared: Arc<PoolShared>,
}

struct PoolShared {
    buffer_capacity: usize,
    buffer_count: usize,

    /// Free list. Bounded by `buffer_count`; both ends are kept alive for the
    /// life of the pool so the channel never disconnects.
    free_tx: Sender<Buffer>,
    free_rx: Receiver<Buffer>,

    closed: Signal,

    acquisitions: AtomicU64,
    releases: AtomicU64,
    timeouts: AtomicU64,
}

impl BufferPool {
    /// Creates a pool with default settings.
    ///
    /// This is equivalent to `BufferPoolBuilder::new().build()`.
    #[must_use]
    pub fn new() -> Self {
        BufferPoolBuilder::new().build()
    }

    /// Takes an available buffer without blocking.
    ///
    /// Returns `None` if every buffer is checked out or the pool is closed.
    #[must_use]
    pub fn try_acquire(&self) -> Option<Buffer> {
        self.try_checkout().ok()
    }

    /// Like [`try_acquire`](Self::try_acquire), but tells exhaustion apart
    /// from closure.
    ///
    /// # Errors
    ///
    /// - [`AcquireError::Closed`] if the pool is closed.
    /// - [`AcquireError::Exhausted`] if every buffer is checked out.
    pub fn try_checkout(&self) -> Result<Buffer, AcquireError> {
        let shared = &*self.shared;
        if shared.closed.is_fired() {
            return Err(AcquireError::Closed);
        }
        match shared.free_rx.try_recv() {
            Ok(buffer) => self.hand_out(buffer),
            Err(_) => Err(AcquireError::Exhausted),
        }
    }

    /// Waits up to `timeout` for a buffer.
    ///
    /// The calling thread sleeps until a buffer is released, the timeout
    /// elapses or the pool is closed. Returns `None` on timeout (incrementing
    /// the timeout counter) or closure.
    #[must_use]
    pub fn acquire(&self, timeout: Duration) -> Option<Buffer> {
        self.checkout(timeout, None).ok()
    }

    /// Waits up to `timeout` for a buffer, giving up early if `token` is
    /// cancelled.
    ///
    /// Timeout, cancellation and closure all return `None`; use
    /// [`checkout`](Self::checkout) to tell them apart.
    #[must_use]
    pub fn acquire_with_cancel(
        &self,
        timeout: Duration,
        token: &CancellationToken,
    ) -> Option<Buffer> {
        self.checkout(timeout, Some(token)).ok()
    }

    /// Waits up to `timeout` for a buffer and reports why none was obtained.
    ///
    /// # Errors
    ///
    /// - [`AcquireError::TimedOut`] if `timeout` elapsed first. The timeout
    ///   counter is incremented.
    /// - [`AcquireError::Cancelled`] if `token` was cancelled first.
    /// - [`AcquireError::Closed`] if the pool was or became closed.
    pub fn checkout(
        &self,
        timeout: Duration,
        token: Option<&CancellationToken>,
    ) -> Result<Buffer, AcquireError> {
        self.wait(Some(timeout), token)
    }

    /// Waits asynchronously up to `timeout` for a buffer.
    ///
    /// The wait runs on Tokio's blocking thread pool. If the returned future is
    /// dropped before completion, a buffer acquired on its behalf is released
    /// back to the pool.
    ///
    /// # Panics
    ///
    /// Panics if called outside of a Tokio runtime.
    pub async fn acquire_async(&self, timeout: Duration) -> Option<Buffer> {
        let (sender, receiver) = oneshot::channel();
        let pool = self.clone();
        tokio::task::spawn_blocking(move || {
            if let Some(buffer) = pool.acquire(timeout) {
                if let Err(buffer) = sender.send(buffer) {
                    pool.release(buffer);
                }
            }
        });
        receiver.await.ok()
    }

    /// Runs `callback` with a buffer on a background thread once one becomes
    /// available.
    ///
    /// The wait has no timeout. The buffer is released after the callback
    /// returns, and also if it panics. If the pool is closed before a buffer
    /// becomes available, the callback is never invoked.
    ///
    /// The returned handle resolves to `true` if the callback ran.
    ///
    /// # Panics
    ///
    /// Panics if called outside of a Tokio runtime.
    ///
    /// # Example
    ///
    /// ```rust
    /// use ruapc_pools::BufferPool;
    ///
    /// # async fn example() {
    /// let pool = BufferPool::new();
    /// let ran = pool
    ///     .with_buffer_async(|buffer| {
    ///         buffer.append(b"background work");
    ///     })
    ///     .await
    ///     .unwrap();
    /// assert!(ran);
    /// # }
    /// ```
    pub fn with_buffer_async<F>(&self, callback: F) -> JoinHandle<bool>
    where
        F: FnOnce(&mut Buffer) + Send + 'static,
    {
        let pool = self.clone();
        tokio::task::spawn_blocking(move || {
            let Ok(buffer) = pool.wait(None, None) else {
                trace!("pool closed before a buffer became available; callback skipped");
                return false;
            };
            let mut guard = ReleaseGuard {
                pool: &pool,
                buffer: Some(buffer),
            };
            if let Some(buffer) = guard.buffer.as_mut() {
                callback(buffer);
            }
            true
        })
    }

    /// Resets `buffer` and returns it to the pool, waking one waiting acquirer.
    ///
    /// Buffers released after [`close`](Self::close) are dropped. So are
    /// buffers whose capacity does not match the pool's and buffers that would
    /// push the pool past its configured count, which keeps the number of
    /// buffers in circulation bounded.
    pub fn release(&self, mut buffer: Buffer) {
        let shared = &*self.shared;
        if shared.closed.is_fired() {
            trace!("pool closed; dropping released buffer");
            return;
        }
        if buffer.capacity() != shared.buffer_capacity {
            warn!(
                capacity = buffer.capacity(),
                expected = shared.buffer_capacity,
                "dropping released buffer with foreign capacity"
            );
            return;
        }

        buffer.reset();
        match shared.free_tx.try_send(buffer) {
            Ok(()) => {
                shared.releases.fetch_add(1, Ordering::Relaxed);
                trace!("buffer released");
            }
            Err(TrySendError::Full(_)) => {
                warn!(
                    buffer_count = shared.buffer_count,
                    "free list already full; dropping released buffer"
                );
            }
            Err(TrySendError::Disconnected(_)) => {}
        }
    }

    /// Closes the pool.
    ///
    /// Available buffers are freed, blocked acquirers return `None` promptly
    /// and every later acquisition fails immediately. Closing twice is a no-op.
    pub fn close(&self) {
        let shared = &*self.shared;
        if !shared.closed.fire() {
            return;
        }
        let mut freed = 0usize;
        while shared.free_rx.try_recv().is_ok() {
            freed += 1;
        }
        debug!(freed, "buffer pool closed");
    }

    /// Returns `true` once [`close`](Self::close) has been called.
    #[must_use]
    pub fn is_closed(&self) -> bool {
        self.shared.closed.is_fired()
    }

    /// Returns the number of buffers currently available.
    #[must_use]
    pub fn available(&self) -> usize {
        if self.is_closed() {
            0
        } else {
            self.shared.free_rx.len()
        }
    }

    /// Returns the configured number of buffers.
    #[must_use]
    pub fn buffer_count(&self) -> usize {
        self.shared.buffer_count
    }

    /// Returns the configured capacity of each buffer.
    #[must_use]
    pub fn buffer_capacity(&self) -> usize {
        self.shared.buffer_capacity
    }

    /// Returns the number of successful acquisitions.
    #[must_use]
    pub fn acquisitions(&self) -> u64 {
        self.shared.acquisitions.load(Ordering::Relaxed)
    }

    /// Returns the number of buffers returned to the free list.
    #[must_use]
    pub fn releases(&self) -> u64 {
        self.shared.releases.load(Ordering::Relaxed)
    }

    /// Returns the number of timed acquisitions that gave up.
    #[must_use]
    pub fn timeouts(&self) -> u64 {
        self.shared.timeouts.load(Ordering::Relaxed)
    }

    /// Returns a snapshot of the counters and the available count.
    #[must_use]
    pub fn stats(&self) -> PoolStats {
        PoolStats {
            acquisitions: self.acquisitions(),
            releases: self.releases(),
            timeouts: self.timeouts(),
            available: self.available(),
        }
    }

    /// Zeroes the counters without touching the buffers.
    pub fn reset_counters(&self) {
        let shared = &*self.shared;
        shared.acquisitions.store(0, Ordering::Relaxed);
        shared.releases.store(0, Ordering::Relaxed);
        shared.timeouts.store(0, Ordering::Relaxed);
    }

    /// Blocks until a buffer arrives, the pool closes, `token` fires or
    /// `timeout` (if any) elapses.
    fn wait(
        &self,
        timeout: Option<Duration>,
        token: Option<&CancellationToken>,
    ) -> Result<Buffer, AcquireError> {
        let shared = &*self.shared;
        if shared.closed.is_fired() {
            return Err(AcquireError::Closed);
        }
        if token.is_some_and(CancellationToken::is_cancelled) {
            return Err(AcquireError::Cancelled);
        }

        let mut select = Select::new();
        let free = select.recv(&shared.free_rx);
        let closed = select.recv(shared.closed.receiver());
        if let Some(token) = token {
            select.recv(token.receiver());
        }

        let op = match timeout {
            Some(timeout) => {
                if let Ok(op) = select.select_timeout(timeout) {
                    op
                } else {
                    shared.timeouts.fetch_add(1, Ordering::Relaxed);
                    trace!(?timeout, "timed out waiting for a buffer");
                    return Err(AcquireError::TimedOut);
                }
            }
            None => select.select(),
        };

        let index = op.index();
        if index == free {
            match op.recv(&shared.free_rx) {
                Ok(buffer) => self.hand_out(buffer),
                Err(_) => Err(AcquireError::Closed),
            }
        } else if index == closed {
            let _ = op.recv(shared.closed.receiver());
            Err(AcquireError::Closed)
        } else {
            if let Some(token) = token {
                let _ = op.recv(token.receiver());
            }
            trace!("buffer acquisition cancelled");
            Err(AcquireError::Cancelled)
        }
    }

    /// Counts a buffer taken off the free list, unless the pool closed while
    /// it was in flight.
    fn hand_out(&self, buffer: Buffer) -> Result<Buffer, AcquireError> {
        let shared = &*self.shared;
        if shared.closed.is_fired() {
            drop(buffer);
            return Err(AcquireError::Closed);
        }
        shared.acquisitions.fetch_add(1, Ordering::Relaxed);
        trace!("buffer acquired");
        Ok(buffer)
    }
}

impl Default for BufferPool {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for BufferPool {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BufferPool")
            .field("buffer_capacity", &self.buffer_capacity())
            .field("buffer_count", &self.buffer_count())
            .field("available", &self.available())
            .field("closed", &self.is_closed())
            .finish_non_exhaustive()
    }
}

/// Returns the buffer to the pool on drop, including during unwinding.
struct ReleaseGuard<'a> {
    pool: &'a BufferPool,
    buffer: Option<Buffer>,
}

impl Drop for ReleaseGuard<'_> {
    fn drop(&mut self) {
        if let Some(buffer) = self.buffer.take() {
            self.pool.release(buffer);
        }
    }
}
