//! One-shot broadcast signals built on channel disconnection.
//!
//! A [`Signal`] owns the only sender of a zero-capacity channel. Firing the
//! signal drops that sender, which wakes every thread blocked on the receiver
//! at once and makes all later receives return immediately. This lets pool
//! closure and caller cancellation participate in the same blocking `select`
//! as the free list, so nothing ever polls a flag.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use crossbeam_channel::{Receiver, Sender};
use parking_lot::Mutex;

/// Latch that can be fired exactly once and observed by any number of waiters.
#[derive(Debug)]
pub(crate) struct Signal {
    fired: AtomicBool,
    tx: Mutex<Option<Sender<()>>>,
    rx: Receiver<()>,
}

impl Signal {
    pub(crate) fn new() -> Self {
        let (tx, rx) = crossbeam_channel::bounded(0);
        Self {
            fired: AtomicBool::new(false),
            tx: Mutex::new(Some(tx)),
            rx,
        }
    }

    /// Fires the signal. Returns `true` on the first call only.
    pub(crate) fn fire(&self) -> bool {
        if self.fired.swap(true, Ordering::AcqRel) {
            return false;
        }
        drop(self.tx.lock().take());
        true
    }

    #[inline]
    pub(crate) fn is_fired(&self) -> bool {
        self.fired.load(Ordering::Acquire)
    }

    /// Receiver that becomes ready (disconnected) once the signal fires.
    #[inline]
    pub(crate) const fn receiver(&self) -> &Receiver<()> {
        &self.rx
    }
}

/// Cancels blocked buffer acquisitions from another thread.
///
/// Clones share the same state: cancelling any clone cancels them all.
/// Cancellation is permanent.
///
/// # Example
///
/// ```rust
/// use std::time::Duration;
/// use ruapc_pools::{BufferPoolBuilder, CancellationToken};
///
/// let pool = BufferPoolBuilder::new().buffer_count(1).build();
/// let held = pool.try_acquire().unwrap();
///
/// let token = CancellationToken::new();
/// token.cancel();
/// assert!(pool.acquire_with_cancel(Duration::from_secs(60), &token).is_none());
/// pool.release(held);
/// ```
#[derive(Debug, Clone)]
pub struct CancellationToken {
    signal: Arc<Signal>,
}

impl CancellationToken {
    /// Creates a token that has not been cancelled.
    #[must_use]
    pub fn new() -> Self {
        Self {
            signal: Arc::new(Signal::new()),
        }
    }

    /// Cancels the token, waking every acquisition waiting on it.
    pub fn cancel(&self) {
        self.signal.fire();
    }

    /// Returns `true` once [`cancel`](Self::cancel) has been called on any clone.
    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        self.signal.is_fired()
    }

    pub(crate) fn receiver(&self) -> &Receiver<()> {
        self.signal.receiver()
    }
}

impl Default for CancellationToken {
    fn default() -> Self {
        Self::new()
    }
}
