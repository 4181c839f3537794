//! Error types shared by the buffer pool and the worker pool.
//!
//! Exhaustion, timeouts and pool closure are ordinary outcomes rather than
//! faults, so they are modelled as [`AcquireError`] variants that callers can
//! match on, while the `Option`-returning acquisition calls collapse them.

use std::fmt;
use std::io;

use thiserror::Error;

use crate::worker::Job;

/// Boxed error returned by user-supplied work functions.
pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Failure while moving bytes between a [`Buffer`](crate::Buffer) and an
/// external reader or writer.
///
/// Both variants record how many bytes were transferred before the failure.
#[derive(Debug, Error)]
pub enum TransferError {
    /// The sink stopped accepting bytes before all unread bytes were written.
    #[error("short write: sink accepted only {transferred} bytes")]
    ShortWrite {
        /// Bytes accepted by the sink.
        transferred: usize,
    },

    /// The underlying reader or writer returned an error.
    #[error("i/o error after {transferred} bytes: {source}")]
    Io {
        /// Bytes transferred before the error.
        transferred: usize,
        /// The error reported by the reader or writer.
        #[source]
        source: io::Error,
    },
}

impl TransferError {
    /// Returns the number of bytes transferred before the failure.
    #[must_use]
    pub const fn transferred(&self) -> usize {
        match self {
            Self::ShortWrite { transferred } | Self::Io { transferred, .. } => *transferred,
        }
    }
}

impl From<TransferError> for io::Error {
    fn from(e: TransferError) -> Self {
        match e {
            TransferError::ShortWrite { .. } => Self::new(io::ErrorKind::WriteZero, e),
            TransferError::Io { source, .. } => source,
        }
    }
}

/// Why an acquisition did not yield a buffer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum AcquireError {
    /// No buffer was available for a non-blocking acquisition.
    #[error("no buffer available")]
    Exhausted,

    /// The timeout elapsed before a buffer was released.
    #[error("timed out waiting for a buffer")]
    TimedOut,

    /// The cancellation token fired before a buffer was released.
    #[error("buffer acquisition cancelled")]
    Cancelled,

    /// The pool has been closed.
    #[error("buffer pool is closed")]
    Closed,
}

/// Per-job failure reported through a [`JobResult`](crate::JobResult).
#[derive(Debug, Error)]
pub enum JobError {
    /// The work function returned an error.
    #[error("job failed: {0}")]
    Failed(#[source] BoxError),

    /// The work function panicked. The worker survived and kept serving jobs.
    #[error("job panicked: {message}")]
    Panicked {
        /// The panic payload, if it was a string.
        message: String,
    },
}

/// A job could not be submitted because the pool has been stopped.
///
/// The rejected job is handed back so the caller can resubmit it elsewhere.
#[derive(Error)]
pub enum SubmitError<I> {
    /// The pool no longer accepts jobs.
    #[error("worker pool is stopped")]
    Stopped(Job<I>),
}

impl<I> SubmitError<I> {
    /// Returns the job that was not submitted.
    #[must_use]
    pub fn into_job(self) -> Job<I> {
        match self {
            Self::Stopped(job) => job,
        }
    }
}

impl<I> fmt::Debug for SubmitError<I> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Stopped(job) => f.debug_tuple("Stopped").field(&job.id()).finish(),
        }
    }
}

/// Worker pool lifecycle errors.
#[derive(Debug, Error)]
pub enum WorkerPoolError {
    /// [`WorkerPool::start`](crate::WorkerPool::start) was called twice.
    #[error("worker pool already started")]
    AlreadyStarted,

    /// The pool has been stopped and cannot be restarted.
    #[error("worker pool is stopped")]
    Stopped,

    /// A worker thread could not be spawned.
    #[error("failed to spawn worker thread: {0}")]
    Spawn(#[from] io::Error),
}
