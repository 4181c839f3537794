//! # ruapc-pools
//!
//! Fixed-capacity buffer pooling and a fixed-size worker pool for high-throughput
//! request paths. This crate is part of the [ruapc](https://github.com/SF-Zhou/ruapc) project.
//!
//! ## Features
//!
//! - **Pre-allocated Buffers**: Every [`Buffer`] is allocated when the [`BufferPool`]
//!   is built; the hot path never allocates
//! - **Blocking, Timed and Cancellable Acquisition**: Waiters sleep on the free
//!   list and are woken by release, timeout, cancellation or pool closure
//! - **Async Hand-off**: [`BufferPool::with_buffer_async`] and
//!   [`BufferPool::acquire_async`] for Tokio environments
//! - **Worker Pool**: [`WorkerPool`] runs a user function on N persistent threads
//!   behind bounded queues, isolating per-job errors and panics
//!
//! ## Example
//!
//! ```rust
//! use std::time::Duration;
//! use ruapc_pools::BufferPoolBuilder;
//!
//! let pool = BufferPoolBuilder::new()
//!     .buffer_capacity(4096)
//!     .buffer_count(8)
//!     .build();
//!
//! let mut buffer = pool.acquire(Duration::from_millis(100)).unwrap();
//! buffer.append(b"hello");
//!
//! let mut out = Vec::new();
//! buffer.write_to(&mut out).unwrap();
//! assert_eq!(out, b"hello");
//!
//! pool.release(buffer);
//! ```
//!
//! ## Worker Pool Example
//!
//! ```rust
//! use ruapc_pools::{BoxError, WorkerPool};
//!
//! let pool = WorkerPool::with_size(4, |job| {
//!     let n: &u64 = job.payload();
//!     Ok::<_, BoxError>(n * n)
//! });
//! pool.start().unwrap();
//!
//! for n in 0..4 {
//!     pool.create_and_submit(n).unwrap();
//! }
//! let mut squares: Vec<u64> = (0..4)
//!     .map(|_| *pool.result().unwrap().output().unwrap())
//!     .collect();
//! squares.sort_unstable();
//! assert_eq!(squares, [0, 1, 4, 9]);
//!
//! pool.stop();
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![forbid(unsafe_code)]

mod buffer;
mod error;
mod pool;
mod queue;
mod signal;
mod worker;

pub use buffer::Buffer;
pub use error::{AcquireError, BoxError, JobError, SubmitError, TransferError, WorkerPoolError};
pub use pool::{
    BufferPool, BufferPoolBuilder, DEFAULT_BUFFER_CAPACITY, DEFAULT_BUFFER_COUNT, PoolStats,
};
pub use queue::BufferQueue;
pub use signal::CancellationToken;
pub use worker::{
    DEFAULT_THREAD_NAME, Job, JobId, JobResult, JobTiming, TimingHook, WorkFn, WorkerPool,
    WorkerPoolBuilder, default_worker_count,
};
