//! Fixed-size pool of persistent worker threads.
//!
//! This module provides [`WorkerPool`] and [`WorkerPoolBuilder`]. Jobs flow
//! through a bounded input queue (capacity = worker count) to the workers, and
//! results flow back through a bounded output queue (capacity = 4 × worker
//! count). Workers block on the input queue when idle, so an idle pool uses no
//! CPU.
//!
//! Errors returned by the work function, and panics raised by it, are per-job
//! data: they are reported in the job's [`JobResult`] and the worker moves on
//! to the next job.

use std::any::Any;
use std::fmt;
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

use crossbeam_channel::{Receiver, Sender};
use parking_lot::Mutex;
use tracing::{debug, trace, warn};

use crate::error::{BoxError, JobError, SubmitError, WorkerPoolError};

/// Default thread name prefix for worker threads.
pub const DEFAULT_THREAD_NAME: &str = "ruapc-worker";

/// Output queue capacity per worker.
const RESULTS_PER_WORKER: usize = 4;

/// User-supplied function run once per job.
pub type WorkFn<I, O> = dyn Fn(&Job<I>) -> Result<O, BoxError> + Send + Sync;

/// Hook invoked with the timing of every completed job.
pub type TimingHook = dyn Fn(&JobTiming) + Send + Sync;

/// Returns the default worker count: the number of logical CPUs.
#[must_use]
pub fn default_worker_count() -> usize {
    num_cpus::get().max(1)
}

/// Identifier of a [`Job`], drawn from the operating system's random source.
///
/// Valid identifiers are non-negative. If the random source fails, the job
/// gets [`JobId::INVALID`] instead of failing; callers decide whether that is
/// fatal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct JobId(i64);

impl JobId {
    /// Sentinel used when no random identifier could be obtained.
    pub const INVALID: Self = Self(-1);

    /// Draws a fresh identifier.
    #[must_use]
    pub fn generate() -> Self {
        let mut bytes = [0u8; 8];
        match getrandom::getrandom(&mut bytes) {
            Ok(()) => Self(i64::from_le_bytes(bytes) & i64::MAX),
            Err(e) => {
                warn!(error = %e, "random source unavailable; assigning invalid job id");
                Self::INVALID
            }
        }
    }

    /// Returns `false` for [`JobId::INVALID`].
    #[must_use]
    pub const fn is_valid(self) -> bool {
        self.0 >= 0
    }

    /// Returns the raw identifier.
    #[must_use]
    pub const fn as_i64(self) -> i64 {
        self.0
    }
}

impl fmt::Display for JobId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_valid() {
            write!(f, "{:016X}", self.0)
        } else {
            f.write_str("invalid")
        }
    }
}

/// A unit of work submitted to a [`WorkerPool`].
#[derive(Debug)]
pub struct Job<I> {
    id: JobId,
    payload: I,
    submitted_at: Instant,
    dequeued_at: Option<Instant>,
    completed_at: Option<Instant>,
}

impl<I> Job<I> {
    /// Creates a job with a fresh identifier, stamped with the current time.
    #[must_use]
    pub fn new(payload: I) -> Self {
        Self {
            id: JobId::generate(),
            payload,
            submitted_at: Instant::now(),
            dequeued_at: None,
            completed_at: None,
        }
    }

    /// Returns the job identifier.
    #[must_use]
    pub const fn id(&self) -> JobId {
        self.id
    }

    /// Returns the payload.
    #[must_use]
    pub const fn payload(&self) -> &I {
        &self.payload
    }

    /// Consumes the job, returning its payload.
    #[must_use]
    pub fn into_payload(self) -> I {
        self.payload
    }

    /// Time the job was created.
    #[must_use]
    pub const fn submitted_at(&self) -> Instant {
        self.submitted_at
    }

    /// Time a worker took the job off the queue.
    #[must_use]
    pub const fn dequeued_at(&self) -> Option<Instant> {
        self.dequeued_at
    }

    /// Time the work function returned.
    #[must_use]
    pub const fn completed_at(&self) -> Option<Instant> {
        self.completed_at
    }
}

/// Completion record for one job: its output or its error, never both.
#[derive(Debug)]
pub struct JobResult<O> {
    job_id: JobId,
    outcome: Result<O, JobError>,
}

impl<O> JobResult<O> {
    /// Returns the identifier of the job that produced this result.
    #[must_use]
    pub const fn job_id(&self) -> JobId {
        self.job_id
    }

    /// Returns `true` if the job succeeded.
    #[must_use]
    pub const fn is_ok(&self) -> bool {
        self.outcome.is_ok()
    }

    /// Returns the output of a successful job.
    #[must_use]
    pub fn output(&self) -> Option<&O> {
        self.outcome.as_ref().ok()
    }

    /// Returns the error of a failed job.
    #[must_use]
    pub fn error(&self) -> Option<&JobError> {
        self.outcome.as_ref().err()
    }

    /// Consumes the result, returning the outcome.
    ///
    /// # Errors
    ///
    /// Returns the job's [`JobError`] if it failed.
    pub fn into_outcome(self) -> Result<O, JobError> {
        self.outcome
    }
}

/// Latencies of one completed job, passed to the timing hook.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct JobTiming {
    /// The job.
    pub job_id: JobId,
    /// Time between creation and dequeue.
    pub queued: Duration,
    /// Time spent in the work function.
    pub processing: Duration,
}

/// Builder for creating a [`WorkerPool`] with custom configuration.
///
/// # Example
///
/// ```rust
/// use ruapc_pools::{BoxError, Job, WorkerPoolBuilder};
///
/// let pool = WorkerPoolBuilder::new()
///     .size(2)
///     .timing_hook(|timing| println!("{} took {:?}", timing.job_id, timing.processing))
///     .build(|job: &Job<i32>| Ok::<_, BoxError>(job.payload() * 2));
///
/// pool.start().unwrap();
/// pool.create_and_submit(21).unwrap();
/// assert_eq!(pool.result().unwrap().output(), Some(&42));
/// pool.stop();
/// ```
pub struct WorkerPoolBuilder {
    size: usize,
    thread_name: String,
    timing_hook: Option<Arc<TimingHook>>,
}

impl Default for WorkerPoolBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl WorkerPoolBuilder {
    /// Creates a new builder with default settings.
    ///
    /// Default settings:
    /// - Size: [`default_worker_count`]
    /// - Thread name prefix: [`DEFAULT_THREAD_NAME`]
    /// - No timing hook
    #[must_use]
    pub fn new() -> Self {
        Self {
            size: default_worker_count(),
            thread_name: DEFAULT_THREAD_NAME.to_owned(),
            timing_hook: None,
        }
    }

    /// Sets the number of workers. Values below 1 are raised to 1.
    #[must_use]
    pub fn size(mut self, size: usize) -> Self {
        self.size = if size == 0 { 1 } else { size };
        self
    }

    /// Sets the worker thread name prefix; threads are named `{prefix}-{index}`.
    #[must_use]
    pub fn thread_name(mut self, prefix: impl Into<String>) -> Self {
        self.thread_name = prefix.into();
        self
    }

    /// Sets a hook invoked once per completed job. Panics in the hook are
    /// caught and logged.
    #[must_use]
    pub fn timing_hook<H>(mut self, hook: H) -> Self
    where
        H: Fn(&JobTiming) + Send + Sync + 'static,
    {
        self.timing_hook = Some(Arc::new(hook));
        self
    }

    /// Builds a pool that runs `work` for every job. Workers are not started
    /// until [`WorkerPool::start`] is called.
    #[must_use]
    pub fn build<I, O, F>(self, work: F) -> WorkerPool<I, O>
    where
        I: Send + 'static,
        O: Send + 'static,
        F: Fn(&Job<I>) -> Result<O, BoxError> + Send + Sync + 'static,
    {
        let (job_tx, job_rx) = crossbeam_channel::bounded(self.size);
        let (result_tx, result_rx) = crossbeam_channel::bounded(self.size * RESULTS_PER_WORKER);

        WorkerPool {
            size: self.size,
            thread_name: self.thread_name,
            work: Arc::new(work),
            timing_hook: self.timing_hook,
            job_tx: Mutex::new(Some(job_tx)),
            job_rx,
            result_tx: Mutex::new(Some(result_tx)),
            result_rx,
            workers: Mutex::new(Vec::new()),
            state: Mutex::new(PoolState::Idle),
        }
    }
}

impl fmt::Debug for WorkerPoolBuilder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WorkerPoolBuilder")
            .field("size", &self.size)
            .field("thread_name", &self.thread_name)
            .field("timing_hook", &self.timing_hook.is_some())
            .finish()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum PoolState {
    Idle,
    Running,
    Stopped,
}

/// A fixed number of worker threads draining a bounded job queue.
///
/// The pool is started once and stopped once; it cannot be restarted.
/// Results arrive in completion order, not submission order.
///
/// # Blocking
///
/// - [`submit`](Self::submit) blocks while the input queue is full.
/// - [`result`](Self::result) blocks until a result is available.
/// - Workers block while the output queue is full, so callers must keep
///   consuming results; [`stop`](Self::stop) waits for queued jobs to finish
///   and cannot complete while workers are blocked on a full output queue.
///
/// # Example
///
/// ```rust
/// use ruapc_pools::{BoxError, WorkerPool};
///
/// let pool = WorkerPool::with_size(1, |job| {
///     let text: &String = job.payload();
///     Ok::<_, BoxError>(text.len())
/// });
/// pool.start().unwrap();
///
/// let id = pool.create_and_submit("input".to_string()).unwrap();
/// let result = pool.result().unwrap();
/// assert_eq!(result.job_id(), id);
/// assert_eq!(result.output(), Some(&5));
///
/// pool.stop();
/// assert!(!pool.has_result());
/// ```
pub struct WorkerPool<I, O> {
    size: usize,
    thread_name: String,
    work: Arc<WorkFn<I, O>>,
    timing_hook: Option<Arc<TimingHook>>,

    /// Taken on stop; dropping it lets workers drain the queue and exit.
    job_tx: Mutex<Option<Sender<Job<I>>>>,
    job_rx: Receiver<Job<I>>,

    /// Handed to the workers on start, or dropped on stop.
    result_tx: Mutex<Option<Sender<JobResult<O>>>>,
    result_rx: Receiver<JobResult<O>>,

    workers: Mutex<Vec<thread::JoinHandle<()>>>,
    state: Mutex<PoolState>,
}

impl<I, O> WorkerPool<I, O>
where
    I: Send + 'static,
    O: Send + 'static,
{
    /// Creates a pool with one worker per logical CPU.
    #[must_use]
    pub fn new<F>(work: F) -> Self
    where
        F: Fn(&Job<I>) -> Result<O, BoxError> + Send + Sync + 'static,
    {
        WorkerPoolBuilder::new().build(work)
    }

    /// Creates a pool with `size` workers.
    #[must_use]
    pub fn with_size<F>(size: usize, work: F) -> Self
    where
        F: Fn(&Job<I>) -> Result<O, BoxError> + Send + Sync + 'static,
    {
        WorkerPoolBuilder::new().size(size).build(work)
    }

    /// Launches the workers.
    ///
    /// # Errors
    ///
    /// - [`WorkerPoolError::AlreadyStarted`] if called twice.
    /// - [`WorkerPoolError::Stopped`] after [`stop`](Self::stop).
    /// - [`WorkerPoolError::Spawn`] if a thread could not be spawned. Workers
    ///   spawned before the failure keep running until `stop`.
    pub fn start(&self) -> Result<(), WorkerPoolError> {
        let mut state = self.state.lock();
        match *state {
            PoolState::Idle => {}
            PoolState::Running => return Err(WorkerPoolError::AlreadyStarted),
            PoolState::Stopped => return Err(WorkerPoolError::Stopped),
        }
        let Some(result_tx) = self.result_tx.lock().take() else {
            return Err(WorkerPoolError::Stopped);
        };

        *state = PoolState::Running;
        let mut workers = self.workers.lock();
        for index in 0..self.size {
            let worker = Worker {
                index,
                jobs: self.job_rx.clone(),
                results: result_tx.clone(),
                work: Arc::clone(&self.work),
                timing_hook: self.timing_hook.clone(),
            };
            let handle = thread::Builder::new()
                .name(format!("{}-{index}", self.thread_name))
                .spawn(move || worker.run())?;
            workers.push(handle);
        }

        debug!(size = self.size, "worker pool started");
        Ok(())
    }

    /// Creates a job for `payload` without submitting it.
    #[must_use]
    pub fn create_job(&self, payload: I) -> Job<I> {
        Job::new(payload)
    }

    /// Enqueues `job`, blocking while the input queue is full.
    ///
    /// Jobs may be submitted before [`start`](Self::start); they wait in the
    /// queue until workers are running.
    ///
    /// # Errors
    ///
    /// Returns [`SubmitError::Stopped`] with the job if the pool is stopped.
    pub fn submit(&self, job: Job<I>) -> Result<(), SubmitError<I>> {
        let sender = self.job_tx.lock().clone();
        let Some(sender) = sender else {
            return Err(SubmitError::Stopped(job));
        };
        let job_id = job.id();
        sender
            .send(job)
            .map_err(|e| SubmitError::Stopped(e.into_inner()))?;
        trace!(%job_id, "job submitted");
        Ok(())
    }

    /// Creates and submits a job for `payload`, returning its identifier.
    ///
    /// # Errors
    ///
    /// Returns [`SubmitError::Stopped`] with the job if the pool is stopped.
    pub fn create_and_submit(&self, payload: I) -> Result<JobId, SubmitError<I>> {
        let job = self.create_job(payload);
        let job_id = job.id();
        self.submit(job)?;
        Ok(job_id)
    }

    /// Blocks until the next result is available.
    ///
    /// Returns `None` once the pool has been stopped and every result has been
    /// taken.
    #[must_use]
    pub fn result(&self) -> Option<JobResult<O>> {
        self.result_rx.recv().ok()
    }

    /// Waits up to `timeout` for the next result.
    #[must_use]
    pub fn result_timeout(&self, timeout: Duration) -> Option<JobResult<O>> {
        self.result_rx.recv_timeout(timeout).ok()
    }

    /// Takes the next result if one is ready.
    #[must_use]
    pub fn try_result(&self) -> Option<JobResult<O>> {
        self.result_rx.try_recv().ok()
    }

    /// Returns `true` if at least one result is waiting.
    #[must_use]
    pub fn has_result(&self) -> bool {
        !self.result_rx.is_empty()
    }

    /// Iterates over results as they complete.
    ///
    /// The iterator blocks between results and ends once the pool has been
    /// stopped and drained.
    pub fn results(&self) -> impl Iterator<Item = JobResult<O>> + '_ {
        self.result_rx.iter()
    }

    /// Stops the pool.
    ///
    /// No further jobs are accepted. Jobs already queued are run to completion
    /// if workers are running, then every worker exits and is joined. Jobs
    /// queued on a pool that was never started are dropped without results.
    /// Stopping twice is a no-op.
    pub fn stop(&self) {
        let mut state = self.state.lock();
        if *state == PoolState::Stopped {
            return;
        }

        drop(self.job_tx.lock().take());
        drop(self.result_tx.lock().take());

        let workers = std::mem::take(&mut *self.workers.lock());
        for handle in workers {
            if handle.join().is_err() {
                warn!("worker thread panicked outside a job");
            }
        }

        let mut dropped = 0usize;
        while self.job_rx.try_recv().is_ok() {
            dropped += 1;
        }

        *state = PoolState::Stopped;
        debug!(dropped, "worker pool stopped");
    }

    /// Returns `true` once [`stop`](Self::stop) has completed.
    #[must_use]
    pub fn is_stopped(&self) -> bool {
        *self.state.lock() == PoolState::Stopped
    }

    /// Returns the configured number of workers.
    #[must_use]
    #[allow(clippy::len_without_is_empty)]
    pub const fn len(&self) -> usize {
        self.size
    }
}

impl<I, O> fmt::Debug for WorkerPool<I, O> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WorkerPool")
            .field("size", &self.size)
            .field("state", &*self.state.lock())
            .field("queued", &self.job_rx.len())
            .field("results", &self.result_rx.len())
            .finish_non_exhaustive()
    }
}

/// State owned by one worker thread.
struct Worker<I, O> {
    index: usize,
    jobs: Receiver<Job<I>>,
    results: Sender<JobResult<O>>,
    work: Arc<WorkFn<I, O>>,
    timing_hook: Option<Arc<TimingHook>>,
}

impl<I, O> Worker<I, O> {
    fn run(self) {
        trace!(worker = self.index, "worker started");

        // Ends once every job sender is gone and the queue is empty.
        for mut job in &self.jobs {
            let dequeued = Instant::now();
            job.dequeued_at = Some(dequeued);

            let outcome = match panic::catch_unwind(AssertUnwindSafe(|| (self.work)(&job))) {
                Ok(Ok(output)) => Ok(output),
                Ok(Err(e)) => Err(JobError::Failed(e)),
                Err(payload) => {
                    let message = panic_message(payload.as_ref());
                    warn!(job_id = %job.id, %message, "job panicked");
                    Err(JobError::Panicked { message })
                }
            };

            let completed = Instant::now();
            job.completed_at = Some(completed);

            if let Some(hook) = &self.timing_hook {
                let timing = JobTiming {
                    job_id: job.id,
                    queued: dequeued.duration_since(job.submitted_at),
                    processing: completed.duration_since(dequeued),
                };
                if panic::catch_unwind(AssertUnwindSafe(|| hook(&timing))).is_err() {
                    warn!(job_id = %job.id, "timing hook panicked");
                }
            }

            let result = JobResult {
                job_id: job.id,
                outcome,
            };
            if self.results.send(result).is_err() {
                trace!(job_id = %job.id, "result dropped; pool is gone");
            }
        }

        debug!(worker = self.index, "worker exiting");
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_owned()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "non-string panic payload".to_owned()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::{HashMap, HashSet};
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[test]
    fn test_worker_pool() {
        let runs: Arc<Mutex<HashMap<JobId, usize>>> = Arc::default();
        let pool = {
            let runs = Arc::clone(&runs);
            WorkerPool::with_size(1, move |job: &Job<&'static str>| {
                *runs.lock().entry(job.id()).or_default() += 1;
                Ok::<_, BoxError>("here")
            })
        };
        assert_eq!(pool.len(), 1);
        pool.start().unwrap();

        let j1 = pool.create_and_submit("input").unwrap();
        let j2 = pool.create_and_submit("more stuff").unwrap();
        assert_ne!(j1, j2);

        let o1 = pool.result().unwrap();
        let o2 = pool.result().unwrap();
        pool.stop();

        let submitted: HashSet<_> = [j1, j2].into();
        let returned: HashSet<_> = [o1.job_id(), o2.job_id()].into();
        assert_eq!(submitted, returned);
        assert_eq!(o1.output(), Some(&"here"));

        let runs = runs.lock();
        assert_eq!(runs.len(), 2);
        assert!(runs.values().all(|&n| n == 1));
    }

    #[test]
    fn test_worker_pool_with_timing() {
        let timings: Arc<Mutex<Vec<JobTiming>>> = Arc::default();
        let pool = {
            let timings = Arc::clone(&timings);
            WorkerPoolBuilder::new()
                .size(1)
                .timing_hook(move |timing| timings.lock().push(*timing))
                .build(|_job: &Job<u32>| Ok::<_, BoxError>(()))
        };
        pool.start().unwrap();

        let j1 = pool.create_and_submit(1).unwrap();
        let j2 = pool.create_and_submit(2).unwrap();
        let _ = pool.result().unwrap();
        let _ = pool.result().unwrap();
        pool.stop();

        let timings = timings.lock();
        assert_eq!(timings.len(), 2);
        let ids: HashSet<_> = timings.iter().map(|t| t.job_id).collect();
        assert_eq!(ids, [j1, j2].into());
    }

    #[test]
    fn test_timing_hook_panic_is_contained() {
        let pool = WorkerPoolBuilder::new()
            .size(1)
            .timing_hook(|_| panic!("hook failed"))
            .build(|job: &Job<u32>| Ok::<_, BoxError>(*job.payload()));
        pool.start().unwrap();

        pool.create_and_submit(1).unwrap();
        pool.create_and_submit(2).unwrap();
        let outputs: HashSet<_> = (0..2)
            .map(|_| *pool.result().unwrap().output().unwrap())
            .collect();
        assert_eq!(outputs, [1, 2].into());
        pool.stop();
    }

    #[test]
    fn test_default_size() {
        assert!(default_worker_count() > 0);
        let pool = WorkerPool::new(|_job: &Job<()>| Ok::<_, BoxError>(()));
        assert_eq!(pool.len(), default_worker_count());
        assert_eq!(
            WorkerPool::with_size(0, |_job: &Job<()>| Ok::<_, BoxError>(())).len(),
            1
        );
    }

    #[test]
    fn test_worker_pool_error() {
        let pool = WorkerPool::with_size(1, |job: &Job<&'static str>| {
            if *job.payload() == "fail" {
                Err("something broke".into())
            } else {
                Ok("here")
            }
        });
        pool.start().unwrap();

        let ok_id = pool.create_and_submit("input").unwrap();
        let fail_id = pool.create_and_submit("fail").unwrap();

        let mut by_id: HashMap<_, _> = (0..2)
            .map(|_| {
                let result = pool.result().unwrap();
                (result.job_id(), result)
            })
            .collect();
        pool.stop();
        assert!(!pool.has_result());

        let failed = by_id.remove(&fail_id).unwrap();
        assert!(!failed.is_ok());
        assert!(failed.output().is_none());
        assert!(matches!(failed.error(), Some(JobError::Failed(_))));

        let ok = by_id.remove(&ok_id).unwrap();
        assert!(ok.error().is_none());
        assert_eq!(ok.into_outcome().unwrap(), "here");
    }

    #[test]
    fn test_panicking_job_does_not_kill_worker() {
        let pool = WorkerPool::with_size(1, |job: &Job<u32>| {
            assert!(*job.payload() != 0, "zero payload");
            Ok::<_, BoxError>(*job.payload())
        });
        pool.start().unwrap();

        let bad = pool.create_and_submit(0).unwrap();
        let good = pool.create_and_submit(7).unwrap();

        let first = pool.result().unwrap();
        assert_eq!(first.job_id(), bad);
        match first.error() {
            Some(JobError::Panicked { message }) => assert!(message.contains("zero payload")),
            other => panic!("unexpected outcome: {other:?}"),
        }

        let second = pool.result().unwrap();
        assert_eq!(second.job_id(), good);
        assert_eq!(second.output(), Some(&7));
        pool.stop();
    }

    #[test]
    fn test_stop_drains_queued_jobs() {
        let pool = WorkerPool::with_size(2, |job: &Job<usize>| Ok::<_, BoxError>(*job.payload()));
        pool.start().unwrap();

        for i in 0..5 {
            pool.create_and_submit(i).unwrap();
        }
        pool.stop();
        assert!(pool.is_stopped());

        let mut outputs: Vec<_> = pool.results().map(|r| *r.output().unwrap()).collect();
        outputs.sort_unstable();
        assert_eq!(outputs, vec![0, 1, 2, 3, 4]);

        assert!(!pool.has_result());
        assert!(pool.result().is_none());
    }

    #[test]
    fn test_submit_after_stop_returns_job() {
        let pool = WorkerPool::with_size(1, |_job: &Job<String>| Ok::<_, BoxError>(()));
        pool.start().unwrap();
        pool.stop();
        pool.stop();

        let err = pool.create_and_submit("late".to_string()).unwrap_err();
        assert_eq!(err.into_job().into_payload(), "late");
    }

    #[test]
    fn test_stop_before_start_drops_queued_jobs() {
        let ran = Arc::new(AtomicUsize::new(0));
        let pool = {
            let ran = Arc::clone(&ran);
            WorkerPool::with_size(1, move |_job: &Job<()>| {
                ran.fetch_add(1, Ordering::SeqCst);
                Ok::<_, BoxError>(())
            })
        };
        pool.create_and_submit(()).unwrap();
        pool.stop();

        assert!(!pool.has_result());
        assert!(pool.result().is_none());
        assert_eq!(ran.load(Ordering::SeqCst), 0);
        assert!(matches!(pool.start(), Err(WorkerPoolError::Stopped)));
    }

    #[test]
    fn test_start_twice() {
        let pool = WorkerPool::with_size(1, |_job: &Job<()>| Ok::<_, BoxError>(()));
        pool.start().unwrap();
        assert!(matches!(pool.start(), Err(WorkerPoolError::AlreadyStarted)));
        pool.stop();
    }

    #[test]
    fn test_submit_blocks_when_queue_full() {
        let pool = Arc::new(WorkerPool::with_size(1, |job: &Job<u8>| {
            Ok::<_, BoxError>(*job.payload())
        }));
        // Input capacity is 1 and nothing drains it yet.
        pool.create_and_submit(1).unwrap();

        let (done_tx, done_rx) = crossbeam_channel::bounded(1);
        let submitter = {
            let pool = Arc::clone(&pool);
            thread::spawn(move || {
                pool.create_and_submit(2).unwrap();
                done_tx.send(()).unwrap();
            })
        };
        assert!(done_rx.recv_timeout(Duration::from_millis(50)).is_err());

        pool.start().unwrap();
        done_rx.recv_timeout(Duration::from_secs(10)).unwrap();
        submitter.join().unwrap();

        let outputs: HashSet<_> = (0..2)
            .map(|_| *pool.result().unwrap().output().unwrap())
            .collect();
        assert_eq!(outputs, [1, 2].into());
        pool.stop();
    }

    #[test]
    fn test_worker_threads_are_named() {
        let pool = WorkerPoolBuilder::new()
            .size(1)
            .thread_name("pool-test")
            .build(|_job: &Job<()>| {
                Ok::<_, BoxError>(thread::current().name().map(str::to_owned))
            });
        pool.start().unwrap();
        pool.create_and_submit(()).unwrap();

        let name = pool.result().unwrap().into_outcome().unwrap();
        assert_eq!(name.as_deref(), Some("pool-test-0"));
        pool.stop();
    }

    #[test]
    fn test_job_timestamps() {
        let pool = WorkerPool::with_size(1, |job: &Job<()>| {
            assert!(job.dequeued_at().is_some());
            assert!(job.completed_at().is_none());
            Ok::<_, BoxError>(job.dequeued_at().unwrap() >= job.submitted_at())
        });
        pool.start().unwrap();
        pool.create_and_submit(()).unwrap();
        assert!(pool.result_timeout(Duration::from_secs(10)).unwrap().into_outcome().unwrap());
        pool.stop();
        assert!(pool.try_result().is_none());
    }

    #[test]
    fn test_job_ids() {
        let a = JobId::generate();
        let b = JobId::generate();
        assert!(a.is_valid());
        assert!(b.is_valid());
        assert_ne!(a, b);

        assert!(!JobId::INVALID.is_valid());
        assert_eq!(JobId::INVALID.as_i64(), -1);
        assert_eq!(JobId::INVALID.to_string(), "invalid");
        assert_eq!(a.to_string().len(), 16);
    }
}
