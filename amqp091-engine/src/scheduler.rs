//! Deferred execution of jobs on the connection's thread of control
//!
//! Components that must not run work inline (see
//! [`QueuedReader`](crate::reader::QueuedReader)) receive a handle to a
//! [`Schedule`] implementation at construction.

use std::{collections::VecDeque, fmt, sync::Arc};

use parking_lot::Mutex;
use tokio::sync::Notify;

use crate::error::ProtocolError;

/// A unit of deferred work
pub type Job = Box<dyn FnOnce() -> Result<(), ProtocolError> + Send + 'static>;

/// Schedules a job to run in a later step
pub trait Schedule: Send + Sync {
    /// Queues `job` behind every job already scheduled. The job must not be
    /// run before this call returns.
    fn call_soon(&self, job: Job);
}

/// FIFO run queue executing one job per step.
///
/// Clones share the same queue.
#[derive(Clone, Default)]
pub struct RunQueue {
    inner: Arc<RunQueueInner>,
}

#[derive(Default)]
struct RunQueueInner {
    jobs: Mutex<VecDeque<Job>>,
    notify: Notify,
}

impl fmt::Debug for RunQueue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RunQueue")
            .field("pending", &self.len())
            .finish()
    }
}

impl RunQueue {
    /// Creates an empty run queue
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of jobs waiting to run
    pub fn len(&self) -> usize {
        self.inner.jobs.lock().len()
    }

    /// Whether no job is waiting to run
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn pop(&self) -> Option<Job> {
        self.inner.jobs.lock().pop_front()
    }

    /// Runs the oldest job. Returns `None` if there is nothing to run.
    ///
    /// Jobs scheduled by the job itself are queued, not run.
    pub fn run_once(&self) -> Option<Result<(), ProtocolError>> {
        // The lock is released before running so that the job can schedule
        let job = self.pop()?;
        Some(job())
    }

    /// Runs jobs until the queue is empty, stopping at the first error.
    /// Returns the number of jobs that ran successfully.
    pub fn run_until_idle(&self) -> Result<usize, ProtocolError> {
        let mut count = 0;
        while let Some(result) = self.run_once() {
            result?;
            count += 1;
        }
        Ok(count)
    }

    /// Waits for the next job and takes it off the queue.
    ///
    /// This is cancel safe, a job is only taken off the queue when the
    /// future completes.
    pub async fn next_job(&self) -> Job {
        loop {
            if let Some(job) = self.pop() {
                return job;
            }
            self.inner.notify.notified().await;
        }
    }
}

impl Schedule for RunQueue {
    fn call_soon(&self, job: Job) {
        self.inner.jobs.lock().push_back(job);
        self.inner.notify.notify_one();
    }
}
