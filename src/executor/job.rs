//! Queued unit of work as seen by a worker.

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Instant;

static JOB_ID_COUNTER: AtomicU64 = AtomicU64::new(1);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct JobId(u64);

impl JobId {
    fn next() -> Self {
        JobId(JOB_ID_COUNTER.fetch_add(1, Ordering::Relaxed))
    }
}

/// How a job ended, reported back to the worker for bookkeeping.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum JobOutcome {
    Completed,
    Failed,
    Interrupted,
    Panicked,
}

pub(crate) struct Job {
    pub(crate) id: JobId,
    pub(crate) name: String,
    pub(crate) func: Box<dyn FnOnce() -> JobOutcome + Send + 'static>,
    pub(crate) submitted_at: Instant,
}

impl Job {
    pub fn new<S, F>(name: S, f: F) -> Self
    where
        S: Into<String>,
        F: FnOnce() -> JobOutcome + Send + 'static,
    {
        Job {
            id: JobId::next(),
            name: name.into(),
            func: Box::new(f),
            submitted_at: Instant::now(),
        }
    }

    pub fn execute(self) -> JobOutcome {
        (self.func)()
    }
}

impl std::fmt::Debug for Job {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Job")
            .field("id", &self.id)
            .field("name", &self.name)
            .field("submitted_at", &self.submitted_at)
            .finish()
    }
}
