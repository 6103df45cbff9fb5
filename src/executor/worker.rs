// worker thread loop
use super::job::{Job, JobOutcome};
use super::pool::PoolShared;
use crate::interrupt;
use crossbeam_deque::Steal;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};
use tracing::{debug, warn};

pub type WorkerId = usize;

// per-worker stats
#[derive(Debug)]
pub struct WorkerState {
    pub jobs_executed: AtomicU64,
    pub busy_time_ns: AtomicU64,
}

impl WorkerState {
    fn new() -> Self {
        Self {
            jobs_executed: AtomicU64::new(0),
            busy_time_ns: AtomicU64::new(0),
        }
    }
}

#[derive(Debug)]
pub(crate) struct Worker {
    pub id: WorkerId,
    pub state: Arc<WorkerState>,
}

impl Worker {
    pub fn new(id: WorkerId) -> Self {
        Self {
            id,
            state: Arc::new(WorkerState::new()),
        }
    }

    // main loop: runs until shutdown is requested and the queue is drained
    pub fn run(&self, shared: Arc<PoolShared>) {
        let mut backoff_cnt = 0;

        loop {
            // pushes happen under the state read lock, so once shutdown is
            // visible every accepted job is already in the queue
            let draining = shared.is_shutting_down();

            if let Some(job) = self.find_job(&shared) {
                backoff_cnt = 0;
                self.execute_job(job, &shared);
                shared.pending.fetch_sub(1, Ordering::Relaxed);
            } else if draining {
                break;
            } else {
                self.backoff(&mut backoff_cnt);
            }
        }

        debug!(worker = self.id, "worker exiting");
    }

    fn find_job(&self, shared: &PoolShared) -> Option<Job> {
        loop {
            match shared.queue.steal() {
                Steal::Success(job) => return Some(job),
                Steal::Empty => return None,
                Steal::Retry => continue,
            }
        }
    }

    fn execute_job(&self, job: Job, shared: &PoolShared) {
        let id = job.id;
        let name = job.name.clone();
        let queued_for = job.submitted_at.elapsed();

        // an interrupt aimed at a previous job must not leak into this one
        interrupt::interrupted();

        debug!(worker = self.id, job = ?id, task = %name, ?queued_for, "job started");
        let start = Instant::now();

        let outcome = super::panic::catch(|| job.execute()).unwrap_or_else(|msg| {
            warn!(worker = self.id, job = ?id, task = %name, "job panicked: {}", msg);
            JobOutcome::Panicked
        });

        let elapsed = start.elapsed();
        self.state
            .busy_time_ns
            .fetch_add(elapsed.as_nanos() as u64, Ordering::Relaxed);
        self.state.jobs_executed.fetch_add(1, Ordering::Relaxed);
        shared.stats.record(outcome);

        debug!(worker = self.id, job = ?id, task = %name, ?elapsed, ?outcome, "job finished");
    }

    fn backoff(&self, count: &mut u32) {
        const MAX_SPINS: u32 = 10;
        const MAX_YIELDS: u32 = 20;

        *count += 1;

        if *count <= MAX_SPINS {
            let spins = (*count).min(6);
            for _ in 0..(1 << spins) {
                std::hint::spin_loop();
            }
        } else if *count <= MAX_YIELDS {
            thread::yield_now();
        } else {
            thread::park_timeout(Duration::from_millis(1));
        }
    }
}
