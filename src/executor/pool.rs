use super::job::{Job, JobOutcome};
use super::worker::{Worker, WorkerId, WorkerState};
use crate::config::Config;
use crate::error::{Error, Result};
use crate::handle::{self, ResultHandle};
use crate::interrupt::{self, Interruptor};
use crate::task::Callable;
use crossbeam_deque::Injector;
use parking_lot::RwLock;
use std::sync::atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use tracing::{debug, info, warn};

/// Lifecycle of a [`WorkerPool`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PoolState {
    /// Accepting submissions.
    Running,
    /// Rejecting submissions, draining accepted jobs.
    ShuttingDown,
    /// All workers have exited.
    Terminated,
}

/// Counters snapshot returned by [`WorkerPool::stats`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PoolStats {
    pub submitted: u64,
    pub completed: u64,
    pub failed: u64,
    pub interrupted: u64,
    pub panicked: u64,
    pub rejected: u64,
    pub shutdown_transitions: u64,
}

#[derive(Debug, Default)]
pub(crate) struct StatsCounters {
    submitted: AtomicU64,
    completed: AtomicU64,
    failed: AtomicU64,
    interrupted: AtomicU64,
    panicked: AtomicU64,
    rejected: AtomicU64,
    shutdown_transitions: AtomicU64,
}

impl StatsCounters {
    pub(crate) fn record(&self, outcome: JobOutcome) {
        let counter = match outcome {
            JobOutcome::Completed => &self.completed,
            JobOutcome::Failed => &self.failed,
            JobOutcome::Interrupted => &self.interrupted,
            JobOutcome::Panicked => &self.panicked,
        };
        counter.fetch_add(1, Ordering::Relaxed);
    }

    fn snapshot(&self) -> PoolStats {
        PoolStats {
            submitted: self.submitted.load(Ordering::Relaxed),
            completed: self.completed.load(Ordering::Relaxed),
            failed: self.failed.load(Ordering::Relaxed),
            interrupted: self.interrupted.load(Ordering::Relaxed),
            panicked: self.panicked.load(Ordering::Relaxed),
            rejected: self.rejected.load(Ordering::Relaxed),
            shutdown_transitions: self.shutdown_transitions.load(Ordering::Relaxed),
        }
    }
}

/// State shared between the pool handle and its workers.
#[derive(Debug)]
pub(crate) struct PoolShared {
    pub(crate) queue: Injector<Job>,
    pub(crate) state: RwLock<PoolState>,
    pub(crate) pending: AtomicUsize,
    pub(crate) stats: StatsCounters,
}

impl PoolShared {
    pub(crate) fn is_shutting_down(&self) -> bool {
        *self.state.read() != PoolState::Running
    }
}

/// Fixed-size pool of worker threads fed from one shared FIFO queue.
#[derive(Debug)]
pub struct WorkerPool {
    workers: Vec<WorkerHandle>,
    shared: Arc<PoolShared>,
    num_workers: usize,
    next_wake: AtomicUsize,
}

#[derive(Debug)]
struct WorkerHandle {
    id: WorkerId,
    thread: Option<JoinHandle<()>>,
    unparker: thread::Thread,
    interruptor: Interruptor,
    state: Arc<WorkerState>,
}

impl WorkerPool {
    pub fn new(config: &Config) -> Result<Self> {
        config.validate()?;
        let num_workers = config.max_concurrent_workers;

        let shared = Arc::new(PoolShared {
            queue: Injector::new(),
            state: RwLock::new(PoolState::Running),
            pending: AtomicUsize::new(0),
            stats: StatsCounters::default(),
        });

        // a spawn failure drops this partially built pool, which joins
        // whatever workers already started
        let mut pool = Self {
            workers: Vec::with_capacity(num_workers),
            shared,
            num_workers,
            next_wake: AtomicUsize::new(0),
        };

        for id in 0..num_workers {
            let worker = Worker::new(id);
            let state = worker.state.clone();
            let flag = Arc::new(AtomicBool::new(false));
            let shared_clone = pool.shared.clone();
            let flag_clone = flag.clone();
            let name = format!("{}-{}", config.thread_name_prefix, id);

            let mut builder = thread::Builder::new().name(name);

            if let Some(stack_size) = config.stack_size {
                builder = builder.stack_size(stack_size);
            }

            let thread = builder
                .spawn(move || {
                    interrupt::bind(flag_clone);
                    worker.run(shared_clone);
                })
                .map_err(|e| Error::executor(format!("spawn failed: {}", e)))?;

            let unparker = thread.thread().clone();
            let interruptor = Interruptor::new(unparker.clone(), flag);

            pool.workers.push(WorkerHandle {
                id,
                thread: Some(thread),
                unparker,
                interruptor,
                state,
            });
        }

        info!(workers = num_workers, "worker pool started");
        Ok(pool)
    }

    /// Queue `task` and return a handle to its outcome without blocking.
    ///
    /// Fails with [`Error::Rejected`] once shutdown has begun.
    pub fn submit<C: Callable>(&self, task: C) -> Result<ResultHandle<C::Output>> {
        let name = task.name().to_string();
        let (promise, handle) = handle::pair();

        let job = Job::new(name.clone(), move || {
            match super::panic::catch(|| task.call()) {
                Ok(Ok(value)) => {
                    promise.resolve(Ok(value));
                    JobOutcome::Completed
                }
                Ok(Err(err)) => {
                    let outcome = if err.is_interrupted() {
                        JobOutcome::Interrupted
                    } else {
                        JobOutcome::Failed
                    };
                    warn!("task failed: {}", err);
                    promise.resolve(Err(err));
                    outcome
                }
                Err(msg) => {
                    promise.resolve(Err(Error::task_failed(format!("task panicked: {}", msg))));
                    JobOutcome::Panicked
                }
            }
        });

        let id = job.id;
        self.enqueue(job)?;
        debug!(job = ?id, task = %name, "task submitted");

        Ok(handle)
    }

    /// Fire-and-forget variant of [`submit`](Self::submit).
    pub fn execute<F>(&self, f: F) -> Result<()>
    where
        F: FnOnce() + Send + 'static,
    {
        self.enqueue(Job::new("anonymous", move || {
            f();
            JobOutcome::Completed
        }))
    }

    fn enqueue(&self, job: Job) -> Result<()> {
        {
            // held across the push so shutdown cannot slip in between
            let state = self.shared.state.read();
            if *state != PoolState::Running {
                self.shared.stats.rejected.fetch_add(1, Ordering::Relaxed);
                warn!(task = %job.name, "submission rejected, pool is {:?}", *state);
                return Err(Error::Rejected);
            }

            self.shared.pending.fetch_add(1, Ordering::Relaxed);
            self.shared.stats.submitted.fetch_add(1, Ordering::Relaxed);
            self.shared.queue.push(job);
        }

        // wake a worker, round robin
        let idx = self.next_wake.fetch_add(1, Ordering::Relaxed) % self.num_workers;
        if let Some(worker) = self.workers.get(idx) {
            worker.unparker.unpark();
        }

        Ok(())
    }

    pub fn state(&self) -> PoolState {
        *self.shared.state.read()
    }

    pub fn stats(&self) -> PoolStats {
        self.shared.stats.snapshot()
    }

    /// Jobs accepted but not yet finished.
    pub fn pending_tasks(&self) -> usize {
        self.shared.pending.load(Ordering::Relaxed)
    }

    pub fn num_workers(&self) -> usize {
        self.num_workers
    }

    /// Jobs executed so far by each worker, indexed by worker id.
    pub fn jobs_per_worker(&self) -> Vec<u64> {
        self.workers
            .iter()
            .map(|w| w.state.jobs_executed.load(Ordering::Relaxed))
            .collect()
    }

    pub fn worker_interruptors(&self) -> Vec<Interruptor> {
        self.workers.iter().map(|w| w.interruptor.clone()).collect()
    }

    /// Deliver an interrupt to every worker thread.
    pub fn interrupt_workers(&self) {
        for worker in &self.workers {
            debug!(worker = worker.id, "interrupting worker");
            worker.interruptor.interrupt();
        }
    }

    /// Stop accepting work, wait for accepted jobs to finish and join the
    /// workers. Calling it again is a no-op.
    pub fn shutdown(&mut self) {
        {
            let mut state = self.shared.state.write();
            if *state == PoolState::Running {
                *state = PoolState::ShuttingDown;
                self.shared
                    .stats
                    .shutdown_transitions
                    .fetch_add(1, Ordering::Relaxed);
                info!(pending = self.pending_tasks(), "worker pool shutting down");
            }
        }

        // wake everyone up to check the shutdown flag
        for worker in &self.workers {
            worker.unparker.unpark();
        }

        for worker in &mut self.workers {
            if let Some(thread) = worker.thread.take() {
                if thread.join().is_err() {
                    warn!(worker = worker.id, "worker thread panicked");
                }
            }
        }

        let mut state = self.shared.state.write();
        if *state == PoolState::ShuttingDown {
            *state = PoolState::Terminated;
            info!("worker pool terminated");
        }
    }
}

impl Drop for WorkerPool {
    fn drop(&mut self) {
        self.shutdown();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::task::{self, NamedTask};
    use parking_lot::Mutex;
    use std::time::{Duration, Instant};

    fn pool(workers: usize) -> WorkerPool {
        let config = Config::builder()
            .max_concurrent_workers(workers)
            .build()
            .unwrap();
        WorkerPool::new(&config).unwrap()
    }

    #[test]
    fn test_spawns_configured_workers() {
        let pool = pool(2);
        assert_eq!(pool.num_workers(), 2);
        assert_eq!(pool.worker_interruptors().len(), 2);
        assert_eq!(pool.state(), PoolState::Running);
    }

    #[test]
    fn test_worker_threads_are_named() {
        let config = Config::builder()
            .max_concurrent_workers(1)
            .thread_name_prefix("named")
            .build()
            .unwrap();
        let pool = WorkerPool::new(&config).unwrap();

        let handle = pool
            .submit(task::from_fn("whoami", || {
                Ok(thread::current().name().map(str::to_string))
            }))
            .unwrap();

        assert_eq!(handle.get().unwrap().as_deref(), Some("named-0"));
        assert_eq!(pool.worker_interruptors()[0].thread_name(), Some("named-0"));
    }

    #[test]
    fn test_submit_and_get() {
        let pool = pool(2);
        let handle = pool
            .submit(NamedTask::with_timing("a", 2, Duration::from_millis(1)))
            .unwrap();

        assert_eq!(
            handle.get().unwrap(),
            "Task a is running 0\nTask a is running 1\n"
        );
    }

    #[test]
    fn test_submit_does_not_block() {
        let pool = pool(1);
        let start = Instant::now();
        let handle = pool
            .submit(NamedTask::with_timing("slow", 2, Duration::from_millis(100)))
            .unwrap();
        assert!(start.elapsed() < Duration::from_millis(100));
        assert!(handle.get().is_ok());
    }

    #[test]
    fn test_tasks_run_concurrently() {
        let pool = pool(2);
        let start = Instant::now();

        let a = pool
            .submit(NamedTask::with_timing("a", 5, Duration::from_millis(60)))
            .unwrap();
        let b = pool
            .submit(NamedTask::with_timing("b", 5, Duration::from_millis(60)))
            .unwrap();

        a.get().unwrap();
        b.get().unwrap();

        // serial execution would take 600ms
        assert!(start.elapsed() < Duration::from_millis(550));
        assert_eq!(pool.jobs_per_worker().iter().sum::<u64>(), 2);
    }

    #[test]
    fn test_single_worker_serializes() {
        let pool = pool(1);
        let order = Arc::new(Mutex::new(Vec::new()));

        let handles: Vec<_> = (0..4)
            .map(|i| {
                let order = order.clone();
                pool.submit(task::from_fn(format!("t{}", i), move || {
                    order.lock().push(i);
                    Ok(i)
                }))
                .unwrap()
            })
            .collect();

        for (i, h) in handles.iter().enumerate() {
            assert_eq!(h.get(), Ok(i));
        }
        assert_eq!(*order.lock(), vec![0, 1, 2, 3]);
    }

    #[test]
    fn test_task_error_surfaces_on_handle() {
        let pool = pool(2);
        let handle = pool
            .submit(task::from_fn("bad", || -> Result<()> {
                Err(Error::task_failed("broken"))
            }))
            .unwrap();

        assert_eq!(handle.get(), Err(Error::task_failed("broken")));
    }

    #[test]
    fn test_panic_is_isolated() {
        let mut pool = pool(1);
        let bad = pool
            .submit(task::from_fn("panics", || -> Result<()> { panic!("kaboom") }))
            .unwrap();
        let good = pool.submit(task::from_fn("fine", || Ok(1))).unwrap();

        assert_eq!(bad.get(), Err(Error::task_failed("task panicked: kaboom")));
        assert_eq!(good.get(), Ok(1));

        pool.shutdown();
        assert_eq!(pool.stats().panicked, 1);
        assert_eq!(pool.stats().completed, 1);
    }

    #[test]
    fn test_execute_runs_closure() {
        let mut pool = pool(2);
        let counter = Arc::new(Mutex::new(0));

        for _ in 0..10 {
            let counter = counter.clone();
            pool.execute(move || *counter.lock() += 1).unwrap();
        }

        pool.shutdown();
        assert_eq!(*counter.lock(), 10);
    }

    #[test]
    fn test_shutdown_drains_queue() {
        let mut pool = pool(1);
        let handles: Vec<_> = (0..3)
            .map(|i| {
                pool.submit(NamedTask::with_timing(format!("d{}", i), 1, Duration::from_millis(20)))
                    .unwrap()
            })
            .collect();

        pool.shutdown();

        assert_eq!(pool.state(), PoolState::Terminated);
        assert_eq!(pool.pending_tasks(), 0);
        for h in handles {
            assert!(h.try_get().unwrap().is_ok());
        }
    }

    #[test]
    fn test_submit_after_shutdown_rejected() {
        let mut pool = pool(2);
        pool.shutdown();

        let result = pool.submit(task::from_fn("late", || Ok(())));
        assert!(matches!(result, Err(Error::Rejected)));
        assert_eq!(pool.stats().rejected, 1);
    }

    #[test]
    fn test_shutdown_is_idempotent() {
        let mut pool = pool(2);
        pool.shutdown();
        pool.shutdown();
        assert_eq!(pool.state(), PoolState::Terminated);
        assert_eq!(pool.stats().shutdown_transitions, 1);
    }

    #[test]
    fn test_interrupt_workers() {
        let pool = pool(2);
        let (tx, rx) = crossbeam_channel::bounded(2);

        let handles: Vec<_> = (0..2)
            .map(|i| {
                let tx = tx.clone();
                pool.submit(task::from_fn(format!("sleeper{}", i), move || {
                    tx.send(()).ok();
                    interrupt::sleep(Duration::from_secs(30))
                }))
                .unwrap()
            })
            .collect();

        rx.recv().unwrap();
        rx.recv().unwrap();
        pool.interrupt_workers();

        for h in handles {
            assert_eq!(h.get(), Err(Error::Interrupted));
        }
    }
}
