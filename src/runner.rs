//! Composition root: builds a pool, submits tasks, prints their results in
//! submission order and always shuts the pool down.

use crate::config::Config;
use crate::error::Result;
use crate::executor::{PoolState, PoolStats, WorkerPool};
use crate::handle::ResultHandle;
use crate::task::NamedTask;
use std::io::Write;
use tracing::{info, warn};

const ORDINALS: [&str; 10] = [
    "first", "second", "third", "fourth", "fifth", "sixth", "seventh", "eighth", "ninth", "tenth",
];

/// What a run produced, in submission order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunReport {
    pub outcomes: Vec<Result<String>>,
    pub final_state: PoolState,
    pub stats: PoolStats,
}

impl RunReport {
    pub fn all_succeeded(&self) -> bool {
        self.outcomes.iter().all(|o| o.is_ok())
    }
}

#[derive(Debug, Clone, Default)]
pub struct PoolRunner {
    config: Config,
}

impl PoolRunner {
    pub fn new(config: Config) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn run<W: Write>(&self, tasks: Vec<NamedTask>, out: &mut W) -> Result<RunReport> {
        let pool = WorkerPool::new(&self.config)?;
        Self::run_with_pool(pool, tasks, out)
    }

    /// Run `tasks` on an already built pool. The pool is shut down before
    /// this returns, including when writing to `out` fails.
    pub fn run_with_pool<W: Write>(
        mut pool: WorkerPool,
        tasks: Vec<NamedTask>,
        out: &mut W,
    ) -> Result<RunReport> {
        let collected = Self::submit_and_collect(&pool, tasks, out);

        pool.shutdown();
        info!(stats = ?pool.stats(), "run finished");

        Ok(RunReport {
            outcomes: collected?,
            final_state: pool.state(),
            stats: pool.stats(),
        })
    }

    fn submit_and_collect<W: Write>(
        pool: &WorkerPool,
        tasks: Vec<NamedTask>,
        out: &mut W,
    ) -> Result<Vec<Result<String>>> {
        let handles: Vec<Result<ResultHandle<String>>> =
            tasks.into_iter().map(|task| pool.submit(task)).collect();

        let mut outcomes = Vec::with_capacity(handles.len());

        for (i, handle) in handles.iter().enumerate() {
            writeln!(out, "Result from {} task:", ordinal(i))?;

            let outcome = handle.as_ref().map_err(Clone::clone).and_then(|h| h.get());
            match &outcome {
                Ok(text) => write!(out, "{}", text)?,
                Err(err) => {
                    warn!(task = i, "retrieval failed: {}", err);
                    writeln!(out, "Task execution interrupted: {}", err)?;
                }
            }

            outcomes.push(outcome);
        }

        out.flush()?;
        Ok(outcomes)
    }
}

/// "first", "second", ... for the first ten positions, "#n" after that.
pub fn ordinal(index: usize) -> String {
    ORDINALS
        .get(index)
        .map(|s| s.to_string())
        .unwrap_or_else(|| format!("#{}", index + 1))
}

/// The two tasks the binary runs.
pub fn demo_tasks() -> Vec<NamedTask> {
    vec![NamedTask::new("Task 1"), NamedTask::new("Task 2")]
}
