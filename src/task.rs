//! Units of work accepted by the pool.

use crate::error::Result;
use crate::interrupt;
use std::fmt;
use std::fmt::Write as _;
use std::time::Duration;

pub const DEFAULT_STEPS: usize = 5;
pub const DEFAULT_STEP_DELAY: Duration = Duration::from_millis(500);

/// A named unit of work that produces a value or fails.
pub trait Callable: Send + 'static {
    type Output: Send + 'static;

    fn name(&self) -> &str;

    fn call(self) -> Result<Self::Output>;
}

/// Demo task: writes one progress line per step and suspends between steps.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NamedTask {
    name: String,
    steps: usize,
    step_delay: Duration,
}

impl NamedTask {
    pub fn new<S: Into<String>>(name: S) -> Self {
        Self::with_timing(name, DEFAULT_STEPS, DEFAULT_STEP_DELAY)
    }

    pub fn with_timing<S: Into<String>>(name: S, steps: usize, step_delay: Duration) -> Self {
        Self {
            name: name.into(),
            steps,
            step_delay,
        }
    }

    pub fn steps(&self) -> usize {
        self.steps
    }

    pub fn step_delay(&self) -> Duration {
        self.step_delay
    }

    /// Expected wall-clock time of one run.
    pub fn duration(&self) -> Duration {
        self.step_delay * self.steps as u32
    }

    pub fn progress_line(name: &str, step: usize) -> String {
        format!("Task {} is running {}", name, step)
    }
}

impl Callable for NamedTask {
    type Output = String;

    fn name(&self) -> &str {
        &self.name
    }

    fn call(self) -> Result<String> {
        let mut out = String::new();

        for step in 0..self.steps {
            // writing into a String cannot fail
            let _ = writeln!(out, "{}", Self::progress_line(&self.name, step));
            interrupt::sleep(self.step_delay)?;
        }

        Ok(out)
    }
}

/// Adapter turning a closure into a [`Callable`].
pub struct FnTask<F> {
    name: String,
    f: F,
}

pub fn from_fn<S, F, T>(name: S, f: F) -> FnTask<F>
where
    S: Into<String>,
    F: FnOnce() -> Result<T> + Send + 'static,
    T: Send + 'static,
{
    FnTask {
        name: name.into(),
        f,
    }
}

impl<F, T> Callable for FnTask<F>
where
    F: FnOnce() -> Result<T> + Send + 'static,
    T: Send + 'static,
{
    type Output = T;

    fn name(&self) -> &str {
        &self.name
    }

    fn call(self) -> Result<T> {
        (self.f)()
    }
}

impl<F> fmt::Debug for FnTask<F> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FnTask").field("name", &self.name).finish()
    }
}
