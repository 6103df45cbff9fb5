//! callpool - a fixed-size worker pool for named tasks
//!
//! Tasks are submitted to a [`WorkerPool`] with a fixed number of worker
//! threads. Each submission returns a [`ResultHandle`] immediately; calling
//! [`ResultHandle::get`] blocks until the task has produced its value or
//! failed.
//!
//! # Quick Start
//!
//! ```no_run
//! use callpool::prelude::*;
//!
//! let config = Config::builder().max_concurrent_workers(2).build().unwrap();
//! let mut pool = WorkerPool::new(&config).unwrap();
//!
//! let first = pool.submit(NamedTask::new("Task 1")).unwrap();
//! let second = pool.submit(NamedTask::new("Task 2")).unwrap();
//!
//! println!("{}", first.get().unwrap());
//! println!("{}", second.get().unwrap());
//!
//! pool.shutdown();
//! ```
//!
//! # Errors
//!
//! A task outcome is either a value, an execution error raised by the task
//! (panics included), or an interruption raised when the task's suspension
//! or the caller's wait is interrupted through an [`Interruptor`].

#![warn(missing_debug_implementations)]

pub mod config;
pub mod error;
pub mod executor;
pub mod handle;
pub mod interrupt;
pub mod logging;
pub mod prelude;
pub mod runner;
pub mod task;

pub use config::{Config, ConfigBuilder};
pub use error::{Error, Result};
pub use executor::{PoolState, PoolStats, WorkerPool};
pub use handle::ResultHandle;
pub use interrupt::Interruptor;
pub use runner::{PoolRunner, RunReport};
pub use task::{Callable, NamedTask};
