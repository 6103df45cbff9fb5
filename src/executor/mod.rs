//! Task execution infrastructure.
//!
//! This module provides the fixed worker pool, its worker threads and the
//! queued job representation they share.

pub mod job;
pub mod panic;
pub mod pool;
pub mod worker;

pub use job::JobId;
pub use pool::{PoolState, PoolStats, WorkerPool};

