pub use crate::config::{Config, ConfigBuilder};
pub use crate::error::{Error, Result};
pub use crate::executor::{PoolState, PoolStats, WorkerPool};
pub use crate::handle::ResultHandle;
pub use crate::interrupt::Interruptor;
pub use crate::runner::{PoolRunner, RunReport};
pub use crate::task::{Callable, NamedTask};
