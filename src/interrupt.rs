//! Per-thread interrupt flags.
//!
//! Every thread owns a flag that other threads can raise through an
//! [`Interruptor`]. Blocking points in this crate ([`sleep`] and
//! [`ResultHandle::get`](crate::handle::ResultHandle::get)) observe the flag,
//! clear it, and fail with [`Error::Interrupted`].

use crate::error::{Error, Result};
use std::cell::RefCell;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::{self, Thread};
use std::time::{Duration, Instant};

thread_local! {
    static FLAG: RefCell<Arc<AtomicBool>> = RefCell::new(Arc::new(AtomicBool::new(false)));
}

/// Handle used to interrupt a specific thread.
#[derive(Debug, Clone)]
pub struct Interruptor {
    thread: Thread,
    flag: Arc<AtomicBool>,
}

impl Interruptor {
    pub(crate) fn new(thread: Thread, flag: Arc<AtomicBool>) -> Self {
        Self { thread, flag }
    }

    /// Raise the flag and wake the thread if it is parked.
    pub fn interrupt(&self) {
        self.flag.store(true, Ordering::Release);
        self.thread.unpark();
    }

    pub fn is_interrupted(&self) -> bool {
        self.flag.load(Ordering::Acquire)
    }

    pub fn thread_name(&self) -> Option<&str> {
        self.thread.name()
    }
}

/// Interruptor for the calling thread.
pub fn current() -> Interruptor {
    FLAG.with(|flag| Interruptor::new(thread::current(), flag.borrow().clone()))
}

/// Make `flag` the calling thread's interrupt flag.
pub(crate) fn bind(flag: Arc<AtomicBool>) {
    FLAG.with(|slot| *slot.borrow_mut() = flag);
}

/// Test the calling thread's flag without clearing it.
pub fn is_interrupted() -> bool {
    FLAG.with(|flag| flag.borrow().load(Ordering::Acquire))
}

/// Test and clear the calling thread's flag.
pub fn interrupted() -> bool {
    FLAG.with(|flag| flag.borrow().swap(false, Ordering::AcqRel))
}

/// Fails with [`Error::Interrupted`] (clearing the flag) if the calling
/// thread has been interrupted.
pub fn check() -> Result<()> {
    if interrupted() {
        Err(Error::Interrupted)
    } else {
        Ok(())
    }
}

/// Suspend the calling thread for `duration` unless it is interrupted first.
pub fn sleep(duration: Duration) -> Result<()> {
    let deadline = Instant::now() + duration;

    loop {
        check()?;

        let now = Instant::now();
        if now >= deadline {
            return Ok(());
        }

        // unpark() from submissions or interrupts can end this early; loop re-checks
        thread::park_timeout(deadline - now);
    }
}
