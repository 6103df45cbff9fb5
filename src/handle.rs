//! Single-assignment result cells.
//!
//! [`pair`] creates a [`Promise`] for the producing side and a
//! [`ResultHandle`] for the consuming side. The promise resolves exactly
//! once; every `get` after that returns the same stored outcome.

use crate::error::{Error, Result};
use crate::interrupt;
use parking_lot::Mutex;
use std::fmt;
use std::sync::Arc;
use std::thread::{self, Thread};

struct Slot<T> {
    outcome: Option<Result<T>>,
    waiters: Vec<Thread>,
}

struct Shared<T> {
    slot: Mutex<Slot<T>>,
}

impl<T> Shared<T> {
    fn complete(&self, outcome: Result<T>) {
        let waiters = {
            let mut slot = self.slot.lock();
            if slot.outcome.is_some() {
                return;
            }
            slot.outcome = Some(outcome);
            std::mem::take(&mut slot.waiters)
        };

        for waiter in waiters {
            waiter.unpark();
        }
    }
}

/// Create a connected promise/handle pair.
pub fn pair<T>() -> (Promise<T>, ResultHandle<T>) {
    let shared = Arc::new(Shared {
        slot: Mutex::new(Slot {
            outcome: None,
            waiters: Vec::new(),
        }),
    });

    (
        Promise {
            shared: Some(shared.clone()),
        },
        ResultHandle { shared },
    )
}

/// Producing side of a [`ResultHandle`].
///
/// Dropping a promise without resolving it fails the handle with an
/// executor error so waiters never hang.
pub struct Promise<T> {
    shared: Option<Arc<Shared<T>>>,
}

impl<T> Promise<T> {
    pub fn resolve(mut self, outcome: Result<T>) {
        if let Some(shared) = self.shared.take() {
            shared.complete(outcome);
        }
    }
}

impl<T> Drop for Promise<T> {
    fn drop(&mut self) {
        if let Some(shared) = self.shared.take() {
            shared.complete(Err(Error::executor("task dropped before completion")));
        }
    }
}

impl<T> fmt::Debug for Promise<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Promise")
            .field("resolved", &self.shared.is_none())
            .finish()
    }
}

/// Blocking handle to the eventual outcome of a submitted task.
pub struct ResultHandle<T> {
    shared: Arc<Shared<T>>,
}

impl<T: Clone> ResultHandle<T> {
    /// Block until the task resolves and return its outcome.
    ///
    /// Fails with [`Error::Interrupted`] if the calling thread is interrupted
    /// first; the handle stays pending and can be waited on again.
    pub fn get(&self) -> Result<T> {
        let me = thread::current();

        loop {
            {
                let mut slot = self.shared.slot.lock();
                if let Some(outcome) = &slot.outcome {
                    return outcome.clone();
                }

                if interrupt::interrupted() {
                    slot.waiters.retain(|t| t.id() != me.id());
                    return Err(Error::Interrupted);
                }

                if !slot.waiters.iter().any(|t| t.id() == me.id()) {
                    slot.waiters.push(me.clone());
                }
            }

            thread::park();
        }
    }

    /// Non-blocking peek at the outcome.
    pub fn try_get(&self) -> Option<Result<T>> {
        self.shared.slot.lock().outcome.clone()
    }
}

impl<T> ResultHandle<T> {
    pub fn is_resolved(&self) -> bool {
        self.shared.slot.lock().outcome.is_some()
    }
}

impl<T> Clone for ResultHandle<T> {
    fn clone(&self) -> Self {
        Self {
            shared: self.shared.clone(),
        }
    }
}

impl<T> fmt::Debug for ResultHandle<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ResultHandle")
            .field("resolved", &self.is_resolved())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn test_resolve_then_get() {
        let (promise, handle) = pair::<String>();
        assert!(!handle.is_resolved());
        assert!(handle.try_get().is_none());

        promise.resolve(Ok("done".to_string()));

        assert!(handle.is_resolved());
        assert_eq!(handle.get(), Ok("done".to_string()));
    }

    #[test]
    fn test_get_blocks_until_resolved() {
        let (promise, handle) = pair::<u32>();

        let t = thread::spawn(move || {
            thread::sleep(Duration::from_millis(50));
            promise.resolve(Ok(7));
        });

        assert_eq!(handle.get(), Ok(7));
        t.join().unwrap();
    }

    #[test]
    fn test_get_is_idempotent() {
        let (promise, handle) = pair::<String>();
        promise.resolve(Err(Error::task_failed("boom")));

        let first = handle.get();
        let second = handle.get();
        assert_eq!(first, Err(Error::task_failed("boom")));
        assert_eq!(first, second);
    }

    #[test]
    fn test_clones_share_outcome() {
        let (promise, handle) = pair::<u32>();
        let other = handle.clone();

        let waiter = thread::spawn(move || other.get());
        thread::sleep(Duration::from_millis(20));
        promise.resolve(Ok(42));

        assert_eq!(waiter.join().unwrap(), Ok(42));
        assert_eq!(handle.get(), Ok(42));
    }

    #[test]
    fn test_dropped_promise_fails_handle() {
        let (promise, handle) = pair::<u32>();
        drop(promise);
        assert!(matches!(handle.get(), Err(Error::Executor(_))));
    }

    #[test]
    fn test_get_interrupted_then_retry() {
        let (promise, handle) = pair::<u32>();
        let me = interrupt::current();

        let t = thread::spawn(move || {
            thread::sleep(Duration::from_millis(30));
            me.interrupt();
            thread::sleep(Duration::from_millis(30));
            promise.resolve(Ok(3));
        });

        assert_eq!(handle.get(), Err(Error::Interrupted));
        assert!(!handle.is_resolved() || handle.try_get() == Some(Ok(3)));
        assert_eq!(handle.get(), Ok(3));
        t.join().unwrap();
    }
}
