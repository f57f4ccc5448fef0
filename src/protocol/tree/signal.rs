//! One-shot value slot with bounded blocking waits.

use std::time::{Duration, Instant};

use once_cell::sync::OnceCell;
use parking_lot::{Condvar, Mutex};

/// A value that is set at most once and can be awaited from other threads.
///
/// Reads after the value is set are lock-free; only waiters that arrive
/// before it take the slot's mutex.
#[derive(Debug)]
pub struct OneShot<T> {
    value: OnceCell<T>,
    lock: Mutex<()>,
    signal: Condvar,
}

impl<T> OneShot<T> {
    /// Creates an empty slot.
    pub fn new() -> Self {
        Self {
            value: OnceCell::new(),
            lock: Mutex::new(()),
            signal: Condvar::new(),
        }
    }

    /// Returns the value if it has been set.
    pub fn get(&self) -> Option<&T> {
        self.value.get()
    }

    /// Sets the value and wakes every waiter.
    ///
    /// Returns the value back if the slot was already set.
    pub fn set(&self, value: T) -> Result<(), T> {
        let _guard = self.lock.lock();
        self.value.set(value)?;
        self.signal.notify_all();
        Ok(())
    }

    /// Blocks until the value is set or `timeout` elapses.
    pub fn wait_for(&self, timeout: Duration) -> Option<&T> {
        if let Some(value) = self.value.get() {
            return Some(value);
        }

        let deadline = Instant::now() + timeout;
        let mut guard = self.lock.lock();
        while self.value.get().is_none() {
            if self.signal.wait_until(&mut guard, deadline).timed_out() {
                break;
            }
        }
        self.value.get()
    }
}

impl<T> Default for OneShot<T> {
    fn default() -> Self {
        Self::new()
    }
}
