//! Coalescing wake/cancel flag between the editor and the highlight worker
//!
//! Any number of producers may `set()` it; exactly one consumer (the
//! scheduler loop) waits on it and clears it.

use std::time::{Duration, Instant};

use parking_lot::{Condvar, Mutex};

/// Level-triggered restart request
#[derive(Debug, Default)]
pub struct RestartSignal {
    pending: Mutex<bool>,
    wake: Condvar,
}

impl RestartSignal {
    pub fn new() -> Self {
        Self::default()
    }

    /// Request a (re)start. Setting an already-set signal has no further effect.
    pub fn set(&self) {
        let mut pending = self.pending.lock();
        *pending = true;
        self.wake.notify_one();
    }

    /// Peek without clearing
    pub fn is_set(&self) -> bool {
        *self.pending.lock()
    }

    /// Wait up to `timeout` for the signal, then check and clear it atomically.
    ///
    /// A zero timeout is a non-blocking poll.
    pub fn try_consume(&self, timeout: Duration) -> bool {
        let mut pending = self.pending.lock();
        if !*pending && !timeout.is_zero() {
            let deadline = Instant::now() + timeout;
            while !*pending {
                if self.wake.wait_until(&mut pending, deadline).timed_out() {
                    break;
                }
            }
        }
        std::mem::replace(&mut *pending, false)
    }

    /// Block until the signal is set, then clear it
    pub fn wait_and_clear(&self) {
        let mut pending = self.pending.lock();
        while !*pending {
            self.wake.wait(&mut pending);
        }
        *pending = false;
    }
}
