//! Completion signals.
//!
//! A completion signal is the blocking half of the job gate: the gate arms
//! it before starting a job, the completion interrupt signals it, and the
//! submitting context waits on it. The signal is a binary latch, so a
//! signal raised before anyone waits is not lost and repeated signals do
//! not accumulate.
//!
//! Two implementations are provided:
//!
//! - [`SpinSignal`]: atomic flag polled in a spin loop, for bare-metal
//!   targets without a scheduler.
//! - [`SemaphoreSignal`]: binary semaphore built on `Mutex` + `Condvar`,
//!   available with the `std` feature.

use core::sync::atomic::{AtomicBool, Ordering};
use core::time::Duration;

/// Blocking primitive used by the job gate.
pub trait CompletionSignal: Send + Sync {
    /// Discard any latched completion before a new job starts.
    fn arm(&self);

    /// Latch a completion and wake the waiter. Callable from interrupt context.
    fn signal(&self);

    /// Block until a completion is latched, then consume it.
    fn wait(&self);

    /// Like [`wait`](Self::wait) but gives up after `timeout`.
    ///
    /// Returns `false` if the deadline passed with nothing latched.
    fn wait_timeout(&self, timeout: Duration) -> bool;

    /// Whether [`wait_timeout`](Self::wait_timeout) can honour a deadline.
    fn supports_timeout(&self) -> bool;
}

/// Monotonic time source for bounded spinning.
pub type Clock = fn() -> Duration;

/// Completion signal polled in a spin loop.
pub struct SpinSignal {
    latched: AtomicBool,
    clock: Option<Clock>,
}

impl SpinSignal {
    /// Create a spin signal without a time source.
    ///
    /// `wait_timeout` then degrades to an unbounded wait.
    pub const fn new() -> Self {
        SpinSignal {
            latched: AtomicBool::new(false),
            clock: None,
        }
    }

    /// Create a spin signal that bounds waits with `clock`.
    pub const fn with_clock(clock: Clock) -> Self {
        SpinSignal {
            latched: AtomicBool::new(false),
            clock: Some(clock),
        }
    }

    fn try_consume(&self) -> bool {
        self.latched
            .compare_exchange(true, false, Ordering::Acquire, Ordering::Relaxed)
            .is_ok()
    }
}

impl Default for SpinSignal {
    fn default() -> Self {
        Self::new()
    }
}

impl CompletionSignal for SpinSignal {
    fn arm(&self) {
        self.latched.store(false, Ordering::Release);
    }

    fn signal(&self) {
        self.latched.store(true, Ordering::Release);
    }

    fn wait(&self) {
        while !self.try_consume() {
            core::hint::spin_loop();
        }
    }

    fn wait_timeout(&self, timeout: Duration) -> bool {
        let Some(clock) = self.clock else {
            self.wait();
            return true;
        };

        let deadline = clock().saturating_add(timeout);
        loop {
            if self.try_consume() {
                return true;
            }
            if clock() >= deadline {
                // Last look, the completion may have landed after the check.
                return self.try_consume();
            }
            core::hint::spin_loop();
        }
    }

    fn supports_timeout(&self) -> bool {
        self.clock.is_some()
    }
}

#[cfg(any(feature = "std", test))]
pub use semaphore::SemaphoreSignal;

#[cfg(any(feature = "std", test))]
mod semaphore {
    use super::CompletionSignal;
    use core::time::Duration;
    use std::sync::{Condvar, Mutex, MutexGuard, PoisonError};

    /// Binary semaphore completion signal.
    pub struct SemaphoreSignal {
        permit: Mutex<bool>,
        available: Condvar,
    }

    impl SemaphoreSignal {
        /// Create an empty semaphore.
        pub fn new() -> Self {
            SemaphoreSignal {
                permit: Mutex::new(false),
                available: Condvar::new(),
            }
        }

        fn permit(&self) -> MutexGuard<'_, bool> {
            // The guarded value is a plain bool, a poisoned lock is still usable.
            self.permit.lock().unwrap_or_else(PoisonError::into_inner)
        }
    }

    impl Default for SemaphoreSignal {
        fn default() -> Self {
            Self::new()
        }
    }

    impl CompletionSignal for SemaphoreSignal {
        fn arm(&self) {
            *self.permit() = false;
        }

        fn signal(&self) {
            let mut permit = self.permit();
            *permit = true;
            self.available.notify_one();
        }

        fn wait(&self) {
            let mut permit = self.permit();
            while !*permit {
                permit = self
                    .available
                    .wait(permit)
                    .unwrap_or_else(PoisonError::into_inner);
            }
            *permit = false;
        }

        fn wait_timeout(&self, timeout: Duration) -> bool {
            let permit = self.permit();
            let (mut permit, _) = self
                .available
                .wait_timeout_while(permit, timeout, |taken| !*taken)
                .unwrap_or_else(PoisonError::into_inner);
            let acquired = *permit;
            *permit = false;
            acquired
        }

        fn supports_timeout(&self) -> bool {
            true
        }
    }
}
