//! Minimal spin lock for short critical sections in instrumentation callbacks

use std::sync::atomic::{AtomicU64, Ordering};

const FREE: u64 = 0;
const HELD: u64 = 1;

/// A lock word with two states, free and held. Every transition is a
/// sequentially-consistent compare-exchange.
#[derive(Debug, Default)]
pub struct SpinMutex {
    state: AtomicU64,
}

impl SpinMutex {
    pub const fn new() -> Self {
        Self {
            state: AtomicU64::new(FREE),
        }
    }

    /// Spin until the lock is taken.
    pub fn acquire(&self) {
        while self
            .state
            .compare_exchange(FREE, HELD, Ordering::SeqCst, Ordering::SeqCst)
            .is_err()
        {
            std::hint::spin_loop();
        }
    }

    /// Take the lock if it is free.
    pub fn try_acquire(&self) -> bool {
        self.state
            .compare_exchange(FREE, HELD, Ordering::SeqCst, Ordering::SeqCst)
            .is_ok()
    }

    /// Spin until the lock is released. Releasing a free lock never returns.
    pub fn release(&self) {
        while self
            .state
            .compare_exchange(HELD, FREE, Ordering::SeqCst, Ordering::SeqCst)
            .is_err()
        {
            std::hint::spin_loop();
        }
    }

    pub fn is_held(&self) -> bool {
        self.state.load(Ordering::SeqCst) == HELD
    }

    /// Acquire and release on drop.
    pub fn lock(&self) -> SpinGuard<'_> {
        self.acquire();
        SpinGuard { mutex: self }
    }
}

pub struct SpinGuard<'a> {
    mutex: &'a SpinMutex,
}

impl Drop for SpinGuard<'_> {
    fn drop(&mut self) {
        self.mutex.release();
    }
}
