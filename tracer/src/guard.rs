//! Per-thread trace suppression
//!
//! Calls the profiler makes into the intercepted API on its own behalf (for
//! example while querying device information) must not show up in the
//! reports. Holding a [`TraceGuard`] marks the current thread inactive.

use std::cell::Cell;
use std::marker::PhantomData;

thread_local! {
    static INACTIVE: Cell<u32> = const { Cell::new(0) };
}

/// Suppresses recording on the current thread while alive
#[derive(Debug)]
pub struct TraceGuard {
    // Guards are tied to the thread that created them.
    _not_send: PhantomData<*const ()>,
}

impl TraceGuard {
    pub fn new() -> Self {
        INACTIVE.with(|count| count.set(count.get() + 1));
        Self {
            _not_send: PhantomData,
        }
    }

    /// Whether the current thread is inside a guard
    pub fn inactive() -> bool {
        INACTIVE.with(|count| count.get() > 0)
    }
}

impl Default for TraceGuard {
    fn default() -> Self {
        Self::new()
    }
}

impl Drop for TraceGuard {
    fn drop(&mut self) {
        INACTIVE.with(|count| {
            debug_assert!(count.get() > 0);
            count.set(count.get().saturating_sub(1));
        });
    }
}
