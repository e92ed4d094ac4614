//! Spin-then-block waiting used by both sides of the ring
//!
//! Waiters first spin/yield with a crossbeam [`Backoff`], then park on a
//! condition variable. Signallers only touch the mutex when somebody is
//! actually parked, so the common uncontended publish stays lock-free.
//! Every park is a timed wait; a missed notification costs at most one
//! timeout, never a hang.

use crossbeam_utils::Backoff;
use parking_lot::{Condvar, Mutex};
use std::sync::atomic::{fence, AtomicUsize, Ordering};
use std::time::{Duration, Instant};

#[derive(Debug, Default)]
pub struct WaitStrategy {
    lock: Mutex<()>,
    cond: Condvar,
    parked: AtomicUsize,
}

impl WaitStrategy {
    pub fn new() -> Self {
        Self::default()
    }

    /// Wait until `ready` returns true or `timeout` elapses
    ///
    /// Returns the last observed value of `ready`.
    pub fn wait_for(&self, timeout: Duration, ready: impl Fn() -> bool) -> bool {
        let backoff = Backoff::new();
        while !backoff.is_completed() {
            if ready() {
                return true;
            }
            backoff.snooze();
        }

        let deadline = Instant::now() + timeout;
        let mut guard = self.lock.lock();
        self.parked.fetch_add(1, Ordering::SeqCst);
        fence(Ordering::SeqCst);

        let result = loop {
            if ready() {
                break true;
            }
            if self.cond.wait_until(&mut guard, deadline).timed_out() {
                break ready();
            }
        };

        self.parked.fetch_sub(1, Ordering::SeqCst);
        result
    }

    /// Wake every parked waiter
    ///
    /// Must be called after the state change the waiters are polling for.
    pub fn signal(&self) {
        fence(Ordering::SeqCst);
        if self.parked.load(Ordering::SeqCst) > 0 {
            let _guard = self.lock.lock();
            self.cond.notify_all();
        }
    }
}
