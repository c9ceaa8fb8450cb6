//! # Stop Signals
//!
//! Cooperative cancellation for threads blocked inside the warehouse.
//!
//! A [`StopSignal`] is a cheap, cloneable flag. Blocking operations check it every
//! time they wake up, and they never sleep longer than [`STOP_POLL_INTERVAL`] in one
//! go, so a stop request is observed within a bounded time even if nobody calls
//! [`BoundedOrderQueue::interrupt_waiters`](super::BoundedOrderQueue::interrupt_waiters).
//!
//! Signals form a tree. The coordinator owns the run-level signal and hands each
//! task a [`child`](StopSignal::child): stopping the run stops every task, while
//! stopping one task leaves the others running.

use super::WarehouseError;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

/// Upper bound on how long a blocked thread goes without re-checking its signal.
pub const STOP_POLL_INTERVAL: Duration = Duration::from_millis(10);

#[derive(Debug, Clone, Default)]
pub struct StopSignal {
    inner: Arc<StopInner>,
}

#[derive(Debug, Default)]
struct StopInner {
    stopped: AtomicBool,
    parent: Option<StopSignal>,
}

impl StopSignal {
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a signal that fires when either it or `self` (or any ancestor) fires.
    pub fn child(&self) -> Self {
        Self {
            inner: Arc::new(StopInner {
                stopped: AtomicBool::new(false),
                parent: Some(self.clone()),
            }),
        }
    }

    pub fn stop(&self) {
        self.inner.stopped.store(true, Ordering::Release);
    }

    pub fn is_stopped(&self) -> bool {
        self.inner.stopped.load(Ordering::Acquire)
            || self
                .inner
                .parent
                .as_ref()
                .is_some_and(StopSignal::is_stopped)
    }

    /// Returns `Err(Cancelled)` once the signal has fired.
    pub fn check(&self) -> Result<(), WarehouseError> {
        if self.is_stopped() {
            Err(WarehouseError::Cancelled)
        } else {
            Ok(())
        }
    }

    /// Sleeps for `duration`, returning early with `Cancelled` if the signal fires.
    pub fn sleep(&self, duration: Duration) -> Result<(), WarehouseError> {
        let deadline = Instant::now() + duration;
        loop {
            self.check()?;
            let now = Instant::now();
            if now >= deadline {
                return Ok(());
            }
            thread::sleep((deadline - now).min(STOP_POLL_INTERVAL));
        }
    }
}
