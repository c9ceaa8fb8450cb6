//! # Run Lifecycle & Orchestration
//!
//! Wiring only: this module builds the queue, starts producers and consumers,
//! waits for them within a bounded time and reports what is left.
//!
//! ## Shutdown
//!
//! The coordinator owns the run-level [`StopSignal`](crate::warehouse::StopSignal).
//! Every task gets a child of it, so:
//!
//! 1. **Normal end** - producers finish their counts, consumers reach their
//!    quotas (or are stopped once the queue drains, for `UntilStopped`)
//! 2. **Timeout** - tasks still running at the join deadline get a broadcast stop
//!    plus [`interrupt_waiters`](crate::warehouse::BoundedOrderQueue::interrupt_waiters)
//!    and a short grace period
//! 3. **External request** - a [`ShutdownHandle`] does the same at any time
//!    (the binary wires it to Ctrl-C)
//!
//! A panicking task is reported as failed; the other tasks keep running.

pub mod config;
pub mod coordinator;
pub mod tracing;

pub use self::config::*;
pub use self::coordinator::*;
pub use self::tracing::setup_tracing;
