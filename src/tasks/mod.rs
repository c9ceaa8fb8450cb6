//! # Producer & Consumer Tasks
//!
//! The worker side of the warehouse. Each task is a plain blocking loop meant to
//! run on its own OS thread (the coordinator uses `tokio::task::spawn_blocking`).
//!
//! - [`Producer`] - submits a fixed number of round-robin orders
//! - [`Consumer`] - takes orders until its quota is met or it is stopped
//! - [`FulfillmentService`] - executor-style variant returning one [`Receipt`] per order
//!
//! Tasks never return errors. A cancelled or failed loop ends cleanly and records
//! why in its report's [`TaskOutcome`].

pub mod consumer;
pub mod fulfillment;
pub mod producer;

pub use consumer::*;
pub use fulfillment::*;
pub use producer::*;

/// How a task's loop ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TaskOutcome {
    /// The task did all the work it was given.
    Completed,
    /// The task's stop signal fired before it finished.
    Cancelled,
    /// The task hit an error or panicked.
    Failed(String),
}

impl TaskOutcome {
    pub fn is_completed(&self) -> bool {
        matches!(self, TaskOutcome::Completed)
    }
}
