//! # Warehouse Errors
//!
//! This module defines the error types shared by the queue, the tasks and the
//! coordinator. Full and empty are not errors: they are transient states handled
//! by blocking.

/// Errors that can occur while building or using the warehouse.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum WarehouseError {
    /// Invalid capacity, task counts, catalog or environment override.
    #[error("Invalid configuration: {0}")]
    Configuration(String),

    /// A blocking operation was interrupted by its stop signal.
    #[error("Operation cancelled")]
    Cancelled,

    /// A thread panicked while holding the queue lock.
    #[error("Warehouse lock poisoned")]
    Poisoned,

    /// A worker task panicked or was torn down before reporting back.
    #[error("Task failed: {0}")]
    TaskFailed(String),
}
