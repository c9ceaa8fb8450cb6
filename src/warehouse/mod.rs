//! # Warehouse Core
//!
//! The shared, synchronized part of the system. Everything else (producers,
//! consumers, the fulfillment pool, the coordinator) only talks to the warehouse
//! through [`BoundedOrderQueue::put`], [`BoundedOrderQueue::take`] and
//! [`BoundedOrderQueue::size`].
//!
//! # Main Components
//!
//! - [`BoundedOrderQueue`] - Mutex + two condition variables around a FIFO buffer
//! - [`StopSignal`] - Cooperative cancellation for blocked callers
//! - [`WarehouseError`] - Configuration, cancellation and poisoning errors

pub mod error;
pub mod queue;
pub mod stop;

pub use error::WarehouseError;
pub use queue::{BoundedOrderQueue, WakePolicy};
pub use stop::{StopSignal, STOP_POLL_INTERVAL};
