//! # Order Warehouse
//!
//! > **A bounded, blocking producer/consumer warehouse on plain threads.**
//!
//! Producers submit orders into a shared warehouse of fixed capacity; consumers
//! take them out and process them. Producers block while the warehouse is full,
//! consumers block while it is empty, and a single lock keeps the buffer and the
//! order-id counter consistent.
//!
//! ## 🏗️ Design Philosophy
//!
//! ### Why a monitor and not a channel?
//!
//! The whole point of the warehouse is the wait/notify protocol itself: a
//! `Mutex` plus two `Condvar`s, with every wait re-checked in a loop. That makes
//! the invariants easy to state and easy to test:
//! - **Capacity**: `0 <= size() <= capacity()` at every instant
//! - **Ids**: assigned under the lock, strictly increasing from 1, never reused
//! - **FIFO**: every `take` returns the oldest order not yet taken
//! - **Cancellation**: a cancelled `put`/`take` changes nothing
//!
//! ### Concurrency Model
//!
//! Producers and consumers are blocking loops running on OS threads (Tokio's
//! blocking pool). Tokio is only used by the coordinator, for spawning, bounded
//! joins and the Ctrl-C handler.
//!
//! ## 🗺️ Module Tour
//!
//! ### 1. The Core ([`warehouse`])
//! - **Key items**: [`BoundedOrderQueue`](warehouse::BoundedOrderQueue),
//!   [`StopSignal`](warehouse::StopSignal), [`WarehouseError`](warehouse::WarehouseError).
//!
//! ### 2. The Data ([`model`])
//! - **Key items**: [`Order`](model::Order), [`Catalog`](model::Catalog).
//!
//! ### 3. The Workers ([`tasks`])
//! - **Key items**: [`Producer`](tasks::Producer), [`Consumer`](tasks::Consumer),
//!   [`FulfillmentService`](tasks::FulfillmentService).
//!
//! ### 4. The Orchestrator ([`lifecycle`])
//! - **Key items**: [`Coordinator`](lifecycle::Coordinator),
//!   [`WarehouseConfig`](lifecycle::WarehouseConfig), [`setup_tracing`](lifecycle::setup_tracing).
//!
//! ## 🚀 Quick Start
//!
//! ```bash
//! # Default run: capacity 10, 1 producer x 20 orders, 4 consumers x 5
//! RUST_LOG=info cargo run
//!
//! # Saturated warehouse, consumers run until the queue drains
//! RUST_LOG=info WAREHOUSE_CAPACITY=1 WAREHOUSE_CONSUMER_QUOTA=none cargo run
//!
//! # Executor variant with per-order receipts
//! RUST_LOG=info WAREHOUSE_MODE=executor WAREHOUSE_CONSUMERS=3 cargo run
//! ```

pub mod lifecycle;
pub mod model;
pub mod tasks;
pub mod warehouse;
