//! # Observability & Tracing
//!
//! The warehouse logs one structured line per state change, so a run can be read
//! back as a trace of accepts and fulfillments.
//!
//! ## What Gets Traced
//!
//! - **Queue events**: `Accepted` (with `order_id`, `category`, `quantity`, `size`)
//!   and `Dispatched` (with `order_id`, `size`)
//! - **Task lifecycle**: start, finish and cancellation, inside a `producer` or
//!   `consumer` span carrying the task name
//! - **Coordinator**: join timeouts, forced stops, failed tasks and the final
//!   `Remaining orders` report
//!
//! ## Usage Examples
//!
//! ```bash
//! # Accept / fulfill trace
//! RUST_LOG=info cargo run
//!
//! # Also show producers and consumers waiting on a full or empty queue
//! RUST_LOG=debug cargo run
//!
//! # Only the queue itself
//! RUST_LOG=order_warehouse::warehouse=info cargo run
//! ```
//!
//! **With `RUST_LOG=info`**:
//!
//! ```text
//! INFO producer: Accepted order_id=order_1 category="Running shoes" quantity=1 size=1 task=producer-1
//! INFO consumer: Dispatched order_id=order_1 size=0 task=consumer-1
//! INFO consumer: Fulfilled order_id=order_1 order=Order{id=1, type='Running shoes', quantity=1} task=consumer-1
//! ```
pub fn setup_tracing() {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_target(false)
        .compact()
        .init();
}
