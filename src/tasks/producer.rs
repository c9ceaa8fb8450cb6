//! # Producer
//!
//! Generates a fixed number of orders and submits each one to the shared queue.

use super::TaskOutcome;
use crate::model::{Catalog, Order};
use crate::warehouse::{BoundedOrderQueue, StopSignal, WarehouseError};
use std::num::NonZeroU32;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, error, info, info_span, warn};

/// Quantities cycle through `1..=DEFAULT_MAX_QUANTITY` unless overridden.
pub const DEFAULT_MAX_QUANTITY: NonZeroU32 = match NonZeroU32::new(5) {
    Some(n) => n,
    None => panic!("quantity bound must be non-zero"),
};

/// Maps the submission index to an order quantity.
pub type QuantityFn = Arc<dyn Fn(usize) -> NonZeroU32 + Send + Sync>;

/// Deterministic quantities cycling through `1..=max`.
pub fn cycling_quantity(max: NonZeroU32) -> QuantityFn {
    Arc::new(move |index| {
        let step = (index as u64 % u64::from(max.get())) as u32;
        NonZeroU32::MIN.saturating_add(step)
    })
}

/// Submits `count` orders, picking category `i mod len(catalog)` for submission `i`.
pub struct Producer {
    name: String,
    queue: Arc<BoundedOrderQueue>,
    catalog: Catalog,
    count: usize,
    delay: Duration,
    quantity: QuantityFn,
    stop: StopSignal,
}

#[derive(Debug, Clone)]
pub struct ProducerReport {
    pub name: String,
    /// Orders accepted by the queue, in submission order.
    pub accepted: Vec<Order>,
    pub outcome: TaskOutcome,
}

impl ProducerReport {
    /// Report for a producer whose thread never handed back a result.
    pub fn unfinished(name: String, outcome: TaskOutcome) -> Self {
        Self {
            name,
            accepted: Vec::new(),
            outcome,
        }
    }
}

impl Producer {
    pub fn new(
        name: impl Into<String>,
        queue: Arc<BoundedOrderQueue>,
        catalog: Catalog,
        count: usize,
        stop: StopSignal,
    ) -> Self {
        Self {
            name: name.into(),
            queue,
            catalog,
            count,
            delay: Duration::ZERO,
            quantity: cycling_quantity(DEFAULT_MAX_QUANTITY),
            stop,
        }
    }

    /// Pause between two successive submissions.
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    pub fn with_quantities(
        mut self,
        quantity: impl Fn(usize) -> NonZeroU32 + Send + Sync + 'static,
    ) -> Self {
        self.quantity = Arc::new(quantity);
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Runs the submission loop on the calling thread.
    ///
    /// Orders already accepted stay in the queue when the producer is stopped.
    pub fn run(self) -> ProducerReport {
        let span = info_span!("producer", task = %self.name);
        let _enter = span.enter();
        info!(count = self.count, "Producer started");

        let mut accepted = Vec::with_capacity(self.count);
        let mut outcome = TaskOutcome::Completed;

        for index in 0..self.count {
            let category = self.catalog.category(index);
            let quantity = (self.quantity)(index);

            match self.queue.put(category, quantity, &self.stop) {
                Ok(order) => {
                    debug!(order_id = %order.id(), "Submitted");
                    accepted.push(order);
                }
                Err(WarehouseError::Cancelled) => {
                    warn!(submitted = accepted.len(), "Producer cancelled");
                    outcome = TaskOutcome::Cancelled;
                    break;
                }
                Err(e) => {
                    error!(error = %e, "Submission failed");
                    outcome = TaskOutcome::Failed(e.to_string());
                    break;
                }
            }

            if index + 1 < self.count && self.stop.sleep(self.delay).is_err() {
                warn!(submitted = accepted.len(), "Producer cancelled between submissions");
                outcome = TaskOutcome::Cancelled;
                break;
            }
        }

        info!(submitted = accepted.len(), ?outcome, "Producer finished");
        ProducerReport {
            name: self.name,
            accepted,
            outcome,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::OrderId;

    #[test]
    fn cycling_quantity_stays_in_range() {
        let quantity = cycling_quantity(NonZeroU32::new(3).unwrap());
        let values: Vec<u32> = (0..7).map(|i| quantity(i).get()).collect();
        assert_eq!(values, vec![1, 2, 3, 1, 2, 3, 1]);
    }

    #[test]
    fn producer_uses_round_robin_categories() {
        let queue = Arc::new(BoundedOrderQueue::new(10).unwrap());
        let catalog = Catalog::new(["left", "right"]).unwrap();
        let report = Producer::new("p", queue.clone(), catalog, 5, StopSignal::new())
            .with_quantities(|i| NonZeroU32::new(i as u32 + 1).unwrap())
            .run();

        assert_eq!(report.outcome, TaskOutcome::Completed);
        let categories: Vec<&str> = report.accepted.iter().map(|o| o.category()).collect();
        assert_eq!(categories, ["left", "right", "left", "right", "left"]);
        let quantities: Vec<u32> = report.accepted.iter().map(|o| o.quantity()).collect();
        assert_eq!(quantities, [1, 2, 3, 4, 5]);
        assert_eq!(report.accepted[4].id(), OrderId(5));
        assert_eq!(queue.size(), 5);
    }

    #[test]
    fn stopped_producer_keeps_what_was_accepted() {
        let queue = Arc::new(BoundedOrderQueue::new(2).unwrap());
        let stop = StopSignal::new();
        let producer = Producer::new("p", queue.clone(), Catalog::default(), 5, stop.clone());

        let handle = std::thread::spawn(move || producer.run());
        std::thread::sleep(Duration::from_millis(50));
        stop.stop();
        queue.interrupt_waiters();

        let report = handle.join().unwrap();
        assert_eq!(report.outcome, TaskOutcome::Cancelled);
        assert_eq!(report.accepted.len(), 2);
        assert_eq!(queue.size(), 2);
    }
}
