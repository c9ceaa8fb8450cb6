//! # Fulfillment Service
//!
//! The executor-style front end to the warehouse. Instead of running long-lived
//! consumer loops, every accepted order schedules one fulfillment job on a
//! bounded worker pool, and the submitter gets a [`Receipt`] to wait on.
//!
//! The receipt is a completion channel layered on top of the queue; the queue
//! itself knows nothing about it. A job takes whatever order is at the head of
//! the queue, so the order a receipt reports as fulfilled is not necessarily the
//! one its submitter put in. [`Fulfillment`] carries both ids.
//!
//! ```rust,ignore
//! let service = FulfillmentService::new(queue, 3, Duration::from_millis(300), handle, stop)?;
//! let receipt = service.submit("Boots", quantity)?;   // blocks while the queue is full
//! let done = receipt.wait_blocking()?;
//! ```

use super::{cycling_quantity, ProducerReport, QuantityFn, TaskOutcome, DEFAULT_MAX_QUANTITY};
use crate::model::{Catalog, Order, OrderId};
use crate::warehouse::{BoundedOrderQueue, StopSignal, WarehouseError};
use std::num::NonZeroU32;
use std::sync::Arc;
use std::time::Duration;
use tokio::runtime::Handle;
use tokio::sync::{oneshot, Semaphore};
use tracing::{debug, error, info, info_span, warn};

/// The outcome of one fulfillment job.
#[derive(Debug, Clone)]
pub struct Fulfillment {
    /// Id of the order whose submission scheduled this job.
    pub submitted: OrderId,
    /// The order the job actually removed from the queue.
    pub fulfilled: Order,
    /// Processing was cut short by a stop after the order left the queue.
    pub interrupted: bool,
}

/// Completion handle for one submitted order.
#[derive(Debug)]
pub struct Receipt {
    order: Order,
    response: oneshot::Receiver<Result<Fulfillment, WarehouseError>>,
}

impl Receipt {
    /// The order accepted by the queue for this submission.
    pub fn order(&self) -> &Order {
        &self.order
    }

    pub async fn wait(self) -> Result<Fulfillment, WarehouseError> {
        self.response
            .await
            .map_err(|_| WarehouseError::TaskFailed("fulfillment job dropped".to_string()))?
    }

    /// Blocking variant of [`wait`](Self::wait). Must not be called from an async context.
    pub fn wait_blocking(self) -> Result<Fulfillment, WarehouseError> {
        self.response
            .blocking_recv()
            .map_err(|_| WarehouseError::TaskFailed("fulfillment job dropped".to_string()))?
    }
}

/// Everything a batch submission produced.
#[derive(Debug, Clone)]
pub struct BatchReport {
    pub producer: ProducerReport,
    pub fulfilled: Vec<Fulfillment>,
    pub failures: Vec<WarehouseError>,
}

impl BatchReport {
    /// Report for a submitter whose thread never handed back a result.
    pub fn unfinished(name: String, outcome: TaskOutcome) -> Self {
        Self {
            producer: ProducerReport::unfinished(name, outcome),
            fulfilled: Vec::new(),
            failures: Vec::new(),
        }
    }
}

pub struct FulfillmentService {
    queue: Arc<BoundedOrderQueue>,
    permits: Arc<Semaphore>,
    process_delay: Duration,
    handle: Handle,
    stop: StopSignal,
}

impl FulfillmentService {
    /// Creates a service whose jobs run at most `workers` at a time on `handle`'s
    /// blocking pool.
    pub fn new(
        queue: Arc<BoundedOrderQueue>,
        workers: usize,
        process_delay: Duration,
        handle: Handle,
        stop: StopSignal,
    ) -> Result<Self, WarehouseError> {
        if workers == 0 {
            return Err(WarehouseError::Configuration(
                "fulfillment pool needs at least one worker".to_string(),
            ));
        }

        Ok(Self {
            queue,
            permits: Arc::new(Semaphore::new(workers)),
            process_delay,
            handle,
            stop,
        })
    }

    pub fn queue(&self) -> &Arc<BoundedOrderQueue> {
        &self.queue
    }

    /// Puts an order into the queue and schedules one fulfillment job for it.
    ///
    /// Blocks the calling thread while the queue is full, so call it from a
    /// blocking context (a plain thread or `spawn_blocking`).
    pub fn submit(
        &self,
        category: impl Into<String>,
        quantity: NonZeroU32,
    ) -> Result<Receipt, WarehouseError> {
        let order = self.queue.put(category, quantity, &self.stop)?;
        let (respond_to, response) = oneshot::channel();

        let submitted = order.id();
        let queue = self.queue.clone();
        let permits = self.permits.clone();
        let stop = self.stop.clone();
        let delay = self.process_delay;

        self.handle.spawn(async move {
            let Ok(permit) = permits.acquire_owned().await else {
                let _ = respond_to.send(Err(WarehouseError::Cancelled));
                return;
            };

            let job = tokio::task::spawn_blocking(move || -> Result<Fulfillment, WarehouseError> {
                let _permit = permit;
                let order = queue.take(&stop)?;
                debug!(%submitted, order_id = %order.id(), "Fulfilling");
                let interrupted = stop.sleep(delay).is_err();
                if interrupted {
                    warn!(order_id = %order.id(), "Processing interrupted");
                } else {
                    info!(order_id = %order.id(), %order, "Fulfilled");
                }
                Ok(Fulfillment {
                    submitted,
                    fulfilled: order,
                    interrupted,
                })
            });

            let result = match job.await {
                Ok(result) => result,
                Err(e) => {
                    error!(%submitted, error = %e, "Fulfillment job failed");
                    Err(WarehouseError::TaskFailed(e.to_string()))
                }
            };
            let _ = respond_to.send(result);
        });

        Ok(Receipt { order, response })
    }

    /// Submits `count` round-robin orders, pausing `delay` between them, then
    /// waits for every receipt.
    ///
    /// Blocking; run it from a plain thread or `spawn_blocking`.
    pub fn submit_all(
        &self,
        name: impl Into<String>,
        catalog: &Catalog,
        count: usize,
        delay: Duration,
    ) -> BatchReport {
        self.submit_all_with(name, catalog, count, delay, cycling_quantity(DEFAULT_MAX_QUANTITY))
    }

    pub fn submit_all_with(
        &self,
        name: impl Into<String>,
        catalog: &Catalog,
        count: usize,
        delay: Duration,
        quantity: QuantityFn,
    ) -> BatchReport {
        let name = name.into();
        let span = info_span!("submitter", task = %name);
        let _enter = span.enter();

        let mut receipts = Vec::with_capacity(count);
        let mut outcome = TaskOutcome::Completed;

        for index in 0..count {
            match self.submit(catalog.category(index), quantity(index)) {
                Ok(receipt) => receipts.push(receipt),
                Err(WarehouseError::Cancelled) => {
                    warn!(submitted = receipts.len(), "Submitter cancelled");
                    outcome = TaskOutcome::Cancelled;
                    break;
                }
                Err(e) => {
                    error!(error = %e, "Submission failed");
                    outcome = TaskOutcome::Failed(e.to_string());
                    break;
                }
            }

            if index + 1 < count && self.stop.sleep(delay).is_err() {
                outcome = TaskOutcome::Cancelled;
                break;
            }
        }

        let accepted = receipts.iter().map(|r| r.order().clone()).collect();
        let mut fulfilled = Vec::with_capacity(receipts.len());
        let mut failures = Vec::new();
        for receipt in receipts {
            match receipt.wait_blocking() {
                Ok(done) => fulfilled.push(done),
                Err(e) => {
                    warn!(error = %e, "Order not fulfilled");
                    failures.push(e);
                }
            }
        }

        info!(fulfilled = fulfilled.len(), failed = failures.len(), "Submitter finished");
        BatchReport {
            producer: ProducerReport {
                name,
                accepted,
                outcome,
            },
            fulfilled,
            failures,
        }
    }

    /// Cancels pending and in-flight jobs. Their receipts resolve to `Cancelled`.
    pub fn shutdown(&self) {
        info!("Shutting down fulfillment service");
        self.stop.stop();
        self.permits.close();
        self.queue.interrupt_waiters();
    }
}
