//! # Consumer
//!
//! Repeatedly takes orders from the shared queue and simulates processing them.
//!
//! A consumer ends in one of two ways: it reaches a [`ConsumerQuota::Fixed`] count,
//! or its [`StopSignal`] fires. Counting alone is not enough to terminate safely,
//! since a consumer waiting for its fifth order blocks forever if the producers
//! only ever made four; [`ConsumerQuota::UntilStopped`] makes the stop signal the
//! only exit.

use super::TaskOutcome;
use crate::model::Order;
use crate::warehouse::{BoundedOrderQueue, StopSignal, WarehouseError};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use tracing::{error, info, info_span, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConsumerQuota {
    /// Take exactly this many orders, unless stopped first.
    Fixed(usize),
    /// Keep taking orders until the stop signal fires.
    UntilStopped,
}

impl From<Option<usize>> for ConsumerQuota {
    fn from(quota: Option<usize>) -> Self {
        quota.map_or(ConsumerQuota::UntilStopped, ConsumerQuota::Fixed)
    }
}

pub struct Consumer {
    name: String,
    queue: Arc<BoundedOrderQueue>,
    quota: ConsumerQuota,
    delay: Duration,
    stop: StopSignal,
}

#[derive(Debug, Clone)]
pub struct ConsumerReport {
    pub name: String,
    /// Every order this consumer removed from the queue, in removal order.
    /// Includes an order whose processing was interrupted by a stop.
    pub fulfilled: Vec<Order>,
    pub outcome: TaskOutcome,
}

impl ConsumerReport {
    /// Report for a consumer whose thread never handed back a result.
    pub fn unfinished(name: String, outcome: TaskOutcome) -> Self {
        Self {
            name,
            fulfilled: Vec::new(),
            outcome,
        }
    }
}

impl Consumer {
    pub fn new(
        name: impl Into<String>,
        queue: Arc<BoundedOrderQueue>,
        quota: ConsumerQuota,
        stop: StopSignal,
    ) -> Self {
        Self {
            name: name.into(),
            queue,
            quota,
            delay: Duration::ZERO,
            stop,
        }
    }

    /// Simulated processing time per order.
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn run(self) -> ConsumerReport {
        let span = info_span!("consumer", task = %self.name);
        let _enter = span.enter();
        info!(quota = ?self.quota, "Consumer started");

        let mut fulfilled = Vec::new();

        let outcome = loop {
            if let ConsumerQuota::Fixed(limit) = self.quota {
                if fulfilled.len() >= limit {
                    break TaskOutcome::Completed;
                }
            }

            let order = match self.queue.take(&self.stop) {
                Ok(order) => order,
                Err(WarehouseError::Cancelled) => break self.stopped_outcome(fulfilled.len()),
                Err(e) => {
                    error!(error = %e, "Take failed");
                    break TaskOutcome::Failed(e.to_string());
                }
            };

            let processed = self.stop.sleep(self.delay);
            match processed {
                Ok(()) => info!(order_id = %order.id(), %order, "Fulfilled"),
                Err(_) => warn!(order_id = %order.id(), "Processing interrupted"),
            }
            fulfilled.push(order);
            if processed.is_err() {
                break self.stopped_outcome(fulfilled.len());
            }
        };

        info!(fulfilled = fulfilled.len(), ?outcome, "Consumer finished");
        ConsumerReport {
            name: self.name,
            fulfilled,
            outcome,
        }
    }

    fn stopped_outcome(&self, fulfilled: usize) -> TaskOutcome {
        match self.quota {
            ConsumerQuota::UntilStopped => TaskOutcome::Completed,
            ConsumerQuota::Fixed(limit) => {
                warn!(fulfilled, limit, "Consumer cancelled before reaching quota");
                TaskOutcome::Cancelled
            }
        }
    }
}
