//! # Bounded Order Queue
//!
//! The synchronized core of the warehouse: a FIFO buffer with a fixed capacity,
//! shared by any number of producer and consumer threads.
//!
//! ## Monitor Layout
//!
//! One `Mutex` guards both the buffer and the id counter, so the wait-check and
//! the mutation in [`put`](BoundedOrderQueue::put) and [`take`](BoundedOrderQueue::take)
//! are a single critical section. Two condition variables carry the wake-ups:
//!
//! - `not_full` - producers wait here while `len == capacity`
//! - `not_empty` - consumers wait here while `len == 0`
//!
//! Every wait is a loop that re-checks the predicate after waking, because a
//! wake-up only says the state *was* favourable when the signal was sent; another
//! thread may have taken the slot before this one re-acquired the lock.
//!
//! Waiting releases the mutex (standard `Condvar` semantics), and each wait is
//! capped at [`STOP_POLL_INTERVAL`] so a caller's [`StopSignal`] is noticed within a
//! bounded time.

use super::{StopSignal, WarehouseError, STOP_POLL_INTERVAL};
use crate::model::{Order, OrderId};
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use std::num::NonZeroU32;
use std::sync::{Condvar, Mutex, MutexGuard};
use tracing::{debug, info};

/// How many complementary waiters a state change wakes.
///
/// Each `put` adds exactly one item and each `take` frees exactly one slot, so
/// waking a single waiter is enough. `All` broadcasts instead; it costs more
/// wake-ups but is equally correct because every waiter re-checks its predicate.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WakePolicy {
    #[default]
    One,
    All,
}

impl std::str::FromStr for WakePolicy {
    type Err = WarehouseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "one" => Ok(WakePolicy::One),
            "all" => Ok(WakePolicy::All),
            other => Err(WarehouseError::Configuration(format!(
                "unknown wake policy '{other}', expected 'one' or 'all'"
            ))),
        }
    }
}

struct QueueState {
    buffer: VecDeque<Order>,
    next_id: u64,
}

pub struct BoundedOrderQueue {
    capacity: usize,
    wake_policy: WakePolicy,
    state: Mutex<QueueState>,
    not_full: Condvar,
    not_empty: Condvar,
}

impl BoundedOrderQueue {
    /// Creates a queue holding at most `capacity` orders.
    ///
    /// Fails with [`WarehouseError::Configuration`] when `capacity` is zero.
    pub fn new(capacity: usize) -> Result<Self, WarehouseError> {
        Self::with_wake_policy(capacity, WakePolicy::default())
    }

    pub fn with_wake_policy(
        capacity: usize,
        wake_policy: WakePolicy,
    ) -> Result<Self, WarehouseError> {
        if capacity == 0 {
            return Err(WarehouseError::Configuration(
                "queue capacity must be at least 1".to_string(),
            ));
        }

        Ok(Self {
            capacity,
            wake_policy,
            state: Mutex::new(QueueState {
                buffer: VecDeque::with_capacity(capacity),
                next_id: 1,
            }),
            not_full: Condvar::new(),
            not_empty: Condvar::new(),
        })
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn wake_policy(&self) -> WakePolicy {
        self.wake_policy
    }

    /// Accepts a new order, blocking while the queue is full.
    ///
    /// The id is assigned here, under the lock, so ids are strictly increasing in
    /// acceptance order. If `stop` fires before a slot is available the call
    /// returns [`WarehouseError::Cancelled`] and neither the buffer nor the id
    /// counter is touched.
    pub fn put(
        &self,
        category: impl Into<String>,
        quantity: NonZeroU32,
        stop: &StopSignal,
    ) -> Result<Order, WarehouseError> {
        let mut state = self.lock()?;

        loop {
            let has_room = state.buffer.len() < self.capacity;
            if stop.is_stopped() {
                if has_room {
                    self.pass_on(&self.not_full);
                }
                debug!(size = state.buffer.len(), "Put cancelled");
                return Err(WarehouseError::Cancelled);
            }
            if has_room {
                break;
            }
            debug!(capacity = self.capacity, "Queue full, producer waiting");
            state = self.wait(&self.not_full, state)?;
        }

        let order = Order::new(OrderId(state.next_id), category.into(), quantity);
        state.next_id += 1;
        state.buffer.push_back(order.clone());

        info!(
            order_id = %order.id(),
            category = order.category(),
            quantity = order.quantity(),
            size = state.buffer.len(),
            "Accepted"
        );

        self.signal(&self.not_empty);
        Ok(order)
    }

    /// Removes the oldest order, blocking while the queue is empty.
    ///
    /// If `stop` fires before an order is available the call returns
    /// [`WarehouseError::Cancelled`] and the buffer is left as it was.
    pub fn take(&self, stop: &StopSignal) -> Result<Order, WarehouseError> {
        let mut state = self.lock()?;

        let order = loop {
            if stop.is_stopped() {
                if !state.buffer.is_empty() {
                    self.pass_on(&self.not_empty);
                }
                debug!(size = state.buffer.len(), "Take cancelled");
                return Err(WarehouseError::Cancelled);
            }
            if let Some(order) = state.buffer.pop_front() {
                break order;
            }
            debug!("Queue empty, consumer waiting");
            state = self.wait(&self.not_empty, state)?;
        };

        info!(order_id = %order.id(), size = state.buffer.len(), "Dispatched");

        self.signal(&self.not_full);
        Ok(order)
    }

    /// Current number of buffered orders, read under the lock.
    ///
    /// A poisoned lock still yields the length: the buffer is only mutated after
    /// all fallible steps, so its length is always within bounds.
    pub fn size(&self) -> usize {
        match self.state.lock() {
            Ok(state) => state.buffer.len(),
            Err(poisoned) => poisoned.into_inner().buffer.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.size() == 0
    }

    /// Wakes every blocked producer and consumer so they re-check their stop
    /// signals immediately instead of at the next poll tick.
    pub fn interrupt_waiters(&self) {
        // Taking the lock orders this wake-up after any in-flight predicate check.
        let _guard = self.lock();
        self.not_full.notify_all();
        self.not_empty.notify_all();
    }

    fn lock(&self) -> Result<MutexGuard<'_, QueueState>, WarehouseError> {
        self.state.lock().map_err(|_| WarehouseError::Poisoned)
    }

    fn wait<'a>(
        &self,
        condvar: &Condvar,
        guard: MutexGuard<'a, QueueState>,
    ) -> Result<MutexGuard<'a, QueueState>, WarehouseError> {
        condvar
            .wait_timeout(guard, STOP_POLL_INTERVAL)
            .map(|(guard, _)| guard)
            .map_err(|_| WarehouseError::Poisoned)
    }

    fn signal(&self, condvar: &Condvar) {
        match self.wake_policy {
            WakePolicy::One => condvar.notify_one(),
            WakePolicy::All => condvar.notify_all(),
        }
    }

    /// A cancelled waiter may have consumed the single wake-up meant for the
    /// predicate it was waiting on; hand it to the next waiter.
    fn pass_on(&self, condvar: &Condvar) {
        if self.wake_policy == WakePolicy::One {
            condvar.notify_one();
        }
    }
}

impl std::fmt::Debug for BoundedOrderQueue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BoundedOrderQueue")
            .field("capacity", &self.capacity)
            .field("size", &self.size())
            .field("wake_policy", &self.wake_policy)
            .finish()
    }
}
