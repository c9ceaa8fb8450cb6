//! Represents one unit of work held by the warehouse.
//!
//! Orders are only ever built by [`BoundedOrderQueue::put`](crate::warehouse::BoundedOrderQueue::put),
//! which assigns the id under the queue lock. The fields are private so an order
//! cannot change after it has been accepted.
use serde::{Deserialize, Serialize};
use std::fmt::Display;
use std::num::NonZeroU32;

/// Type-safe identifier for Orders. The first accepted order is `order_1`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct OrderId(pub u64);

impl From<u64> for OrderId {
    fn from(id: u64) -> Self {
        Self(id)
    }
}

impl Display for OrderId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "order_{}", self.0)
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct Order {
    id: OrderId,
    category: String,
    quantity: NonZeroU32,
}

impl Order {
    pub(crate) fn new(id: OrderId, category: String, quantity: NonZeroU32) -> Self {
        Self {
            id,
            category,
            quantity,
        }
    }

    pub fn id(&self) -> OrderId {
        self.id
    }

    pub fn category(&self) -> &str {
        &self.category
    }

    pub fn quantity(&self) -> u32 {
        self.quantity.get()
    }
}

impl Display for Order {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "Order{{id={}, type='{}', quantity={}}}",
            self.id.0, self.category, self.quantity
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_matches_trace_format() {
        let order = Order::new(OrderId(7), "Sandals".to_string(), NonZeroU32::new(3).unwrap());
        assert_eq!(order.to_string(), "Order{id=7, type='Sandals', quantity=3}");
        assert_eq!(order.id().to_string(), "order_7");
    }

    #[test]
    fn serializes_with_plain_fields() {
        let order = Order::new(OrderId(1), "Boots".to_string(), NonZeroU32::new(2).unwrap());
        let json = serde_json::to_value(&order).unwrap();
        assert_eq!(json["id"], 1);
        assert_eq!(json["category"], "Boots");
        assert_eq!(json["quantity"], 2);
    }
}
