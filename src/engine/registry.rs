// ============================================================================
// Order Registry
// Engine-wide order ownership, independent of book structure
// ============================================================================

use crate::domain::{Order, OrderId};
use crate::errors::{EngineError, EngineResult};
use parking_lot::RwLock;
use std::collections::HashMap;
use std::sync::Arc;

/// Engine-wide map from order ID to order state.
///
/// The registry owns every accepted order for its whole lifetime: terminal
/// orders leave their book but stay here for historical status queries.
/// Guarded by its own lock, independent of the books lock, so `get` is never
/// blocked by book mutation; the order's mutable fields are atomics on the
/// shared `Arc<Order>`, so readers take only this map's read lock.
#[derive(Default)]
pub struct OrderRegistry {
    orders: RwLock<HashMap<OrderId, Arc<Order>>>,
}

impl OrderRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a newly-accepted order. Duplicate IDs are rejected.
    pub fn insert(&self, order: Arc<Order>) -> EngineResult<()> {
        let mut orders = self.orders.write();
        if orders.contains_key(&order.id) {
            return Err(EngineError::InvalidOrder(format!(
                "duplicate order id {}",
                order.id
            )));
        }
        orders.insert(order.id, order);
        Ok(())
    }

    pub fn get(&self, order_id: OrderId) -> Option<Arc<Order>> {
        self.orders.read().get(&order_id).map(Arc::clone)
    }

    /// Undo a registration whose book insertion failed. Accepted orders are
    /// never removed; history is kept for terminal orders.
    pub(crate) fn remove(&self, order_id: OrderId) -> Option<Arc<Order>> {
        self.orders.write().remove(&order_id)
    }

    pub fn len(&self) -> usize {
        self.orders.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.orders.read().is_empty()
    }

    /// Orders not yet in a terminal state
    pub fn open_orders(&self) -> usize {
        self.orders
            .read()
            .values()
            .filter(|order| !order.status().is_terminal())
            .count()
    }
}
