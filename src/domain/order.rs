// ============================================================================
// Order Domain Model
// ============================================================================

use crate::errors::{EngineError, EngineResult};
use chrono::{DateTime, Utc};
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use std::fmt;
use std::sync::atomic::{AtomicI64, AtomicU64, AtomicU8, Ordering};
use std::sync::Arc;
use uuid::Uuid;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

// ============================================================================
// Value Objects
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct OrderId(Uuid);

impl OrderId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    pub fn from_uuid(uuid: Uuid) -> Self {
        Self(uuid)
    }

    pub fn as_uuid(&self) -> &Uuid {
        &self.0
    }
}

impl Default for OrderId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for OrderId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum Side {
    Buy,
    Sell,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum OrderType {
    /// Rests at its limit price until matched or cancelled
    Limit,
    /// No price of its own; executes against resting limit liquidity
    Market,
}

// ============================================================================
// Order Status State Machine
// ============================================================================

pub mod status {
    #[cfg(feature = "serde")]
    use serde::{Deserialize, Serialize};

    /// Lifecycle of an accepted order.
    ///
    /// `Filled` and `Cancelled` are terminal: no transition leaves them, and
    /// orders in either state are absent from the book but remain queryable
    /// via the registry.
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    #[repr(u8)]
    #[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
    pub enum OrderStatus {
        Open = 0,
        PartiallyFilled = 1,
        Filled = 2,
        Cancelled = 3,
    }

    impl OrderStatus {
        pub fn from_u8(val: u8) -> Self {
            match val {
                0 => OrderStatus::Open,
                1 => OrderStatus::PartiallyFilled,
                2 => OrderStatus::Filled,
                _ => OrderStatus::Cancelled,
            }
        }

        pub fn is_terminal(&self) -> bool {
            matches!(self, OrderStatus::Filled | OrderStatus::Cancelled)
        }

        pub fn can_be_cancelled(&self) -> bool {
            matches!(self, OrderStatus::Open | OrderStatus::PartiallyFilled)
        }
    }

    /// Valid transitions for the order status machine
    #[derive(Debug, Clone, Copy)]
    pub enum StatusTransition {
        PartialFill,
        Fill,
        Cancel,
    }

    impl OrderStatus {
        pub fn transition(&self, transition: StatusTransition) -> Result<OrderStatus, String> {
            match (self, transition) {
                (OrderStatus::Open, StatusTransition::PartialFill) => {
                    Ok(OrderStatus::PartiallyFilled)
                },
                (OrderStatus::Open, StatusTransition::Fill) => Ok(OrderStatus::Filled),
                (OrderStatus::Open, StatusTransition::Cancel) => Ok(OrderStatus::Cancelled),

                (OrderStatus::PartiallyFilled, StatusTransition::PartialFill) => {
                    Ok(OrderStatus::PartiallyFilled)
                },
                (OrderStatus::PartiallyFilled, StatusTransition::Fill) => Ok(OrderStatus::Filled),
                (OrderStatus::PartiallyFilled, StatusTransition::Cancel) => {
                    Ok(OrderStatus::Cancelled)
                },

                _ => Err(format!(
                    "invalid transition from {:?} via {:?}",
                    self, transition
                )),
            }
        }
    }
}

use status::{OrderStatus, StatusTransition};

// ============================================================================
// Fixed-Point Quantity Representation
// ============================================================================

/// Decimal places carried by the atomic quantity mirror (one nano-unit)
const QUANTITY_DECIMALS: u32 = 9;

/// Scale factor for the atomic i64 representation (10^9)
const QUANTITY_SCALE: i64 = 1_000_000_000;

/// Convert a decimal quantity to its exact i64 nano representation.
///
/// Returns `None` when the value carries more than nine decimal places or
/// does not fit in an i64; such values are rejected at validation so that
/// fill arithmetic stays exact.
pub(crate) fn to_nanos(value: Decimal) -> Option<i64> {
    let scaled = value.checked_mul(Decimal::from(QUANTITY_SCALE))?;
    if !scaled.is_integer() {
        return None;
    }
    scaled.to_i64()
}

pub(crate) fn from_nanos(nanos: i64) -> Decimal {
    Decimal::new(nanos, QUANTITY_DECIMALS)
}

// ============================================================================
// Order Entity
// ============================================================================

/// An order with atomic mutable state for concurrent access.
///
/// Immutable identity fields are set at construction. The mutable fields
/// (filled quantity, status, sequence, update time) are atomics, so status
/// reads never take a lock while the sweep holds a book lock. The registry
/// owns the single `Arc<Order>` allocation; books hold references to the
/// same allocation, never copies of the mutable fields.
#[derive(Debug)]
pub struct Order {
    pub id: OrderId,
    pub user_id: Arc<String>,
    pub symbol: Arc<String>,
    pub side: Side,
    pub order_type: OrderType,
    /// Limit price; `None` for market orders
    pub price: Option<Decimal>,
    /// Original quantity, never mutated
    pub quantity: Decimal,
    pub created_at: DateTime<Utc>,

    /// `quantity` mirrored as i64 nanos; 0 when unrepresentable, which
    /// validation rejects before the order can reach a book
    quantity_nanos: i64,
    filled_nanos: AtomicI64,
    status: AtomicU8,
    /// Engine-wide arrival sequence assigned at submission; drives time
    /// priority and the maker-price convention
    sequence: AtomicU64,
    updated_at_micros: AtomicI64,
}

impl Order {
    pub fn new(
        user_id: String,
        symbol: String,
        side: Side,
        order_type: OrderType,
        price: Option<Decimal>,
        quantity: Decimal,
    ) -> Self {
        let now = Utc::now();
        Self {
            id: OrderId::new(),
            user_id: Arc::new(user_id),
            symbol: Arc::new(symbol),
            side,
            order_type,
            price,
            quantity,
            created_at: now,
            quantity_nanos: to_nanos(quantity).unwrap_or(0),
            filled_nanos: AtomicI64::new(0),
            status: AtomicU8::new(OrderStatus::Open as u8),
            sequence: AtomicU64::new(0),
            updated_at_micros: AtomicI64::new(now.timestamp_micros()),
        }
    }

    /// Convenience constructor for a limit order
    pub fn limit(
        user_id: impl Into<String>,
        symbol: impl Into<String>,
        side: Side,
        price: Decimal,
        quantity: Decimal,
    ) -> Self {
        Self::new(
            user_id.into(),
            symbol.into(),
            side,
            OrderType::Limit,
            Some(price),
            quantity,
        )
    }

    /// Convenience constructor for a market order
    pub fn market(
        user_id: impl Into<String>,
        symbol: impl Into<String>,
        side: Side,
        quantity: Decimal,
    ) -> Self {
        Self::new(
            user_id.into(),
            symbol.into(),
            side,
            OrderType::Market,
            None,
            quantity,
        )
    }

    /// Check the submission preconditions.
    ///
    /// Quantity must be positive and representable at nine decimal places;
    /// limit orders must carry a positive, representable price. A market
    /// order's price field is ignored entirely.
    pub fn validate(&self) -> EngineResult<()> {
        if self.quantity <= Decimal::ZERO {
            return Err(EngineError::InvalidOrder(
                "quantity must be positive".to_string(),
            ));
        }

        if self.quantity_nanos <= 0 {
            return Err(EngineError::InvalidOrder(
                "quantity exceeds supported precision or range".to_string(),
            ));
        }

        if self.is_limit_order() {
            let price = self.price.ok_or_else(|| {
                EngineError::InvalidOrder("limit orders must have a price".to_string())
            })?;
            if price <= Decimal::ZERO {
                return Err(EngineError::InvalidOrder(
                    "limit price must be positive".to_string(),
                ));
            }
            if to_nanos(price).is_none() {
                return Err(EngineError::InvalidOrder(
                    "limit price exceeds supported precision or range".to_string(),
                ));
            }
        }

        Ok(())
    }

    // ========================================================================
    // Atomic Getters
    // ========================================================================

    /// Cumulative executed quantity
    pub fn filled(&self) -> Decimal {
        from_nanos(self.filled_nanos.load(Ordering::Acquire))
    }

    /// Quantity still available for matching
    pub fn remaining(&self) -> Decimal {
        from_nanos(self.quantity_nanos - self.filled_nanos.load(Ordering::Acquire))
    }

    pub fn status(&self) -> OrderStatus {
        OrderStatus::from_u8(self.status.load(Ordering::Acquire))
    }

    pub fn sequence(&self) -> u64 {
        self.sequence.load(Ordering::Acquire)
    }

    pub fn updated_at(&self) -> DateTime<Utc> {
        DateTime::from_timestamp_micros(self.updated_at_micros.load(Ordering::Acquire))
            .unwrap_or(self.created_at)
    }

    // ========================================================================
    // Atomic Operations
    // ========================================================================

    /// Atomically execute `quantity` against this order.
    ///
    /// Returns false when the order is already terminal, when the fill
    /// would exceed the remaining quantity, or when the quantity is not
    /// positive and representable. On success the status advances to
    /// `PartiallyFilled` or `Filled`.
    pub fn try_fill(&self, quantity: Decimal) -> bool {
        let fill_nanos = match to_nanos(quantity) {
            Some(nanos) if nanos > 0 => nanos,
            _ => return false,
        };

        if self.status().is_terminal() {
            return false;
        }

        loop {
            let current_filled = self.filled_nanos.load(Ordering::Acquire);
            let new_filled = current_filled + fill_nanos;

            if new_filled > self.quantity_nanos {
                return false; // Would overfill
            }

            if self
                .filled_nanos
                .compare_exchange(
                    current_filled,
                    new_filled,
                    Ordering::AcqRel,
                    Ordering::Acquire,
                )
                .is_ok()
            {
                let new_status = if new_filled == self.quantity_nanos {
                    OrderStatus::Filled
                } else {
                    OrderStatus::PartiallyFilled
                };
                self.status.store(new_status as u8, Ordering::Release);
                self.touch();
                return true;
            }
            // CAS failed, retry
        }
    }

    /// Atomically cancel this order.
    ///
    /// Returns false when the order is already terminal, so a cancel that
    /// loses the race against a concurrent fill is rejected here.
    pub fn try_cancel(&self) -> bool {
        loop {
            let current = self.status.load(Ordering::Acquire);
            let target = match OrderStatus::from_u8(current).transition(StatusTransition::Cancel) {
                Ok(status) => status,
                Err(_) => return false,
            };

            if self
                .status
                .compare_exchange(current, target as u8, Ordering::AcqRel, Ordering::Acquire)
                .is_ok()
            {
                self.touch();
                return true;
            }
        }
    }

    /// Set the arrival sequence (called once by the engine at submission)
    pub fn set_sequence(&self, seq: u64) {
        self.sequence.store(seq, Ordering::Release);
    }

    fn touch(&self) {
        self.updated_at_micros
            .store(Utc::now().timestamp_micros(), Ordering::Release);
    }

    // ========================================================================
    // Helper Methods
    // ========================================================================

    pub fn is_market_order(&self) -> bool {
        matches!(self.order_type, OrderType::Market)
    }

    pub fn is_limit_order(&self) -> bool {
        matches!(self.order_type, OrderType::Limit)
    }
}

impl Clone for Order {
    fn clone(&self) -> Self {
        Self {
            id: self.id,
            user_id: Arc::clone(&self.user_id),
            symbol: Arc::clone(&self.symbol),
            side: self.side,
            order_type: self.order_type,
            price: self.price,
            quantity: self.quantity,
            created_at: self.created_at,
            quantity_nanos: self.quantity_nanos,
            filled_nanos: AtomicI64::new(self.filled_nanos.load(Ordering::Acquire)),
            status: AtomicU8::new(self.status.load(Ordering::Acquire)),
            sequence: AtomicU64::new(self.sequence.load(Ordering::Acquire)),
            updated_at_micros: AtomicI64::new(self.updated_at_micros.load(Ordering::Acquire)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn limit_buy(quantity: i64) -> Order {
        Order::limit(
            "user1",
            "AAPL",
            Side::Buy,
            Decimal::from(10),
            Decimal::from(quantity),
        )
    }

    #[test]
    fn test_order_creation() {
        let order = limit_buy(100);

        assert_eq!(order.remaining(), Decimal::from(100));
        assert_eq!(order.filled(), Decimal::ZERO);
        assert_eq!(order.status(), OrderStatus::Open);
        assert!(order.validate().is_ok());
    }

    #[test]
    fn test_atomic_fill() {
        let order = limit_buy(10);

        assert!(order.try_fill(Decimal::from(3)));
        assert_eq!(order.filled(), Decimal::from(3));
        assert_eq!(order.remaining(), Decimal::from(7));
        assert_eq!(order.status(), OrderStatus::PartiallyFilled);

        assert!(order.try_fill(Decimal::from(7)));
        assert_eq!(order.status(), OrderStatus::Filled);
    }

    #[test]
    fn test_overfill_protection() {
        let order = limit_buy(5);

        assert!(!order.try_fill(Decimal::from(10)));
        assert_eq!(order.filled(), Decimal::ZERO);
        assert_eq!(order.status(), OrderStatus::Open);
    }

    #[test]
    fn test_cancel() {
        let order = limit_buy(1);

        assert!(order.try_cancel());
        assert_eq!(order.status(), OrderStatus::Cancelled);

        // Terminal states stay terminal
        assert!(!order.try_cancel());
        assert!(!order.try_fill(Decimal::ONE));
    }

    #[test]
    fn test_cancel_after_partial_fill() {
        let order = limit_buy(10);
        assert!(order.try_fill(Decimal::from(4)));
        assert!(order.try_cancel());
        assert_eq!(order.status(), OrderStatus::Cancelled);
        assert_eq!(order.filled(), Decimal::from(4));
    }

    #[test]
    fn test_validation_rejects_bad_orders() {
        let zero_qty = Order::limit("u", "AAPL", Side::Buy, Decimal::from(10), Decimal::ZERO);
        assert!(zero_qty.validate().is_err());

        let no_price = Order::new(
            "u".to_string(),
            "AAPL".to_string(),
            Side::Buy,
            OrderType::Limit,
            None,
            Decimal::from(1),
        );
        assert!(no_price.validate().is_err());

        let negative_price =
            Order::limit("u", "AAPL", Side::Sell, Decimal::from(-5), Decimal::from(1));
        assert!(negative_price.validate().is_err());

        // Ten decimal places cannot be represented exactly at scale nine
        let too_precise = Order::limit(
            "u",
            "AAPL",
            Side::Buy,
            Decimal::from(10),
            Decimal::new(1, 10),
        );
        assert!(too_precise.validate().is_err());
    }

    #[test]
    fn test_market_order_ignores_price() {
        let order = Order::market("u", "AAPL", Side::Buy, Decimal::from(5));
        assert!(order.validate().is_ok());
        assert!(order.price.is_none());
        assert!(order.is_market_order());
    }

    #[test]
    fn test_fractional_quantities_are_exact() {
        let order = Order::limit(
            "u",
            "AAPL",
            Side::Buy,
            Decimal::from(10),
            Decimal::new(15, 1), // 1.5
        );
        assert!(order.try_fill(Decimal::new(5, 1))); // 0.5
        assert_eq!(order.remaining(), Decimal::ONE);
        assert_eq!(order.filled(), Decimal::new(5, 1));
    }

    #[test]
    fn test_status_transitions() {
        use status::*;

        assert_eq!(
            OrderStatus::Open.transition(StatusTransition::PartialFill),
            Ok(OrderStatus::PartiallyFilled)
        );
        assert_eq!(
            OrderStatus::PartiallyFilled.transition(StatusTransition::Fill),
            Ok(OrderStatus::Filled)
        );
        assert!(OrderStatus::Filled
            .transition(StatusTransition::Cancel)
            .is_err());
        assert!(OrderStatus::Cancelled
            .transition(StatusTransition::Fill)
            .is_err());
    }
}
