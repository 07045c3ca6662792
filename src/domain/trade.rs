// ============================================================================
// Trade Domain Model
// ============================================================================

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use std::sync::Arc;
use uuid::Uuid;

use super::{Order, OrderId};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// A matched execution between one buy and one sell order.
///
/// Trades are created only by the matching step and never mutated or deleted
/// afterwards; the trade log treats them as append-only records.
#[derive(Debug, Clone)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Trade {
    /// Unique trade identifier
    pub id: Uuid,

    /// Traded symbol
    pub symbol: String,

    /// Order ID of the buy side
    pub buy_order_id: OrderId,

    /// Order ID of the sell side
    pub sell_order_id: OrderId,

    /// User owning the buy order
    pub buy_user_id: String,

    /// User owning the sell order
    pub sell_user_id: String,

    /// Execution price (the maker order's price)
    pub price: Decimal,

    /// Executed quantity
    pub quantity: Decimal,

    /// Trade timestamp
    pub timestamp: DateTime<Utc>,
}

impl Trade {
    /// Build a trade from the two matched orders.
    ///
    /// The caller has already decided the execution price; this only captures
    /// the identities of both sides.
    pub fn from_match(
        symbol: &Arc<String>,
        buy: &Order,
        sell: &Order,
        price: Decimal,
        quantity: Decimal,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            symbol: (**symbol).clone(),
            buy_order_id: buy.id,
            sell_order_id: sell.id,
            buy_user_id: (*buy.user_id).clone(),
            sell_user_id: (*sell.user_id).clone(),
            price,
            quantity,
            timestamp: Utc::now(),
        }
    }

    /// Notional value of the trade (price * quantity).
    ///
    /// Returns `None` on overflow.
    pub fn notional(&self) -> Option<Decimal> {
        self.price.checked_mul(self.quantity)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::Side;

    #[test]
    fn test_trade_from_match() {
        let symbol = Arc::new("AAPL".to_string());
        let buy = Order::limit("buyer", "AAPL", Side::Buy, Decimal::from(10), Decimal::from(100));
        let sell = Order::limit("seller", "AAPL", Side::Sell, Decimal::from(10), Decimal::from(100));

        let trade = Trade::from_match(&symbol, &buy, &sell, Decimal::from(10), Decimal::from(100));

        assert_eq!(trade.symbol, "AAPL");
        assert_eq!(trade.buy_order_id, buy.id);
        assert_eq!(trade.sell_order_id, sell.id);
        assert_eq!(trade.buy_user_id, "buyer");
        assert_eq!(trade.sell_user_id, "seller");
        assert_eq!(trade.notional(), Some(Decimal::from(1000)));
    }

    #[test]
    fn test_notional_with_fractional_price() {
        let symbol = Arc::new("AAPL".to_string());
        let buy = Order::limit("b", "AAPL", Side::Buy, Decimal::new(1005, 1), Decimal::from(2));
        let sell = Order::limit("s", "AAPL", Side::Sell, Decimal::new(1005, 1), Decimal::from(2));

        let trade =
            Trade::from_match(&symbol, &buy, &sell, Decimal::new(1005, 1), Decimal::from(2));

        // 100.5 * 2 = 201.0
        assert_eq!(trade.notional(), Some(Decimal::from(201)));
    }
}
