// ============================================================================
// Trade Log Interface
// Append-only durability seam for executed trades
// ============================================================================

use crate::domain::Trade;
use crate::errors::EngineResult;
use parking_lot::Mutex;

/// Append-only trade persistence seam.
///
/// Called once per generated trade, before event publication. A failure is
/// fatal for that record from the engine's point of view: it is logged and
/// the sweep moves on; retry with backoff belongs to the collaborator behind
/// this trait, not to the engine.
pub trait TradeLog: Send + Sync {
    fn record(&self, trade: &Trade) -> EngineResult<()>;
}

/// Discards all trades; for tests and benchmarks
pub struct NoOpTradeLog;

impl TradeLog for NoOpTradeLog {
    fn record(&self, _trade: &Trade) -> EngineResult<()> {
        Ok(())
    }
}

/// Keeps trades in memory; for tests and demos
#[derive(Default)]
pub struct InMemoryTradeLog {
    trades: Mutex<Vec<Trade>>,
}

impl InMemoryTradeLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.trades.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.trades.lock().is_empty()
    }

    /// Copy of everything recorded so far, in append order
    pub fn snapshot(&self) -> Vec<Trade> {
        self.trades.lock().clone()
    }
}

impl TradeLog for InMemoryTradeLog {
    fn record(&self, trade: &Trade) -> EngineResult<()> {
        self.trades.lock().push(trade.clone());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{Order, Side};
    use rust_decimal::Decimal;
    use std::sync::Arc;

    #[test]
    fn test_in_memory_log_appends() {
        let log = InMemoryTradeLog::new();
        let symbol = Arc::new("AAPL".to_string());
        let buy = Order::limit("b", "AAPL", Side::Buy, Decimal::from(10), Decimal::ONE);
        let sell = Order::limit("s", "AAPL", Side::Sell, Decimal::from(10), Decimal::ONE);
        let trade = Trade::from_match(&symbol, &buy, &sell, Decimal::from(10), Decimal::ONE);

        assert!(log.is_empty());
        log.record(&trade).unwrap();
        log.record(&trade).unwrap();

        assert_eq!(log.len(), 2);
        assert_eq!(log.snapshot()[0].id, trade.id);
    }
}
