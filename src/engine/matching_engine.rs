// ============================================================================
// Matching Engine
// Multi-symbol orchestration: submission, cancellation, the matching sweep
// ============================================================================

use crate::domain::{EngineConfig, Order, OrderBook, OrderBookSnapshot, OrderId, Trade};
use crate::engine::OrderRegistry;
use crate::errors::{EngineError, EngineResult};
use crate::interfaces::{EngineEvent, EventPublisher, OrderPayload, TradeLog, TradePayload};
use parking_lot::RwLock;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

// ============================================================================
// Engine Statistics
// ============================================================================

#[derive(Default)]
struct Counters {
    orders_submitted: AtomicU64,
    orders_cancelled: AtomicU64,
    trades_executed: AtomicU64,
    sweeps_completed: AtomicU64,
}

/// Point-in-time engine statistics
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EngineStats {
    pub orders_submitted: u64,
    pub orders_cancelled: u64,
    pub trades_executed: u64,
    pub sweeps_completed: u64,
    pub active_symbols: usize,
    pub open_orders: usize,
}

// ============================================================================
// Matching Engine
// ============================================================================

/// The component callers interact with directly.
///
/// Owns the symbol -> book map and the order registry, publishes events via
/// the messaging collaborator, and records trades through the trade log.
/// Multiple caller threads may submit, cancel and query concurrently while
/// one dedicated worker drives [`run_matching_sweep`](Self::run_matching_sweep).
///
/// Locking discipline: the books map has a read-write lock (reads for
/// lookup, a write only on the rare book-creation path); each book has its
/// own internal lock, so matching symbol A never blocks submission on
/// symbol B; the registry has an independent lock so status reads are never
/// blocked by book mutation. Nested acquisition always runs books map ->
/// book -> registry, never the reverse.
pub struct MatchingEngine {
    config: EngineConfig,
    books: RwLock<HashMap<String, Arc<OrderBook>>>,
    registry: OrderRegistry,
    publisher: Arc<dyn EventPublisher>,
    trade_log: Arc<dyn TradeLog>,
    /// Arrival sequence source; also breaks maker-price ties
    sequence: AtomicU64,
    counters: Counters,
}

impl MatchingEngine {
    /// Create an engine, validating the configuration and eagerly creating
    /// books for any pre-configured symbols.
    pub fn new(
        config: EngineConfig,
        publisher: Arc<dyn EventPublisher>,
        trade_log: Arc<dyn TradeLog>,
    ) -> EngineResult<Self> {
        config.validate()?;

        let mut books = HashMap::new();
        for symbol in &config.symbols {
            books
                .entry(symbol.clone())
                .or_insert_with(|| Arc::new(OrderBook::new(Arc::new(symbol.clone()))));
        }

        Ok(Self {
            config,
            books: RwLock::new(books),
            registry: OrderRegistry::new(),
            publisher,
            trade_log,
            sequence: AtomicU64::new(0),
            counters: Counters::default(),
        })
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    // ========================================================================
    // Order Entry
    // ========================================================================

    /// Accept an order: validate, register, rest it in its book, publish
    /// `orders.created`.
    ///
    /// No matching happens here; the order rests until the next sweep.
    /// Failures are synchronous and never partially applied.
    pub fn submit_order(&self, order: Arc<Order>) -> EngineResult<()> {
        order.validate()?;

        let book = self.book_for(&order.symbol)?;

        order.set_sequence(self.sequence.fetch_add(1, Ordering::AcqRel));
        self.registry.insert(Arc::clone(&order))?;

        if let Err(err) = book.add(Arc::clone(&order)) {
            // Roll the registration back so the rejection leaves no trace
            self.registry.remove(order.id);
            return Err(err);
        }

        self.counters.orders_submitted.fetch_add(1, Ordering::Relaxed);
        tracing::debug!(order_id = %order.id, symbol = %order.symbol, "order accepted");
        self.publish(EngineEvent::OrderCreated(OrderPayload::from_order(&order)));
        Ok(())
    }

    /// Cancel a resting order and publish `orders.cancelled`.
    ///
    /// Returns `OrderNotFound` for unknown or already-terminal orders, and
    /// for a cancel that loses the race against the sweep consuming the
    /// order; callers must treat that as "already filled".
    pub fn cancel_order(&self, order_id: OrderId) -> EngineResult<()> {
        let order = self
            .registry
            .get(order_id)
            .ok_or(EngineError::OrderNotFound(order_id))?;

        if order.status().is_terminal() {
            return Err(EngineError::OrderNotFound(order_id));
        }

        let book = self
            .books
            .read()
            .get(order.symbol.as_str())
            .map(Arc::clone)
            .ok_or(EngineError::OrderNotFound(order_id))?;

        let cancelled = book.cancel(order_id)?;

        self.counters.orders_cancelled.fetch_add(1, Ordering::Relaxed);
        tracing::debug!(order_id = %order_id, symbol = %cancelled.symbol, "order cancelled");
        self.publish(EngineEvent::OrderCancelled(OrderPayload::from_order(
            &cancelled,
        )));
        Ok(())
    }

    // ========================================================================
    // Matching Sweep
    // ========================================================================

    /// Run one matching pass over every active book.
    ///
    /// For each trade, in order: append to the trade log, publish
    /// `trades.executed`, then `orders.updated` for both contributing
    /// orders. Collaborator failures are logged and never stall the sweep;
    /// one symbol's trouble never blocks matching for the others.
    pub fn run_matching_sweep(&self) -> Vec<Trade> {
        let books: Vec<Arc<OrderBook>> = self.books.read().values().map(Arc::clone).collect();
        let mut all_trades = Vec::new();

        for book in books {
            let trades = book.match_orders();
            if !trades.is_empty() {
                tracing::debug!(symbol = book.symbol(), count = trades.len(), "sweep matched");
            }

            for trade in trades {
                if let Err(err) = self.trade_log.record(&trade) {
                    tracing::error!(trade_id = %trade.id, error = %err, "trade log append failed");
                }
                self.counters.trades_executed.fetch_add(1, Ordering::Relaxed);

                self.publish(EngineEvent::TradeExecuted(TradePayload::from_trade(&trade)));
                for order_id in [trade.buy_order_id, trade.sell_order_id] {
                    if let Some(order) = self.registry.get(order_id) {
                        self.publish(EngineEvent::OrderUpdated(OrderPayload::from_order(&order)));
                    }
                }

                all_trades.push(trade);
            }
        }

        self.counters.sweeps_completed.fetch_add(1, Ordering::Relaxed);
        all_trades
    }

    // ========================================================================
    // Read-Only Accessors
    // ========================================================================

    pub fn get_order(&self, order_id: OrderId) -> Option<Arc<Order>> {
        self.registry.get(order_id)
    }

    /// Snapshot of a symbol's book, `None` when no book exists
    pub fn get_order_book(&self, symbol: &str, depth: usize) -> Option<OrderBookSnapshot> {
        self.books
            .read()
            .get(symbol)
            .map(|book| book.snapshot(depth))
    }

    pub fn get_stats(&self) -> EngineStats {
        EngineStats {
            orders_submitted: self.counters.orders_submitted.load(Ordering::Relaxed),
            orders_cancelled: self.counters.orders_cancelled.load(Ordering::Relaxed),
            trades_executed: self.counters.trades_executed.load(Ordering::Relaxed),
            sweeps_completed: self.counters.sweeps_completed.load(Ordering::Relaxed),
            active_symbols: self.books.read().len(),
            open_orders: self.registry.open_orders(),
        }
    }

    // ========================================================================
    // Private Methods
    // ========================================================================

    /// Look up the symbol's book, creating it lazily when policy allows
    fn book_for(&self, symbol: &Arc<String>) -> EngineResult<Arc<OrderBook>> {
        if let Some(book) = self.books.read().get(symbol.as_str()) {
            return Ok(Arc::clone(book));
        }

        if !self.config.auto_create_books {
            return Err(EngineError::UnknownSymbol((**symbol).clone()));
        }

        let mut books = self.books.write();
        let book = books
            .entry((**symbol).clone())
            .or_insert_with(|| Arc::new(OrderBook::new(Arc::clone(symbol))));
        Ok(Arc::clone(book))
    }

    /// Publish best-effort: a failure is logged and never rolls back state
    fn publish(&self, event: EngineEvent) {
        if let Err(err) = self.publisher.publish(event) {
            tracing::warn!(error = %err, "event publication failed");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{OrderStatus, Side};
    use crate::interfaces::{ChannelPublisher, InMemoryTradeLog, NoOpPublisher, NoOpTradeLog};
    use rust_decimal::Decimal;

    fn engine() -> MatchingEngine {
        MatchingEngine::new(
            EngineConfig::default(),
            Arc::new(NoOpPublisher),
            Arc::new(NoOpTradeLog),
        )
        .unwrap()
    }

    fn limit(side: Side, price: i64, quantity: i64) -> Arc<Order> {
        Arc::new(Order::limit(
            "user1",
            "AAPL",
            side,
            Decimal::from(price),
            Decimal::from(quantity),
        ))
    }

    #[test]
    fn test_submit_rests_until_sweep() {
        let engine = engine();
        let bid = limit(Side::Buy, 10, 100);
        let ask = limit(Side::Sell, 10, 100);

        engine.submit_order(Arc::clone(&bid)).unwrap();
        engine.submit_order(Arc::clone(&ask)).unwrap();

        // Nothing matches at submission time
        assert_eq!(bid.status(), OrderStatus::Open);
        assert_eq!(ask.status(), OrderStatus::Open);

        let trades = engine.run_matching_sweep();
        assert_eq!(trades.len(), 1);
        assert_eq!(bid.status(), OrderStatus::Filled);
        assert_eq!(ask.status(), OrderStatus::Filled);
    }

    #[test]
    fn test_submit_rejects_invalid() {
        let engine = engine();
        let bad = limit(Side::Buy, 0, 100);

        assert!(matches!(
            engine.submit_order(bad),
            Err(EngineError::InvalidOrder(_))
        ));
        assert_eq!(engine.get_stats().orders_submitted, 0);
        assert_eq!(engine.get_stats().open_orders, 0);
    }

    #[test]
    fn test_duplicate_submission_rejected() {
        let engine = engine();
        let order = limit(Side::Buy, 10, 100);

        engine.submit_order(Arc::clone(&order)).unwrap();
        assert!(matches!(
            engine.submit_order(order),
            Err(EngineError::InvalidOrder(_))
        ));
        assert_eq!(engine.get_stats().orders_submitted, 1);
    }

    #[test]
    fn test_unknown_symbol_policy() {
        let config = EngineConfig::new()
            .with_auto_create_books(false)
            .with_symbol("AAPL");
        let engine =
            MatchingEngine::new(config, Arc::new(NoOpPublisher), Arc::new(NoOpTradeLog)).unwrap();

        engine.submit_order(limit(Side::Buy, 10, 1)).unwrap();

        let other = Arc::new(Order::limit(
            "user1",
            "MSFT",
            Side::Buy,
            Decimal::from(10),
            Decimal::ONE,
        ));
        assert!(matches!(
            engine.submit_order(other),
            Err(EngineError::UnknownSymbol(_))
        ));
    }

    #[test]
    fn test_cancel_idempotence() {
        let engine = engine();
        let order = limit(Side::Buy, 10, 100);
        engine.submit_order(Arc::clone(&order)).unwrap();

        engine.cancel_order(order.id).unwrap();
        assert_eq!(order.status(), OrderStatus::Cancelled);

        // Cancelling again, or cancelling an unknown id, finds nothing and
        // mutates nothing
        assert!(matches!(
            engine.cancel_order(order.id),
            Err(EngineError::OrderNotFound(_))
        ));
        assert!(matches!(
            engine.cancel_order(OrderId::new()),
            Err(EngineError::OrderNotFound(_))
        ));
        assert_eq!(engine.get_stats().orders_cancelled, 1);
    }

    #[test]
    fn test_cancel_filled_order_rejected() {
        let engine = engine();
        let bid = limit(Side::Buy, 10, 100);
        let ask = limit(Side::Sell, 10, 100);
        engine.submit_order(Arc::clone(&bid)).unwrap();
        engine.submit_order(ask).unwrap();
        engine.run_matching_sweep();

        assert!(matches!(
            engine.cancel_order(bid.id),
            Err(EngineError::OrderNotFound(_))
        ));
        assert_eq!(bid.status(), OrderStatus::Filled);
    }

    #[test]
    fn test_cancelled_order_stays_queryable() {
        let engine = engine();
        let order = limit(Side::Buy, 10, 100);
        engine.submit_order(Arc::clone(&order)).unwrap();
        engine.cancel_order(order.id).unwrap();

        let found = engine.get_order(order.id).unwrap();
        assert_eq!(found.status(), OrderStatus::Cancelled);
        // But it no longer shows in the book
        let snapshot = engine.get_order_book("AAPL", 10).unwrap();
        assert!(snapshot.bids.is_empty());
    }

    #[test]
    fn test_sweep_records_and_publishes_in_order() {
        let (publisher, events) = ChannelPublisher::new();
        let trade_log = Arc::new(InMemoryTradeLog::new());
        let engine = MatchingEngine::new(
            EngineConfig::default(),
            Arc::new(publisher),
            Arc::clone(&trade_log) as Arc<dyn TradeLog>,
        )
        .unwrap();

        engine.submit_order(limit(Side::Buy, 10, 100)).unwrap();
        engine.submit_order(limit(Side::Sell, 10, 40)).unwrap();
        engine.run_matching_sweep();

        assert_eq!(trade_log.len(), 1);

        let topics: Vec<&'static str> = events.try_iter().map(|event| event.topic()).collect();
        assert_eq!(
            topics,
            vec![
                "orders.created",
                "orders.created",
                "trades.executed",
                "orders.updated",
                "orders.updated",
            ]
        );
    }

    #[test]
    fn test_sweep_covers_all_symbols() {
        let engine = engine();
        for symbol in ["AAPL", "MSFT"] {
            let bid = Arc::new(Order::limit(
                "b",
                symbol,
                Side::Buy,
                Decimal::from(10),
                Decimal::from(5),
            ));
            let ask = Arc::new(Order::limit(
                "s",
                symbol,
                Side::Sell,
                Decimal::from(10),
                Decimal::from(5),
            ));
            engine.submit_order(bid).unwrap();
            engine.submit_order(ask).unwrap();
        }

        let trades = engine.run_matching_sweep();
        assert_eq!(trades.len(), 2);

        let stats = engine.get_stats();
        assert_eq!(stats.active_symbols, 2);
        assert_eq!(stats.trades_executed, 2);
        assert_eq!(stats.sweeps_completed, 1);
        assert_eq!(stats.open_orders, 0);
    }

    #[test]
    fn test_stats_snapshot() {
        let engine = engine();
        engine.submit_order(limit(Side::Buy, 10, 100)).unwrap();
        engine.submit_order(limit(Side::Buy, 9, 50)).unwrap();

        let stats = engine.get_stats();
        assert_eq!(stats.orders_submitted, 2);
        assert_eq!(stats.open_orders, 2);
        assert_eq!(stats.active_symbols, 1);
        assert_eq!(stats.trades_executed, 0);
    }

    #[test]
    fn test_publish_failure_does_not_roll_back() {
        // A dropped receiver makes every publish fail
        let (publisher, receiver) = ChannelPublisher::new();
        drop(receiver);
        let engine = MatchingEngine::new(
            EngineConfig::default(),
            Arc::new(publisher),
            Arc::new(NoOpTradeLog),
        )
        .unwrap();

        let order = limit(Side::Buy, 10, 100);
        engine.submit_order(Arc::clone(&order)).unwrap();
        assert_eq!(engine.get_stats().orders_submitted, 1);
        assert!(engine.get_order(order.id).is_some());
    }
}
