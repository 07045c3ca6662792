// ============================================================================
// Order Book Domain Model
// Per-symbol resting liquidity and the deferred matching algorithm
// ============================================================================

use parking_lot::Mutex;
use rust_decimal::Decimal;
use std::collections::{BTreeMap, HashMap, VecDeque};
use std::sync::Arc;

use crate::errors::{EngineError, EngineResult};

use super::{Order, OrderId, Side, Trade};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

// ============================================================================
// Price Level Queue
// ============================================================================

/// FIFO queue of resting orders sharing one price.
///
/// Preserves strict arrival order so price-time priority holds at the level.
/// The queue with `price == None` holds resting market orders, which carry no
/// price of their own. Pure data structure; emits no events.
#[derive(Debug, Default)]
pub struct PriceLevelQueue {
    price: Option<Decimal>,
    orders: VecDeque<Arc<Order>>,
}

impl PriceLevelQueue {
    pub fn new(price: Option<Decimal>) -> Self {
        Self {
            price,
            orders: VecDeque::new(),
        }
    }

    pub fn price(&self) -> Option<Decimal> {
        self.price
    }

    /// Append an order at the tail. The order's price must match the level.
    pub fn push(&mut self, order: Arc<Order>) {
        debug_assert_eq!(order.price, self.price, "order price must match its level");
        self.orders.push_back(order);
    }

    /// Earliest-arrived order still resting at this level
    pub fn peek_front(&self) -> Option<&Arc<Order>> {
        self.orders.front()
    }

    pub fn pop_front(&mut self) -> Option<Arc<Order>> {
        self.orders.pop_front()
    }

    /// Remove an order anywhere in the queue (cancellation path).
    ///
    /// O(n), acceptable because price levels are expected to be shallow.
    pub fn remove(&mut self, order_id: OrderId) -> Option<Arc<Order>> {
        let position = self.orders.iter().position(|order| order.id == order_id)?;
        self.orders.remove(position)
    }

    /// Total resting quantity: sum of remaining quantity over all members
    pub fn resting_quantity(&self) -> Decimal {
        self.orders.iter().map(|order| order.remaining()).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.orders.is_empty()
    }

    pub fn len(&self) -> usize {
        self.orders.len()
    }
}

// ============================================================================
// Book Side
// ============================================================================

/// One side of the book: sorted limit levels plus the market-order queue.
///
/// Market orders take priority over every limit level; among themselves they
/// are FIFO like any other level.
#[derive(Debug)]
struct BookSide {
    side: Side,
    market: PriceLevelQueue,
    levels: BTreeMap<Decimal, PriceLevelQueue>,
}

impl BookSide {
    fn new(side: Side) -> Self {
        Self {
            side,
            market: PriceLevelQueue::new(None),
            levels: BTreeMap::new(),
        }
    }

    /// Insert an order in price-time position; returns its level key
    /// (`None` for the market queue) for the cancellation index.
    fn insert(&mut self, order: Arc<Order>) -> Option<Decimal> {
        match order.price {
            None => {
                self.market.push(order);
                None
            },
            Some(price) => {
                self.levels
                    .entry(price)
                    .or_insert_with(|| PriceLevelQueue::new(Some(price)))
                    .push(order);
                Some(price)
            },
        }
    }

    /// Best level key in price priority: highest bid, lowest ask
    fn best_level_key(&self) -> Option<Decimal> {
        match self.side {
            Side::Buy => self.levels.keys().next_back().copied(),
            Side::Sell => self.levels.keys().next().copied(),
        }
    }

    /// Front order of the side: market queue first, then the best limit level
    fn front(&self) -> Option<Arc<Order>> {
        if let Some(order) = self.market.peek_front() {
            return Some(Arc::clone(order));
        }
        let key = self.best_level_key()?;
        self.levels.get(&key)?.peek_front().map(Arc::clone)
    }

    /// Pop the front order, pruning its level if it became empty
    fn pop_front(&mut self) -> Option<Arc<Order>> {
        if let Some(order) = self.market.pop_front() {
            return Some(order);
        }
        let key = self.best_level_key()?;
        let level = self.levels.get_mut(&key)?;
        let order = level.pop_front();
        if level.is_empty() {
            self.levels.remove(&key);
        }
        order
    }

    /// Remove an order by id from the level recorded in the index
    fn remove(&mut self, order_id: OrderId, location: Option<Decimal>) -> Option<Arc<Order>> {
        match location {
            None => self.market.remove(order_id),
            Some(price) => {
                let level = self.levels.get_mut(&price)?;
                let order = level.remove(order_id);
                if level.is_empty() {
                    self.levels.remove(&price);
                }
                order
            },
        }
    }

    /// Best limit price on this side (market orders carry none)
    fn best_price(&self) -> Option<Decimal> {
        self.best_level_key()
    }

    /// Aggregated (price, resting quantity) for the top `num_levels` levels
    fn depth(&self, num_levels: usize) -> Vec<(Decimal, Decimal)> {
        let iter: Box<dyn Iterator<Item = &PriceLevelQueue>> = match self.side {
            Side::Buy => Box::new(self.levels.values().rev()),
            Side::Sell => Box::new(self.levels.values()),
        };

        iter.take(num_levels)
            .filter_map(|level| level.price().map(|price| (price, level.resting_quantity())))
            .collect()
    }

    fn order_count(&self) -> usize {
        self.market.len() + self.levels.values().map(PriceLevelQueue::len).sum::<usize>()
    }
}

// ============================================================================
// Order Book
// ============================================================================

/// Resting liquidity for one symbol.
///
/// All interior state sits behind one per-book mutex: `add` and `cancel`
/// take it briefly, `match_orders` holds it for the whole pass so that a
/// concurrent submit or cancel can never observe a half-matched book. A
/// cancel racing the sweep loses cleanly: whichever takes the lock first
/// wins, and the loser sees the order as absent.
pub struct OrderBook {
    symbol: Arc<String>,
    inner: Mutex<BookInner>,
}

struct BookInner {
    bids: BookSide,
    asks: BookSide,
    /// Order ID -> (side, level key) for O(log n) cancellation routing
    index: HashMap<OrderId, (Side, Option<Decimal>)>,
}

impl BookInner {
    fn side_mut(&mut self, side: Side) -> &mut BookSide {
        match side {
            Side::Buy => &mut self.bids,
            Side::Sell => &mut self.asks,
        }
    }

    /// Pop a fully-filled front order and drop it from the index
    fn pop_filled(&mut self, side: Side, order_id: OrderId) {
        if let Some(order) = self.side_mut(side).pop_front() {
            debug_assert_eq!(order.id, order_id, "only the front order can fill");
            self.index.remove(&order.id);
        }
    }
}

impl OrderBook {
    pub fn new(symbol: Arc<String>) -> Self {
        Self {
            symbol,
            inner: Mutex::new(BookInner {
                bids: BookSide::new(Side::Buy),
                asks: BookSide::new(Side::Sell),
                index: HashMap::new(),
            }),
        }
    }

    pub fn symbol(&self) -> &str {
        &self.symbol
    }

    /// Insert a newly-submitted order into its side in price-time order.
    ///
    /// No matching is attempted here; matching is deferred to the sweep so
    /// that submission latency stays decoupled from matching cost.
    pub fn add(&self, order: Arc<Order>) -> EngineResult<()> {
        if *order.symbol != *self.symbol {
            return Err(EngineError::InvalidOrder(format!(
                "symbol mismatch: order is for {}, book is {}",
                order.symbol, self.symbol
            )));
        }
        order.validate()?;

        let mut inner = self.inner.lock();
        if inner.index.contains_key(&order.id) {
            return Err(EngineError::InvalidOrder(format!(
                "duplicate order id {}",
                order.id
            )));
        }

        let side = order.side;
        let location = inner.side_mut(side).insert(Arc::clone(&order));
        inner.index.insert(order.id, (side, location));
        Ok(())
    }

    /// Remove a resting order and transition it to cancelled.
    ///
    /// Removal and the status change happen under the same lock hold, so the
    /// book never references a terminal order. Returns `OrderNotFound` when
    /// the order is not resting here (already filled, cancelled or unknown).
    pub fn cancel(&self, order_id: OrderId) -> EngineResult<Arc<Order>> {
        let mut inner = self.inner.lock();
        let (side, location) = inner
            .index
            .remove(&order_id)
            .ok_or(EngineError::OrderNotFound(order_id))?;
        let order = inner
            .side_mut(side)
            .remove(order_id, location)
            .ok_or(EngineError::OrderNotFound(order_id))?;

        let cancelled = order.try_cancel();
        debug_assert!(cancelled, "resting orders are always cancellable");
        Ok(order)
    }

    /// Match crossing orders until the book is uncrossed.
    ///
    /// Price-time priority: best price first, FIFO within a level, with
    /// resting market orders ahead of all limit levels on their side.
    ///
    /// Execution price convention (fixed and applied consistently): the
    /// maker is the order with the lower arrival sequence, and the trade
    /// executes at the maker's price. When one side of the pair is a market
    /// order the limit order's price is used; two market orders never match
    /// because no price can be discovered for them.
    ///
    /// Returns the trades in generation order; the engine publishes events
    /// in exactly this order.
    pub fn match_orders(&self) -> Vec<Trade> {
        let mut inner = self.inner.lock();
        let mut trades = Vec::new();

        loop {
            let (bid, ask) = match (inner.bids.front(), inner.asks.front()) {
                (Some(bid), Some(ask)) => (bid, ask),
                _ => break,
            };

            let price = match (bid.price, ask.price) {
                (Some(bid_price), Some(ask_price)) => {
                    if bid_price < ask_price {
                        break; // Book is not crossed
                    }
                    if bid.sequence() <= ask.sequence() {
                        bid_price
                    } else {
                        ask_price
                    }
                },
                (Some(bid_price), None) => bid_price,
                (None, Some(ask_price)) => ask_price,
                // Two market orders: no price discovery possible
                (None, None) => break,
            };

            let quantity = bid.remaining().min(ask.remaining());

            if bid.try_fill(quantity) && ask.try_fill(quantity) {
                trades.push(Trade::from_match(&self.symbol, &bid, &ask, price, quantity));
            } else {
                // Unreachable while the book invariant holds: members always
                // have positive remaining quantity under this lock
                tracing::error!(symbol = %self.symbol, "fill rejected mid-match, aborting pass");
                break;
            }

            if bid.remaining() == Decimal::ZERO {
                inner.pop_filled(Side::Buy, bid.id);
            }
            if ask.remaining() == Decimal::ZERO {
                inner.pop_filled(Side::Sell, ask.id);
            }
        }

        trades
    }

    // ========================================================================
    // Read-Only Accessors
    // ========================================================================

    pub fn best_bid(&self) -> Option<Decimal> {
        self.inner.lock().bids.best_price()
    }

    pub fn best_ask(&self) -> Option<Decimal> {
        self.inner.lock().asks.best_price()
    }

    /// True while a resting limit bid meets or exceeds a resting limit ask
    pub fn is_crossed(&self) -> bool {
        let inner = self.inner.lock();
        match (inner.bids.best_price(), inner.asks.best_price()) {
            (Some(bid), Some(ask)) => bid >= ask,
            _ => false,
        }
    }

    /// Number of orders currently resting in the book
    pub fn order_count(&self) -> usize {
        let inner = self.inner.lock();
        inner.bids.order_count() + inner.asks.order_count()
    }

    pub fn contains(&self, order_id: OrderId) -> bool {
        self.inner.lock().index.contains_key(&order_id)
    }

    /// Immutable snapshot of the top `depth` levels per side
    pub fn snapshot(&self, depth: usize) -> OrderBookSnapshot {
        let inner = self.inner.lock();
        OrderBookSnapshot::with_depth(
            (*self.symbol).clone(),
            inner.bids.depth(depth),
            inner.asks.depth(depth),
        )
    }
}

// ============================================================================
// Order Book Snapshot
// ============================================================================

/// Point-in-time view of the book's aggregated depth
#[derive(Debug, Clone)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct OrderBookSnapshot {
    pub symbol: String,
    /// Bid levels (price, resting quantity), best first
    pub bids: Vec<(Decimal, Decimal)>,
    /// Ask levels (price, resting quantity), best first
    pub asks: Vec<(Decimal, Decimal)>,
    /// Best ask minus best bid
    pub spread: Option<Decimal>,
    pub mid_price: Option<Decimal>,
}

impl OrderBookSnapshot {
    pub fn with_depth(
        symbol: String,
        bids: Vec<(Decimal, Decimal)>,
        asks: Vec<(Decimal, Decimal)>,
    ) -> Self {
        let (spread, mid_price) = match (bids.first(), asks.first()) {
            (Some((bid, _)), Some((ask, _))) => {
                (Some(ask - bid), Some((bid + ask) / Decimal::from(2)))
            },
            _ => (None, None),
        };

        Self {
            symbol,
            bids,
            asks,
            spread,
            mid_price,
        }
    }

    pub fn best_bid(&self) -> Option<Decimal> {
        self.bids.first().map(|(price, _)| *price)
    }

    pub fn best_ask(&self) -> Option<Decimal> {
        self.asks.first().map(|(price, _)| *price)
    }
}
