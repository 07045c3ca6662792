// ============================================================================
// Matching Core Library
// Multi-symbol order matching with price-time priority and a sweep loop
// ============================================================================

//! # Matching Core
//!
//! The order matching core of a trading venue: per-symbol order books,
//! price-time priority matching, partial-fill bookkeeping, and typed
//! order/trade events.
//!
//! ## Design
//!
//! - **Deferred matching**: submission only rests the order in its book; a
//!   periodic sweep matches crossing orders, decoupling submission latency
//!   from matching cost.
//! - **Per-book locking**: each book serializes its own add/cancel/match, so
//!   matching one symbol never blocks submission on another.
//! - **Single ownership of order state**: the registry owns every order;
//!   books reference the same allocation, and fill/status updates are atomic
//!   fields readable without locks.
//! - **Typed events**: concrete payload structs per topic
//!   (`orders.created`, `orders.cancelled`, `orders.updated`,
//!   `trades.executed`) instead of dynamic maps.
//!
//! ## Example
//!
//! ```rust
//! use matching_core::prelude::*;
//! use rust_decimal::Decimal;
//! use std::sync::Arc;
//!
//! let engine = Arc::new(
//!     MatchingEngine::new(
//!         EngineConfig::default(),
//!         Arc::new(NoOpPublisher),
//!         Arc::new(NoOpTradeLog),
//!     )
//!     .unwrap(),
//! );
//!
//! let bid = Arc::new(Order::limit(
//!     "alice", "AAPL", Side::Buy, Decimal::from(10), Decimal::from(100),
//! ));
//! let ask = Arc::new(Order::limit(
//!     "bob", "AAPL", Side::Sell, Decimal::from(10), Decimal::from(100),
//! ));
//! engine.submit_order(bid).unwrap();
//! engine.submit_order(ask).unwrap();
//!
//! // Normally driven by `engine.start_sweeper()`
//! let trades = engine.run_matching_sweep();
//! assert_eq!(trades.len(), 1);
//! assert_eq!(trades[0].quantity, Decimal::from(100));
//! ```

pub mod domain;
pub mod engine;
pub mod errors;
pub mod interfaces;

// Re-exports for convenience
pub mod prelude {
    pub use crate::domain::{
        EngineConfig, Order, OrderBook, OrderBookSnapshot, OrderId, OrderStatus, OrderType,
        PriceLevelQueue, Side, StatusTransition, Trade, DEFAULT_SWEEP_INTERVAL,
    };
    pub use crate::engine::{EngineStats, MatchingEngine, OrderRegistry, SweepWorker};
    pub use crate::errors::{EngineError, EngineResult};
    pub use crate::interfaces::{
        ChannelPublisher, EngineEvent, EventPublisher, InMemoryTradeLog, LoggingPublisher,
        NoOpPublisher, NoOpTradeLog, OrderPayload, TradeLog, TradePayload,
    };
}
