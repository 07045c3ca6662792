// ============================================================================
// Event Publisher Interface
// Typed engine events and the outbound messaging contract
// ============================================================================

use crate::domain::{Order, OrderId, OrderStatus, OrderType, Side, Trade};
use crate::errors::{EngineError, EngineResult};
use chrono::{DateTime, Utc};
use crossbeam::channel::{unbounded, Receiver, Sender};
use rust_decimal::Decimal;
use uuid::Uuid;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

// ============================================================================
// Event Payloads
// ============================================================================

/// Wire payload for the order topics.
///
/// A concrete struct rather than a dynamic map, so the wire contract is
/// checked at compile time.
#[derive(Debug, Clone)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct OrderPayload {
    pub order_id: OrderId,
    pub user_id: String,
    pub symbol: String,
    pub side: Side,
    pub order_type: OrderType,
    pub quantity: Decimal,
    /// Absent for market orders
    pub price: Option<Decimal>,
    pub status: OrderStatus,
    pub filled_quantity: Decimal,
}

impl OrderPayload {
    /// Capture the order's current state for publication
    pub fn from_order(order: &Order) -> Self {
        Self {
            order_id: order.id,
            user_id: (*order.user_id).clone(),
            symbol: (*order.symbol).clone(),
            side: order.side,
            order_type: order.order_type,
            quantity: order.quantity,
            price: order.price,
            status: order.status(),
            filled_quantity: order.filled(),
        }
    }
}

/// Wire payload for the trade topic
#[derive(Debug, Clone)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct TradePayload {
    pub trade_id: Uuid,
    pub symbol: String,
    pub buy_order_id: OrderId,
    pub sell_order_id: OrderId,
    pub price: Decimal,
    pub quantity: Decimal,
    pub timestamp: DateTime<Utc>,
}

impl TradePayload {
    pub fn from_trade(trade: &Trade) -> Self {
        Self {
            trade_id: trade.id,
            symbol: trade.symbol.clone(),
            buy_order_id: trade.buy_order_id,
            sell_order_id: trade.sell_order_id,
            price: trade.price,
            quantity: trade.quantity,
            timestamp: trade.timestamp,
        }
    }
}

// ============================================================================
// Engine Events
// ============================================================================

/// Events the engine publishes to the outbound messaging collaborator
#[derive(Debug, Clone)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum EngineEvent {
    OrderCreated(OrderPayload),
    OrderCancelled(OrderPayload),
    OrderUpdated(OrderPayload),
    TradeExecuted(TradePayload),
}

impl EngineEvent {
    /// Topic the event is published under
    pub fn topic(&self) -> &'static str {
        match self {
            EngineEvent::OrderCreated(_) => "orders.created",
            EngineEvent::OrderCancelled(_) => "orders.cancelled",
            EngineEvent::OrderUpdated(_) => "orders.updated",
            EngineEvent::TradeExecuted(_) => "trades.executed",
        }
    }
}

// ============================================================================
// Publisher Contract
// ============================================================================

/// Outbound messaging seam.
///
/// Implementations must not block: the engine calls `publish` from the
/// submission path and from the sweep, and treats failures as best-effort
/// notification losses: the authoritative state lives in the registry and
/// books, never in the event stream.
pub trait EventPublisher: Send + Sync {
    fn publish(&self, event: EngineEvent) -> EngineResult<()>;
}

/// Discards all events; for tests and benchmarks
pub struct NoOpPublisher;

impl EventPublisher for NoOpPublisher {
    fn publish(&self, _event: EngineEvent) -> EngineResult<()> {
        Ok(())
    }
}

/// Logs every event through `tracing`
pub struct LoggingPublisher;

impl EventPublisher for LoggingPublisher {
    fn publish(&self, event: EngineEvent) -> EngineResult<()> {
        tracing::debug!(topic = event.topic(), event = ?event, "engine event");
        Ok(())
    }
}

/// Buffers events into an unbounded channel.
///
/// The send never blocks, which keeps a slow downstream consumer from
/// stalling the sweep or the submission path; the consumer drains the
/// receiver at its own pace.
pub struct ChannelPublisher {
    sender: Sender<EngineEvent>,
}

impl ChannelPublisher {
    /// Create a publisher together with the receiving end of its buffer
    pub fn new() -> (Self, Receiver<EngineEvent>) {
        let (sender, receiver) = unbounded();
        (Self { sender }, receiver)
    }
}

impl EventPublisher for ChannelPublisher {
    fn publish(&self, event: EngineEvent) -> EngineResult<()> {
        self.sender
            .send(event)
            .map_err(|_| EngineError::Publish("event channel disconnected".to_string()))
    }
}
