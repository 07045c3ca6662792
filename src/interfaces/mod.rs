// ============================================================================
// Interfaces Module
// Contains all trait definitions and contracts
// ============================================================================

mod event_publisher;
mod trade_log;

pub use event_publisher::{
    ChannelPublisher, EngineEvent, EventPublisher, LoggingPublisher, NoOpPublisher, OrderPayload,
    TradePayload,
};
pub use trade_log::{InMemoryTradeLog, NoOpTradeLog, TradeLog};
