// ============================================================================
// Basic Usage Example
// ============================================================================

use matching_core::prelude::*;
use rust_decimal::Decimal;
use std::sync::Arc;
use std::time::Duration;

fn main() {
    tracing_subscriber::fmt()
        .with_max_level(tracing::Level::DEBUG)
        .init();

    println!("=== Matching Core Example ===\n");

    let trade_log = Arc::new(InMemoryTradeLog::new());
    let engine = Arc::new(
        MatchingEngine::new(
            EngineConfig::new().with_sweep_interval(Duration::from_millis(50)),
            Arc::new(LoggingPublisher),
            Arc::clone(&trade_log) as Arc<dyn TradeLog>,
        )
        .expect("valid config"),
    );
    let worker = engine.start_sweeper();

    // Rest sell orders at ascending prices
    println!("Adding sell orders...");
    for i in 0i64..5 {
        let ask = Arc::new(Order::limit(
            format!("seller_{}", i),
            "BTC-USD",
            Side::Sell,
            Decimal::from(50_000 + i * 100),
            Decimal::ONE,
        ));
        engine.submit_order(ask).expect("valid order");
    }

    // Rest buy orders below the asks
    println!("Adding buy orders...");
    for i in 0i64..5 {
        let bid = Arc::new(Order::limit(
            format!("buyer_{}", i),
            "BTC-USD",
            Side::Buy,
            Decimal::from(49_900 - i * 100),
            Decimal::ONE,
        ));
        engine.submit_order(bid).expect("valid order");
    }

    std::thread::sleep(Duration::from_millis(100));

    println!("\n=== Order Book Snapshot ===");
    let snapshot = engine.get_order_book("BTC-USD", 5).expect("book exists");

    println!("\nBids:");
    for (price, qty) in &snapshot.bids {
        println!("  {} @ {}", qty, price);
    }
    println!("\nAsks:");
    for (price, qty) in &snapshot.asks {
        println!("  {} @ {}", qty, price);
    }
    println!("\nSpread: {:?}", snapshot.spread);
    println!("Mid Price: {:?}", snapshot.mid_price);

    // A bid that crosses the two best ask levels
    println!("\n=== Submitting Crossing Order ===");
    let crossing = Arc::new(Order::limit(
        "aggressive_buyer",
        "BTC-USD",
        Side::Buy,
        Decimal::from(50_100),
        Decimal::from(2),
    ));
    engine.submit_order(crossing).expect("valid order");

    std::thread::sleep(Duration::from_millis(200));
    worker.stop();

    println!("\n=== Trades ===");
    for trade in trade_log.snapshot() {
        println!(
            "  {} {} @ {} (buy {} / sell {})",
            trade.quantity, trade.symbol, trade.price, trade.buy_user_id, trade.sell_user_id
        );
    }

    let stats = engine.get_stats();
    println!("\n=== Engine Stats ===");
    println!("Orders submitted: {}", stats.orders_submitted);
    println!("Trades executed:  {}", stats.trades_executed);
    println!("Sweeps completed: {}", stats.sweeps_completed);
    println!("Open orders:      {}", stats.open_orders);
}
