// ============================================================================
// Engine Module
// Contains the core matching engine business logic
// ============================================================================

mod matching_engine;
mod registry;
mod sweeper;

pub use matching_engine::{EngineStats, MatchingEngine};
pub use registry::OrderRegistry;
pub use sweeper::SweepWorker;
