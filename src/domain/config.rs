// ============================================================================
// Engine Configuration
// ============================================================================

use crate::errors::{EngineError, EngineResult};
use std::time::Duration;

/// Default period of the background matching sweep
pub const DEFAULT_SWEEP_INTERVAL: Duration = Duration::from_millis(100);

/// Configuration for a matching engine instance.
///
/// Constructed once at process start and handed to the engine; there is no
/// global mutable configuration, so tests can run isolated engines in
/// parallel with different settings.
#[derive(Debug, Clone)]
pub struct EngineConfig {
    /// Period of the background matching sweep
    pub sweep_interval: Duration,

    /// Whether submitting an order for an unseen symbol creates its book
    /// lazily. When false, such submissions fail with `UnknownSymbol`.
    pub auto_create_books: bool,

    /// Symbols whose books are created eagerly at engine construction
    pub symbols: Vec<String>,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            sweep_interval: DEFAULT_SWEEP_INTERVAL,
            auto_create_books: true,
            symbols: Vec::new(),
        }
    }
}

impl EngineConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder method: set the sweep period
    pub fn with_sweep_interval(mut self, interval: Duration) -> Self {
        self.sweep_interval = interval;
        self
    }

    /// Builder method: allow or forbid lazy book creation
    pub fn with_auto_create_books(mut self, auto_create: bool) -> Self {
        self.auto_create_books = auto_create;
        self
    }

    /// Builder method: pre-create a book for `symbol` at startup
    pub fn with_symbol(mut self, symbol: impl Into<String>) -> Self {
        self.symbols.push(symbol.into());
        self
    }

    /// Builder method: pre-create books for all `symbols` at startup
    pub fn with_symbols(mut self, symbols: impl IntoIterator<Item = String>) -> Self {
        self.symbols.extend(symbols);
        self
    }

    /// Validate the configuration
    pub fn validate(&self) -> EngineResult<()> {
        if self.sweep_interval.is_zero() {
            return Err(EngineError::InvalidConfig(
                "sweep interval must be non-zero".to_string(),
            ));
        }

        if self.symbols.iter().any(|symbol| symbol.is_empty()) {
            return Err(EngineError::InvalidConfig(
                "pre-created symbols cannot be empty".to_string(),
            ));
        }

        Ok(())
    }
}
