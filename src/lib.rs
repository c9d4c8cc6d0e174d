//! Streaming swap core
//!
//! This crate synchronizes live market data (last-trade prices and top-N
//! depth) per symbol from a streaming venue over reference-counted shared
//! connections, and derives swap quotes and a simulated transaction
//! workflow on top of the cached view. It is a library consumed by an
//! external presentation shell; it has no CLI and persists nothing.

use std::sync::Arc;

pub mod config;
pub mod error;
pub mod metrics;
pub mod orderbook;
pub mod parser;
pub mod price;
pub mod quote;
pub mod stream;
pub mod transaction;

pub use config::{BackoffConfig, CoreConfig, TransactionConfig};
pub use error::{Result, SwapCoreError};
pub use metrics::{MetricsBounds, MetricsSnapshot};
pub use orderbook::{OrderBookSnapshot, OrderBookView, OrderLevel, Side};
pub use parser::{DepthFrame, ParsedFrame, SubscribeRequest, TickerFrame};
pub use price::{PriceCache, PriceQuote};
pub use quote::Quote;
pub use stream::{StreamConnection, SubscriptionHandle, SubscriptionManager};
pub use transaction::{TransactionState, TransactionWorkflow};

/// Wired-up core shared with the presentation shell
pub struct SwapCore {
    pub config: Arc<CoreConfig>,
    pub prices: Arc<PriceCache>,
    pub books: Arc<OrderBookView>,
    pub subscriptions: SubscriptionManager,
}

impl SwapCore {
    /// Build the core from explicit configuration. The caches handed to
    /// the subscription manager are the same ones exposed to readers.
    pub fn new(config: CoreConfig) -> Self {
        let config = Arc::new(config);
        let prices = Arc::new(PriceCache::new());
        let books = Arc::new(OrderBookView::new(config.depth_levels));
        let subscriptions = SubscriptionManager::new(
            Arc::clone(&config),
            Arc::clone(&prices),
            Arc::clone(&books),
        );

        Self {
            config,
            prices,
            books,
            subscriptions,
        }
    }

    /// A transaction workflow configured from this core's settings, one
    /// per swap attempt
    pub fn transaction_workflow(&self) -> TransactionWorkflow {
        TransactionWorkflow::new(self.config.transaction.clone())
    }
}
