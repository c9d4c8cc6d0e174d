//! Last-trade price cache with staleness tracking
//!
//! One entry per symbol, written only by that symbol's stream task. Updates
//! older than the stored venue event time are rejected, which keeps
//! `observed_at` from moving backwards across reconnects.

use std::collections::HashMap;
use std::sync::RwLock;
use std::time::{Duration, Instant};

use chrono::{DateTime, TimeZone, Utc};
use rust_decimal::Decimal;
use serde::Serialize;
use tracing::trace;

use crate::parser::{TickerFrame, TICKER_EVENT};

/// Last observed price for a symbol
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PriceQuote {
    pub symbol: String,
    pub last_price: Decimal,
    /// Venue event time of the observation (ms)
    pub observed_at: u64,
}

impl PriceQuote {
    /// Venue observation time as a wall-clock timestamp
    pub fn observed_at_utc(&self) -> Option<DateTime<Utc>> {
        Utc.timestamp_millis_opt(self.observed_at as i64).single()
    }
}

#[derive(Debug)]
struct Entry {
    quote: PriceQuote,
    received_at: Instant,
}

/// Per-symbol last-trade prices
#[derive(Debug, Default)]
pub struct PriceCache {
    entries: RwLock<HashMap<String, Entry>>,
}

impl PriceCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Apply a ticker frame.
    ///
    /// Frames with an unexpected event kind are ignored, as are
    /// observations older than the stored one (out-of-order delivery on
    /// reconnect).
    pub fn update(&self, frame: &TickerFrame) {
        if frame.event_type != TICKER_EVENT {
            trace!(event = %frame.event_type, "ignoring non-ticker frame");
            return;
        }

        let key = frame.symbol.to_uppercase();
        let mut entries = self.entries.write().expect("price lock poisoned");
        if let Some(entry) = entries.get(&key) {
            if frame.event_time < entry.quote.observed_at {
                trace!(
                    symbol = %key,
                    stored = entry.quote.observed_at,
                    incoming = frame.event_time,
                    "ignoring out-of-order ticker"
                );
                return;
            }
        }

        entries.insert(
            key.clone(),
            Entry {
                quote: PriceQuote {
                    symbol: key,
                    last_price: frame.last_price,
                    observed_at: frame.event_time,
                },
                received_at: Instant::now(),
            },
        );
    }

    /// Latest price for a symbol, or `None` before the first ticker
    pub fn get(&self, symbol: &str) -> Option<PriceQuote> {
        let entries = self.entries.read().expect("price lock poisoned");
        entries.get(&symbol.to_uppercase()).map(|e| e.quote.clone())
    }

    /// True if no update has been observed within `max_age` (or ever).
    /// Advisory: callers decide whether to act on a stale quote.
    pub fn is_stale(&self, symbol: &str, max_age: Duration) -> bool {
        let entries = self.entries.read().expect("price lock poisoned");
        match entries.get(&symbol.to_uppercase()) {
            Some(entry) => entry.received_at.elapsed() > max_age,
            None => true,
        }
    }

    /// Drop the cached price for a symbol (subscription teardown)
    pub fn evict(&self, symbol: &str) {
        let mut entries = self.entries.write().expect("price lock poisoned");
        entries.remove(&symbol.to_uppercase());
    }
}
