//! Bounded top-N order book view
//!
//! Each symbol's ladder is replaced wholesale by the most recent depth frame.
//! Readers get an `Arc` to an immutable snapshot, so a partially applied
//! update is never observable.

use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use rust_decimal::Decimal;
use serde::Serialize;

use crate::parser::{DepthFrame, RawLevel};

/// Side of the order book
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Side {
    Bid,
    Ask,
}

/// A single level in the order book
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct OrderLevel {
    pub price: Decimal,
    pub size: Decimal,
    pub side: Side,
}

/// Top-N view of one symbol's book as of the last depth frame
#[derive(Debug, Clone, Serialize)]
pub struct OrderBookSnapshot {
    pub symbol: String,
    /// Venue event time of the frame that produced this snapshot (ms)
    pub event_time: u64,
    /// Bids, descending by price, at most N entries
    pub bids: Vec<OrderLevel>,
    /// Asks, ascending by price, at most N entries
    pub asks: Vec<OrderLevel>,
}

impl OrderBookSnapshot {
    pub fn best_bid(&self) -> Option<Decimal> {
        self.bids.first().map(|l| l.price)
    }

    pub fn best_ask(&self) -> Option<Decimal> {
        self.asks.first().map(|l| l.price)
    }
}

/// Per-symbol bounded order book views
#[derive(Debug)]
pub struct OrderBookView {
    depth: usize,
    books: RwLock<HashMap<String, Arc<OrderBookSnapshot>>>,
}

impl OrderBookView {
    /// Create a view keeping the top `depth` levels per side
    pub fn new(depth: usize) -> Self {
        Self {
            depth,
            books: RwLock::new(HashMap::new()),
        }
    }

    /// Apply a depth frame, replacing the symbol's snapshot wholesale.
    ///
    /// The new snapshot is fully constructed before the map lock is taken,
    /// so the write section is a single insert.
    pub fn update(&self, frame: &DepthFrame) {
        let snapshot = Arc::new(build_snapshot(frame, self.depth));
        let mut books = self.books.write().expect("orderbook lock poisoned");
        books.insert(frame.symbol.to_uppercase(), snapshot);
    }

    /// Latest snapshot for a symbol, or `None` before the first frame.
    /// Never blocks beyond a read-lock clone of the `Arc`.
    pub fn snapshot(&self, symbol: &str) -> Option<Arc<OrderBookSnapshot>> {
        let books = self.books.read().expect("orderbook lock poisoned");
        books.get(&symbol.to_uppercase()).cloned()
    }

    /// Drop the cached snapshot for a symbol (subscription teardown)
    pub fn evict(&self, symbol: &str) {
        let mut books = self.books.write().expect("orderbook lock poisoned");
        books.remove(&symbol.to_uppercase());
    }

    /// Symbols with at least one applied frame
    pub fn symbols(&self) -> Vec<String> {
        let books = self.books.read().expect("orderbook lock poisoned");
        books.keys().cloned().collect()
    }
}

fn build_snapshot(frame: &DepthFrame, depth: usize) -> OrderBookSnapshot {
    OrderBookSnapshot {
        symbol: frame.symbol.to_uppercase(),
        event_time: frame.event_time,
        bids: top_levels(&frame.bids, Side::Bid, depth),
        asks: top_levels(&frame.asks, Side::Ask, depth),
    }
}

fn top_levels(raw: &[RawLevel], side: Side, depth: usize) -> Vec<OrderLevel> {
    let mut levels: Vec<OrderLevel> = raw
        .iter()
        .filter(|l| l.size > Decimal::ZERO)
        .map(|l| OrderLevel {
            price: l.price,
            size: l.size,
            side,
        })
        .collect();

    match side {
        Side::Bid => levels.sort_by(|a, b| b.price.cmp(&a.price)),
        Side::Ask => levels.sort_by(|a, b| a.price.cmp(&b.price)),
    }
    levels.truncate(depth);
    levels
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn frame(symbol: &str, event_time: u64, bids: &[(&str, &str)], asks: &[(&str, &str)]) -> DepthFrame {
        let to_levels = |pairs: &[(&str, &str)]| {
            pairs
                .iter()
                .map(|(p, q)| RawLevel {
                    price: p.parse().unwrap(),
                    size: q.parse().unwrap(),
                })
                .collect()
        };
        DepthFrame {
            event_type: "depthUpdate".to_string(),
            event_time,
            symbol: symbol.to_string(),
            bids: to_levels(bids),
            asks: to_levels(asks),
        }
    }

    #[test]
    fn test_sorted_and_truncated_to_depth() {
        let view = OrderBookView::new(5);
        let bids = [
            ("49997", "1"),
            ("50000", "1"),
            ("49998", "1"),
            ("49999", "1"),
            ("49995", "1"),
            ("49996", "1"),
            ("50001", "1"),
        ];
        let asks = [
            ("50004", "1"),
            ("50002", "1"),
            ("50006", "1"),
            ("50003", "1"),
            ("50005", "1"),
            ("50007", "1"),
        ];
        view.update(&frame("BTCUSDT", 1, &bids, &asks));

        let snap = view.snapshot("BTCUSDT").unwrap();
        assert_eq!(snap.bids.len(), 5);
        assert_eq!(snap.asks.len(), 5);
        let bid_prices: Vec<Decimal> = snap.bids.iter().map(|l| l.price).collect();
        assert_eq!(
            bid_prices,
            vec![dec!(50001), dec!(50000), dec!(49999), dec!(49998), dec!(49997)]
        );
        let ask_prices: Vec<Decimal> = snap.asks.iter().map(|l| l.price).collect();
        assert_eq!(
            ask_prices,
            vec![dec!(50002), dec!(50003), dec!(50004), dec!(50005), dec!(50006)]
        );
        assert!(bid_prices.windows(2).all(|w| w[0] > w[1]));
        assert!(ask_prices.windows(2).all(|w| w[0] < w[1]));
    }

    #[test]
    fn test_wholesale_replacement() {
        let view = OrderBookView::new(5);
        view.update(&frame("BTCUSDT", 1, &[("50000", "1"), ("49999", "2")], &[("50001", "1")]));
        view.update(&frame("BTCUSDT", 2, &[("48000", "3")], &[]));

        // Only the second frame's levels remain; nothing from the first
        // frame leaks into the new snapshot.
        let snap = view.snapshot("BTCUSDT").unwrap();
        assert_eq!(snap.event_time, 2);
        assert_eq!(snap.bids.len(), 1);
        assert_eq!(snap.bids[0].price, dec!(48000));
        assert!(snap.asks.is_empty());
    }

    #[test]
    fn test_zero_size_levels_dropped() {
        let view = OrderBookView::new(5);
        view.update(&frame("BTCUSDT", 1, &[("50000", "0"), ("49999", "1")], &[("50001", "0.0")]));

        let snap = view.snapshot("BTCUSDT").unwrap();
        assert_eq!(snap.bids.len(), 1);
        assert_eq!(snap.best_bid(), Some(dec!(49999)));
        assert_eq!(snap.best_ask(), None);
    }

    #[test]
    fn test_empty_before_first_frame_and_after_evict() {
        let view = OrderBookView::new(5);
        assert!(view.snapshot("ETHUSDT").is_none());

        view.update(&frame("ETHUSDT", 1, &[("3000", "1")], &[]));
        assert!(view.snapshot("ETHUSDT").is_some());

        view.evict("ETHUSDT");
        assert!(view.snapshot("ETHUSDT").is_none());
    }

    #[test]
    fn test_symbol_lookup_is_case_insensitive() {
        let view = OrderBookView::new(5);
        view.update(&frame("btcusdt", 1, &[("50000", "1")], &[]));
        assert!(view.snapshot("BTCUSDT").is_some());
    }

    #[test]
    fn test_old_snapshot_arc_survives_replacement() {
        let view = OrderBookView::new(5);
        view.update(&frame("BTCUSDT", 1, &[("50000", "1")], &[]));
        let held = view.snapshot("BTCUSDT").unwrap();

        view.update(&frame("BTCUSDT", 2, &[("48000", "1")], &[]));

        // The reader's snapshot is immutable; swapping in a new one does
        // not mutate it.
        assert_eq!(held.event_time, 1);
        assert_eq!(held.best_bid(), Some(dec!(50000)));
        assert_eq!(view.snapshot("BTCUSDT").unwrap().event_time, 2);
    }
}
