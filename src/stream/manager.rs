//! Reference-counted subscription manager
//!
//! Tracks the set of symbols consumers care about, runs one stream task per
//! symbol, and routes inbound frames into the shared caches. Multiple
//! consumers of the same symbol (ticker view plus depth view) share one
//! connection; the last release tears the connection down and evicts the
//! symbol's cached state.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use rand::Rng;
use tokio::task::JoinHandle;
use tokio::time::sleep;
use tracing::{debug, info, trace, warn};

use super::StreamConnection;
use crate::config::{BackoffConfig, CoreConfig};
use crate::orderbook::OrderBookView;
use crate::parser::ParsedFrame;
use crate::price::PriceCache;

/// Token returned by `subscribe`, passed back to `release`
#[derive(Debug)]
pub struct SubscriptionHandle {
    symbol: String,
}

impl SubscriptionHandle {
    pub fn symbol(&self) -> &str {
        &self.symbol
    }
}

struct SubEntry {
    refcount: usize,
    task: JoinHandle<()>,
}

/// Manages one refcounted stream subscription per symbol
pub struct SubscriptionManager {
    config: Arc<CoreConfig>,
    prices: Arc<PriceCache>,
    books: Arc<OrderBookView>,
    subs: Mutex<HashMap<String, SubEntry>>,
}

impl SubscriptionManager {
    pub fn new(config: Arc<CoreConfig>, prices: Arc<PriceCache>, books: Arc<OrderBookView>) -> Self {
        Self {
            config,
            prices,
            books,
            subs: Mutex::new(HashMap::new()),
        }
    }

    /// Register interest in a symbol. Non-blocking: the first subscriber
    /// spawns the stream task, later subscribers only bump the refcount.
    ///
    /// Each call counts as one consumer; a consumer switching symbols
    /// releases its previous handle before subscribing again.
    pub fn subscribe(&self, symbol: &str) -> SubscriptionHandle {
        let key = symbol.to_uppercase();
        let mut subs = self.subs.lock().expect("subscription lock poisoned");

        match subs.get_mut(&key) {
            Some(entry) => {
                entry.refcount += 1;
                debug!(symbol = %key, refcount = entry.refcount, "subscription shared");
            }
            None => {
                let task = tokio::spawn(run_stream(
                    key.clone(),
                    Arc::clone(&self.config),
                    Arc::clone(&self.prices),
                    Arc::clone(&self.books),
                ));
                subs.insert(key.clone(), SubEntry { refcount: 1, task });
                info!(symbol = %key, "subscription opened");
            }
        }

        SubscriptionHandle { symbol: key }
    }

    /// Release a handle. At refcount zero the stream task is aborted
    /// (cancelling any in-flight backoff sleep) and the symbol's cached
    /// price and book are evicted.
    pub fn release(&self, handle: SubscriptionHandle) {
        let mut subs = self.subs.lock().expect("subscription lock poisoned");

        let Some(entry) = subs.get_mut(&handle.symbol) else {
            warn!(symbol = %handle.symbol, "release for unknown subscription");
            return;
        };

        entry.refcount -= 1;
        if entry.refcount > 0 {
            debug!(symbol = %handle.symbol, refcount = entry.refcount, "subscription released");
            return;
        }

        let entry = subs.remove(&handle.symbol).expect("entry just looked up");
        entry.task.abort();
        self.prices.evict(&handle.symbol);
        self.books.evict(&handle.symbol);
        info!(symbol = %handle.symbol, "subscription closed");
    }

    /// Current refcount for a symbol (0 when not subscribed)
    pub fn refcount(&self, symbol: &str) -> usize {
        let subs = self.subs.lock().expect("subscription lock poisoned");
        subs.get(&symbol.to_uppercase()).map_or(0, |e| e.refcount)
    }

    /// Symbols with at least one active subscriber
    pub fn active_symbols(&self) -> Vec<String> {
        let subs = self.subs.lock().expect("subscription lock poisoned");
        subs.keys().cloned().collect()
    }
}

impl Drop for SubscriptionManager {
    fn drop(&mut self) {
        let subs = self.subs.lock().expect("subscription lock poisoned");
        for entry in subs.values() {
            entry.task.abort();
        }
    }
}

/// Per-symbol stream task: connect, subscribe, route frames, and back off
/// with jitter on failure. Runs until aborted by the last release.
async fn run_stream(
    symbol: String,
    config: Arc<CoreConfig>,
    prices: Arc<PriceCache>,
    books: Arc<OrderBookView>,
) {
    let mut connection = StreamConnection::new(&config.ws_endpoint, &symbol);
    let mut attempt: u32 = 0;

    loop {
        match connection.connect().await {
            Ok(()) => {
                attempt = 0;
                loop {
                    match connection.recv().await {
                        Ok(Some(text)) => route_frame(&symbol, &text, &prices, &books),
                        Ok(None) => continue,
                        Err(e) => {
                            warn!(symbol = %symbol, error = %e, "stream interrupted");
                            break;
                        }
                    }
                }
            }
            Err(e) => {
                warn!(symbol = %symbol, error = %e, "stream connect failed");
            }
        }

        attempt += 1;
        let delay = backoff_delay(&config.backoff, attempt);
        debug!(symbol = %symbol, attempt, delay_ms = delay.as_millis() as u64, "backing off");
        sleep(delay).await;
    }
}

/// Route one inbound frame into the caches. Malformed frames and frames
/// for other symbols are dropped, never propagated.
fn route_frame(symbol: &str, raw: &str, prices: &PriceCache, books: &OrderBookView) {
    match ParsedFrame::parse(raw) {
        Ok(ParsedFrame::Ticker(ticker)) => {
            if ticker.symbol.eq_ignore_ascii_case(symbol) {
                prices.update(&ticker);
            } else {
                trace!(expected = %symbol, got = %ticker.symbol, "ticker for unsubscribed symbol");
            }
        }
        Ok(ParsedFrame::Depth(depth)) => {
            if depth.symbol.eq_ignore_ascii_case(symbol) {
                books.update(&depth);
            } else {
                trace!(expected = %symbol, got = %depth.symbol, "depth for unsubscribed symbol");
            }
        }
        Ok(ParsedFrame::Other(msg)) => {
            trace!(symbol = %symbol, msg = %msg, "unrouted frame");
        }
        Err(e) => {
            warn!(symbol = %symbol, error = %e, "malformed frame dropped");
        }
    }
}

/// Exponential backoff with full jitter: `base * factor^(attempt-1)`,
/// capped, then spread over `±jitter`.
fn backoff_delay(config: &BackoffConfig, attempt: u32) -> Duration {
    let exponent = attempt.saturating_sub(1).min(16);
    let multiplier = (config.factor as u64).saturating_pow(exponent);
    let exp_ms = (config.base.as_millis() as u64)
        .saturating_mul(multiplier)
        .min(config.cap.as_millis() as u64);

    let spread = rand::thread_rng().gen_range(-config.jitter..=config.jitter);
    let jittered = (exp_ms as f64 * (1.0 + spread)).max(0.0);
    Duration::from_millis(jittered as u64)
}
