//! Configuration for the streaming swap core
//!
//! Everything is explicit construction; `from_env` is a convenience loader
//! for hosts that configure through the environment.

use std::env;
use std::time::Duration;

use serde::Deserialize;

use crate::metrics::MetricsBounds;

/// Top-level configuration, passed at construction
#[derive(Debug, Clone, Deserialize)]
pub struct CoreConfig {
    /// WebSocket endpoint of the venue
    pub ws_endpoint: String,

    /// Order book levels kept per side
    pub depth_levels: usize,

    /// Age beyond which a cached price is flagged stale
    pub price_max_age: Duration,

    /// Reconnect backoff parameters
    pub backoff: BackoffConfig,

    /// Cadence of the simulated metrics feed
    pub metrics_interval: Duration,

    /// Bounds of the simulated metrics feed
    pub metrics_bounds: MetricsBounds,

    /// Transaction workflow timings and outcome probability
    pub transaction: TransactionConfig,
}

/// Exponential backoff with jitter for stream reconnects
#[derive(Debug, Clone, Deserialize)]
pub struct BackoffConfig {
    /// Delay before the first retry
    pub base: Duration,
    /// Multiplier applied per attempt
    pub factor: u32,
    /// Upper bound on the delay
    pub cap: Duration,
    /// Full jitter fraction; 0.2 spreads each delay over ±20%
    pub jitter: f64,
}

impl Default for BackoffConfig {
    fn default() -> Self {
        Self {
            base: Duration::from_secs(1),
            factor: 2,
            cap: Duration::from_secs(30),
            jitter: 0.2,
        }
    }
}

/// Timed status sequence of the simulated swap transaction
#[derive(Debug, Clone, Deserialize)]
pub struct TransactionConfig {
    /// Time from start until `Exchanging`
    pub exchanging_after: Duration,
    /// Time from start until `Confirming`
    pub confirming_after: Duration,
    /// Time from start until the terminal outcome
    pub terminal_after: Duration,
    /// Probability of the simulated attempt succeeding
    pub success_probability: f64,
}

impl Default for TransactionConfig {
    fn default() -> Self {
        Self {
            exchanging_after: Duration::from_millis(1500),
            confirming_after: Duration::from_millis(3000),
            terminal_after: Duration::from_millis(4000),
            success_probability: 0.6,
        }
    }
}

impl Default for CoreConfig {
    fn default() -> Self {
        Self {
            ws_endpoint: "wss://stream.binance.com:9443/ws".to_string(),
            depth_levels: 5,
            price_max_age: Duration::from_secs(10),
            backoff: BackoffConfig::default(),
            metrics_interval: Duration::from_secs(2),
            metrics_bounds: MetricsBounds::default(),
            transaction: TransactionConfig::default(),
        }
    }
}

impl CoreConfig {
    /// Load configuration from environment variables, falling back to the
    /// defaults for anything unset or unparsable.
    pub fn from_env() -> anyhow::Result<Self> {
        dotenvy::dotenv().ok();

        let defaults = Self::default();

        Ok(Self {
            ws_endpoint: env::var("WS_ENDPOINT").unwrap_or(defaults.ws_endpoint),
            depth_levels: parse_env("DEPTH_LEVELS", defaults.depth_levels),
            price_max_age: Duration::from_millis(parse_env(
                "PRICE_MAX_AGE_MS",
                defaults.price_max_age.as_millis() as u64,
            )),
            backoff: BackoffConfig {
                base: Duration::from_millis(parse_env(
                    "BACKOFF_BASE_MS",
                    defaults.backoff.base.as_millis() as u64,
                )),
                factor: parse_env("BACKOFF_FACTOR", defaults.backoff.factor),
                cap: Duration::from_millis(parse_env(
                    "BACKOFF_CAP_MS",
                    defaults.backoff.cap.as_millis() as u64,
                )),
                jitter: parse_env("BACKOFF_JITTER", defaults.backoff.jitter),
            },
            metrics_interval: Duration::from_millis(parse_env(
                "METRICS_INTERVAL_MS",
                defaults.metrics_interval.as_millis() as u64,
            )),
            metrics_bounds: defaults.metrics_bounds,
            transaction: TransactionConfig {
                success_probability: parse_env(
                    "TX_SUCCESS_PROBABILITY",
                    defaults.transaction.success_probability,
                ),
                ..defaults.transaction
            },
        })
    }
}

fn parse_env<T: std::str::FromStr>(key: &str, default: T) -> T {
    env::var(key)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}
