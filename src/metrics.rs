//! Trading metrics input and its simulated feed
//!
//! The core only ever consumes the latest `MetricsSnapshot`; it is produced
//! externally on a fixed cadence. `spawn_simulator` ships a bounded-random
//! stand-in for deployments without a real feed. The sampled values are
//! simulation output, not derived from market conditions.

use std::time::Duration;

use rand::Rng;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tokio::sync::watch;
use tracing::debug;

/// Externally supplied cost fractions applied to a quote
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct MetricsSnapshot {
    /// Expected slippage as a fraction (0.01 = 1%)
    pub slippage: Decimal,
    /// Price impact as a fraction, informational only
    pub price_impact: Decimal,
    /// Venue fees as a fraction
    pub fees: Decimal,
}

/// Upper bounds for the simulated metrics feed.
///
/// Plain configuration: no scaling with order size or venue liquidity is
/// modeled.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MetricsBounds {
    pub max_slippage: Decimal,
    pub max_price_impact: Decimal,
    pub max_fees: Decimal,
}

impl Default for MetricsBounds {
    fn default() -> Self {
        Self {
            max_slippage: Decimal::new(2, 1),     // 0.2
            max_price_impact: Decimal::new(5, 1), // 0.5
            max_fees: Decimal::new(1, 1),         // 0.1
        }
    }
}

impl MetricsBounds {
    fn sample(&self, rng: &mut impl Rng) -> MetricsSnapshot {
        MetricsSnapshot {
            slippage: sample_fraction(rng, self.max_slippage),
            price_impact: sample_fraction(rng, self.max_price_impact),
            fees: sample_fraction(rng, self.max_fees),
        }
    }
}

/// Uniform sample in `[0, bound]`, rounded to 4 decimal places
fn sample_fraction(rng: &mut impl Rng, bound: Decimal) -> Decimal {
    let unit = Decimal::new(rng.gen_range(0..=10_000), 4);
    (bound * unit).round_dp(4)
}

/// Spawn the simulated metrics feed.
///
/// Publishes a fresh bounded-random snapshot every `interval` on a watch
/// channel; the task exits once every receiver is dropped.
pub fn spawn_simulator(
    bounds: MetricsBounds,
    interval: Duration,
) -> watch::Receiver<MetricsSnapshot> {
    let initial = bounds.sample(&mut rand::thread_rng());
    let (tx, rx) = watch::channel(initial);

    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(interval);
        ticker.tick().await; // first tick completes immediately
        loop {
            ticker.tick().await;
            let snapshot = bounds.sample(&mut rand::thread_rng());
            debug!(
                slippage = %snapshot.slippage,
                price_impact = %snapshot.price_impact,
                fees = %snapshot.fees,
                "simulated metrics tick"
            );
            if tx.send(snapshot).is_err() {
                break;
            }
        }
    });

    rx
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_samples_within_bounds() {
        let bounds = MetricsBounds::default();
        let mut rng = rand::thread_rng();
        for _ in 0..200 {
            let snap = bounds.sample(&mut rng);
            assert!(snap.slippage >= Decimal::ZERO && snap.slippage <= dec!(0.2));
            assert!(snap.price_impact >= Decimal::ZERO && snap.price_impact <= dec!(0.5));
            assert!(snap.fees >= Decimal::ZERO && snap.fees <= dec!(0.1));
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_simulator_publishes_on_cadence() {
        let mut rx = spawn_simulator(MetricsBounds::default(), Duration::from_secs(2));
        // Two consecutive ticks each produce a value within bounds.
        for _ in 0..2 {
            rx.changed().await.unwrap();
            let snap = *rx.borrow();
            assert!(snap.slippage <= dec!(0.2));
        }
    }
}
