//! Pure swap quote derivation
//!
//! Every output is computed fresh from the inputs on each call; this module
//! holds no state. Failure modes are `DivisionUndefined` (zero denominator)
//! and `MissingInput` (absent or stale price), both of which mean "no quote
//! available" to the caller, never zero.

use std::time::Duration;

use rust_decimal::Decimal;
use serde::Serialize;

use crate::error::{Result, SwapCoreError};
use crate::metrics::MetricsSnapshot;
use crate::price::PriceCache;

/// Swap quote derived from two prices and a metrics snapshot
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Quote {
    /// Units of B per unit of A
    pub rate: Decimal,
    /// Amount of B received for the input amount of A
    pub converted_amount: Decimal,
    /// Converted amount valued in the quote currency
    pub gross_value: Decimal,
    /// Gross value after slippage and fees
    pub total_with_costs: Decimal,
}

/// Exchange rate `price_a / price_b`
pub fn rate(price_a: Decimal, price_b: Decimal) -> Result<Decimal> {
    if price_b.is_zero() {
        return Err(SwapCoreError::DivisionUndefined);
    }
    Ok(price_a / price_b)
}

/// Amount of B for `amount_a` of A: `amount_a * price_a / price_b`
pub fn convert(amount_a: Decimal, price_a: Decimal, price_b: Decimal) -> Result<Decimal> {
    Ok(amount_a * rate(price_a, price_b)?)
}

/// Apply slippage then fees multiplicatively, in that fixed order.
/// Price impact is informational and does not enter the total.
pub fn total_with_costs(value: Decimal, metrics: &MetricsSnapshot) -> Decimal {
    value * (Decimal::ONE + metrics.slippage) * (Decimal::ONE + metrics.fees)
}

/// Derive a full quote for swapping `amount_a` of A into B
pub fn quote(
    amount_a: Decimal,
    price_a: Decimal,
    price_b: Decimal,
    metrics: &MetricsSnapshot,
) -> Result<Quote> {
    let rate = rate(price_a, price_b)?;
    let converted_amount = amount_a * rate;
    let gross_value = converted_amount * price_b;
    Ok(Quote {
        rate,
        converted_amount,
        gross_value,
        total_with_costs: total_with_costs(gross_value, metrics),
    })
}

/// Derive a quote from cached prices.
///
/// Fails with `MissingInput` when either price is absent or older than
/// `max_age`; the caller renders a placeholder, not a number.
pub fn quote_from_cache(
    prices: &PriceCache,
    symbol_a: &str,
    symbol_b: &str,
    amount_a: Decimal,
    max_age: Duration,
    metrics: &MetricsSnapshot,
) -> Result<Quote> {
    let price_a = prices
        .get(symbol_a)
        .ok_or(SwapCoreError::MissingInput("base price unavailable"))?;
    let price_b = prices
        .get(symbol_b)
        .ok_or(SwapCoreError::MissingInput("quote price unavailable"))?;

    if prices.is_stale(symbol_a, max_age) {
        return Err(SwapCoreError::MissingInput("base price stale"));
    }
    if prices.is_stale(symbol_b, max_age) {
        return Err(SwapCoreError::MissingInput("quote price stale"));
    }

    quote(amount_a, price_a.last_price, price_b.last_price, metrics)
}
