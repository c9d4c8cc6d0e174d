//! Parser module for venue WebSocket frames
//!
//! Handles deserialization of ticker and depth frames and serialization of
//! the subscribe control message.

use rust_decimal::Decimal;
use serde::{Deserialize, Deserializer, Serialize};
use std::str::FromStr;

/// Ticker frame carrying the last-traded price for a symbol
#[derive(Debug, Clone, Deserialize)]
pub struct TickerFrame {
    /// Event type
    #[serde(rename = "e")]
    pub event_type: String,

    /// Event time (milliseconds)
    #[serde(rename = "E")]
    pub event_time: u64,

    /// Symbol
    #[serde(rename = "s")]
    pub symbol: String,

    /// Last traded price
    #[serde(rename = "c", deserialize_with = "deserialize_decimal")]
    pub last_price: Decimal,
}

/// Event type the venue uses for ticker frames
pub const TICKER_EVENT: &str = "24hrTicker";

/// Event type the venue uses for depth frames
pub const DEPTH_EVENT: &str = "depthUpdate";

/// Depth frame carrying bid/ask ladders as string-encoded pairs
#[derive(Debug, Clone, Deserialize)]
pub struct DepthFrame {
    /// Event type
    #[serde(rename = "e")]
    pub event_type: String,

    /// Event time (milliseconds)
    #[serde(rename = "E")]
    pub event_time: u64,

    /// Symbol
    #[serde(rename = "s")]
    pub symbol: String,

    /// Bid levels, highest interest first on the venue side
    #[serde(rename = "b", deserialize_with = "deserialize_levels")]
    pub bids: Vec<RawLevel>,

    /// Ask levels
    #[serde(rename = "a", deserialize_with = "deserialize_levels")]
    pub asks: Vec<RawLevel>,
}

/// Price/size pair as received from the venue
#[derive(Debug, Clone, PartialEq)]
pub struct RawLevel {
    pub price: Decimal,
    pub size: Decimal,
}

/// Subscribe control message sent on connect and reconnect
#[derive(Debug, Clone, Serialize)]
pub struct SubscribeRequest {
    pub method: &'static str,
    pub params: Vec<String>,
    pub id: u64,
}

impl SubscribeRequest {
    /// Build the subscribe message covering both the ticker and depth
    /// streams for a symbol, so one connection serves every consumer kind.
    pub fn for_symbol(symbol: &str, id: u64) -> Self {
        let s = symbol.to_lowercase();
        Self {
            method: "SUBSCRIBE",
            params: vec![format!("{s}@ticker"), format!("{s}@depth")],
            id,
        }
    }
}

/// Parsed inbound frame
#[derive(Debug, Clone)]
pub enum ParsedFrame {
    Ticker(TickerFrame),
    Depth(DepthFrame),
    Other(String),
}

impl ParsedFrame {
    /// Parse a raw WebSocket text frame.
    ///
    /// Frames that deserialize but carry an unexpected event type come back
    /// as `Other`; a serde failure on both shapes is a malformed frame and
    /// the caller drops it.
    pub fn parse(raw: &str) -> Result<Self, serde_json::Error> {
        if let Ok(ticker) = serde_json::from_str::<TickerFrame>(raw) {
            if ticker.event_type == TICKER_EVENT {
                return Ok(ParsedFrame::Ticker(ticker));
            }
        }

        if let Ok(depth) = serde_json::from_str::<DepthFrame>(raw) {
            if depth.event_type == DEPTH_EVENT {
                return Ok(ParsedFrame::Depth(depth));
            }
        }

        // Still valid JSON? Then it is a control response or an event kind
        // we do not route (e.g. the subscribe ack).
        let value: serde_json::Value = serde_json::from_str(raw)?;
        Ok(ParsedFrame::Other(value.to_string()))
    }
}

/// Custom deserializer for Decimal from string
fn deserialize_decimal<'de, D>(deserializer: D) -> Result<Decimal, D::Error>
where
    D: Deserializer<'de>,
{
    let s: &str = Deserialize::deserialize(deserializer)?;
    Decimal::from_str(s).map_err(serde::de::Error::custom)
}

/// Custom deserializer for levels from arrays of string pairs
fn deserialize_levels<'de, D>(deserializer: D) -> Result<Vec<RawLevel>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw: Vec<Vec<String>> = Deserialize::deserialize(deserializer)?;
    raw.into_iter()
        .map(|pair| {
            if pair.len() != 2 {
                return Err(serde::de::Error::custom("invalid level format"));
            }
            Ok(RawLevel {
                price: Decimal::from_str(&pair[0]).map_err(serde::de::Error::custom)?,
                size: Decimal::from_str(&pair[1]).map_err(serde::de::Error::custom)?,
            })
        })
        .collect()
}
