//! Error types for the streaming swap core

use thiserror::Error;

use crate::transaction::TransactionState;

/// Errors surfaced by the streaming core and the quote engine
#[derive(Error, Debug)]
pub enum SwapCoreError {
    #[error("stream connection error: {0}")]
    Connection(String),

    #[error("stream message error: {0}")]
    Stream(String),

    #[error("malformed frame: {0}")]
    MalformedFrame(String),

    #[error("missing quote input: {0}")]
    MissingInput(&'static str),

    #[error("division undefined: quote denominator is zero")]
    DivisionUndefined,

    #[error("transaction still in flight")]
    TransactionInFlight,

    #[error("invalid transaction transition from {from:?}")]
    InvalidTransition { from: TransactionState },
}

impl From<tokio_tungstenite::tungstenite::Error> for SwapCoreError {
    fn from(err: tokio_tungstenite::tungstenite::Error) -> Self {
        SwapCoreError::Connection(err.to_string())
    }
}

impl From<serde_json::Error> for SwapCoreError {
    fn from(err: serde_json::Error) -> Self {
        SwapCoreError::MalformedFrame(err.to_string())
    }
}

pub type Result<T> = std::result::Result<T, SwapCoreError>;
