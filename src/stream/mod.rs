//! Streaming subsystem: per-symbol venue connections and their manager

mod connection;
mod manager;

pub use connection::StreamConnection;
pub use manager::{SubscriptionHandle, SubscriptionManager};
