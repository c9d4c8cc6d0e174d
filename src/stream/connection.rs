//! WebSocket connection to the venue for one subscription target
//!
//! Handles connect, the subscribe handshake, and message reception.

use futures_util::{SinkExt, StreamExt};
use tokio::net::TcpStream;
use tokio_tungstenite::{
    connect_async,
    tungstenite::protocol::Message,
    MaybeTlsStream, WebSocketStream,
};
use tracing::{debug, error, info, warn};

use crate::error::{Result, SwapCoreError};
use crate::parser::SubscribeRequest;

type WsStream = WebSocketStream<MaybeTlsStream<TcpStream>>;

/// A single duplex streaming channel, one per subscribed symbol
pub struct StreamConnection {
    stream: Option<WsStream>,
    endpoint: String,
    symbol: String,
    next_request_id: u64,
}

impl StreamConnection {
    pub fn new(endpoint: &str, symbol: &str) -> Self {
        Self {
            stream: None,
            endpoint: endpoint.to_string(),
            symbol: symbol.to_string(),
            next_request_id: 1,
        }
    }

    /// Connect to the venue and send the subscribe request for this
    /// symbol's ticker and depth streams. Also used for reconnects: the
    /// subscribe message goes out on every new connection before any
    /// routing resumes.
    pub async fn connect(&mut self) -> Result<()> {
        info!(endpoint = %self.endpoint, symbol = %self.symbol, "connecting stream");

        let (ws_stream, response) = connect_async(&self.endpoint)
            .await
            .map_err(|e| SwapCoreError::Connection(format!("failed to connect: {e}")))?;

        debug!(status = ?response.status(), symbol = %self.symbol, "stream connected");
        self.stream = Some(ws_stream);
        self.send_subscribe().await?;

        Ok(())
    }

    async fn send_subscribe(&mut self) -> Result<()> {
        let request = SubscribeRequest::for_symbol(&self.symbol, self.next_request_id);
        self.next_request_id += 1;

        let payload = serde_json::to_string(&request)?;
        let stream = self
            .stream
            .as_mut()
            .ok_or_else(|| SwapCoreError::Connection("not connected".to_string()))?;
        stream
            .send(Message::Text(payload))
            .await
            .map_err(|e| SwapCoreError::Stream(e.to_string()))?;

        info!(symbol = %self.symbol, id = request.id, "subscribe request sent");
        Ok(())
    }

    /// Receive the next text frame. `Ok(None)` means a control frame was
    /// handled and the caller should keep polling.
    pub async fn recv(&mut self) -> Result<Option<String>> {
        let stream = self
            .stream
            .as_mut()
            .ok_or_else(|| SwapCoreError::Connection("not connected".to_string()))?;

        match stream.next().await {
            Some(Ok(Message::Text(text))) => {
                debug!(len = text.len(), "received text frame");
                Ok(Some(text))
            }
            Some(Ok(Message::Binary(data))) => {
                let text = String::from_utf8_lossy(&data).to_string();
                Ok(Some(text))
            }
            Some(Ok(Message::Ping(data))) => {
                debug!("received ping, sending pong");
                if let Some(stream) = self.stream.as_mut() {
                    let _ = stream.send(Message::Pong(data)).await;
                }
                Ok(None)
            }
            Some(Ok(Message::Pong(_))) => Ok(None),
            Some(Ok(Message::Close(frame))) => {
                warn!(frame = ?frame, symbol = %self.symbol, "received close frame");
                self.stream = None;
                Err(SwapCoreError::Connection("connection closed".to_string()))
            }
            Some(Ok(Message::Frame(_))) => Ok(None),
            Some(Err(e)) => {
                error!(error = %e, symbol = %self.symbol, "stream error");
                self.stream = None;
                Err(SwapCoreError::Stream(e.to_string()))
            }
            None => {
                warn!(symbol = %self.symbol, "stream ended");
                self.stream = None;
                Err(SwapCoreError::Connection("stream ended".to_string()))
            }
        }
    }

    /// Check if connected
    pub fn is_connected(&self) -> bool {
        self.stream.is_some()
    }

    /// Close the connection
    pub async fn close(&mut self) {
        if let Some(mut stream) = self.stream.take() {
            let _ = stream.close(None).await;
        }
    }
}
