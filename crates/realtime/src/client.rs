//! WebSocket client for the DuoTrack socket server.
//!
//! [`RealtimeClient`] holds the endpoint. Call [`RealtimeClient::connect`]
//! to establish a live [`RealtimeConnection`].

use tokio_tungstenite::{connect_async, MaybeTlsStream, WebSocketStream};

pub type WsStream = WebSocketStream<MaybeTlsStream<tokio::net::TcpStream>>;

/// Connection configuration for the socket server.
#[derive(Debug, Clone)]
pub struct RealtimeClient {
    ws_url: String,
}

/// A live WebSocket connection.
pub struct RealtimeConnection {
    pub ws_stream: WsStream,
}

impl RealtimeClient {
    /// * `ws_url` - socket endpoint, e.g. `ws://host:8000/ws`.
    pub fn new(ws_url: impl Into<String>) -> Self {
        Self {
            ws_url: ws_url.into(),
        }
    }

    pub fn ws_url(&self) -> &str {
        &self.ws_url
    }

    pub async fn connect(&self) -> Result<RealtimeConnection, RealtimeError> {
        let (ws_stream, _response) = connect_async(self.ws_url.as_str()).await.map_err(|e| {
            RealtimeError::Connection(format!("Failed to connect to {}: {e}", self.ws_url))
        })?;

        tracing::info!(url = %self.ws_url, "Socket connected");

        Ok(RealtimeConnection { ws_stream })
    }
}

#[derive(Debug, thiserror::Error)]
pub enum RealtimeError {
    /// Failed to establish the WebSocket connection.
    #[error("Connection error: {0}")]
    Connection(String),

    /// An outbound event could not be encoded.
    #[error("Encode error: {0}")]
    Encode(#[from] serde_json::Error),

    /// The transport failed on an established connection.
    #[error("Transport error: {0}")]
    Transport(#[from] tokio_tungstenite::tungstenite::Error),
}
