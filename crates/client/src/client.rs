//! WebSocket client for the QR Tracker push channel.
//!
//! [`PushClient`] holds the push endpoint for one back-end. Call
//! [`PushClient::connect`] to open the WebSocket and complete both the
//! Engine.IO and the Socket.IO handshakes, yielding a live
//! [`PushConnection`].

use std::time::Duration;

use futures::{SinkExt, StreamExt};
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{connect_async, MaybeTlsStream};

use crate::packet::{EnginePacket, OpenHandshake, SocketPacket, DEFAULT_NAMESPACE, ENGINE_IO_VERSION};

/// How long each handshake step may take before the attempt is abandoned.
pub const HANDSHAKE_TIMEOUT: Duration = Duration::from_secs(10);

pub type WsStream = tokio_tungstenite::WebSocketStream<MaybeTlsStream<tokio::net::TcpStream>>;

/// Configuration handle for the push channel of one back-end.
#[derive(Debug, Clone)]
pub struct PushClient {
    push_url: String,
}

/// A live, handshaken push connection.
pub struct PushConnection {
    /// Socket.IO session id for the default namespace.
    pub sid: String,
    /// Engine.IO parameters announced by the server.
    pub handshake: OpenHandshake,
    /// The raw WebSocket stream for reading/writing frames.
    pub ws_stream: WsStream,
}

impl std::fmt::Debug for PushConnection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PushConnection")
            .field("sid", &self.sid)
            .field("handshake", &self.handshake)
            .finish_non_exhaustive()
    }
}

impl PushClient {
    /// * `push_url` - WebSocket base URL, e.g. `ws://localhost:5000`.
    pub fn new(push_url: impl Into<String>) -> Self {
        let push_url = push_url.into().trim_end_matches('/').to_string();
        Self { push_url }
    }

    /// WebSocket base URL (e.g. `ws://localhost:5000`).
    pub fn push_url(&self) -> &str {
        &self.push_url
    }

    /// Full Socket.IO endpoint for the WebSocket transport.
    pub fn endpoint(&self) -> String {
        format!(
            "{}/socket.io/?EIO={ENGINE_IO_VERSION}&transport=websocket",
            self.push_url
        )
    }

    /// Connect and join the default namespace.
    ///
    /// Waits for the Engine.IO `open` packet, sends a Socket.IO CONNECT,
    /// and waits for the server to acknowledge it. Pings that arrive during
    /// the handshake are answered.
    pub async fn connect(&self) -> Result<PushConnection, PushError> {
        let endpoint = self.endpoint();
        let (mut ws_stream, _response) = connect_async(endpoint.as_str()).await.map_err(|e| {
            PushError::Connection(format!(
                "Failed to connect to push channel at {}: {e}",
                self.push_url
            ))
        })?;

        let handshake = match next_engine_packet(&mut ws_stream).await? {
            EnginePacket::Open(handshake) => handshake,
            other => {
                return Err(PushError::Handshake(format!(
                    "expected an open packet, got {other:?}"
                )))
            }
        };

        ws_stream
            .send(Message::Text(SocketPacket::connect_default().into_frame()))
            .await
            .map_err(|e| PushError::Protocol(e.to_string()))?;

        let sid = loop {
            match next_engine_packet(&mut ws_stream).await? {
                EnginePacket::Ping(data) => {
                    ws_stream
                        .send(Message::Text(EnginePacket::Pong(data).encode()))
                        .await
                        .map_err(|e| PushError::Protocol(e.to_string()))?;
                }
                EnginePacket::Message(data) => match SocketPacket::decode(&data)? {
                    SocketPacket::Connect { namespace, payload } if namespace == DEFAULT_NAMESPACE => {
                        break payload
                            .as_ref()
                            .and_then(|p| p.get("sid"))
                            .and_then(|sid| sid.as_str())
                            .unwrap_or(handshake.sid.as_str())
                            .to_string();
                    }
                    SocketPacket::ConnectError { payload, .. } => {
                        let reason = payload
                            .as_ref()
                            .and_then(|p| p.get("message"))
                            .and_then(|m| m.as_str())
                            .unwrap_or("connection refused")
                            .to_string();
                        return Err(PushError::Rejected(reason));
                    }
                    other => {
                        tracing::debug!(packet = ?other, "Ignoring packet during handshake");
                    }
                },
                EnginePacket::Close => {
                    return Err(PushError::Handshake("server closed during handshake".into()))
                }
                _ => {}
            }
        };

        tracing::info!(
            sid = %sid,
            push_url = %self.push_url,
            ping_interval_ms = handshake.ping_interval,
            "Connected to push channel",
        );

        Ok(PushConnection {
            sid,
            handshake,
            ws_stream,
        })
    }
}

/// Read the next text frame as an Engine.IO packet, within
/// [`HANDSHAKE_TIMEOUT`].
async fn next_engine_packet(ws_stream: &mut WsStream) -> Result<EnginePacket, PushError> {
    loop {
        let frame = tokio::time::timeout(HANDSHAKE_TIMEOUT, ws_stream.next())
            .await
            .map_err(|_| PushError::Handshake("timed out waiting for the server".into()))?;

        match frame {
            Some(Ok(Message::Text(text))) => return Ok(EnginePacket::decode(&text)?),
            Some(Ok(Message::Close(frame))) => {
                return Err(PushError::Handshake(format!(
                    "server closed the WebSocket: {frame:?}"
                )))
            }
            Some(Ok(_)) => {}
            Some(Err(e)) => return Err(PushError::Protocol(e.to_string())),
            None => return Err(PushError::Handshake("WebSocket stream ended".into())),
        }
    }
}

/// Errors that can occur when working with the push channel.
#[derive(Debug, thiserror::Error)]
pub enum PushError {
    /// Failed to establish the WebSocket connection.
    #[error("Connection error: {0}")]
    Connection(String),

    /// The server did not complete the Engine.IO or Socket.IO handshake.
    #[error("Handshake error: {0}")]
    Handshake(String),

    /// The server refused to join the namespace.
    #[error("Connection rejected: {0}")]
    Rejected(String),

    /// A protocol-level error on an already-established connection.
    #[error("Protocol error: {0}")]
    Protocol(String),
}

impl From<crate::packet::PacketError> for PushError {
    fn from(e: crate::packet::PacketError) -> Self {
        PushError::Protocol(e.to_string())
    }
}
