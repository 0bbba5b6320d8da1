//! Push-channel frame processing loop.
//!
//! Reads raw frames from a handshaken [`PushConnection`](crate::client::PushConnection),
//! answers Engine.IO heartbeats, decodes Socket.IO events into typed
//! [`ServerEvent`]s, and forwards scan updates to the subscriber.

use std::time::Duration;

use futures::{SinkExt, StreamExt};
use tokio::sync::mpsc;
use tokio_tungstenite::tungstenite::Message;
use tokio_util::sync::CancellationToken;

use crate::client::WsStream;
use crate::events::PushMessage;
use crate::messages::{parse_event, EventParseError, ServerEvent};
use crate::packet::{EnginePacket, SocketPacket};

/// Why a processing session stopped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionEnd {
    /// The subscription was torn down.
    Cancelled,
    /// Nobody is listening for messages any more.
    ReceiverClosed,
    /// The connection dropped or the server ended the session.
    Dropped,
}

/// What to do after handling one frame.
enum Flow {
    Continue,
    Stop(SessionEnd),
}

/// Process frames from one push connection.
///
/// Loops until cancellation, until the receiver is dropped, or until the
/// connection ends: a close frame, an Engine.IO `close`, a Socket.IO
/// `disconnect`, a receive error, or silence longer than `heartbeat`.
pub async fn process_frames(
    ws_stream: &mut WsStream,
    heartbeat: Duration,
    tx: &mpsc::Sender<PushMessage>,
    cancel: &CancellationToken,
) -> SessionEnd {
    loop {
        let next = tokio::select! {
            _ = cancel.cancelled() => None,
            frame = tokio::time::timeout(heartbeat, ws_stream.next()) => Some(frame),
        };

        let Some(next) = next else {
            let _ = ws_stream
                .send(Message::Text(EnginePacket::Close.encode()))
                .await;
            let _ = ws_stream.close(None).await;
            return SessionEnd::Cancelled;
        };

        let frame = match next {
            Ok(frame) => frame,
            Err(_) => {
                tracing::warn!(
                    heartbeat_ms = heartbeat.as_millis() as u64,
                    "No heartbeat from push channel"
                );
                return SessionEnd::Dropped;
            }
        };

        match frame {
            Some(Ok(Message::Text(text))) => {
                if let Flow::Stop(end) = handle_text_frame(ws_stream, &text, tx, cancel).await {
                    return end;
                }
            }
            Some(Ok(Message::Binary(_))) => {
                tracing::trace!("Ignoring binary frame");
            }
            Some(Ok(Message::Ping(_) | Message::Pong(_))) => {
                // Handled automatically by tungstenite.
            }
            Some(Ok(Message::Close(frame))) => {
                tracing::info!(?frame, "Push channel WebSocket closed");
                return SessionEnd::Dropped;
            }
            Some(Ok(Message::Frame(_))) => {}
            Some(Err(e)) => {
                tracing::error!(error = %e, "Push channel receive error");
                return SessionEnd::Dropped;
            }
            None => {
                tracing::info!("Push channel stream exhausted");
                return SessionEnd::Dropped;
            }
        }
    }
}

/// Dispatch a single text frame.
async fn handle_text_frame(
    ws_stream: &mut WsStream,
    text: &str,
    tx: &mpsc::Sender<PushMessage>,
    cancel: &CancellationToken,
) -> Flow {
    let packet = match EnginePacket::decode(text) {
        Ok(packet) => packet,
        Err(e) => {
            tracing::warn!(error = %e, raw_frame = %text, "Failed to decode Engine.IO packet");
            return Flow::Continue;
        }
    };

    match packet {
        EnginePacket::Ping(data) => {
            if let Err(e) = ws_stream
                .send(Message::Text(EnginePacket::Pong(data).encode()))
                .await
            {
                tracing::error!(error = %e, "Failed to answer heartbeat");
                return Flow::Stop(SessionEnd::Dropped);
            }
            Flow::Continue
        }
        EnginePacket::Message(data) => handle_socket_packet(&data, tx, cancel).await,
        EnginePacket::Close => {
            tracing::info!("Server closed the Engine.IO session");
            Flow::Stop(SessionEnd::Dropped)
        }
        EnginePacket::Open(_) | EnginePacket::Pong(_) | EnginePacket::Upgrade | EnginePacket::Noop => {
            Flow::Continue
        }
    }
}

async fn handle_socket_packet(
    data: &str,
    tx: &mpsc::Sender<PushMessage>,
    cancel: &CancellationToken,
) -> Flow {
    let packet = match SocketPacket::decode(data) {
        Ok(packet) => packet,
        Err(e) => {
            tracing::warn!(error = %e, raw_packet = %data, "Failed to decode Socket.IO packet");
            return Flow::Continue;
        }
    };

    match packet {
        SocketPacket::Event { name, args, .. } => match parse_event(&name, &args) {
            Ok(ServerEvent::ScanUpdate(update)) => {
                tracing::debug!(id = update.id, scan_count = update.scan_count, "Scan update");
                match forward(tx, PushMessage::ScanUpdate(update), cancel).await {
                    Ok(()) => Flow::Continue,
                    Err(end) => Flow::Stop(end),
                }
            }
            Err(EventParseError::UnknownEvent(name)) => {
                tracing::debug!(event = %name, "Ignoring unknown push event");
                Flow::Continue
            }
            Err(e) => {
                tracing::warn!(error = %e, "Failed to parse push event");
                Flow::Continue
            }
        },
        SocketPacket::Disconnect { namespace } => {
            tracing::info!(namespace = %namespace, "Server disconnected the namespace");
            Flow::Stop(SessionEnd::Dropped)
        }
        other => {
            tracing::debug!(packet = ?other, "Ignoring Socket.IO packet");
            Flow::Continue
        }
    }
}

/// Deliver `message`, giving up if the subscription is cancelled while the
/// channel is full.
pub(crate) async fn forward(
    tx: &mpsc::Sender<PushMessage>,
    message: PushMessage,
    cancel: &CancellationToken,
) -> Result<(), SessionEnd> {
    tokio::select! {
        _ = cancel.cancelled() => Err(SessionEnd::Cancelled),
        sent = tx.send(message) => sent.map_err(|_| SessionEnd::ReceiverClosed),
    }
}
