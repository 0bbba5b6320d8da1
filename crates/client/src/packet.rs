//! Engine.IO v4 and Socket.IO v5 text packet codec.
//!
//! The push channel runs Socket.IO over a raw WebSocket. Every text frame
//! is one Engine.IO packet: a single type digit followed by an optional
//! payload. Engine.IO `message` packets in turn carry one Socket.IO packet:
//!
//! ```text
//! <type>[<namespace>,][<ack id>][<json>]
//! ```
//!
//! e.g. `42["scan_update",{"id":1,"scan_count":9}]` is an Engine.IO message
//! (`4`) wrapping a Socket.IO event (`2`) on the default namespace.
//! Binary attachments are not used by the QR Tracker server and are
//! rejected.

use std::time::Duration;

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Engine.IO protocol revision sent in the handshake query.
pub const ENGINE_IO_VERSION: u8 = 4;

/// Namespace every QR Tracker event is emitted on.
pub const DEFAULT_NAMESPACE: &str = "/";

/// Payload of the Engine.IO `open` packet.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OpenHandshake {
    pub sid: String,
    #[serde(default)]
    pub upgrades: Vec<String>,
    /// Milliseconds between server pings.
    pub ping_interval: u64,
    /// Milliseconds the server waits for a pong.
    pub ping_timeout: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_payload: Option<u64>,
}

impl OpenHandshake {
    /// Longest silence tolerated before the connection is considered dead.
    pub fn heartbeat_window(&self) -> Duration {
        Duration::from_millis(self.ping_interval.saturating_add(self.ping_timeout))
    }
}

/// One Engine.IO packet.
#[derive(Debug, Clone, PartialEq)]
pub enum EnginePacket {
    Open(OpenHandshake),
    Close,
    Ping(String),
    Pong(String),
    /// Carries an encoded Socket.IO packet.
    Message(String),
    Upgrade,
    Noop,
}

impl EnginePacket {
    pub fn decode(frame: &str) -> Result<Self, PacketError> {
        let (kind, rest) = split_type(frame)?;
        match kind {
            '0' => Ok(EnginePacket::Open(serde_json::from_str(rest)?)),
            '1' => Ok(EnginePacket::Close),
            '2' => Ok(EnginePacket::Ping(rest.to_string())),
            '3' => Ok(EnginePacket::Pong(rest.to_string())),
            '4' => Ok(EnginePacket::Message(rest.to_string())),
            '5' => Ok(EnginePacket::Upgrade),
            '6' => Ok(EnginePacket::Noop),
            other => Err(PacketError::UnknownType(other)),
        }
    }

    pub fn encode(&self) -> String {
        match self {
            EnginePacket::Open(handshake) => {
                // OpenHandshake only holds strings and integers.
                let json = serde_json::to_string(handshake).unwrap_or_default();
                format!("0{json}")
            }
            EnginePacket::Close => "1".to_string(),
            EnginePacket::Ping(data) => format!("2{data}"),
            EnginePacket::Pong(data) => format!("3{data}"),
            EnginePacket::Message(data) => format!("4{data}"),
            EnginePacket::Upgrade => "5".to_string(),
            EnginePacket::Noop => "6".to_string(),
        }
    }
}

/// One Socket.IO packet.
#[derive(Debug, Clone, PartialEq)]
pub enum SocketPacket {
    Connect {
        namespace: String,
        payload: Option<Value>,
    },
    Disconnect {
        namespace: String,
    },
    Event {
        namespace: String,
        ack_id: Option<u64>,
        name: String,
        args: Vec<Value>,
    },
    Ack {
        namespace: String,
        ack_id: u64,
        args: Vec<Value>,
    },
    ConnectError {
        namespace: String,
        payload: Option<Value>,
    },
}

impl SocketPacket {
    /// CONNECT request for the default namespace.
    pub fn connect_default() -> Self {
        SocketPacket::Connect {
            namespace: DEFAULT_NAMESPACE.to_string(),
            payload: None,
        }
    }

    pub fn namespace(&self) -> &str {
        match self {
            SocketPacket::Connect { namespace, .. }
            | SocketPacket::Disconnect { namespace }
            | SocketPacket::Event { namespace, .. }
            | SocketPacket::Ack { namespace, .. }
            | SocketPacket::ConnectError { namespace, .. } => namespace,
        }
    }

    pub fn decode(data: &str) -> Result<Self, PacketError> {
        let (kind, rest) = split_type(data)?;
        if matches!(kind, '5' | '6') {
            return Err(PacketError::BinaryUnsupported);
        }

        let (namespace, rest) = split_namespace(rest);
        let (ack_id, json) = split_ack_id(rest)?;

        match kind {
            '0' => Ok(SocketPacket::Connect {
                namespace,
                payload: optional_json(json)?,
            }),
            '1' => Ok(SocketPacket::Disconnect { namespace }),
            '2' => {
                let mut args = json_array(json)?.into_iter();
                let name = match args.next() {
                    Some(Value::String(name)) => name,
                    _ => {
                        return Err(PacketError::Malformed(
                            "event payload must start with the event name".into(),
                        ))
                    }
                };
                Ok(SocketPacket::Event {
                    namespace,
                    ack_id,
                    name,
                    args: args.collect(),
                })
            }
            '3' => {
                let ack_id = ack_id
                    .ok_or_else(|| PacketError::Malformed("ack packet without an id".into()))?;
                Ok(SocketPacket::Ack {
                    namespace,
                    ack_id,
                    args: json_array(json)?,
                })
            }
            '4' => Ok(SocketPacket::ConnectError {
                namespace,
                payload: optional_json(json)?,
            }),
            other => Err(PacketError::UnknownType(other)),
        }
    }

    pub fn encode(&self) -> String {
        let (kind, ack_id, json) = match self {
            SocketPacket::Connect { payload, .. } => ('0', None, payload.as_ref().map(Value::to_string)),
            SocketPacket::Disconnect { .. } => ('1', None, None),
            SocketPacket::Event {
                ack_id, name, args, ..
            } => {
                let mut items = Vec::with_capacity(args.len() + 1);
                items.push(Value::String(name.clone()));
                items.extend(args.iter().cloned());
                ('2', *ack_id, Some(Value::Array(items).to_string()))
            }
            SocketPacket::Ack { ack_id, args, .. } => {
                ('3', Some(*ack_id), Some(Value::Array(args.clone()).to_string()))
            }
            SocketPacket::ConnectError { payload, .. } => {
                ('4', None, payload.as_ref().map(Value::to_string))
            }
        };

        let mut out = String::new();
        out.push(kind);
        let namespace = self.namespace();
        if namespace != DEFAULT_NAMESPACE {
            out.push_str(namespace);
            out.push(',');
        }
        if let Some(id) = ack_id {
            out.push_str(&id.to_string());
        }
        if let Some(json) = json {
            out.push_str(&json);
        }
        out
    }

    /// Wrap this packet in an Engine.IO message frame.
    pub fn into_frame(self) -> String {
        EnginePacket::Message(self.encode()).encode()
    }
}

/// Errors raised while decoding a packet.
#[derive(Debug, thiserror::Error)]
pub enum PacketError {
    #[error("empty packet")]
    Empty,

    #[error("unknown packet type {0:?}")]
    UnknownType(char),

    #[error("binary packets are not supported")]
    BinaryUnsupported,

    #[error("malformed JSON payload: {0}")]
    Payload(#[from] serde_json::Error),

    #[error("malformed packet: {0}")]
    Malformed(String),
}

// ---- private helpers ----

fn split_type(data: &str) -> Result<(char, &str), PacketError> {
    let kind = data.chars().next().ok_or(PacketError::Empty)?;
    Ok((kind, &data[kind.len_utf8()..]))
}

/// A namespace starts with `/` and runs up to the first comma.
fn split_namespace(data: &str) -> (String, &str) {
    if !data.starts_with('/') {
        return (DEFAULT_NAMESPACE.to_string(), data);
    }
    match data.find(',') {
        Some(idx) => (data[..idx].to_string(), &data[idx + 1..]),
        None => (data.to_string(), ""),
    }
}

fn split_ack_id(data: &str) -> Result<(Option<u64>, &str), PacketError> {
    let digits = data.bytes().take_while(u8::is_ascii_digit).count();
    if digits == 0 {
        return Ok((None, data));
    }
    let id = data[..digits]
        .parse()
        .map_err(|_| PacketError::Malformed(format!("ack id {:?} out of range", &data[..digits])))?;
    Ok((Some(id), &data[digits..]))
}

fn optional_json(data: &str) -> Result<Option<Value>, PacketError> {
    if data.is_empty() {
        return Ok(None);
    }
    Ok(Some(serde_json::from_str(data)?))
}

fn json_array(data: &str) -> Result<Vec<Value>, PacketError> {
    match serde_json::from_str::<Value>(data)? {
        Value::Array(items) => Ok(items),
        _ => Err(PacketError::Malformed("expected a JSON array".into())),
    }
}
