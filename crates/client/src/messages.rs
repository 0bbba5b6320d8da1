//! Typed server events carried by the push channel.
//!
//! The QR Tracker back-end emits Socket.IO events of the shape
//! `["<name>", <payload>]`. This module turns a decoded event into a
//! strongly-typed [`ServerEvent`].

use qrtrack_core::qr_code::ScanUpdate;
use serde::Deserialize;
use serde_json::Value;

/// Event emitted whenever a code is scanned.
pub const SCAN_UPDATE_EVENT: &str = "scan_update";

/// All known server events.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ServerEvent {
    /// A code's authoritative scan counter changed.
    ScanUpdate(ScanUpdate),
}

/// Errors raised while interpreting an event.
#[derive(Debug, thiserror::Error)]
pub enum EventParseError {
    #[error("unknown event {0:?}")]
    UnknownEvent(String),

    #[error("event {0:?} carries no payload")]
    MissingPayload(&'static str),

    #[error("malformed payload: {0}")]
    Payload(#[from] serde_json::Error),
}

/// Interpret a Socket.IO event by name and arguments.
///
/// Returns `Err` for unknown events and malformed payloads. Callers
/// should log and continue.
pub fn parse_event(name: &str, args: &[Value]) -> Result<ServerEvent, EventParseError> {
    match name {
        SCAN_UPDATE_EVENT => {
            let payload = args
                .first()
                .ok_or(EventParseError::MissingPayload(SCAN_UPDATE_EVENT))?;
            let update = ScanUpdate::deserialize(payload)?;
            Ok(ServerEvent::ScanUpdate(update))
        }
        other => Err(EventParseError::UnknownEvent(other.to_string())),
    }
}
