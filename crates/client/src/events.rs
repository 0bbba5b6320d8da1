//! Messages the push subscription delivers to the dashboard.
//!
//! These are produced by the subscription task after interpreting raw
//! Socket.IO packets, and consumed by whoever owns the working set.

use qrtrack_core::qr_code::ScanUpdate;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PushMessage {
    /// The Socket.IO session was established (or re-established).
    Connected { sid: String },

    /// The session ended; the subscription is reconnecting.
    Disconnected,

    /// A code's scan counter changed on the server.
    ScanUpdate(ScanUpdate),
}
