//! QR Tracker HTTP and push-channel client library.
//!
//! Provides the REST API wrapper, an Engine.IO / Socket.IO packet codec,
//! a reconnecting push subscription that streams scan updates, and the
//! session and dashboard controllers that tie them to the domain state in
//! `qrtrack-core`.

pub mod api;
pub mod client;
pub mod config;
pub mod dashboard;
pub mod download;
pub mod events;
pub mod messages;
pub mod notices;
pub mod packet;
pub mod processor;
pub mod reconnect;
pub mod session;
pub mod subscription;
