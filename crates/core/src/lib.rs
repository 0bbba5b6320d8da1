//! Domain types and pure state logic for the QR Tracker client.
//!
//! Nothing in this crate performs I/O. The client crate owns the network
//! side and drives these types from its controllers.

pub mod credentials;
pub mod edit;
pub mod error;
pub mod generate;
pub mod notice;
pub mod qr_code;
pub mod screen;
pub mod types;
pub mod working_set;
