//! `qrtrack` terminal front-end library crate.
//!
//! Exposes the command parser, the text renderer, and the screen loop for
//! integration testing. The binary entrypoint lives in `main.rs`.

pub mod app;
pub mod command;
pub mod render;
