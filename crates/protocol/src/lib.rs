//! Wire types for the WhatsApp worker protocol.
//!
//! The worker is a long-lived Node.js process that drives a headless browser
//! session and talks to the host over line-delimited JSON on stdio:
//!
//! - **stdout**: one [`ProtocolMessage`] per line, interleaved with the
//!   worker's own diagnostic output (anything not starting with `{`)
//! - **stdin**: one [`Command`] per line
//!
//! This crate is the "protocol layer": the shapes of data as they appear on
//! the wire and the line codec that converts between text and typed values.
//! It performs no I/O.
//!
//! # Main Types
//!
//! - [`ProtocolMessage`] - decoded worker-to-host message
//! - [`Command`] - host-to-worker command
//! - [`Line`] - classification of one line of worker stdout
//! - [`DecodeError`] - why a candidate line was dropped

mod codec;
mod command;
mod error;
mod lenient;
mod message;

pub use codec::{Line, decode_line};
pub use command::Command;
pub use error::DecodeError;
pub use message::{GroupRef, MediaPayload, ProtocolMessage, TextPayload};
