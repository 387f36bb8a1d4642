//! WhatsApp worker bridge runtime.
//!
//! Supervises the Node.js worker that drives the WhatsApp Web session and
//! exposes it as an async command/event API:
//!
//! - **Locate & launch**: find Node.js and the worker script, spawn with piped
//!   stdio, purge the session directory first
//! - **Transport**: newline-delimited JSON over stdin/stdout
//! - **Dispatch**: decode each stdout line, update [`BridgeState`], publish a
//!   [`BridgeEvent`]
//! - **Supervision**: report crashes as state changes, relaunch with backoff,
//!   escalate slow shutdowns to a kill
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────┐  commands   ┌──────────────┐  stdin   ┌────────┐
//! │    Bridge    ├────────────►│  WorkerLink  ├─────────►│        │
//! └──────┬───────┘             └──────────────┘          │ worker │
//!        │ subscribe                                     │ (node) │
//! ┌──────▼───────┐   lines     ┌──────────────┐  stdout  │        │
//! │  Dispatcher  │◄────────────┤  Supervisor  │◄─────────┤        │
//! └──────────────┘             └──────────────┘          └────────┘
//! ```
//!
//! Commands are fire-and-forget: the wire protocol has no request ids, so a
//! command's effect is only visible through later events.

mod bridge;
pub mod cleanup;
pub mod config;
mod dispatcher;
pub mod error;
pub mod events;
pub mod locate;
pub mod service;
pub mod state;
mod supervisor;
pub mod testing;
pub mod transport;
pub mod worker;

pub use bridge::Bridge;
pub use config::{BridgeConfig, RestartPolicy};
pub use error::{Error, Result};
pub use events::BridgeEvent;
pub use service::WorkerBridge;
pub use state::{BridgeState, Phase};
pub use wabridge_protocol::{Command, GroupRef, MediaPayload, ProtocolMessage, TextPayload};
