//! Operator console for the WhatsApp worker bridge.
//!
//! `wabridge run` launches the worker, prints every bridge event to stdout and
//! accepts commands on stdin. `wabridge check` resolves the runtime, script
//! and session paths without launching anything.

pub mod cli;
pub mod commands;
pub mod console;
pub mod logging;
pub mod operator;
pub mod output;
