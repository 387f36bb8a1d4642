//! Event rendering for the operator console.
//!
//! `json` prints one object per line with an `event` discriminator, suitable
//! for piping into other tools. Media bodies are never printed, only their
//! metadata.

use serde_json::{Value, json};
use wabridge::{BridgeEvent, BridgeState};

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, clap::ValueEnum)]
pub enum OutputFormat {
	/// Human-readable text
	#[default]
	Text,
	/// Newline-delimited JSON
	Json,
}

pub fn render_event(event: &BridgeEvent, format: OutputFormat) -> String {
	match format {
		OutputFormat::Text => event_text(event),
		OutputFormat::Json => event_json(event).to_string(),
	}
}

pub fn render_state(state: &BridgeState, format: OutputFormat) -> String {
	match format {
		OutputFormat::Text => format!(
			"phase={:?} connected={} monitoring={} user={} groups={}",
			state.phase,
			state.connected,
			state.monitoring,
			if state.last_user_name.is_empty() {
				"-"
			} else {
				state.last_user_name.as_str()
			},
			state.groups.len()
		),
		OutputFormat::Json => json!({ "event": "status", "state": state }).to_string(),
	}
}

fn event_text(event: &BridgeEvent) -> String {
	match event {
		BridgeEvent::QrCodeReceived(qr) => format!("qr: {qr}"),
		BridgeEvent::ConnectionStatusChanged(true) => "connected".to_string(),
		BridgeEvent::ConnectionStatusChanged(false) => "disconnected".to_string(),
		BridgeEvent::UserNameReceived(name) => format!("logged in as {name}"),
		BridgeEvent::GroupsUpdated(groups) => {
			let mut out = format!("{} group(s)", groups.len());
			for group in groups {
				out.push_str(&format!("\n  {}  {}", group.id, group.name));
			}
			out
		}
		BridgeEvent::MediaReceived(media) => format!(
			"media {} from {} ({}, {} bytes{})",
			media.id,
			display_sender(&media.sender_name, &media.author),
			media.mime_type,
			media.size_bytes,
			if media.filename.is_empty() {
				String::new()
			} else {
				format!(", {}", media.filename)
			}
		),
		BridgeEvent::TextReceived(text) => format!(
			"text from {}: {}",
			display_sender(&text.sender_name, &text.author),
			text.text
		),
		BridgeEvent::MonitoringStatusChanged(true) => "monitoring started".to_string(),
		BridgeEvent::MonitoringStatusChanged(false) => "monitoring stopped".to_string(),
		BridgeEvent::Error(message) => format!("worker error: {message}"),
		BridgeEvent::WorkerExited { code, expected } => {
			let code = code.map_or_else(|| "signal".to_string(), |c| c.to_string());
			if *expected {
				format!("worker stopped ({code})")
			} else {
				format!("worker exited unexpectedly ({code})")
			}
		}
	}
}

fn display_sender<'a>(name: &'a str, author: &'a str) -> &'a str {
	if !name.is_empty() {
		name
	} else if !author.is_empty() {
		author
	} else {
		"unknown"
	}
}

fn event_json(event: &BridgeEvent) -> Value {
	let name = event.name();
	match event {
		BridgeEvent::QrCodeReceived(qr) => json!({ "event": name, "qr": qr }),
		BridgeEvent::ConnectionStatusChanged(connected) => {
			json!({ "event": name, "connected": connected })
		}
		BridgeEvent::UserNameReceived(user) => json!({ "event": name, "name": user }),
		BridgeEvent::GroupsUpdated(groups) => json!({ "event": name, "groups": groups }),
		BridgeEvent::MediaReceived(media) => json!({
			"event": name,
			"id": media.id,
			"from": media.from,
			"author": media.author,
			"senderName": media.sender_name,
			"mimeType": media.mime_type,
			"filename": media.filename,
			"size": media.size_bytes,
			"timestamp": media.timestamp_unix,
		}),
		BridgeEvent::TextReceived(text) => json!({ "event": name, "message": text }),
		BridgeEvent::MonitoringStatusChanged(active) => json!({ "event": name, "active": active }),
		BridgeEvent::Error(message) => json!({ "event": name, "message": message }),
		BridgeEvent::WorkerExited { code, expected } => {
			json!({ "event": name, "code": code, "expected": expected })
		}
	}
}
