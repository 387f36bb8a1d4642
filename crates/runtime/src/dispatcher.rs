//! Applies decoded worker messages to [`BridgeState`] and republishes them as
//! [`BridgeEvent`]s.
//!
//! The dispatcher is the only writer of bridge state. Every mutation and the
//! event it produces happen under one lock, so subscribers observe events in
//! exactly the order the state changed, and a reader that takes a snapshot
//! after receiving an event sees at least that event's effect.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use parking_lot::Mutex;
use tokio::sync::broadcast;
use tracing::{debug, info, trace, warn};
use wabridge_protocol::{Line, ProtocolMessage, decode_line};

use crate::events::BridgeEvent;
use crate::state::{BridgeState, Phase};

const LOG_PREVIEW_CHARS: usize = 160;

pub struct Dispatcher {
	state: Mutex<BridgeState>,
	events: broadcast::Sender<BridgeEvent>,
	connects: AtomicU64,
}

impl Dispatcher {
	pub fn new(capacity: usize) -> Self {
		let (events, _) = broadcast::channel(capacity.max(1));
		Self {
			state: Mutex::new(BridgeState::default()),
			events,
			connects: AtomicU64::new(0),
		}
	}

	pub fn subscribe(&self) -> broadcast::Receiver<BridgeEvent> {
		self.events.subscribe()
	}

	pub fn snapshot(&self) -> BridgeState {
		self.state.lock().clone()
	}

	pub fn is_connected(&self) -> bool {
		self.state.lock().connected
	}

	pub fn is_monitoring(&self) -> bool {
		self.state.lock().monitoring
	}

	/// Number of `status: true` messages seen since creation.
	pub fn connect_count(&self) -> u64 {
		self.connects.load(Ordering::Relaxed)
	}

	/// A new worker process is up; state starts over.
	pub fn worker_started(&self) {
		let mut state = self.state.lock();
		*state = BridgeState {
			phase: Phase::Connecting,
			..BridgeState::default()
		};
	}

	/// Decodes one stdout line and dispatches it. Never fails.
	pub fn handle_line(&self, line: &str) {
		match decode_line(line) {
			Ok(Line::Blank) => {}
			Ok(Line::Diagnostic(text)) => {
				debug!(target = "wabridge.worker", line = %preview(text), "worker output");
			}
			Ok(Line::Message(message)) => self.dispatch(message),
			Err(e) if e.is_unknown_type() => {
				debug!(target = "wabridge", error = %e, "ignoring worker message");
			}
			Err(e) => {
				warn!(
					target = "wabridge",
					error = %e,
					line = %preview(line),
					"dropping worker line"
				);
			}
		}
	}

	/// Applies one message and publishes the resulting event.
	pub fn dispatch(&self, message: ProtocolMessage) {
		trace!(target = "wabridge", message = message.tag(), "dispatching");
		let mut state = self.state.lock();
		let event = match message {
			ProtocolMessage::QrCode { data } => {
				if state.connected {
					debug!(target = "wabridge", "QR code received while connected");
				}
				BridgeEvent::QrCodeReceived(data)
			}
			ProtocolMessage::ConnectionStatus { connected } => {
				if connected {
					self.connects.fetch_add(1, Ordering::Relaxed);
				}
				state.set_connected(connected);
				info!(target = "wabridge", connected, "connection status");
				BridgeEvent::ConnectionStatusChanged(connected)
			}
			ProtocolMessage::UserName { name } => {
				state.last_user_name.clone_from(&name);
				BridgeEvent::UserNameReceived(name)
			}
			ProtocolMessage::GroupList { groups, error } => {
				if let Some(error) = error {
					warn!(target = "wabridge", error = %error, "worker failed to list groups");
				}
				debug!(target = "wabridge", count = groups.len(), "group list replaced");
				state.groups.clone_from(&groups);
				BridgeEvent::GroupsUpdated(groups)
			}
			ProtocolMessage::Media(media) => {
				debug!(
					target = "wabridge",
					id = %media.id,
					mime = %media.mime_type,
					size = media.size_bytes,
					"media received"
				);
				BridgeEvent::MediaReceived(Arc::new(media))
			}
			ProtocolMessage::Text(text) => BridgeEvent::TextReceived(text),
			ProtocolMessage::MonitoringStatus { active } => {
				state.set_monitoring(active);
				info!(target = "wabridge", active, "monitoring status");
				BridgeEvent::MonitoringStatusChanged(active)
			}
			ProtocolMessage::ErrorNotice { message } => {
				warn!(target = "wabridge", message = %message, "worker reported error");
				BridgeEvent::Error(message)
			}
		};
		self.publish(event);
	}

	/// The worker process is gone.
	///
	/// Always reports disconnected and not monitoring, whatever the previous
	/// state, then the exit itself.
	pub fn worker_exited(&self, code: Option<i32>, expected: bool) {
		let mut state = self.state.lock();
		*state = BridgeState::default();
		self.publish(BridgeEvent::ConnectionStatusChanged(false));
		self.publish(BridgeEvent::MonitoringStatusChanged(false));
		self.publish(BridgeEvent::WorkerExited { code, expected });
	}

	/// Returns to defaults, announcing only the flags that were set.
	pub fn reset(&self) {
		let mut state = self.state.lock();
		let was_connected = state.connected;
		let was_monitoring = state.monitoring;
		*state = BridgeState::default();
		if was_connected {
			self.publish(BridgeEvent::ConnectionStatusChanged(false));
		}
		if was_monitoring {
			self.publish(BridgeEvent::MonitoringStatusChanged(false));
		}
	}

	fn publish(&self, event: BridgeEvent) {
		// No subscribers is fine.
		let _ = self.events.send(event);
	}
}

fn preview(line: &str) -> &str {
	match line.char_indices().nth(LOG_PREVIEW_CHARS) {
		Some((idx, _)) => &line[..idx],
		None => line,
	}
}

#[cfg(test)]
mod tests;
