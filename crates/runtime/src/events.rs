//! Events published to bridge subscribers.

use std::sync::Arc;

use wabridge_protocol::{GroupRef, MediaPayload, TextPayload};

/// A typed notification from the bridge.
///
/// Delivered over a broadcast channel in the order the worker produced the
/// underlying messages. Media bodies can be large, so they are shared rather
/// than cloned per subscriber.
#[derive(Debug, Clone, PartialEq)]
pub enum BridgeEvent {
	QrCodeReceived(String),
	ConnectionStatusChanged(bool),
	UserNameReceived(String),
	/// Full group list; replaces anything reported earlier.
	GroupsUpdated(Vec<GroupRef>),
	MediaReceived(Arc<MediaPayload>),
	TextReceived(TextPayload),
	MonitoringStatusChanged(bool),
	/// Worker-reported error. Connection state is unchanged.
	Error(String),
	/// The worker process exited. `expected` is true for logout and dispose.
	WorkerExited { code: Option<i32>, expected: bool },
}

impl BridgeEvent {
	pub fn name(&self) -> &'static str {
		match self {
			BridgeEvent::QrCodeReceived(_) => "qr_code_received",
			BridgeEvent::ConnectionStatusChanged(_) => "connection_status_changed",
			BridgeEvent::UserNameReceived(_) => "user_name_received",
			BridgeEvent::GroupsUpdated(_) => "groups_updated",
			BridgeEvent::MediaReceived(_) => "media_received",
			BridgeEvent::TextReceived(_) => "text_received",
			BridgeEvent::MonitoringStatusChanged(_) => "monitoring_status_changed",
			BridgeEvent::Error(_) => "error",
			BridgeEvent::WorkerExited { .. } => "worker_exited",
		}
	}
}
