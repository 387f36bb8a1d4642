//! Connection/monitoring state owned by the dispatcher.

use serde::Serialize;
use wabridge_protocol::GroupRef;

/// Session phase.
///
/// ```text
/// Idle -> Connecting -> Connected <-> Monitoring
///   ^__________|____________|____________|   (disconnect, crash, logout)
/// ```
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Phase {
	/// No worker, or the worker reported a disconnect.
	#[default]
	Idle,
	/// Worker launched, waiting for the browser session.
	Connecting,
	Connected,
	/// Connected and forwarding messages from a group.
	Monitoring,
}

/// Snapshot of bridge state.
///
/// `connected` and `monitoring` mirror the last status messages received from
/// the worker. They are independent flags on the wire, so a worker could in
/// principle report monitoring while disconnected; `phase` is the derived
/// view that only reaches `Monitoring` from a connected session.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BridgeState {
	pub phase: Phase,
	pub connected: bool,
	pub monitoring: bool,
	/// Last reported account name; empty until one arrives.
	pub last_user_name: String,
	/// Most recent group list; cleared on disconnect.
	pub groups: Vec<GroupRef>,
}

impl BridgeState {
	pub(crate) fn set_connected(&mut self, connected: bool) {
		self.connected = connected;
		if connected {
			self.phase = if self.monitoring {
				Phase::Monitoring
			} else {
				Phase::Connected
			};
		} else {
			self.phase = Phase::Idle;
			self.groups.clear();
		}
	}

	pub(crate) fn set_monitoring(&mut self, active: bool) {
		self.monitoring = active;
		match (active, self.phase) {
			(true, Phase::Connected) => self.phase = Phase::Monitoring,
			(false, Phase::Monitoring) => self.phase = Phase::Connected,
			_ => {}
		}
	}
}
