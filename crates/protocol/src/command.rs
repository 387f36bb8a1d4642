use serde::{Deserialize, Serialize};

/// Host-to-worker command.
///
/// Commands are fire-and-forget: the wire format has no correlation id, so the
/// effect of a command is only observable through later
/// [`ProtocolMessage`](crate::ProtocolMessage)s (e.g. `MonitorGroup` is
/// acknowledged by a `monitoringStatus` message).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Command {
	/// Ask the worker to fetch and report the group list.
	GetGroups,
	/// Start forwarding messages from one group.
	MonitorGroup {
		#[serde(rename = "groupId")]
		group_id: String,
	},
	StopMonitoring,
	/// Log the session out; the worker exits on its own afterwards.
	Logout,
}

impl Command {
	pub fn monitor_group(group_id: impl Into<String>) -> Self {
		Command::MonitorGroup {
			group_id: group_id.into(),
		}
	}

	/// Serializes the command as a single newline-terminated line.
	pub fn to_line(&self) -> serde_json::Result<String> {
		let mut line = serde_json::to_string(self)?;
		line.push('\n');
		Ok(line)
	}

	pub fn name(&self) -> &'static str {
		match self {
			Command::GetGroups => "get_groups",
			Command::MonitorGroup { .. } => "monitor_group",
			Command::StopMonitoring => "stop_monitoring",
			Command::Logout => "logout",
		}
	}
}
