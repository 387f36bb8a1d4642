//! Decoded worker-to-host messages.
//!
//! These are the typed shapes the rest of the host works with. The looser
//! on-the-wire structs live in the codec; everything here has its optional
//! fields already defaulted to empty/zero.

use std::time::{Duration, SystemTime, UNIX_EPOCH};

use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use serde::{Deserialize, Serialize};

/// A WhatsApp group the logged-in account belongs to.
///
/// `id` is the serialized chat id (e.g. `1203...@g.us`) and is unique within a
/// session.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct GroupRef {
	/// Stable external group identifier.
	pub id: String,
	/// Display name.
	pub name: String,
}

impl GroupRef {
	pub fn new(id: impl Into<String>, name: impl Into<String>) -> Self {
		Self {
			id: id.into(),
			name: name.into(),
		}
	}
}

/// A media message downloaded by the worker from the monitored group.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MediaPayload {
	/// Message id (not globally unique; pair with timestamp and sender).
	pub id: String,
	/// Chat the message arrived in.
	pub from: String,
	/// Participant who posted it (group messages only).
	pub author: String,
	/// MIME type reported by WhatsApp, e.g. `image/jpeg`.
	pub mime_type: String,
	/// Seconds since the Unix epoch.
	pub timestamp_unix: i64,
	/// Original filename, often empty for photos.
	pub filename: String,
	/// Base64-encoded file body.
	pub base64_data: String,
	/// Size in bytes as reported by the worker.
	pub size_bytes: u64,
	/// Push name, saved name or number of the sender.
	pub sender_name: String,
}

impl MediaPayload {
	/// Decodes the base64 body.
	pub fn decode_data(&self) -> Result<Vec<u8>, base64::DecodeError> {
		STANDARD.decode(self.base64_data.as_bytes())
	}

	/// Message time, clamped to the epoch for negative values.
	pub fn timestamp(&self) -> SystemTime {
		unix_to_system_time(self.timestamp_unix)
	}
}

/// A plain text message from the monitored group.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TextPayload {
	pub id: String,
	pub from: String,
	pub author: String,
	pub timestamp_unix: i64,
	pub text: String,
	pub sender_name: String,
}

impl TextPayload {
	pub fn timestamp(&self) -> SystemTime {
		unix_to_system_time(self.timestamp_unix)
	}
}

fn unix_to_system_time(secs: i64) -> SystemTime {
	UNIX_EPOCH + Duration::from_secs(secs.max(0) as u64)
}

/// One decoded unit of worker-to-host communication.
///
/// Exactly one variant per protocol line. The `type` discriminator on the wire
/// maps as follows:
///
/// | wire `type`        | variant                |
/// |--------------------|------------------------|
/// | `qr`               | [`QrCode`](Self::QrCode) |
/// | `status`           | [`ConnectionStatus`](Self::ConnectionStatus) |
/// | `userName`         | [`UserName`](Self::UserName) |
/// | `groups`           | [`GroupList`](Self::GroupList) |
/// | `media`            | [`Media`](Self::Media) |
/// | `text`             | [`Text`](Self::Text) |
/// | `monitoringStatus` | [`MonitoringStatus`](Self::MonitoringStatus) |
/// | `error`            | [`ErrorNotice`](Self::ErrorNotice) |
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProtocolMessage {
	/// Pairing QR code to render for the user.
	QrCode { data: String },
	/// The browser session became (dis)connected.
	ConnectionStatus { connected: bool },
	/// Push name of the logged-in account.
	UserName { name: String },
	/// Full replacement of the known group list.
	///
	/// `error` is set when the worker failed to fetch chats and sent an empty
	/// list instead.
	GroupList {
		groups: Vec<GroupRef>,
		error: Option<String>,
	},
	Media(MediaPayload),
	Text(TextPayload),
	/// Monitoring of the selected group started or stopped.
	MonitoringStatus { active: bool },
	/// Worker-side error report.
	ErrorNotice { message: String },
}

impl ProtocolMessage {
	/// Wire discriminator for this message.
	pub fn tag(&self) -> &'static str {
		match self {
			ProtocolMessage::QrCode { .. } => "qr",
			ProtocolMessage::ConnectionStatus { .. } => "status",
			ProtocolMessage::UserName { .. } => "userName",
			ProtocolMessage::GroupList { .. } => "groups",
			ProtocolMessage::Media(_) => "media",
			ProtocolMessage::Text(_) => "text",
			ProtocolMessage::MonitoringStatus { .. } => "monitoringStatus",
			ProtocolMessage::ErrorNotice { .. } => "error",
		}
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn media_decodes_base64_body() {
		let media = MediaPayload {
			base64_data: "aGVsbG8=".to_string(),
			..Default::default()
		};
		assert_eq!(media.decode_data().unwrap(), b"hello");
	}

	#[test]
	fn media_with_garbage_body_reports_error() {
		let media = MediaPayload {
			base64_data: "not base64!".to_string(),
			..Default::default()
		};
		assert!(media.decode_data().is_err());
	}

	#[test]
	fn negative_timestamp_clamps_to_epoch() {
		let text = TextPayload {
			timestamp_unix: -5,
			..Default::default()
		};
		assert_eq!(text.timestamp(), UNIX_EPOCH);

		let media = MediaPayload {
			timestamp_unix: 1_700_000_000,
			..Default::default()
		};
		assert_eq!(
			media.timestamp(),
			UNIX_EPOCH + Duration::from_secs(1_700_000_000)
		);
	}
}
