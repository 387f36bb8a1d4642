//! Line codec for worker stdout.
//!
//! Decoding is a two-step tagged parse: the line is parsed into a generic
//! JSON object, the `type` discriminator is extracted, and only the payload
//! shape belonging to that tag is decoded. Anything else is reported as a
//! [`DecodeError`] for the caller to log and drop.
//!
//! # Media field casing
//!
//! The supported contract for `media` is the capitalised shape the worker
//! emits (`"Media": {"Id", "From", "Author", "Type", "Timestamp", "Filename",
//! "Data", "Size", "SenderName"}`). Because field matching is case-insensitive
//! for every message, lowercase spellings of those same names also decode.
//! No alternative field names are aliased.

use serde::Deserialize;
use serde::de::DeserializeOwned;
use serde_json::Value;

use crate::error::DecodeError;
use crate::lenient::{fold_keys, relax};
use crate::message::{GroupRef, MediaPayload, ProtocolMessage, TextPayload};

/// Classification of one line of worker stdout.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Line<'a> {
	/// Empty or whitespace only.
	Blank,
	/// Worker log output sharing the stream; never parsed.
	Diagnostic(&'a str),
	/// A decoded protocol message.
	Message(ProtocolMessage),
}

/// Decodes one line of worker stdout.
///
/// Lines whose trimmed content does not start with `{` are returned as
/// [`Line::Diagnostic`] and never fail. Candidate lines that cannot be decoded
/// return an error describing why.
pub fn decode_line(line: &str) -> Result<Line<'_>, DecodeError> {
	let trimmed = line.trim();
	if trimmed.is_empty() {
		return Ok(Line::Blank);
	}
	if !trimmed.starts_with('{') {
		return Ok(Line::Diagnostic(trimmed));
	}

	let value = parse_relaxed(trimmed)?;
	decode_value(value).map(Line::Message)
}

fn parse_relaxed(text: &str) -> Result<Value, DecodeError> {
	match serde_json::from_str::<Value>(text) {
		Ok(value) => Ok(value),
		Err(strict) => {
			serde_json::from_str::<Value>(&relax(text)).map_err(|_| DecodeError::Malformed(strict))
		}
	}
}

fn decode_value(value: Value) -> Result<ProtocolMessage, DecodeError> {
	let Value::Object(mut object) = fold_keys(value) else {
		return Err(DecodeError::NotAnObject);
	};

	let tag = match object.remove("type") {
		Some(Value::String(tag)) => tag,
		_ => return Err(DecodeError::MissingType),
	};
	let body = Value::Object(object);

	match tag.as_str() {
		"qr" => {
			let wire: QrWire = payload("qr", body)?;
			Ok(ProtocolMessage::QrCode {
				data: wire.qr.unwrap_or_default(),
			})
		}
		"status" => {
			let wire: StatusWire = payload("status", body)?;
			Ok(ProtocolMessage::ConnectionStatus {
				connected: wire.connected.unwrap_or(false),
			})
		}
		"userName" => {
			let wire: UserNameWire = payload("userName", body)?;
			Ok(ProtocolMessage::UserName {
				name: wire.name.unwrap_or_default(),
			})
		}
		"groups" => {
			let wire: GroupsWire = payload("groups", body)?;
			let groups = wire.groups.ok_or(DecodeError::EmptyPayload { tag: "groups" })?;
			Ok(ProtocolMessage::GroupList {
				groups: groups.into_iter().map(GroupWire::into_ref).collect(),
				error: wire.error,
			})
		}
		"media" => {
			let wire: MediaEnvelope = payload("media", body)?;
			let media = wire.media.ok_or(DecodeError::EmptyPayload { tag: "media" })?;
			Ok(ProtocolMessage::Media(media.into_payload()))
		}
		"text" => {
			let wire: TextEnvelope = payload("text", body)?;
			let text = wire.text.ok_or(DecodeError::EmptyPayload { tag: "text" })?;
			Ok(ProtocolMessage::Text(text.into_payload()))
		}
		"monitoringStatus" => {
			let wire: MonitoringWire = payload("monitoringStatus", body)?;
			Ok(ProtocolMessage::MonitoringStatus {
				active: wire.monitoring.unwrap_or(false),
			})
		}
		"error" => {
			let wire: ErrorWire = payload("error", body)?;
			Ok(ProtocolMessage::ErrorNotice {
				message: wire.message.unwrap_or_default(),
			})
		}
		_ => Err(DecodeError::UnknownType(tag)),
	}
}

fn payload<T: DeserializeOwned>(tag: &'static str, body: Value) -> Result<T, DecodeError> {
	serde_json::from_value(body).map_err(|source| DecodeError::InvalidPayload { tag, source })
}

// Wire shapes below use the folded (lowercase) key names.

#[derive(Deserialize)]
struct QrWire {
	#[serde(default)]
	qr: Option<String>,
}

#[derive(Deserialize)]
struct StatusWire {
	#[serde(default)]
	connected: Option<bool>,
}

#[derive(Deserialize)]
struct UserNameWire {
	#[serde(default)]
	name: Option<String>,
}

#[derive(Deserialize)]
struct GroupsWire {
	#[serde(default)]
	groups: Option<Vec<GroupWire>>,
	#[serde(default)]
	error: Option<String>,
}

#[derive(Deserialize)]
struct GroupWire {
	#[serde(default)]
	id: Option<String>,
	#[serde(default)]
	name: Option<String>,
}

impl GroupWire {
	fn into_ref(self) -> GroupRef {
		GroupRef {
			id: self.id.unwrap_or_default(),
			name: self.name.unwrap_or_default(),
		}
	}
}

#[derive(Deserialize)]
struct MediaEnvelope {
	#[serde(default)]
	media: Option<MediaWire>,
}

#[derive(Deserialize)]
struct MediaWire {
	#[serde(default)]
	id: Option<String>,
	#[serde(default)]
	from: Option<String>,
	#[serde(default)]
	author: Option<String>,
	#[serde(default, rename = "type")]
	mime_type: Option<String>,
	#[serde(default)]
	timestamp: Option<i64>,
	#[serde(default)]
	filename: Option<String>,
	#[serde(default)]
	data: Option<String>,
	#[serde(default)]
	size: Option<u64>,
	#[serde(default)]
	sendername: Option<String>,
}

impl MediaWire {
	fn into_payload(self) -> MediaPayload {
		MediaPayload {
			id: self.id.unwrap_or_default(),
			from: self.from.unwrap_or_default(),
			author: self.author.unwrap_or_default(),
			mime_type: self.mime_type.unwrap_or_default(),
			timestamp_unix: self.timestamp.unwrap_or(0),
			filename: self.filename.unwrap_or_default(),
			base64_data: self.data.unwrap_or_default(),
			size_bytes: self.size.unwrap_or(0),
			sender_name: self.sendername.unwrap_or_default(),
		}
	}
}

#[derive(Deserialize)]
struct TextEnvelope {
	#[serde(default)]
	text: Option<TextWire>,
}

#[derive(Deserialize)]
struct TextWire {
	#[serde(default)]
	id: Option<String>,
	#[serde(default)]
	from: Option<String>,
	#[serde(default)]
	author: Option<String>,
	#[serde(default)]
	timestamp: Option<i64>,
	#[serde(default)]
	text: Option<String>,
	#[serde(default)]
	sendername: Option<String>,
}

impl TextWire {
	fn into_payload(self) -> TextPayload {
		TextPayload {
			id: self.id.unwrap_or_default(),
			from: self.from.unwrap_or_default(),
			author: self.author.unwrap_or_default(),
			timestamp_unix: self.timestamp.unwrap_or(0),
			text: self.text.unwrap_or_default(),
			sender_name: self.sendername.unwrap_or_default(),
		}
	}
}

#[derive(Deserialize)]
struct MonitoringWire {
	#[serde(default)]
	monitoring: Option<bool>,
}

#[derive(Deserialize)]
struct ErrorWire {
	#[serde(default)]
	message: Option<String>,
}
