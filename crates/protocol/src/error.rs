use thiserror::Error;

/// Reasons a candidate protocol line is dropped.
///
/// None of these are fatal: the supervisor logs them and moves on to the
/// next line.
#[derive(Debug, Error)]
pub enum DecodeError {
	/// The line looked like an object but is not valid JSON, even after
	/// stripping comments and trailing commas.
	#[error("malformed protocol line: {0}")]
	Malformed(#[source] serde_json::Error),

	/// Valid JSON, but not an object.
	#[error("protocol line is not a JSON object")]
	NotAnObject,

	/// The object has no string `type` discriminator.
	#[error("protocol message has no `type` field")]
	MissingType,

	/// The discriminator names a message this host does not understand.
	#[error("unknown protocol message type: {0}")]
	UnknownType(String),

	/// The payload object for `tag` is absent or null.
	#[error("`{tag}` message carries no payload")]
	EmptyPayload {
		/// Message tag whose payload was missing.
		tag: &'static str,
	},

	/// The payload exists but does not fit the expected shape.
	#[error("invalid `{tag}` payload: {source}")]
	InvalidPayload {
		/// Message tag whose payload failed to decode.
		tag: &'static str,
		#[source]
		source: serde_json::Error,
	},
}

impl DecodeError {
	/// Returns true for lines that were well-formed but simply not meant for us.
	pub fn is_unknown_type(&self) -> bool {
		matches!(self, DecodeError::UnknownType(_))
	}
}
