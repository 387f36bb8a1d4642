//! Error types for the worker bridge.

use std::path::PathBuf;

use thiserror::Error;

/// Result type alias for bridge operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors surfaced to callers of the bridge.
///
/// Protocol noise and command-send races are handled internally (logged and
/// dropped) and never show up here. What remains are startup failures and
/// configuration problems.
#[derive(Debug, Error)]
pub enum Error {
	/// The worker entry script does not exist.
	#[error("Worker script not found at: {}", .0.display())]
	ScriptNotFound(PathBuf),

	/// The script runtime (Node.js) could not be located.
	#[error("Worker runtime not found: {0}. Install Node.js or set WABRIDGE_NODE_EXE.")]
	RuntimeNotFound(String),

	/// Spawning the worker failed, or it died during startup.
	#[error("Failed to launch worker: {0}")]
	LaunchFailed(String),

	/// Reading from or writing to the worker's stdio failed.
	#[error("Transport error: {0}")]
	Transport(String),

	/// Invalid configuration value.
	#[error("Invalid configuration: {0}")]
	Config(String),

	#[error("I/O error: {0}")]
	Io(#[from] std::io::Error),

	#[error("JSON error: {0}")]
	Json(#[from] serde_json::Error),
}

impl Error {
	/// Returns true if this error came from process startup.
	pub fn is_startup(&self) -> bool {
		matches!(
			self,
			Error::ScriptNotFound(_) | Error::RuntimeNotFound(_) | Error::LaunchFailed(_)
		)
	}
}
