//! Bridge configuration.
//!
//! Defaults reproduce the desktop app's layout: the worker lives in
//! `<install dir>/Node/whatsapp.js` and persists its browser session in
//! `<install dir>/Node/.wwebjs_auth`. Every field can be overridden from a
//! JSON file, and the paths from environment variables.

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::Deserialize;

use crate::error::{Error, Result};

/// Overrides the runtime used to execute the worker script.
pub const ENV_NODE_EXE: &str = "WABRIDGE_NODE_EXE";
/// Overrides the worker script path.
pub const ENV_SCRIPT: &str = "WABRIDGE_SCRIPT";
/// Overrides the directory the script and session data are resolved against.
pub const ENV_INSTALL_DIR: &str = "WABRIDGE_INSTALL_DIR";
/// Overrides the session directory purged before each launch.
pub const ENV_SESSION_DIR: &str = "WABRIDGE_SESSION_DIR";

const WORKER_DIR: &str = "Node";
const WORKER_SCRIPT: &str = "whatsapp.js";
const SESSION_DIR: &str = ".wwebjs_auth";

/// Settings for one [`Bridge`](crate::Bridge).
#[derive(Debug, Clone, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct BridgeConfig {
	/// Program that runs the script; a bare name is looked up on `PATH`.
	pub runtime: PathBuf,
	/// Explicit worker script. Defaults to `<install_dir>/Node/whatsapp.js`.
	pub script: Option<PathBuf>,
	/// Base directory. Defaults to the directory of the current executable.
	pub install_dir: Option<PathBuf>,
	/// Session/auth directory purged before every launch and after logout.
	pub session_dir: Option<PathBuf>,
	/// How long `initialize` waits for the process to start producing output.
	#[serde(with = "millis")]
	pub startup_delay: Duration,
	/// Pause after sending `logout` so the worker can act on it.
	#[serde(with = "millis")]
	pub command_flush: Duration,
	/// How long `logout` waits for the worker to exit on its own.
	#[serde(with = "millis")]
	pub exit_grace: Duration,
	/// How long `dispose` waits before forcing termination.
	#[serde(with = "millis")]
	pub dispose_grace: Duration,
	/// Attempts made to delete a locked session directory.
	pub cleanup_retries: u32,
	/// Fixed delay between session-directory delete attempts.
	#[serde(with = "millis")]
	pub cleanup_delay: Duration,
	/// Events buffered per subscriber before the oldest are dropped.
	pub event_capacity: usize,
	pub restart: RestartPolicy,
}

impl Default for BridgeConfig {
	fn default() -> Self {
		Self {
			runtime: PathBuf::from("node"),
			script: None,
			install_dir: None,
			session_dir: None,
			startup_delay: Duration::from_secs(1),
			command_flush: Duration::from_secs(1),
			exit_grace: Duration::from_secs(10),
			dispose_grace: Duration::from_secs(2),
			cleanup_retries: 5,
			cleanup_delay: Duration::from_millis(200),
			event_capacity: 256,
			restart: RestartPolicy::default(),
		}
	}
}

impl BridgeConfig {
	/// Defaults with environment overrides applied.
	pub fn from_env() -> Self {
		Self::default().with_env_overrides()
	}

	/// Loads a JSON config file, then applies environment overrides.
	pub fn from_file(path: &Path) -> Result<Self> {
		let text = std::fs::read_to_string(path)?;
		let config: Self = serde_json::from_str(&text)?;
		config.validate()?;
		Ok(config.with_env_overrides())
	}

	/// Applies `WABRIDGE_*` environment variables on top of this config.
	pub fn with_env_overrides(mut self) -> Self {
		if let Some(node) = env_path(ENV_NODE_EXE) {
			self.runtime = node;
		}
		if let Some(script) = env_path(ENV_SCRIPT) {
			self.script = Some(script);
		}
		if let Some(dir) = env_path(ENV_INSTALL_DIR) {
			self.install_dir = Some(dir);
		}
		if let Some(dir) = env_path(ENV_SESSION_DIR) {
			self.session_dir = Some(dir);
		}
		self
	}

	pub fn validate(&self) -> Result<()> {
		if self.runtime.as_os_str().is_empty() {
			return Err(Error::Config("runtime must not be empty".to_string()));
		}
		if self.event_capacity == 0 {
			return Err(Error::Config("eventCapacity must be at least 1".to_string()));
		}
		Ok(())
	}

	/// Directory the default script and session paths hang off.
	pub fn base_dir(&self) -> PathBuf {
		if let Some(dir) = &self.install_dir {
			return dir.clone();
		}
		std::env::current_exe()
			.ok()
			.and_then(|exe| exe.parent().map(Path::to_path_buf))
			.unwrap_or_else(|| PathBuf::from("."))
	}

	pub fn script_path(&self) -> PathBuf {
		self.script
			.clone()
			.unwrap_or_else(|| self.base_dir().join(WORKER_DIR).join(WORKER_SCRIPT))
	}

	pub fn session_path(&self) -> PathBuf {
		self.session_dir
			.clone()
			.unwrap_or_else(|| self.base_dir().join(WORKER_DIR).join(SESSION_DIR))
	}
}

fn env_path(key: &str) -> Option<PathBuf> {
	std::env::var_os(key)
		.filter(|value| !value.is_empty())
		.map(PathBuf::from)
}

/// Automatic relaunch after an unexpected worker exit.
///
/// The delay doubles on each consecutive attempt, capped at `max_backoff`.
/// A worker that reaches a connected state resets the attempt counter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct RestartPolicy {
	pub max_restarts: u32,
	#[serde(with = "millis")]
	pub initial_backoff: Duration,
	#[serde(with = "millis")]
	pub max_backoff: Duration,
}

impl Default for RestartPolicy {
	fn default() -> Self {
		Self {
			max_restarts: 3,
			initial_backoff: Duration::from_millis(500),
			max_backoff: Duration::from_secs(8),
		}
	}
}

impl RestartPolicy {
	pub fn disabled() -> Self {
		Self {
			max_restarts: 0,
			..Self::default()
		}
	}

	/// Delay before restart number `attempt` (zero-based), or `None` once
	/// the budget is spent.
	pub fn backoff(&self, attempt: u32) -> Option<Duration> {
		if attempt >= self.max_restarts {
			return None;
		}
		let factor = 1u32.checked_shl(attempt).unwrap_or(u32::MAX);
		Some(
			self.initial_backoff
				.saturating_mul(factor)
				.min(self.max_backoff),
		)
	}
}

mod millis {
	use std::time::Duration;

	use serde::{Deserialize, Deserializer};

	pub fn deserialize<'de, D>(deserializer: D) -> Result<Duration, D::Error>
	where
		D: Deserializer<'de>,
	{
		u64::deserialize(deserializer).map(Duration::from_millis)
	}
}
