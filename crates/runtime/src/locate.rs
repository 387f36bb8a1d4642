//! Worker runtime and script discovery.
//!
//! The runtime is resolved in this order:
//! 1. The configured runtime, if it is a path to an existing file
//! 2. A `PATH` lookup of the configured name
//! 3. Common Node.js install locations
//!
//! The script is never searched for: it is either configured explicitly or
//! expected next to the host executable, and startup fails fast when it is
//! missing.

use std::path::{Path, PathBuf};

use tracing::debug;

use crate::config::BridgeConfig;
use crate::error::{Error, Result};

/// Resolves the program used to run the worker script.
pub fn resolve_runtime(configured: &Path) -> Result<PathBuf> {
	if configured.components().count() > 1 || configured.is_absolute() {
		if configured.is_file() {
			return Ok(configured.to_path_buf());
		}
		return Err(Error::RuntimeNotFound(format!(
			"{} does not exist",
			configured.display()
		)));
	}

	if let Ok(found) = which::which(configured) {
		debug!(target = "wabridge", runtime = %found.display(), "runtime found on PATH");
		return Ok(found);
	}

	if configured == Path::new("node") {
		if let Some(found) = common_node_locations().into_iter().find(|p| p.is_file()) {
			debug!(
				target = "wabridge",
				runtime = %found.display(),
				"runtime found in common location"
			);
			return Ok(found);
		}
	}

	Err(Error::RuntimeNotFound(format!(
		"{} is not on PATH",
		configured.display()
	)))
}

/// Resolves the worker entry script, failing if it does not exist.
pub fn resolve_script(config: &BridgeConfig) -> Result<PathBuf> {
	let script = config.script_path();
	debug!(target = "wabridge", script = %script.display(), "looking for worker script");
	if script.is_file() {
		Ok(script)
	} else {
		Err(Error::ScriptNotFound(script))
	}
}

fn common_node_locations() -> Vec<PathBuf> {
	#[cfg(not(windows))]
	let locations = [
		"/usr/local/bin/node",
		"/usr/bin/node",
		"/opt/homebrew/bin/node",
		"/opt/local/bin/node",
	];

	#[cfg(windows)]
	let locations = [
		"C:\\Program Files\\nodejs\\node.exe",
		"C:\\Program Files (x86)\\nodejs\\node.exe",
	];

	locations.iter().map(PathBuf::from).collect()
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn missing_script_reports_full_path() {
		let dir = tempfile::tempdir().unwrap();
		let config = BridgeConfig {
			install_dir: Some(dir.path().to_path_buf()),
			..Default::default()
		};

		let err = resolve_script(&config).unwrap_err();
		let expected = dir.path().join("Node").join("whatsapp.js");
		match &err {
			Error::ScriptNotFound(path) => assert_eq!(path, &expected),
			other => panic!("Expected ScriptNotFound, got {other:?}"),
		}
		assert!(err.to_string().contains("whatsapp.js"));
	}

	#[test]
	fn existing_script_resolves() {
		let dir = tempfile::tempdir().unwrap();
		let script = dir.path().join("worker.js");
		std::fs::write(&script, "// worker").unwrap();

		let config = BridgeConfig {
			script: Some(script.clone()),
			..Default::default()
		};
		assert_eq!(resolve_script(&config).unwrap(), script);
	}

	#[test]
	fn explicit_runtime_path_must_exist() {
		let err = resolve_runtime(Path::new("/definitely/not/here/node")).unwrap_err();
		assert!(matches!(err, Error::RuntimeNotFound(_)));
	}

	#[test]
	fn unknown_runtime_name_is_not_found() {
		let err = resolve_runtime(Path::new("wabridge-no-such-runtime")).unwrap_err();
		assert!(matches!(err, Error::RuntimeNotFound(_)));
	}

	#[cfg(unix)]
	#[test]
	fn shell_resolves_from_path() {
		let found = resolve_runtime(Path::new("sh")).unwrap();
		assert!(found.is_file());
	}
}
