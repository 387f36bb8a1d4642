//! Session directory cleanup.
//!
//! The worker keeps its browser profile and auth tokens in one directory. A
//! crashed worker can leave it locked or half-written, so it is removed before
//! every launch and after logout. Files may still be held open for a moment by
//! a process that just exited, hence the retries.

use std::io::ErrorKind;
use std::path::Path;
use std::time::Duration;

use tracing::{debug, warn};

/// Recursively deletes `path`, retrying up to `retries` times with a fixed
/// `delay` between attempts.
///
/// Returns whether the directory is gone. A missing directory counts as
/// success. Failure is logged, never returned.
pub async fn purge_session_dir(path: &Path, retries: u32, delay: Duration) -> bool {
	let attempts = retries.max(1);

	for attempt in 1..=attempts {
		match tokio::fs::remove_dir_all(path).await {
			Ok(()) => {
				debug!(
					target = "wabridge",
					path = %path.display(),
					attempt,
					"session directory removed"
				);
				return true;
			}
			Err(e) if e.kind() == ErrorKind::NotFound => return true,
			Err(e) if attempt < attempts => {
				debug!(
					target = "wabridge",
					path = %path.display(),
					attempt,
					error = %e,
					"session directory busy, retrying"
				);
				tokio::time::sleep(delay).await;
			}
			Err(e) => {
				warn!(
					target = "wabridge",
					path = %path.display(),
					attempts,
					error = %e,
					"could not remove session directory"
				);
			}
		}
	}

	false
}
