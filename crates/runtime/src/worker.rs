//! Worker process handle.
//!
//! Launches `<runtime> <script>` with all three stdio streams piped, running
//! in the script's directory so the worker's relative session storage lands
//! next to it. On Unix the worker leads its own process group, and termination
//! signals the whole group so the headless browser it drives goes down too.

use std::path::Path;
use std::process::{ExitStatus, Stdio};
use std::time::Duration;

use tokio::process::{Child, ChildStderr, ChildStdin, ChildStdout, Command};
use tracing::{debug, warn};

use crate::error::{Error, Result};

/// The three pipes of a freshly launched worker.
pub struct WorkerStdio {
	pub stdin: ChildStdin,
	pub stdout: ChildStdout,
	pub stderr: ChildStderr,
}

/// A running worker process.
///
/// The child is killed when this handle is dropped.
#[derive(Debug)]
pub struct WorkerProcess {
	process: Child,
	pid: Option<u32>,
}

impl WorkerProcess {
	/// Spawns the worker.
	///
	/// # Errors
	///
	/// Returns [`Error::LaunchFailed`] if the process cannot be spawned.
	pub fn launch(runtime: &Path, script: &Path) -> Result<Self> {
		let mut cmd = Command::new(runtime);
		cmd.arg(script)
			.stdin(Stdio::piped())
			.stdout(Stdio::piped())
			.stderr(Stdio::piped())
			.kill_on_drop(true);

		if let Some(dir) = script.parent().filter(|d| !d.as_os_str().is_empty()) {
			cmd.current_dir(dir);
		}

		#[cfg(unix)]
		cmd.process_group(0);

		let process = cmd.spawn().map_err(|e| {
			Error::LaunchFailed(format!(
				"Failed to spawn {} {}: {e}",
				runtime.display(),
				script.display()
			))
		})?;
		let pid = process.id();

		debug!(target = "wabridge", pid = ?pid, script = %script.display(), "worker spawned");
		Ok(Self { process, pid })
	}

	pub fn pid(&self) -> Option<u32> {
		self.pid
	}

	/// Takes ownership of the stdio pipes. Can only succeed once.
	pub fn take_stdio(&mut self) -> Result<WorkerStdio> {
		let missing = || Error::LaunchFailed("worker stdio was not captured".to_string());
		Ok(WorkerStdio {
			stdin: self.process.stdin.take().ok_or_else(missing)?,
			stdout: self.process.stdout.take().ok_or_else(missing)?,
			stderr: self.process.stderr.take().ok_or_else(missing)?,
		})
	}

	/// Waits for the process to exit on its own.
	pub async fn wait(&mut self) -> std::io::Result<ExitStatus> {
		self.process.wait().await
	}

	/// Non-blocking exit check.
	pub fn try_exited(&mut self) -> Option<ExitStatus> {
		self.process.try_wait().ok().flatten()
	}

	/// Kills the worker (and on Unix its process group) and reaps it.
	///
	/// Returns the exit status if the process was reaped within `timeout`.
	pub async fn terminate(&mut self, timeout: Duration) -> Option<ExitStatus> {
		if let Some(status) = self.try_exited() {
			return Some(status);
		}

		#[cfg(windows)]
		{
			drop(self.process.stdin.take());
			drop(self.process.stdout.take());
			drop(self.process.stderr.take());
		}

		if !self.signal_group() {
			if let Err(e) = self.process.start_kill() {
				warn!(target = "wabridge", error = %e, "failed to kill worker");
			}
		}

		match tokio::time::timeout(timeout, self.process.wait()).await {
			Ok(Ok(status)) => Some(status),
			Ok(Err(e)) => {
				warn!(target = "wabridge", error = %e, "failed to reap worker");
				None
			}
			Err(_) => {
				warn!(target = "wabridge", pid = ?self.pid, "worker did not exit after kill");
				None
			}
		}
	}

	/// Kills anything left in the worker's process group after the worker
	/// itself exited on its own.
	pub fn kill_group(&self) {
		#[cfg(unix)]
		{
			use nix::errno::Errno;
			use nix::sys::signal::{Signal, killpg};

			let Some(group) = self.group() else {
				return;
			};
			match killpg(group, Signal::SIGKILL) {
				Ok(()) => {
					debug!(target = "wabridge", pid = ?self.pid, "killed leftover processes");
				}
				Err(Errno::ESRCH) => {}
				Err(e) => {
					debug!(target = "wabridge", pid = ?self.pid, error = %e, "killpg failed");
				}
			}
		}
	}

	#[cfg(unix)]
	fn group(&self) -> Option<nix::unistd::Pid> {
		let pid = i32::try_from(self.pid?).ok()?;
		Some(nix::unistd::Pid::from_raw(pid))
	}

	#[cfg(unix)]
	fn signal_group(&self) -> bool {
		use nix::sys::signal::{Signal, killpg};

		let Some(group) = self.group() else {
			return false;
		};
		match killpg(group, Signal::SIGKILL) {
			Ok(()) => true,
			Err(e) => {
				debug!(
					target = "wabridge",
					pid = ?self.pid,
					error = %e,
					"killpg failed, falling back to kill"
				);
				false
			}
		}
	}

	#[cfg(not(unix))]
	fn signal_group(&self) -> bool {
		false
	}
}

/// Exit code for logging and events; `None` when killed by a signal.
pub fn exit_code(status: Option<ExitStatus>) -> Option<i32> {
	status.and_then(|s| s.code())
}
