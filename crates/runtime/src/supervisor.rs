//! Worker supervision loop.
//!
//! One [`Supervisor`] task runs per bridge session and owns the worker
//! process for its whole life, including relaunches. Per process it:
//!
//! 1. Attaches the stdio pipes: stdout lines go through a single reader and a
//!    single dispatch task (FIFO), stderr is logged
//! 2. Waits for the process to exit, or for the session's stop token
//! 3. Drains what the worker already wrote, then reports the exit to the
//!    dispatcher so the final status events follow the last messages
//! 4. Relaunches with backoff if the exit was unexpected
//!
//! Commands reach the process through the shared [`WorkerLink`], which the
//! supervisor re-points at each new stdin.

use std::path::PathBuf;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::process::{ChildStderr, ChildStdin};
use tokio::sync::{Mutex, watch};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};
use wabridge_protocol::Command;

use crate::cleanup::purge_session_dir;
use crate::config::BridgeConfig;
use crate::dispatcher::Dispatcher;
use crate::error::{Error, Result};
use crate::transport::{LineSender, LineTransport};
use crate::worker::{WorkerProcess, exit_code};

/// How long a killed worker has to be reaped.
const KILL_TIMEOUT: Duration = Duration::from_secs(5);
/// How long to keep reading output after the process is gone.
const DRAIN_TIMEOUT: Duration = Duration::from_secs(2);

/// Liveness of the current worker process.
///
/// `generation` starts at 1 and increases with every relaunch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum WorkerStatus {
	Running { pid: Option<u32>, generation: u32 },
	Exited { code: Option<i32>, generation: u32 },
}

/// Write access to the live worker, shared between the supervisor and the
/// command API.
pub(crate) struct WorkerLink {
	stdin: Mutex<Option<LineSender<ChildStdin>>>,
	status: watch::Sender<WorkerStatus>,
}

impl WorkerLink {
	pub(crate) fn new(pid: Option<u32>) -> Self {
		let (status, _) = watch::channel(WorkerStatus::Running { pid, generation: 1 });
		Self {
			stdin: Mutex::new(None),
			status,
		}
	}

	pub(crate) fn status(&self) -> WorkerStatus {
		*self.status.borrow()
	}

	pub(crate) fn is_running(&self) -> bool {
		matches!(self.status(), WorkerStatus::Running { .. })
	}

	pub(crate) fn pid(&self) -> Option<u32> {
		match self.status() {
			WorkerStatus::Running { pid, .. } => pid,
			WorkerStatus::Exited { .. } => None,
		}
	}

	/// Writes one command to the worker.
	///
	/// A missing or broken pipe means the worker is exiting; the command is
	/// dropped with a log line. Only serialization errors are returned.
	pub(crate) async fn send(&self, command: &Command) -> Result<()> {
		let mut stdin = self.stdin.lock().await;
		let Some(sender) = stdin.as_mut() else {
			info!(
				target = "wabridge",
				command = command.name(),
				"worker not running, command dropped"
			);
			return Ok(());
		};

		match sender.send(command).await {
			Ok(()) => {
				debug!(target = "wabridge", command = command.name(), "command sent");
				Ok(())
			}
			Err(Error::Json(e)) => Err(Error::Json(e)),
			Err(e) => {
				warn!(target = "wabridge", command = command.name(), error = %e, "command dropped");
				Ok(())
			}
		}
	}

	/// Waits up to `grace` for the current process to exit.
	pub(crate) async fn wait_exit(&self, grace: Duration) -> bool {
		let mut rx = self.status.subscribe();
		let exited = rx.wait_for(|s| matches!(s, WorkerStatus::Exited { .. }));
		matches!(tokio::time::timeout(grace, exited).await, Ok(Ok(_)))
	}

	async fn attach(&self, sender: LineSender<ChildStdin>, pid: Option<u32>, generation: u32) {
		*self.stdin.lock().await = Some(sender);
		self.status.send_replace(WorkerStatus::Running { pid, generation });
	}

	async fn detach(&self) {
		self.stdin.lock().await.take();
	}

	fn mark_exited(&self, code: Option<i32>, generation: u32) {
		self.status.send_replace(WorkerStatus::Exited { code, generation });
	}
}

/// Everything the supervision loop needs, moved into its task.
pub(crate) struct Supervisor {
	pub(crate) config: BridgeConfig,
	pub(crate) runtime: PathBuf,
	pub(crate) script: PathBuf,
	pub(crate) dispatcher: Arc<Dispatcher>,
	pub(crate) link: Arc<WorkerLink>,
	pub(crate) stop: CancellationToken,
	pub(crate) expected: Arc<AtomicBool>,
}

impl Supervisor {
	pub(crate) async fn run(self, mut worker: WorkerProcess) {
		let mut generation = 1u32;
		let mut failures = 0u32;

		loop {
			let connects_before = self.dispatcher.connect_count();
			let code = self.run_once(&mut worker, generation).await;
			let expected = self.expected.load(Ordering::SeqCst) || self.stop.is_cancelled();

			self.link.mark_exited(code, generation);
			self.dispatcher.worker_exited(code, expected);

			if expected {
				info!(target = "wabridge", code = ?code, generation, "worker stopped");
				return;
			}
			warn!(target = "wabridge", code = ?code, generation, "worker exited unexpectedly");

			if self.dispatcher.connect_count() > connects_before {
				failures = 0;
			}
			let Some(delay) = self.config.restart.backoff(failures) else {
				if self.config.restart.max_restarts > 0 {
					warn!(
						target = "wabridge",
						failures,
						"restart budget exhausted, worker stays down"
					);
				}
				return;
			};
			failures += 1;

			info!(
				target = "wabridge",
				attempt = failures,
				delay_ms = delay.as_millis() as u64,
				"restarting worker"
			);
			tokio::select! {
				_ = self.stop.cancelled() => return,
				_ = tokio::time::sleep(delay) => {}
			}

			let config = &self.config;
			purge_session_dir(&config.session_path(), config.cleanup_retries, config.cleanup_delay)
				.await;
			if self.stop.is_cancelled() {
				return;
			}

			match WorkerProcess::launch(&self.runtime, &self.script) {
				Ok(next) => {
					worker = next;
					generation += 1;
					self.dispatcher.worker_started();
				}
				Err(e) => {
					warn!(target = "wabridge", error = %e, "worker relaunch failed");
					return;
				}
			}
		}
	}

	/// Runs one process to completion. Returns its exit code.
	async fn run_once(&self, worker: &mut WorkerProcess, generation: u32) -> Option<i32> {
		let stdio = match worker.take_stdio() {
			Ok(stdio) => stdio,
			Err(e) => {
				warn!(target = "wabridge", error = %e, "worker has no stdio");
				return exit_code(worker.terminate(KILL_TIMEOUT).await);
			}
		};

		let (transport, mut lines) = LineTransport::new(stdio.stdin, stdio.stdout);
		let (sender, receiver) = transport.into_parts();
		self.link.attach(sender, worker.pid(), generation).await;

		let mut reader = tokio::spawn(async move {
			if let Err(e) = receiver.run().await {
				warn!(target = "wabridge", error = %e, "worker stdout closed");
			}
		});
		let dispatcher = Arc::clone(&self.dispatcher);
		let dispatch = tokio::spawn(async move {
			while let Some(line) = lines.recv().await {
				dispatcher.handle_line(&line);
			}
		});
		let mut stderr = tokio::spawn(log_stderr(stdio.stderr));

		let exited = tokio::select! {
			result = worker.wait() => match result {
				Ok(status) => Some(status),
				Err(e) => {
					warn!(target = "wabridge", error = %e, "failed to wait on worker");
					None
				}
			},
			_ = self.stop.cancelled() => None,
		};
		let status = match exited {
			Some(status) => {
				worker.kill_group();
				Some(status)
			}
			None => worker.terminate(KILL_TIMEOUT).await,
		};

		self.link.detach().await;

		if tokio::time::timeout(DRAIN_TIMEOUT, &mut reader).await.is_err() {
			debug!(target = "wabridge", "worker stdout still open after exit");
			reader.abort();
		}
		let _ = dispatch.await;
		if tokio::time::timeout(DRAIN_TIMEOUT, &mut stderr).await.is_err() {
			stderr.abort();
		}

		exit_code(status)
	}
}

/// Logs worker stderr line by line until EOF.
///
/// The pipe is read as bytes so invalid UTF-8 never ends the reader. After a
/// read error the rest is discarded, but the pipe stays open so the worker
/// never writes into a closed stderr.
async fn log_stderr(stderr: ChildStderr) {
	let mut reader = BufReader::new(stderr);
	let mut buf = Vec::new();
	loop {
		buf.clear();
		match reader.read_until(b'\n', &mut buf).await {
			Ok(0) => return,
			Ok(_) => {
				let line = String::from_utf8_lossy(&buf);
				let line = line.trim_end_matches(['\r', '\n']);
				if !line.trim().is_empty() {
					warn!(target = "wabridge.worker", line = %line, "worker stderr");
				}
			}
			Err(e) => {
				debug!(target = "wabridge", error = %e, "worker stderr unreadable, discarding");
				let _ = tokio::io::copy(&mut reader, &mut tokio::io::sink()).await;
				return;
			}
		}
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[tokio::test]
	async fn send_without_stdin_is_a_noop() {
		let link = WorkerLink::new(None);
		assert!(link.send(&Command::GetGroups).await.is_ok());
	}

	#[tokio::test]
	async fn wait_exit_observes_mark_exited() {
		let link = Arc::new(WorkerLink::new(Some(42)));
		assert!(link.is_running());
		assert_eq!(link.pid(), Some(42));
		assert!(!link.wait_exit(Duration::from_millis(20)).await);

		let waiter = {
			let link = Arc::clone(&link);
			tokio::spawn(async move { link.wait_exit(Duration::from_secs(5)).await })
		};
		link.mark_exited(Some(0), 1);

		assert!(waiter.await.unwrap());
		assert!(!link.is_running());
		assert_eq!(link.pid(), None);
		assert_eq!(
			link.status(),
			WorkerStatus::Exited {
				code: Some(0),
				generation: 1
			}
		);
	}
}
