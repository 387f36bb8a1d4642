//! The bridge: lifecycle and command API over one supervised worker.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use tokio::sync::broadcast;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};
use wabridge_protocol::Command;

use crate::cleanup::purge_session_dir;
use crate::config::BridgeConfig;
use crate::dispatcher::Dispatcher;
use crate::error::{Error, Result};
use crate::events::BridgeEvent;
use crate::locate::{resolve_runtime, resolve_script};
use crate::state::BridgeState;
use crate::supervisor::{Supervisor, WorkerLink, WorkerStatus};
use crate::worker::WorkerProcess;

/// Upper bound on waiting for the supervision task after stopping it.
const TASK_JOIN_TIMEOUT: Duration = Duration::from_secs(10);

/// Supervised connection to the WhatsApp worker.
///
/// Cheap to clone; clones share the same worker, state and event stream.
///
/// # Example
///
/// ```ignore
/// let bridge = Bridge::new(BridgeConfig::from_env())?;
/// let mut events = bridge.subscribe();
/// bridge.initialize().await?;
///
/// while let Ok(event) = events.recv().await {
///     if let BridgeEvent::ConnectionStatusChanged(true) = event {
///         bridge.get_groups().await?;
///     }
/// }
/// ```
#[derive(Clone)]
pub struct Bridge {
	inner: Arc<Inner>,
}

struct Inner {
	config: BridgeConfig,
	dispatcher: Arc<Dispatcher>,
	/// Serializes initialize, logout and dispose.
	lifecycle: tokio::sync::Mutex<()>,
	session: parking_lot::Mutex<Option<Session>>,
}

/// One initialize-to-shutdown span. Dropping it stops the worker.
struct Session {
	stop: CancellationToken,
	expected: Arc<AtomicBool>,
	link: Arc<WorkerLink>,
	task: Option<JoinHandle<()>>,
}

impl Drop for Session {
	fn drop(&mut self) {
		self.stop.cancel();
	}
}

#[derive(Debug, Clone, Copy)]
enum ShutdownMode {
	/// Ask the worker to log out, wait, then kill if needed.
	Graceful { flush: Duration, grace: Duration },
	/// Kill straight away.
	Immediate,
}

impl Bridge {
	pub fn new(config: BridgeConfig) -> Result<Self> {
		config.validate()?;
		let dispatcher = Arc::new(Dispatcher::new(config.event_capacity));
		Ok(Self {
			inner: Arc::new(Inner {
				config,
				dispatcher,
				lifecycle: tokio::sync::Mutex::new(()),
				session: parking_lot::Mutex::new(None),
			}),
		})
	}

	pub fn config(&self) -> &BridgeConfig {
		&self.inner.config
	}

	/// Subscribes to events. Only events published after this call are seen.
	pub fn subscribe(&self) -> broadcast::Receiver<BridgeEvent> {
		self.inner.dispatcher.subscribe()
	}

	pub fn snapshot(&self) -> BridgeState {
		self.inner.dispatcher.snapshot()
	}

	pub fn is_connected(&self) -> bool {
		self.inner.dispatcher.is_connected()
	}

	pub fn is_monitoring(&self) -> bool {
		self.inner.dispatcher.is_monitoring()
	}

	/// Pid of the live worker process, if any.
	pub fn worker_pid(&self) -> Option<u32> {
		self.inner.link().and_then(|link| link.pid())
	}

	/// Starts the worker.
	///
	/// Purges the session directory, locates the runtime and script, spawns the
	/// worker and gives it `startup_delay` to settle. Readiness is reported
	/// later through [`BridgeEvent::ConnectionStatusChanged`]. A worker that is
	/// already running is shut down first.
	///
	/// # Errors
	///
	/// - [`Error::ScriptNotFound`] if the worker script is missing
	/// - [`Error::RuntimeNotFound`] if Node.js cannot be located
	/// - [`Error::LaunchFailed`] if spawning fails or the worker exits during
	///   the startup delay
	///
	/// On error no worker process is left running.
	pub async fn initialize(&self) -> Result<()> {
		let inner = &self.inner;
		let config = &inner.config;
		let _lifecycle = inner.lifecycle.lock().await;

		let existing = inner.session.lock().take();
		if let Some(existing) = existing {
			info!(target = "wabridge", "replacing running worker");
			inner.shutdown(Some(existing), ShutdownMode::Immediate).await;
		}

		purge_session_dir(&config.session_path(), config.cleanup_retries, config.cleanup_delay)
			.await;

		let script = resolve_script(config)?;
		let runtime = resolve_runtime(&config.runtime)?;
		let worker = WorkerProcess::launch(&runtime, &script)?;
		info!(
			target = "wabridge",
			pid = ?worker.pid(),
			runtime = %runtime.display(),
			script = %script.display(),
			"worker started"
		);

		let link = Arc::new(WorkerLink::new(worker.pid()));
		let stop = CancellationToken::new();
		let expected = Arc::new(AtomicBool::new(false));
		inner.dispatcher.worker_started();

		let supervisor = Supervisor {
			config: config.clone(),
			runtime,
			script,
			dispatcher: Arc::clone(&inner.dispatcher),
			link: Arc::clone(&link),
			stop: stop.clone(),
			expected: Arc::clone(&expected),
		};
		let task = tokio::spawn(supervisor.run(worker));

		*inner.session.lock() = Some(Session {
			stop,
			expected,
			link: Arc::clone(&link),
			task: Some(task),
		});

		tokio::time::sleep(config.startup_delay).await;

		let status = link.status();
		if matches!(status, WorkerStatus::Running { generation: 1, .. }) {
			return Ok(());
		}

		let session = {
			let mut slot = inner.session.lock();
			let ours = slot
				.as_ref()
				.is_some_and(|current| Arc::ptr_eq(&current.link, &link));
			if ours { slot.take() } else { None }
		};
		inner.shutdown(session, ShutdownMode::Immediate).await;

		let detail = match status {
			WorkerStatus::Exited {
				code: Some(code),
				generation: 1,
			} => format!("worker exited during startup with code {code}"),
			_ => "worker exited during startup".to_string(),
		};
		Err(Error::LaunchFailed(detail))
	}

	/// Asks the worker to report the group list.
	pub async fn get_groups(&self) -> Result<()> {
		self.inner.send(Command::GetGroups).await
	}

	/// Starts monitoring `group_id`.
	///
	/// Dropped with a log line when the session is not connected. Success is
	/// reported asynchronously by [`BridgeEvent::MonitoringStatusChanged`].
	pub async fn monitor_group(&self, group_id: &str) -> Result<()> {
		if !self.is_connected() {
			warn!(target = "wabridge", group_id, "not connected, monitor request dropped");
			return Ok(());
		}
		self.inner.send(Command::monitor_group(group_id)).await
	}

	/// Stops monitoring. Local state changes only once the worker confirms.
	pub async fn stop_monitoring(&self) -> Result<()> {
		self.inner.send(Command::StopMonitoring).await
	}

	/// Logs the session out and stops the worker.
	///
	/// Sends `logout`, waits `command_flush` plus up to `exit_grace` for the
	/// worker to exit, and kills it otherwise. The session directory is purged
	/// and state reset in every case.
	pub async fn logout(&self) -> Result<()> {
		let inner = &self.inner;
		let _lifecycle = inner.lifecycle.lock().await;
		let session = inner.session.lock().take();
		let mode = ShutdownMode::Graceful {
			flush: inner.config.command_flush,
			grace: inner.config.exit_grace,
		};
		inner.shutdown(session, mode).await;
		Ok(())
	}

	/// Best-effort logout with a short grace period, then forced termination.
	///
	/// Safe to call repeatedly and from shutdown paths; never fails.
	pub async fn dispose(&self) {
		let inner = &self.inner;
		let _lifecycle = inner.lifecycle.lock().await;
		let Some(session) = inner.session.lock().take() else {
			debug!(target = "wabridge", "dispose: no worker");
			inner.dispatcher.reset();
			return;
		};
		let mode = ShutdownMode::Graceful {
			flush: Duration::ZERO,
			grace: inner.config.dispose_grace,
		};
		inner.shutdown(Some(session), mode).await;
	}
}

impl Inner {
	fn link(&self) -> Option<Arc<WorkerLink>> {
		self.session.lock().as_ref().map(|s| Arc::clone(&s.link))
	}

	async fn send(&self, command: Command) -> Result<()> {
		match self.link() {
			Some(link) => link.send(&command).await,
			None => {
				info!(target = "wabridge", command = command.name(), "no worker, command dropped");
				Ok(())
			}
		}
	}

	/// The single teardown path for initialize, logout and dispose.
	async fn shutdown(&self, session: Option<Session>, mode: ShutdownMode) {
		if let Some(mut session) = session {
			session.expected.store(true, Ordering::SeqCst);

			if let ShutdownMode::Graceful { flush, grace } = mode {
				if session.link.is_running() {
					self.request_logout(&session.link).await;
					if !flush.is_zero() {
						tokio::time::sleep(flush).await;
					}
					if !session.link.wait_exit(grace).await {
						warn!(
							target = "wabridge",
							grace_ms = grace.as_millis() as u64,
							"worker did not exit in time, killing"
						);
					}
				}
			}

			session.stop.cancel();
			if let Some(mut task) = session.task.take() {
				if tokio::time::timeout(TASK_JOIN_TIMEOUT, &mut task).await.is_err() {
					warn!(target = "wabridge", "supervisor did not stop in time, aborting");
					task.abort();
				}
			}
		}

		let config = &self.config;
		purge_session_dir(&config.session_path(), config.cleanup_retries, config.cleanup_delay)
			.await;
		self.dispatcher.reset();
	}

	async fn request_logout(&self, link: &WorkerLink) {
		if self.dispatcher.is_monitoring() {
			if let Err(e) = link.send(&Command::StopMonitoring).await {
				warn!(target = "wabridge", error = %e, "failed to send stop_monitoring");
			}
		}
		if let Err(e) = link.send(&Command::Logout).await {
			warn!(target = "wabridge", error = %e, "failed to send logout");
		}
	}
}
