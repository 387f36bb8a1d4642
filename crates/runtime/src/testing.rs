//! Test double for [`WorkerBridge`].
//!
//! [`MockBridge`] runs the real dispatcher without a process: tests feed it
//! worker output lines and inspect the commands the code under test sent.
//!
//! ```ignore
//! let bridge = MockBridge::new();
//! bridge.feed(r#"{"type":"status","connected":true}"#);
//! my_session_layer(&bridge).await;
//! assert_eq!(bridge.commands(), vec![Command::GetGroups]);
//! ```

use std::sync::atomic::{AtomicU32, Ordering};

use async_trait::async_trait;
use parking_lot::Mutex;
use tokio::sync::broadcast;
use wabridge_protocol::{Command, ProtocolMessage};

use crate::dispatcher::Dispatcher;
use crate::error::{Error, Result};
use crate::events::BridgeEvent;
use crate::service::WorkerBridge;
use crate::state::BridgeState;

/// In-memory [`WorkerBridge`] that records commands.
pub struct MockBridge {
	dispatcher: Dispatcher,
	commands: Mutex<Vec<Command>>,
	launches: AtomicU32,
	fail_initialize: Mutex<Option<String>>,
}

impl Default for MockBridge {
	fn default() -> Self {
		Self::new()
	}
}

impl MockBridge {
	pub fn new() -> Self {
		Self {
			dispatcher: Dispatcher::new(256),
			commands: Mutex::new(Vec::new()),
			launches: AtomicU32::new(0),
			fail_initialize: Mutex::new(None),
		}
	}

	/// Makes the next `initialize` fail with [`Error::LaunchFailed`].
	pub fn fail_next_initialize(&self, reason: impl Into<String>) {
		*self.fail_initialize.lock() = Some(reason.into());
	}

	/// Processes `line` as if the worker had written it to stdout.
	pub fn feed(&self, line: &str) {
		self.dispatcher.handle_line(line);
	}

	pub fn emit(&self, message: ProtocolMessage) {
		self.dispatcher.dispatch(message);
	}

	/// Simulates the worker dying.
	pub fn crash(&self, code: Option<i32>) {
		self.dispatcher.worker_exited(code, false);
	}

	/// Commands sent so far, oldest first.
	pub fn commands(&self) -> Vec<Command> {
		self.commands.lock().clone()
	}

	pub fn launches(&self) -> u32 {
		self.launches.load(Ordering::SeqCst)
	}

	fn record(&self, command: Command) {
		self.commands.lock().push(command);
	}
}

#[async_trait]
impl WorkerBridge for MockBridge {
	fn subscribe(&self) -> broadcast::Receiver<BridgeEvent> {
		self.dispatcher.subscribe()
	}

	fn is_connected(&self) -> bool {
		self.dispatcher.is_connected()
	}

	fn is_monitoring(&self) -> bool {
		self.dispatcher.is_monitoring()
	}

	fn snapshot(&self) -> BridgeState {
		self.dispatcher.snapshot()
	}

	async fn initialize(&self) -> Result<()> {
		if let Some(reason) = self.fail_initialize.lock().take() {
			return Err(Error::LaunchFailed(reason));
		}
		self.launches.fetch_add(1, Ordering::SeqCst);
		self.dispatcher.worker_started();
		Ok(())
	}

	async fn get_groups(&self) -> Result<()> {
		self.record(Command::GetGroups);
		Ok(())
	}

	/// Dropped unless connected, like [`Bridge::monitor_group`](crate::Bridge::monitor_group).
	async fn monitor_group(&self, group_id: &str) -> Result<()> {
		if self.dispatcher.is_connected() {
			self.record(Command::monitor_group(group_id));
		}
		Ok(())
	}

	async fn stop_monitoring(&self) -> Result<()> {
		self.record(Command::StopMonitoring);
		Ok(())
	}

	async fn logout(&self) -> Result<()> {
		self.record(Command::Logout);
		self.dispatcher.worker_exited(Some(0), true);
		Ok(())
	}

	async fn dispose(&self) {
		self.dispatcher.reset();
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[tokio::test]
	async fn records_commands_in_order() {
		let bridge = MockBridge::new();
		bridge.initialize().await.unwrap();
		bridge.feed(r#"{"type":"status","connected":true}"#);
		bridge.get_groups().await.unwrap();
		bridge.monitor_group("g1").await.unwrap();
		bridge.stop_monitoring().await.unwrap();

		assert_eq!(
			bridge.commands(),
			vec![
				Command::GetGroups,
				Command::monitor_group("g1"),
				Command::StopMonitoring
			]
		);
		assert_eq!(bridge.launches(), 1);
	}

	#[tokio::test]
	async fn fed_lines_drive_state() {
		let bridge = MockBridge::new();
		let mut rx = WorkerBridge::subscribe(&bridge);

		bridge.feed(r#"{"type":"status","connected":true}"#);
		assert!(bridge.is_connected());
		assert_eq!(rx.recv().await.unwrap(), BridgeEvent::ConnectionStatusChanged(true));

		bridge.crash(Some(1));
		assert!(!bridge.is_connected());
	}

	#[tokio::test]
	async fn monitor_requires_connection() {
		let bridge = MockBridge::new();
		bridge.monitor_group("g1").await.unwrap();
		assert!(bridge.commands().is_empty());

		bridge.feed(r#"{"type":"status","connected":true}"#);
		bridge.monitor_group("g1").await.unwrap();
		assert_eq!(bridge.commands(), vec![Command::monitor_group("g1")]);
	}

	#[tokio::test]
	async fn initialize_failure_is_one_shot() {
		let bridge = MockBridge::new();
		bridge.fail_next_initialize("boom");
		assert!(matches!(bridge.initialize().await, Err(Error::LaunchFailed(_))));
		assert!(bridge.initialize().await.is_ok());
	}
}
