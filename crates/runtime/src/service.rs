//! Collaborator-facing bridge interface.
//!
//! The session layer programs against [`WorkerBridge`] rather than [`Bridge`]
//! directly, so it can be driven by [`MockBridge`](crate::testing::MockBridge)
//! in tests.

use async_trait::async_trait;
use tokio::sync::broadcast;

use crate::bridge::Bridge;
use crate::error::Result;
use crate::events::BridgeEvent;
use crate::state::BridgeState;

/// Commands, lifecycle and state of one WhatsApp worker.
#[async_trait]
pub trait WorkerBridge: Send + Sync {
	/// Returns a receiver for events published from now on.
	fn subscribe(&self) -> broadcast::Receiver<BridgeEvent>;

	fn is_connected(&self) -> bool;

	fn is_monitoring(&self) -> bool;

	fn snapshot(&self) -> BridgeState;

	/// Cleans up and launches the worker.
	async fn initialize(&self) -> Result<()>;

	async fn get_groups(&self) -> Result<()>;

	async fn monitor_group(&self, group_id: &str) -> Result<()>;

	async fn stop_monitoring(&self) -> Result<()>;

	/// Logs out, stops the worker and clears the session.
	async fn logout(&self) -> Result<()>;

	/// Stops everything. Never fails.
	async fn dispose(&self);
}

#[async_trait]
impl WorkerBridge for Bridge {
	fn subscribe(&self) -> broadcast::Receiver<BridgeEvent> {
		Bridge::subscribe(self)
	}

	fn is_connected(&self) -> bool {
		Bridge::is_connected(self)
	}

	fn is_monitoring(&self) -> bool {
		Bridge::is_monitoring(self)
	}

	fn snapshot(&self) -> BridgeState {
		Bridge::snapshot(self)
	}

	async fn initialize(&self) -> Result<()> {
		Bridge::initialize(self).await
	}

	async fn get_groups(&self) -> Result<()> {
		Bridge::get_groups(self).await
	}

	async fn monitor_group(&self, group_id: &str) -> Result<()> {
		Bridge::monitor_group(self, group_id).await
	}

	async fn stop_monitoring(&self) -> Result<()> {
		Bridge::stop_monitoring(self).await
	}

	async fn logout(&self) -> Result<()> {
		Bridge::logout(self).await
	}

	async fn dispose(&self) {
		Bridge::dispose(self).await
	}
}
