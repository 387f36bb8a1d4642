//! Interactive console: prints bridge events and executes operator commands.

use std::io::Write;

use tokio::io::{AsyncBufRead, AsyncBufReadExt};
use tokio::sync::broadcast::{self, error::RecvError};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};
use wabridge::{BridgeEvent, WorkerBridge};

use crate::operator::{HELP, OperatorCommand};
use crate::output::{OutputFormat, render_event, render_state};

#[derive(Debug, Clone, Default)]
pub struct ConsoleOptions {
	pub format: OutputFormat,
	/// Request the group list whenever the session connects.
	pub auto_groups: bool,
	/// Group to monitor once it shows up in a group list.
	pub monitor: Option<String>,
}

#[derive(Debug, PartialEq, Eq)]
enum Flow {
	Continue,
	Quit,
}

pub struct Console<'a, B: ?Sized> {
	events: broadcast::Receiver<BridgeEvent>,
	handler: Handler<'a, B>,
}

struct Handler<'a, B: ?Sized> {
	bridge: &'a B,
	options: ConsoleOptions,
	pending_monitor: Option<String>,
}

impl<'a, B> Console<'a, B>
where
	B: WorkerBridge + ?Sized,
{
	/// Subscribes immediately, so no event after this call is missed.
	pub fn new(bridge: &'a B, options: ConsoleOptions) -> Self {
		let pending_monitor = options.monitor.clone();
		Self {
			events: bridge.subscribe(),
			handler: Handler {
				bridge,
				options,
				pending_monitor,
			},
		}
	}

	/// Runs until `quit`, `logout` or `shutdown`, then disposes the bridge.
	///
	/// End of input does not stop the console; events keep printing until
	/// shutdown.
	pub async fn run<R, W>(
		self,
		input: R,
		out: &mut W,
		shutdown: CancellationToken,
	) -> anyhow::Result<()>
	where
		R: AsyncBufRead + Unpin,
		W: Write,
	{
		let Console {
			mut events,
			handler: mut this,
		} = self;
		let mut lines = input.lines();
		let mut input_open = true;

		let result: anyhow::Result<()> = async {
			loop {
				tokio::select! {
					_ = shutdown.cancelled() => {
						info!("shutdown requested");
						break;
					}
					event = events.recv() => match event {
						Ok(event) => this.on_event(&event, out).await?,
						Err(RecvError::Lagged(skipped)) => {
							warn!(skipped, "console fell behind, events dropped");
						}
						Err(RecvError::Closed) => break,
					},
					line = lines.next_line(), if input_open => match line {
						Ok(Some(line)) => {
							if this.on_line(&line, out).await? == Flow::Quit {
								break;
							}
						}
						Ok(None) => {
							debug!("stdin closed");
							input_open = false;
						}
						Err(e) => {
							warn!(error = %e, "stdin unreadable");
							input_open = false;
						}
					},
				}
			}
			Ok(())
		}
		.await;

		this.bridge.dispose().await;
		result
	}
}

impl<B> Handler<'_, B>
where
	B: WorkerBridge + ?Sized,
{
	async fn on_event<W: Write>(&mut self, event: &BridgeEvent, out: &mut W) -> anyhow::Result<()> {
		writeln!(out, "{}", render_event(event, self.options.format))?;
		out.flush()?;

		match event {
			BridgeEvent::ConnectionStatusChanged(true) if self.options.auto_groups => {
				self.bridge.get_groups().await?;
			}
			BridgeEvent::GroupsUpdated(groups) => {
				if let Some(wanted) = &self.pending_monitor {
					if groups.iter().any(|g| &g.id == wanted) {
						info!(group_id = %wanted, "monitoring requested group");
						self.bridge.monitor_group(wanted).await?;
						self.pending_monitor = None;
					} else {
						debug!(group_id = %wanted, "requested group not in list");
					}
				}
			}
			_ => {}
		}
		Ok(())
	}

	async fn on_line<W: Write>(&mut self, line: &str, out: &mut W) -> anyhow::Result<Flow> {
		let command = match OperatorCommand::parse(line) {
			None => return Ok(Flow::Continue),
			Some(Err(e)) => {
				writeln!(out, "{e}")?;
				return Ok(Flow::Continue);
			}
			Some(Ok(command)) => command,
		};

		match command {
			OperatorCommand::Groups => self.bridge.get_groups().await?,
			OperatorCommand::Monitor(group_id) => {
				if self.bridge.is_connected() {
					self.bridge.monitor_group(&group_id).await?;
				} else {
					writeln!(out, "not connected yet; will monitor {group_id} once it is listed")?;
					self.pending_monitor = Some(group_id);
				}
			}
			OperatorCommand::Stop => self.bridge.stop_monitoring().await?,
			OperatorCommand::Status => {
				writeln!(out, "{}", render_state(&self.bridge.snapshot(), self.options.format))?;
			}
			OperatorCommand::Logout => {
				self.bridge.logout().await?;
				return Ok(Flow::Quit);
			}
			OperatorCommand::Quit => return Ok(Flow::Quit),
			OperatorCommand::Help => writeln!(out, "{HELP}")?,
		}
		out.flush()?;
		Ok(Flow::Continue)
	}
}
