use std::path::PathBuf;

use clap::builder::Styles;
use clap::builder::styling::AnsiColor;
use clap::{Args, Parser, Subcommand};
use wabridge::{BridgeConfig, RestartPolicy};

use crate::output::OutputFormat;

#[derive(Parser, Debug)]
#[command(name = "wabridge")]
#[command(about = "Run and drive the WhatsApp worker from a terminal")]
#[command(version)]
#[command(styles = styles())]
pub struct Cli {
	/// Increase verbosity (-v info, -vv debug)
	#[arg(short, long, global = true, action = clap::ArgAction::Count)]
	pub verbose: u8,

	/// Output format for events
	#[arg(short = 'f', long, global = true, value_enum, default_value = "text")]
	pub format: OutputFormat,

	#[command(subcommand)]
	pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
	/// Start the worker and print its events; read commands from stdin
	///
	/// Commands: groups, monitor <group-id>, stop, status, logout, quit
	Run(RunArgs),

	/// Resolve the runtime, script and session paths without launching
	Check(WorkerArgs),
}

#[derive(Args, Debug, Clone, Default)]
pub struct WorkerArgs {
	/// JSON config file (camelCase keys, durations in milliseconds)
	#[arg(short, long, value_name = "FILE")]
	pub config: Option<PathBuf>,

	/// Node.js executable or name on PATH
	#[arg(long, value_name = "PATH")]
	pub node: Option<PathBuf>,

	/// Worker script (default: <install-dir>/Node/whatsapp.js)
	#[arg(long, value_name = "FILE")]
	pub script: Option<PathBuf>,

	/// Directory the default script and session paths are resolved against
	#[arg(long, value_name = "DIR")]
	pub install_dir: Option<PathBuf>,

	/// Session directory purged before launch and after logout
	#[arg(long, value_name = "DIR")]
	pub session_dir: Option<PathBuf>,
}

impl WorkerArgs {
	/// Builds the bridge config: file or defaults, then environment, then
	/// flags.
	pub fn to_config(&self) -> anyhow::Result<BridgeConfig> {
		let mut config = match &self.config {
			Some(path) => BridgeConfig::from_file(path)?,
			None => BridgeConfig::from_env(),
		};
		if let Some(node) = &self.node {
			config.runtime = node.clone();
		}
		if let Some(script) = &self.script {
			config.script = Some(script.clone());
		}
		if let Some(dir) = &self.install_dir {
			config.install_dir = Some(dir.clone());
		}
		if let Some(dir) = &self.session_dir {
			config.session_dir = Some(dir.clone());
		}
		config.validate()?;
		Ok(config)
	}
}

#[derive(Args, Debug, Clone, Default)]
pub struct RunArgs {
	#[command(flatten)]
	pub worker: WorkerArgs,

	/// Do not relaunch the worker after a crash
	#[arg(long)]
	pub no_restart: bool,

	/// Do not request the group list when the session connects
	#[arg(long)]
	pub no_auto_groups: bool,

	/// Start monitoring this group as soon as it appears in the group list
	#[arg(short, long, value_name = "GROUP_ID")]
	pub monitor: Option<String>,
}

impl RunArgs {
	pub fn to_config(&self) -> anyhow::Result<BridgeConfig> {
		let mut config = self.worker.to_config()?;
		if self.no_restart {
			config.restart = RestartPolicy::disabled();
		}
		Ok(config)
	}
}

fn styles() -> Styles {
	Styles::styled()
		.header(AnsiColor::Green.on_default().bold())
		.usage(AnsiColor::Green.on_default().bold())
		.literal(AnsiColor::Cyan.on_default())
		.placeholder(AnsiColor::Cyan.on_default())
}
