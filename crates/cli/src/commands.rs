use std::io::Write;
use std::path::PathBuf;

use anyhow::Context;
use serde_json::{Value, json};
use tokio::io::BufReader;
use tokio_util::sync::CancellationToken;
use tracing::{error, info};
use wabridge::Bridge;
use wabridge::locate::{resolve_runtime, resolve_script};

use crate::cli::{Cli, Commands, RunArgs, WorkerArgs};
use crate::console::{Console, ConsoleOptions};
use crate::output::OutputFormat;

pub async fn dispatch(cli: Cli) -> anyhow::Result<()> {
	match cli.command {
		Commands::Run(args) => run(args, cli.format).await,
		Commands::Check(args) => check(&args, cli.format),
	}
}

async fn run(args: RunArgs, format: OutputFormat) -> anyhow::Result<()> {
	let config = args.to_config()?;
	let bridge = Bridge::new(config).context("invalid bridge configuration")?;

	let options = ConsoleOptions {
		format,
		auto_groups: !args.no_auto_groups,
		monitor: args.monitor.clone(),
	};
	let console = Console::new(&bridge, options);

	bridge.initialize().await.context("failed to start worker")?;
	info!(
		pid = ?bridge.worker_pid(),
		session_dir = %bridge.config().session_path().display(),
		"worker running"
	);

	let shutdown = CancellationToken::new();
	let signal = {
		let shutdown = shutdown.clone();
		tokio::spawn(async move {
			match tokio::signal::ctrl_c().await {
				Ok(()) => shutdown.cancel(),
				Err(e) => error!(error = %e, "cannot listen for ctrl-c"),
			}
		})
	};

	let stdin = BufReader::new(tokio::io::stdin());
	let mut stdout = std::io::stdout();
	let result = console.run(stdin, &mut stdout, shutdown).await;
	signal.abort();
	result
}

fn check(args: &WorkerArgs, format: OutputFormat) -> anyhow::Result<()> {
	let config = args.to_config()?;
	let runtime = resolve_runtime(&config.runtime);
	let script = resolve_script(&config);
	let session = config.session_path();

	let mut out = std::io::stdout();
	match format {
		OutputFormat::Text => {
			match &runtime {
				Ok(path) => writeln!(out, "runtime: {}", path.display())?,
				Err(e) => writeln!(out, "runtime: {e}")?,
			}
			match &script {
				Ok(path) => writeln!(out, "script:  {}", path.display())?,
				Err(e) => writeln!(out, "script:  {e}")?,
			}
			writeln!(out, "session: {}", session.display())?;
		}
		OutputFormat::Json => {
			let value = json!({
				"ok": runtime.is_ok() && script.is_ok(),
				"runtime": path_or_error(&runtime),
				"script": path_or_error(&script),
				"sessionDir": session.display().to_string(),
			});
			writeln!(out, "{value}")?;
		}
	}

	runtime?;
	script?;
	Ok(())
}

fn path_or_error(resolved: &wabridge::Result<PathBuf>) -> Value {
	match resolved {
		Ok(path) => json!({ "path": path.display().to_string() }),
		Err(e) => json!({ "error": e.to_string() }),
	}
}
