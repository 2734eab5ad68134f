use clap::{Arg, ArgAction, Command};
use std::error::Error;
use std::path::PathBuf;
use std::sync::Arc;

use peersync::config::Config;
use peersync::engine::SyncEngine;
use peersync::lifecycle::{Lifecycle, PidFile};
use peersync::logging::*;
use peersync::{metadata, watch};

///////////////////////
// Utility functions //
///////////////////////

fn load_config(path: Option<&String>) -> Result<Config, Box<dyn Error>> {
	let path = path.map(PathBuf::from).unwrap_or_else(Config::default_path);
	if !path.exists() {
		return Err(format!(
			"Config file {} not found (use -c to point at one)",
			path.display()
		)
		.into());
	}
	debug!("Loading config from {}", path.display());
	Ok(Config::load(&path)?)
}

async fn cmd_sync(config: Config, set: Option<&String>) -> Result<bool, Box<dyn Error>> {
	let engine = SyncEngine::new(config);

	let results = match set {
		Some(name) => vec![(name.clone(), engine.run_by_name(name).await?)],
		None => engine.run_all().await,
	};

	let mut clean = true;
	for (name, result) in &results {
		println!("{}: {}", name, result);
		for err in &result.errors {
			println!("  error: {}", err);
		}
		clean &= !result.has_errors();
	}
	Ok(clean)
}

async fn cmd_watch(config: Config) -> Result<(), Box<dyn Error>> {
	let mut lifecycle = Lifecycle::new();
	lifecycle.start()?;

	let pid_path = config.pid_file.clone().unwrap_or_else(PidFile::default_path);
	let _pid_file = PidFile::acquire(&pid_path)?;
	let engine = Arc::new(SyncEngine::new(config));

	lifecycle.mark_running()?;
	info!("Watching {} sync sets (pid file {})", engine.set_count(), pid_path.display());

	let shutdown = async {
		if let Err(e) = tokio::signal::ctrl_c().await {
			error!("Cannot listen for Ctrl-C: {}", e);
		}
	};
	let outcome = watch::run_watch(engine, shutdown).await;

	lifecycle.stop()?;
	lifecycle.mark_stopped()?;
	outcome?;
	Ok(())
}

async fn cmd_status(config: Config) -> Result<(), Box<dyn Error>> {
	let pid_path = config.pid_file.clone().unwrap_or_else(PidFile::default_path);
	match PidFile::running_pid(&pid_path)? {
		Some(pid) => println!("daemon: running (pid {})", pid),
		None => println!("daemon: not running"),
	}

	let engine = SyncEngine::new(config);
	for report in engine.status().await {
		print!("{}", report);
	}
	Ok(())
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn Error>> {
	let matches = Command::new("PeerSync")
		.version(env!("CARGO_PKG_VERSION"))
		.about("Local n-way file and directory synchronizer")
		.subcommand_required(true)
		.arg(
			Arg::new("config")
				.short('c')
				.long("config")
				.value_name("CONFIG")
				.global(true)
				.help("Config file (.toml, .json or .json5)"),
		)
		.arg(
			Arg::new("verbose")
				.short('v')
				.long("verbose")
				.action(ArgAction::Count)
				.global(true)
				.help("More log output (repeat for trace)"),
		)
		.subcommand(
			Command::new("sync")
				.about("Run one pass over every sync set")
				.arg(Arg::new("set").long("set").value_name("NAME").help("Only sync this set")),
		)
		.subcommand(Command::new("watch").about("Sync on every change until interrupted"))
		.subcommand(Command::new("status").about("Show the sync state of every peer"))
		.subcommand(
			Command::new("reset")
				.about("Forget a peer's sync state so it is treated as fresh")
				.arg(Arg::new("path").required(true)),
		)
		.get_matches();

	init_tracing(matches.get_count("verbose"));
	let config_path = matches.get_one::<String>("config");

	if let Some(sub_matches) = matches.subcommand_matches("sync") {
		let config = load_config(config_path)?;
		if !cmd_sync(config, sub_matches.get_one::<String>("set")).await? {
			std::process::exit(1);
		}
	} else if matches.subcommand_matches("watch").is_some() {
		cmd_watch(load_config(config_path)?).await?;
	} else if matches.subcommand_matches("status").is_some() {
		cmd_status(load_config(config_path)?).await?;
	} else if let Some(sub_matches) = matches.subcommand_matches("reset") {
		let path = sub_matches.get_one::<String>("path").ok_or("reset: path argument required")?;
		match metadata::clear(&PathBuf::from(path)).await? {
			Some(removed) => println!("Removed {}", removed.display()),
			None => println!("{} has no sync state", path),
		}
	}

	Ok(())
}

// vim: ts=4
