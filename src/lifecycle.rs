//! Daemon lifecycle: state machine and PID file
//!
//! The watch daemon moves through `NotRunning -> Starting -> Running ->
//! Stopping -> NotRunning`. A [`PidFile`] keeps a second daemon from
//! starting against the same configuration.

use std::fmt;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use sysinfo::{Pid, ProcessesToUpdate, System};

use crate::error::LifecycleError;
use crate::logging::*;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LifecycleState {
	#[default]
	NotRunning,
	Starting,
	Running,
	Stopping,
}

impl fmt::Display for LifecycleState {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		let s = match self {
			LifecycleState::NotRunning => "not-running",
			LifecycleState::Starting => "starting",
			LifecycleState::Running => "running",
			LifecycleState::Stopping => "stopping",
		};
		f.write_str(s)
	}
}

/// Daemon state machine rejecting out-of-order transitions
#[derive(Debug, Default)]
pub struct Lifecycle {
	state: LifecycleState,
}

impl Lifecycle {
	pub fn new() -> Self {
		Self::default()
	}

	pub fn state(&self) -> LifecycleState {
		self.state
	}

	pub fn is_running(&self) -> bool {
		self.state == LifecycleState::Running
	}

	/// Whether `from -> to` is a legal step
	pub fn can_transition(from: LifecycleState, to: LifecycleState) -> bool {
		use LifecycleState::*;
		matches!(
			(from, to),
			(NotRunning, Starting)
				| (Starting, Running)
				| (Starting, Stopping)
				| (Running, Stopping)
				| (Stopping, NotRunning)
		)
	}

	pub fn transition(&mut self, to: LifecycleState) -> Result<(), LifecycleError> {
		if !Self::can_transition(self.state, to) {
			return Err(LifecycleError::IllegalTransition {
				from: self.state.to_string(),
				to: to.to_string(),
			});
		}
		debug!("Lifecycle {} -> {}", self.state, to);
		self.state = to;
		Ok(())
	}

	pub fn start(&mut self) -> Result<(), LifecycleError> {
		self.transition(LifecycleState::Starting)
	}

	pub fn mark_running(&mut self) -> Result<(), LifecycleError> {
		self.transition(LifecycleState::Running)
	}

	pub fn stop(&mut self) -> Result<(), LifecycleError> {
		self.transition(LifecycleState::Stopping)
	}

	pub fn mark_stopped(&mut self) -> Result<(), LifecycleError> {
		self.transition(LifecycleState::NotRunning)
	}
}

/// Exclusive PID file, removed on drop
#[derive(Debug)]
pub struct PidFile {
	path: PathBuf,
}

impl PidFile {
	/// Default location next to the default config (~/.peersync/peersync.pid)
	pub fn default_path() -> PathBuf {
		std::env::var("HOME")
			.map(|h| PathBuf::from(h).join(".peersync").join("peersync.pid"))
			.unwrap_or_else(|_| PathBuf::from(".peersync").join("peersync.pid"))
	}

	/// Claim the PID file for this process
	///
	/// Fails if it names a process that is still alive. A file left behind
	/// by a dead process, or holding garbage, is replaced.
	pub fn acquire(path: &Path) -> Result<Self, LifecycleError> {
		if let Some(pid) = read_pid(path)? {
			if pid != std::process::id() && is_alive(pid) {
				return Err(LifecycleError::AlreadyRunning { pid, path: path.to_path_buf() });
			}
			warn!("Removing stale PID file {} (pid {})", path.display(), pid);
		}

		let pid_err = |e: io::Error| LifecycleError::PidFile { path: path.to_path_buf(), source: e };
		if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
			fs::create_dir_all(parent).map_err(pid_err)?;
		}
		fs::write(path, std::process::id().to_string()).map_err(pid_err)?;

		Ok(PidFile { path: path.to_path_buf() })
	}

	pub fn path(&self) -> &Path {
		&self.path
	}

	/// PID of the live daemon holding `path`, if any
	pub fn running_pid(path: &Path) -> Result<Option<u32>, LifecycleError> {
		Ok(read_pid(path)?.filter(|&pid| is_alive(pid)))
	}
}

impl Drop for PidFile {
	fn drop(&mut self) {
		let _ = fs::remove_file(&self.path);
	}
}

fn read_pid(path: &Path) -> Result<Option<u32>, LifecycleError> {
	match fs::read_to_string(path) {
		Ok(contents) => Ok(contents.trim().parse().ok()),
		Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(None),
		Err(e) => Err(LifecycleError::PidFile { path: path.to_path_buf(), source: e }),
	}
}

fn is_alive(pid: u32) -> bool {
	let pid = Pid::from_u32(pid);
	let mut system = System::new();
	system.refresh_processes(ProcessesToUpdate::Some(&[pid]), true);
	system.process(pid).is_some()
}


// vim: ts=4
