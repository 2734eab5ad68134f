//! Filesystem change notification
//!
//! Native mode registers every peer with a `notify` watcher and forwards
//! the index of the set a changed path belongs to. Poll mode sends the
//! set index on a fixed interval. Either way the receiver feeds a
//! [`TriggerScheduler`](super::TriggerScheduler).

use notify::{Event, EventKind, RecommendedWatcher, RecursiveMode, Watcher};
use std::collections::BTreeSet;
use std::path::{Component, Path, PathBuf};
use std::time::Duration;
use tokio::sync::mpsc::UnboundedSender;
use tokio::task::JoinHandle;

use crate::config::Config;
use crate::error::SyncError;
use crate::exclusion::{normalize_relative, should_ignore, IgnorePatterns};
use crate::logging::*;
use crate::strategies::{SyncSetType, WatchMode};

/// One watched peer and the set it belongs to
#[derive(Debug, Clone)]
pub struct WatchTarget {
	pub set: usize,
	pub path: PathBuf,
	pub set_type: SyncSetType,
	patterns: IgnorePatterns,
}

impl WatchTarget {
	/// `path` is stored absolute and, where it exists, canonical, since
	/// backends report event paths in that form
	pub fn new(set: usize, path: PathBuf, set_type: SyncSetType, patterns: IgnorePatterns) -> Self {
		let path = match set_type {
			SyncSetType::Directory => canonical_or_absolute(&path),
			SyncSetType::File => match (path.parent(), path.file_name()) {
				(Some(parent), Some(name)) => canonical_or_absolute(parent).join(name),
				_ => canonical_or_absolute(&path),
			},
		};
		WatchTarget { set, path, set_type, patterns }
	}

	/// Whether a change at `event_path` should trigger this target's set
	///
	/// Directory peers use the same exclusion predicate as the manifest
	/// builder. File peers only react to the peer file itself.
	pub fn matches(&self, event_path: &Path) -> bool {
		match self.set_type {
			SyncSetType::File => event_path == self.path,
			SyncSetType::Directory => match event_path.strip_prefix(&self.path) {
				Ok(rel) => {
					let rel = normalize_relative(rel);
					!rel.is_empty() && !should_ignore(&rel, &self.patterns)
				}
				Err(_) => false,
			},
		}
	}

	fn watch_spec(&self) -> (PathBuf, RecursiveMode) {
		match self.set_type {
			SyncSetType::Directory => (self.path.clone(), RecursiveMode::Recursive),
			SyncSetType::File => {
				let parent = match self.path.parent() {
					Some(p) if !p.as_os_str().is_empty() => p.to_path_buf(),
					_ => PathBuf::from("."),
				};
				(parent, RecursiveMode::NonRecursive)
			}
		}
	}
}

fn canonical_or_absolute(path: &Path) -> PathBuf {
	let absolute = match std::env::current_dir() {
		Ok(cwd) if !path.is_absolute() => cwd.join(path),
		_ => path.to_path_buf(),
	};
	match std::fs::canonicalize(&absolute) {
		Ok(canonical) => canonical,
		Err(_) => absolute.components().filter(|c| *c != Component::CurDir).collect(),
	}
}

/// Watch targets for every peer of every natively watched set
pub fn native_targets(config: &Config) -> Result<Vec<WatchTarget>, SyncError> {
	let mut targets = Vec::new();
	for (index, set) in config.sync_sets.iter().enumerate() {
		if set.effective_watch_mode(config) != WatchMode::Native {
			continue;
		}
		let patterns = set.ignore_patterns()?;
		for path in &set.paths {
			targets.push(WatchTarget::new(index, path.clone(), set.set_type, patterns.clone()));
		}
	}
	Ok(targets)
}

/// Set indices a raw event should trigger, without duplicates
pub fn route_event(targets: &[WatchTarget], event: &Event) -> BTreeSet<usize> {
	let relevant = matches!(event.kind, EventKind::Create(_) | EventKind::Modify(_) | EventKind::Remove(_));
	if !relevant {
		return BTreeSet::new();
	}

	event
		.paths
		.iter()
		.flat_map(|p| targets.iter().filter(move |t| t.matches(p)).map(|t| t.set))
		.collect()
}

/// Running change sources for all sets; stops them on drop
pub struct ChangeWatcher {
	_native: Option<RecommendedWatcher>,
	pollers: Vec<JoinHandle<()>>,
}

impl ChangeWatcher {
	/// Start watching every set of `config`, sending set indices to `tx`
	///
	/// Must be called from within a tokio runtime.
	pub fn start(config: &Config, tx: UnboundedSender<usize>) -> Result<Self, SyncError> {
		let targets = native_targets(config)?;
		let native = if targets.is_empty() { None } else { Some(start_native(targets, tx.clone())?) };

		let mut pollers = Vec::new();
		for (index, set) in config.sync_sets.iter().enumerate() {
			if set.effective_watch_mode(config) != WatchMode::Poll {
				continue;
			}
			let interval = Duration::from_millis(set.effective_poll_interval_ms(config));
			info!("Polling {} every {:?}", set.display_name(index), interval);
			pollers.push(spawn_poller(index, interval, tx.clone()));
		}

		Ok(ChangeWatcher { _native: native, pollers })
	}
}

impl Drop for ChangeWatcher {
	fn drop(&mut self) {
		for poller in &self.pollers {
			poller.abort();
		}
	}
}

fn start_native(
	targets: Vec<WatchTarget>,
	tx: UnboundedSender<usize>,
) -> Result<RecommendedWatcher, SyncError> {
	let specs: BTreeSet<(PathBuf, bool)> = targets
		.iter()
		.map(|t| {
			let (path, mode) = t.watch_spec();
			(path, mode == RecursiveMode::Recursive)
		})
		.collect();

	let mut watcher = notify::recommended_watcher(move |res: Result<Event, notify::Error>| match res {
		Ok(event) => {
			for set in route_event(&targets, &event) {
				if tx.send(set).is_err() {
					return;
				}
			}
		}
		Err(e) => warn!("File watcher error: {}", e),
	})?;

	for (path, recursive) in specs {
		let mode = if recursive { RecursiveMode::Recursive } else { RecursiveMode::NonRecursive };
		match watcher.watch(&path, mode) {
			Ok(()) => debug!("Watching {}", path.display()),
			// Peers missing at startup are picked up by the next triggered pass
			Err(e) => warn!("Cannot watch {}: {}", path.display(), e),
		}
	}

	Ok(watcher)
}

fn spawn_poller(set: usize, interval: Duration, tx: UnboundedSender<usize>) -> JoinHandle<()> {
	tokio::spawn(async move {
		let mut ticker = tokio::time::interval(interval);
		// The first tick completes immediately; the startup pass covers it
		ticker.tick().await;
		loop {
			ticker.tick().await;
			if tx.send(set).is_err() {
				break;
			}
		}
	})
}


// vim: ts=4
