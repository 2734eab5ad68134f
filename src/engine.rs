//! Sync engine: the entry point that runs passes for configured sets
//!
//! A pass never fails from the caller's point of view. Fatal conditions
//! become a result holding one error; per-file failures sit next to the
//! success counts.

use futures::future;
use std::fmt;
use std::path::PathBuf;
use tracing::Instrument;
use uuid::Uuid;

use crate::config::{Config, SyncSet};
use crate::conflict::ConflictResolver;
use crate::error::{MetadataError, SyncError};
use crate::logging::*;
use crate::metadata;
use crate::strategies::SyncSetType;
use crate::sync_dir::sync_directories;
use crate::sync_file::sync_files;
use crate::types::SyncResult;

/// Runs sync passes for the sets of one configuration
#[derive(Debug, Clone)]
pub struct SyncEngine {
	config: Config,
	resolver: ConflictResolver,
}

impl SyncEngine {
	pub fn new(config: Config) -> Self {
		let resolver = ConflictResolver::new(config.conflict_resolution);
		SyncEngine { config, resolver }
	}

	pub fn config(&self) -> &Config {
		&self.config
	}

	pub fn set_count(&self) -> usize {
		self.config.sync_sets.len()
	}

	/// Display name of the set at `index`
	pub fn set_name(&self, index: usize) -> String {
		match self.config.sync_sets.get(index) {
			Some(set) => set.display_name(index),
			None => format!("set-{}", index),
		}
	}

	/// Run one pass for the set at `index`
	pub async fn run_set(&self, index: usize) -> SyncResult {
		let Some(set) = self.config.sync_sets.get(index) else {
			return SyncResult::failed(format!("No sync set at index {}", index));
		};

		let name = set.display_name(index);
		let span = info_span!("pass", set = %name, id = %Uuid::new_v4());
		self.run_pass(set).instrument(span).await
	}

	/// Run one pass for the set with the given name (or index)
	pub async fn run_by_name(&self, name: &str) -> Result<SyncResult, SyncError> {
		let index = self
			.config
			.find_set(name)
			.ok_or_else(|| SyncError::Other { message: format!("Unknown sync set: {}", name) })?;
		Ok(self.run_set(index).await)
	}

	/// Run one pass for every set concurrently
	///
	/// Sets share no state, so their passes may interleave freely.
	pub async fn run_all(&self) -> Vec<(String, SyncResult)> {
		let passes = (0..self.set_count()).map(|i| async move { (self.set_name(i), self.run_set(i).await) });
		future::join_all(passes).await
	}

	async fn run_pass(&self, set: &SyncSet) -> SyncResult {
		debug!("Starting {} pass over {} peers", set.set_type, set.paths.len());

		let outcome = match set.set_type {
			SyncSetType::Directory => sync_directories(set, &self.resolver).await,
			SyncSetType::File => sync_files(set, &self.resolver).await,
		};

		match outcome {
			Ok(result) => {
				for action in &result.actions {
					debug!("{}", action);
				}
				for err in &result.errors {
					warn!("{}", err);
				}
				if result.is_noop() {
					debug!("{}", result);
				} else {
					info!("{}", result);
				}
				result
			}
			Err(e) => {
				match &e {
					SyncError::Metadata(MetadataError::Corrupted { path, .. }) => {
						error!("Corrupted metadata at {}, pass aborted: {}", path.display(), e);
						error!("Inspect the file or run `peersync reset` on the peer to start fresh");
					}
					_ => error!("Pass aborted: {}", e),
				}
				SyncResult::failed(e.to_string())
			}
		}
	}

	/// Sync state of every peer of every set, without running a pass
	pub async fn status(&self) -> Vec<SetReport> {
		let mut reports = Vec::with_capacity(self.set_count());
		for (index, set) in self.config.sync_sets.iter().enumerate() {
			let mut peers = Vec::with_capacity(set.paths.len());
			for path in &set.paths {
				peers.push(PeerReport { path: path.clone(), state: peer_state(set.set_type, path).await });
			}
			reports.push(SetReport {
				name: set.display_name(index),
				set_type: set.set_type,
				strategy: self.resolver.strategy(set.conflict_resolution),
				peers,
			});
		}
		reports
	}
}

async fn peer_state(set_type: SyncSetType, path: &std::path::Path) -> PeerSyncState {
	let loaded = match set_type {
		SyncSetType::Directory => metadata::read_metadata(path)
			.await
			.map(|m| m.map(|m| (m.last_sync_time, Some(m.manifest.len())))),
		SyncSetType::File => {
			metadata::read_file_metadata(path).await.map(|m| m.map(|m| (m.last_sync_time, None)))
		}
	};

	match loaded {
		Ok(None) => PeerSyncState::Fresh,
		Ok(Some((last_sync_time, files))) => PeerSyncState::Synced { last_sync_time, files },
		Err(e) => PeerSyncState::Unreadable(e.to_string()),
	}
}

/// Status of one set as shown by `peersync status`
#[derive(Debug, Clone)]
pub struct SetReport {
	pub name: String,
	pub set_type: SyncSetType,
	pub strategy: crate::strategies::ConflictResolution,
	pub peers: Vec<PeerReport>,
}

#[derive(Debug, Clone)]
pub struct PeerReport {
	pub path: PathBuf,
	pub state: PeerSyncState,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PeerSyncState {
	/// Never synced
	Fresh,
	/// `files` is the number of tracked files for directory peers
	Synced { last_sync_time: i64, files: Option<usize> },
	Unreadable(String),
}

impl fmt::Display for PeerSyncState {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		match self {
			PeerSyncState::Fresh => write!(f, "fresh"),
			PeerSyncState::Synced { last_sync_time, files } => {
				let when = chrono::DateTime::<chrono::Utc>::from_timestamp_millis(*last_sync_time)
					.map(|t| t.to_rfc3339())
					.unwrap_or_else(|| last_sync_time.to_string());
				match files {
					Some(n) => write!(f, "synced {} ({} files)", when, n),
					None => write!(f, "synced {}", when),
				}
			}
			PeerSyncState::Unreadable(msg) => write!(f, "metadata unreadable: {}", msg),
		}
	}
}

impl fmt::Display for SetReport {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		writeln!(f, "{} ({}, {})", self.name, self.set_type, self.strategy)?;
		for peer in &self.peers {
			writeln!(f, "  {}: {}", peer.path.display(), peer.state)?;
		}
		Ok(())
	}
}


// vim: ts=4
