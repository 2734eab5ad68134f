//! Synchronization of individual file peers
//!
//! Each peer is one file with a `.peersync` sidecar recording its last
//! synced hash. A peer whose content differs from its sidecar (or that has
//! no sidecar yet) is "changed"; the pass picks one changed peer as winner
//! and copies it everywhere else. A peer whose file vanished but whose
//! sidecar remains is left alone: deletions are not propagated.
//!
//! A peer the winner could not reach keeps its old sidecar, and so does the
//! winner, so the next pass sees the same change and tries again.

use std::collections::BTreeSet;
use std::io;
use std::path::{Path, PathBuf};
use tokio::fs as afs;

use crate::config::SyncSet;
use crate::conflict::resolver::Candidate;
use crate::conflict::ConflictResolver;
use crate::error::SyncError;
use crate::fileops;
use crate::logging::*;
use crate::manifest;
use crate::metadata::{self, FileSyncMetadata};
use crate::strategies::ConflictResolution;
use crate::types::SyncResult;

/// Live state of a file peer
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileState {
	pub hash: String,
	pub size: u64,
	pub mtime_ms: i64,
}

/// Classification of a file peer at the start of a pass
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PeerStatus {
	/// Exists and differs from its sidecar, or has no sidecar
	Changed,
	/// Neither the file nor a sidecar exists
	Fresh,
	/// Matches its sidecar, or was deleted after being synced
	Unchanged,
}

#[derive(Debug, Clone)]
struct FilePeer {
	path: PathBuf,
	state: Option<FileState>,
	status: PeerStatus,
}

/// Classify a peer from its live state and sidecar
pub fn classify(state: Option<&FileState>, sidecar: Option<&FileSyncMetadata>) -> PeerStatus {
	match (state, sidecar) {
		(Some(_), None) => PeerStatus::Changed,
		(Some(s), Some(m)) if s.hash != m.hash => PeerStatus::Changed,
		(None, None) => PeerStatus::Fresh,
		_ => PeerStatus::Unchanged,
	}
}

/// Stat and hash a file peer, `None` when it does not exist
pub async fn observe(path: &Path) -> Result<Option<FileState>, SyncError> {
	let meta = match afs::symlink_metadata(path).await {
		Ok(meta) => meta,
		Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(None),
		Err(e) => {
			return Err(SyncError::PeerUnusable { path: path.to_path_buf(), reason: e.to_string() })
		}
	};
	if !meta.is_file() {
		return Err(SyncError::PeerUnusable {
			path: path.to_path_buf(),
			reason: "not a regular file".to_string(),
		});
	}

	let hash = manifest::hash_file(path).await?;
	Ok(Some(FileState { hash, size: meta.len(), mtime_ms: manifest::mtime_ms(&meta) }))
}

/// Run one pass over a file sync set
pub async fn sync_files(set: &SyncSet, resolver: &ConflictResolver) -> Result<SyncResult, SyncError> {
	let strategy = resolver.strategy(set.conflict_resolution);
	let mut result = SyncResult::new();

	let mut peers = Vec::with_capacity(set.paths.len());
	let mut unobserved = false;
	for path in &set.paths {
		let sidecar = metadata::read_file_metadata(path).await?;
		let state = match observe(path).await {
			Ok(state) => state,
			Err(SyncError::Io(e)) => {
				// Locked or unreadable right now; retried on the next pass
				result.record_error("hash", path, e);
				unobserved = true;
				continue;
			}
			Err(e) => return Err(e),
		};
		let status = classify(state.as_ref(), sidecar.as_ref());
		peers.push(FilePeer { path: path.clone(), state, status });
	}

	let changed: Vec<usize> =
		(0..peers.len()).filter(|&i| peers[i].status == PeerStatus::Changed).collect();
	if changed.is_empty() {
		return Ok(result);
	}

	let candidates: Vec<Candidate> = changed
		.iter()
		.filter_map(|&i| peers[i].state.as_ref().map(|s| Candidate { index: i, mtime_ms: s.mtime_ms }))
		.collect();
	let winner = if candidates.len() == 1 {
		candidates[0].index
	} else {
		match ConflictResolver::pick_winner(&candidates, strategy) {
			Some(w) => w,
			None => return Ok(result),
		}
	};

	let winner_path = peers[winner].path.clone();
	let winner_hash = peers[winner].state.as_ref().map(|s| s.hash.clone()).unwrap_or_default();
	debug!("Winner {} among {} changed peers", winner_path.display(), changed.len());

	// Losing changed peers whose content could not be preserved are not overwritten
	let mut skip = BTreeSet::new();
	for &i in &changed {
		let loser_hash = peers[i].state.as_ref().map(|s| s.hash.as_str());
		if i == winner || loser_hash == Some(winner_hash.as_str()) {
			continue;
		}
		result.count_conflict();
		let path = &peers[i].path;

		match strategy {
			ConflictResolution::KeepBoth => match resolver.preserve(path).await {
				Ok(preserved) => result.record_conflict_action(
					&winner_path,
					path,
					format!("{}: saved as {}", strategy, preserved.display()),
				),
				Err(e) => {
					result.record_error("preserve", path, e);
					skip.insert(i);
				}
			},
			ConflictResolution::LastWriteWins => {
				result.record_conflict_action(
					&winner_path,
					path,
					format!("{}: older copy overwritten", strategy),
				);
			}
		}
	}

	for (i, peer) in peers.iter().enumerate() {
		if i == winner || skip.contains(&i) {
			continue;
		}
		if peer.state.as_ref().map(|s| s.hash.as_str()) == Some(winner_hash.as_str()) {
			continue;
		}

		match fileops::copy_file(&winner_path, &peer.path).await {
			Ok(_) if peer.state.is_some() => result.record_modified(&winner_path, &peer.path),
			Ok(_) => result.record_added(&winner_path, &peer.path),
			Err(e) => {
				result.record_error("copy", &peer.path, e);
				skip.insert(i);
			}
		}
	}

	if !skip.is_empty() || unobserved {
		debug!("{} peers missed {}, keeping its sidecar stale", skip.len(), winner_path.display());
		skip.insert(winner);
	}
	write_sidecars(&peers, &skip, &mut result).await;
	Ok(result)
}

/// Refresh the sidecar of every peer that now exists on disk, except `skip`
async fn write_sidecars(peers: &[FilePeer], skip: &BTreeSet<usize>, result: &mut SyncResult) {
	let now = manifest::now_ms();
	for (i, peer) in peers.iter().enumerate() {
		if skip.contains(&i) {
			continue;
		}
		let state = match observe(&peer.path).await {
			Ok(Some(state)) => state,
			Ok(None) => continue,
			Err(e) => {
				result.record_error("hash", &peer.path, e);
				continue;
			}
		};
		let sidecar = FileSyncMetadata {
			hash: state.hash,
			mtime_ms: state.mtime_ms,
			size: state.size,
			last_sync_time: now,
		};
		if let Err(e) = metadata::write_file_metadata(&peer.path, &sidecar).await {
			result.record_error("write sidecar", &peer.path, e);
		}
	}
}


// vim: ts=4
