//! N-way directory synchronization
//!
//! One pass over a directory set works in three phases:
//!
//! 1. Load: every peer gets a current manifest, its previous manifest from
//!    the metadata file (empty when fresh) and the diff between the two.
//! 2. Propagate: every ordered pair of distinct peers, in configured order,
//!    pushes the source's changes into the destination.
//! 3. Commit: every peer's manifest is rebuilt from disk and persisted.
//!    A path that failed to reach some destination keeps the source's
//!    previous baseline entry, so the next pass sees the change again.
//!
//! All decisions are made against the diffs computed in phase 1. Before a
//! destination file is overwritten or deleted its live content is checked,
//! so work done by an earlier pair in the same pass is never clobbered.

use std::collections::BTreeSet;
use std::io;
use std::path::{Path, PathBuf};
use tokio::fs as afs;

use crate::config::SyncSet;
use crate::conflict::{ConflictResolver, PairOutcome};
use crate::diff::{diff, ManifestDiff};
use crate::error::SyncError;
use crate::exclusion::{should_ignore, IgnorePatterns};
use crate::fileops;
use crate::logging::*;
use crate::manifest::{self, build_manifest, Manifest};
use crate::metadata::{self, SyncMetadata};
use crate::strategies::ConflictResolution;
use crate::types::SyncResult;

/// One directory peer as loaded at the start of a pass
#[derive(Debug, Clone)]
pub struct DirPeer {
	pub root: PathBuf,
	/// No metadata file existed when the pass started
	pub fresh: bool,
	/// Baseline from the metadata file, minus ignored paths
	pub previous: Manifest,
	pub current: Manifest,
	pub diff: ManifestDiff,
}

/// Run one pass over a directory sync set
///
/// Fatal errors (an unusable peer, corrupted metadata, bad ignore patterns)
/// abort the pass before anything is written. Per-file failures are
/// collected in the returned result.
pub async fn sync_directories(
	set: &SyncSet,
	resolver: &ConflictResolver,
) -> Result<SyncResult, SyncError> {
	let patterns = set.ignore_patterns()?;
	let strategy = resolver.strategy(set.conflict_resolution);

	for path in &set.paths {
		ensure_peer_dir(path).await?;
	}

	let mut peers = Vec::with_capacity(set.paths.len());
	for path in &set.paths {
		peers.push(load_peer(path, &patterns).await?);
	}

	let fresh = peers.iter().filter(|p| p.fresh).count();
	debug!("Loaded {} peers ({} fresh), strategy {}", peers.len(), fresh, strategy);

	let mut pass = DirectoryPass {
		peers,
		resolver,
		strategy,
		conflicted: BTreeSet::new(),
		failed: BTreeSet::new(),
		result: SyncResult::new(),
	};

	pass.propagate().await;
	pass.commit(&patterns).await;
	Ok(pass.result)
}

/// Make sure `path` is a directory, creating it when missing
pub async fn ensure_peer_dir(path: &Path) -> Result<(), SyncError> {
	match afs::metadata(path).await {
		Ok(meta) if meta.is_dir() => Ok(()),
		Ok(_) => Err(SyncError::PeerUnusable {
			path: path.to_path_buf(),
			reason: "exists but is not a directory".to_string(),
		}),
		Err(e) if e.kind() == io::ErrorKind::NotFound => {
			afs::create_dir_all(path).await.map_err(|e| SyncError::PeerUnusable {
				path: path.to_path_buf(),
				reason: format!("cannot create directory: {}", e),
			})?;
			info!("Created peer directory {}", path.display());
			Ok(())
		}
		Err(e) => Err(SyncError::PeerUnusable { path: path.to_path_buf(), reason: e.to_string() }),
	}
}

/// Build the current manifest and diff for one peer
pub async fn load_peer(root: &Path, patterns: &IgnorePatterns) -> Result<DirPeer, SyncError> {
	let current = build_manifest(root, patterns).await.map_err(|e| SyncError::PeerUnusable {
		path: root.to_path_buf(),
		reason: format!("cannot scan: {}", e),
	})?;

	let stored = metadata::read_metadata(root).await?;
	let fresh = stored.is_none();

	// Paths ignored since the last sync must not show up as deletions
	let previous: Manifest = stored
		.map(|m| {
			m.manifest
				.iter()
				.filter(|e| !should_ignore(&e.relative_path, patterns))
				.cloned()
				.collect::<Manifest>()
		})
		.unwrap_or_default();

	let diff = diff(&previous, &current);
	Ok(DirPeer { root: root.to_path_buf(), fresh, previous, current, diff })
}

struct DirectoryPass<'a> {
	peers: Vec<DirPeer>,
	resolver: &'a ConflictResolver,
	strategy: ConflictResolution,
	/// Paths already counted as conflicts in this pass
	conflicted: BTreeSet<String>,
	/// (source, destination, path) triples whose propagation failed
	failed: BTreeSet<(usize, usize, String)>,
	result: SyncResult,
}

impl DirectoryPass<'_> {
	async fn propagate(&mut self) {
		let n = self.peers.len();
		for src in 0..n {
			for dst in 0..n {
				if src != dst {
					self.sync_pair(src, dst).await;
				}
			}
		}
	}

	async fn sync_pair(&mut self, src: usize, dst: usize) {
		if self.peers[dst].fresh {
			// A fresh destination receives everything and loses nothing
			let paths: Vec<String> = self.peers[src].current.paths().map(String::from).collect();
			for rel in paths {
				if self.peers[dst].current.contains(&rel) {
					self.resolve(src, dst, &rel).await;
				} else {
					self.copy(src, dst, &rel).await;
				}
			}
			return;
		}

		let added: Vec<String> = self.peers[src].diff.added.keys().cloned().collect();
		for rel in added {
			if self.peers[dst].current.contains(&rel) {
				self.resolve(src, dst, &rel).await;
			} else {
				self.copy(src, dst, &rel).await;
			}
		}

		let modified: Vec<String> = self.peers[src].diff.modified.keys().cloned().collect();
		for rel in modified {
			if self.peers[dst].diff.is_changed(&rel) {
				self.resolve(src, dst, &rel).await;
			} else {
				self.copy(src, dst, &rel).await;
			}
		}

		let deleted: Vec<(String, String)> = self.peers[src]
			.diff
			.deleted
			.iter()
			.map(|(rel, entry)| (rel.clone(), entry.hash.clone()))
			.collect();
		for (rel, last_hash) in deleted {
			if self.peers[dst].diff.is_changed(&rel) {
				debug!(
					"Not deleting {} at {}: changed there since last sync",
					rel,
					self.peers[dst].root.display()
				);
				continue;
			}
			self.delete(src, dst, &rel, &last_hash).await;
		}
	}

	/// Copy `rel` from `src` to `dst` unless the destination already matches
	async fn copy(&mut self, src: usize, dst: usize, rel: &str) {
		let source = self.peers[src].root.join(rel);
		let dest = self.peers[dst].root.join(rel);

		let Some(source_hash) = live_hash(&source).await else {
			debug!("Source {} vanished before copy, skipping", source.display());
			return;
		};
		let dest_hash = live_hash(&dest).await;
		if dest_hash.as_deref() == Some(source_hash.as_str()) {
			return;
		}

		match fileops::copy_file(&source, &dest).await {
			Ok(bytes) => {
				debug!("Copied {} -> {} ({} bytes)", source.display(), dest.display(), bytes);
				if dest_hash.is_some() {
					self.result.record_modified(&source, &dest);
				} else {
					self.result.record_added(&source, &dest);
				}
			}
			Err(e) => {
				if e.is_transient() {
					debug!("{} is busy, retrying on the next pass", dest.display());
				}
				self.failed.insert((src, dst, rel.to_string()));
				self.result.record_error("copy", &dest, e)
			}
		}
	}

	/// Settle a path both sides changed independently
	async fn resolve(&mut self, src: usize, dst: usize, rel: &str) {
		let source = self.peers[src].root.join(rel);
		let dest = self.peers[dst].root.join(rel);

		let Some(source_hash) = live_hash(&source).await else {
			debug!("Source {} vanished before conflict check, skipping", source.display());
			return;
		};
		match live_hash(&dest).await {
			None => return self.copy(src, dst, rel).await,
			Some(h) if h == source_hash => return,
			Some(_) => {}
		}

		match self.resolver.resolve_pair(&source, &dest, self.strategy).await {
			Ok(outcome) => {
				if self.conflicted.insert(rel.to_string()) {
					self.result.count_conflict();
				}
				let detail = match outcome {
					PairOutcome::SourceWon { preserved: Some(p) } => {
						format!("{}: kept both, destination saved as {}", self.strategy, p.display())
					}
					PairOutcome::SourceWon { preserved: None } => {
						format!("{}: source overwrote destination", self.strategy)
					}
					PairOutcome::DestinationKept => {
						format!("{}: destination is newer", self.strategy)
					}
				};
				info!("Conflict on {}: {}", rel, detail);
				self.result.record_conflict_action(&source, &dest, detail);
			}
			Err(e) => {
				self.failed.insert((src, dst, rel.to_string()));
				self.result.record_error("resolve", &dest, e)
			}
		}
	}

	/// Delete `rel` at `dst` if it still holds the content the source deleted
	async fn delete(&mut self, src: usize, dst: usize, rel: &str, last_hash: &str) {
		let root = self.peers[dst].root.clone();
		let target = root.join(rel);

		match live_hash(&target).await {
			None => return,
			Some(h) if h != last_hash => {
				debug!("Not deleting {}: content changed during this pass", target.display());
				return;
			}
			Some(_) => {}
		}

		match fileops::delete_file(&target, &root).await {
			Ok(()) => self.result.record_deleted(&target),
			Err(e) => {
				self.failed.insert((src, dst, rel.to_string()));
				self.result.record_error("delete", &target, e)
			}
		}
	}

	/// Rebuild every peer's manifest and persist it as the new baseline
	///
	/// A fresh destination that missed a path stays fresh. Otherwise the
	/// source of a failed path keeps its previous entry for it.
	async fn commit(&mut self, patterns: &IgnorePatterns) {
		let now = manifest::now_ms();
		let mut stay_fresh = BTreeSet::new();
		let mut rollback: Vec<(usize, String)> = Vec::new();
		for (src, dst, rel) in &self.failed {
			if self.peers[*dst].fresh {
				stay_fresh.insert(*dst);
			} else {
				rollback.push((*src, rel.clone()));
			}
		}

		for (index, peer) in self.peers.iter().enumerate() {
			if stay_fresh.contains(&index) {
				debug!("Leaving {} fresh until every path reaches it", peer.root.display());
				continue;
			}
			let mut manifest = match build_manifest(&peer.root, patterns).await {
				Ok(m) => m,
				Err(e) => {
					self.result.record_error("scan", &peer.root, e);
					continue;
				}
			};
			for (_, rel) in rollback.iter().filter(|(src, _)| *src == index) {
				match peer.previous.get(rel) {
					Some(entry) => manifest.insert(entry.clone()),
					None => {
						manifest.remove(rel);
					}
				}
			}
			let stored = SyncMetadata { last_sync_time: now, manifest };
			if let Err(e) = metadata::write_metadata(&peer.root, &stored).await {
				self.result.record_error("write metadata", &peer.root, e);
			}
		}
	}
}

/// Hash of the regular file at `path`, `None` when absent or unreadable
async fn live_hash(path: &Path) -> Option<String> {
	match afs::symlink_metadata(path).await {
		Ok(meta) if meta.is_file() => manifest::hash_file(path).await.ok(),
		_ => None,
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use std::fs;
	use tempfile::TempDir;

	fn write(root: &Path, rel: &str, content: &str) {
		let path = root.join(rel);
		fs::create_dir_all(path.parent().unwrap()).unwrap();
		fs::write(path, content).unwrap();
	}

	fn read(root: &Path, rel: &str) -> Option<String> {
		fs::read_to_string(root.join(rel)).ok()
	}

	fn resolver() -> ConflictResolver {
		ConflictResolver::new(ConflictResolution::KeepBoth)
	}

	#[tokio::test]
	async fn test_missing_peer_is_created() {
		let dir = TempDir::new().unwrap();
		let a = dir.path().join("a");
		let b = dir.path().join("nested/b");
		write(&a, "f.txt", "x");

		let set = SyncSet::directory([&a, &b]);
		let result = sync_directories(&set, &resolver()).await.unwrap();

		assert_eq!(result.files_added, 1);
		assert_eq!(read(&b, "f.txt").as_deref(), Some("x"));
		assert!(metadata::metadata_path(&b).exists());
	}

	#[tokio::test]
	async fn test_non_directory_peer_is_fatal() {
		let dir = TempDir::new().unwrap();
		let a = dir.path().join("a");
		let b = dir.path().join("b");
		write(&a, "f.txt", "x");
		fs::write(&b, "i am a file").unwrap();

		let set = SyncSet::directory([&a, &b]);
		let err = sync_directories(&set, &resolver()).await.unwrap_err();

		assert!(matches!(err, SyncError::PeerUnusable { .. }));
		assert!(!metadata::metadata_path(&a).exists());
	}

	#[tokio::test]
	async fn test_corrupted_metadata_is_fatal() {
		let dir = TempDir::new().unwrap();
		let a = dir.path().join("a");
		let b = dir.path().join("b");
		write(&a, "f.txt", "x");
		write(&b, ".peersync.json", "{ not json");

		let set = SyncSet::directory([&a, &b]);
		let err = sync_directories(&set, &resolver()).await.unwrap_err();

		assert!(matches!(err, SyncError::Metadata(_)));
		assert!(read(&b, "f.txt").is_none());
	}

	#[tokio::test]
	async fn test_same_content_on_both_sides_is_not_a_conflict() {
		let dir = TempDir::new().unwrap();
		let a = dir.path().join("a");
		let b = dir.path().join("b");
		write(&a, "same.txt", "identical");
		write(&b, "same.txt", "identical");

		let set = SyncSet::directory([&a, &b]);
		let result = sync_directories(&set, &resolver()).await.unwrap();

		assert_eq!(result.conflicts, 0);
		assert!(result.is_noop());
	}

	#[tokio::test]
	async fn test_conflict_counted_once_per_path() {
		let dir = TempDir::new().unwrap();
		let peers: Vec<PathBuf> = (0..3).map(|i| dir.path().join(format!("p{}", i))).collect();
		for p in &peers {
			fs::create_dir_all(p).unwrap();
		}
		write(&peers[0], "doc.txt", "base");
		let set = SyncSet::directory(peers.clone());
		sync_directories(&set, &resolver()).await.unwrap();

		write(&peers[0], "doc.txt", "zero");
		write(&peers[1], "doc.txt", "one");
		write(&peers[2], "doc.txt", "two");
		let result = sync_directories(&set, &resolver()).await.unwrap();

		assert_eq!(result.conflicts, 1);
		for p in &peers {
			assert_eq!(read(p, "doc.txt").as_deref(), Some("zero"));
		}
	}

	#[tokio::test]
	async fn test_newly_ignored_path_is_not_deleted() {
		let dir = TempDir::new().unwrap();
		let a = dir.path().join("a");
		let b = dir.path().join("b");
		write(&a, "build.log", "log");

		let set = SyncSet::directory([&a, &b]);
		sync_directories(&set, &resolver()).await.unwrap();
		assert!(b.join("build.log").exists());

		let set = set.with_ignore(["*.log"]);
		let result = sync_directories(&set, &resolver()).await.unwrap();

		assert_eq!(result.files_deleted, 0);
		assert!(a.join("build.log").exists());
		assert!(b.join("build.log").exists());
	}

	#[tokio::test]
	async fn test_load_peer_reports_fresh() {
		let dir = TempDir::new().unwrap();
		write(dir.path(), "x.txt", "x");

		let peer = load_peer(dir.path(), &IgnorePatterns::empty()).await.unwrap();

		assert!(peer.fresh);
		assert!(peer.diff.is_added("x.txt"));
	}
}

// vim: ts=4
