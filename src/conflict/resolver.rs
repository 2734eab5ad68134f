//! Conflict resolution logic

use chrono::Utc;
use std::path::{Path, PathBuf};
use tokio::fs as afs;

use super::unused_conflict_path;
use crate::error::FileOpError;
use crate::fileops;
use crate::logging::*;
use crate::manifest;
use crate::strategies::ConflictResolution;

/// Result of resolving one source/destination conflict
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PairOutcome {
	/// Source content now sits at the destination path; `preserved` holds
	/// the renamed destination copy under keep-both
	SourceWon { preserved: Option<PathBuf> },

	/// Destination was newer and was left untouched
	DestinationKept,
}

/// One changed file peer competing to be the winner
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Candidate {
	/// Position in the configured peer list
	pub index: usize,
	pub mtime_ms: i64,
}

/// Resolves conflicts using configured strategies
#[derive(Debug, Clone, Copy)]
pub struct ConflictResolver {
	/// Strategy used when a sync set has no override
	default_strategy: ConflictResolution,
}

impl ConflictResolver {
	/// Create a new conflict resolver with default strategy
	pub fn new(default_strategy: ConflictResolution) -> Self {
		ConflictResolver { default_strategy }
	}

	/// Effective strategy for a set, honoring its override
	pub fn strategy(&self, set_override: Option<ConflictResolution>) -> ConflictResolution {
		set_override.unwrap_or(self.default_strategy)
	}

	/// Resolve a conflict while propagating `source` onto `dest`
	///
	/// Under last-write-wins the newer side is kept and an equal timestamp
	/// favors the source. Under keep-both the destination is renamed to a
	/// conflict sibling before the source is copied over its path.
	pub async fn resolve_pair(
		&self,
		source: &Path,
		dest: &Path,
		strategy: ConflictResolution,
	) -> Result<PairOutcome, FileOpError> {
		let dest_mtime = match afs::metadata(dest).await {
			Ok(meta) => Some(manifest::mtime_ms(&meta)),
			Err(_) => None,
		};

		let Some(dest_mtime) = dest_mtime else {
			// Destination vanished since the manifest was built
			fileops::copy_file(source, dest).await?;
			return Ok(PairOutcome::SourceWon { preserved: None });
		};

		match strategy {
			ConflictResolution::LastWriteWins => {
				let source_meta =
					afs::metadata(source).await.map_err(|e| FileOpError::from_io(source, e))?;
				let source_mtime = manifest::mtime_ms(&source_meta);

				if source_mtime >= dest_mtime {
					fileops::copy_file(source, dest).await?;
					Ok(PairOutcome::SourceWon { preserved: None })
				} else {
					debug!(
						"Keeping newer {} ({} > {})",
						dest.display(),
						dest_mtime,
						source_mtime
					);
					Ok(PairOutcome::DestinationKept)
				}
			}
			ConflictResolution::KeepBoth => {
				let preserved = self.preserve(dest).await?;
				fileops::copy_file(source, dest).await?;
				Ok(PairOutcome::SourceWon { preserved: Some(preserved) })
			}
		}
	}

	/// Rename `path` to an unused conflict sibling and return the new path
	pub async fn preserve(&self, path: &Path) -> Result<PathBuf, FileOpError> {
		let target = unused_conflict_path(path, Utc::now());
		fileops::rename_file(path, &target).await?;
		info!("Preserved conflicting copy as {}", target.display());
		Ok(target)
	}

	/// Pick the winner among changed file peers, given in configured order
	///
	/// Last-write-wins takes the greatest mtime, the earliest peer on ties.
	/// Keep-both takes the first changed peer.
	pub fn pick_winner(candidates: &[Candidate], strategy: ConflictResolution) -> Option<usize> {
		match strategy {
			ConflictResolution::KeepBoth => candidates.first().map(|c| c.index),
			ConflictResolution::LastWriteWins => candidates
				.iter()
				.fold(None::<&Candidate>, |best, c| match best {
					Some(b) if b.mtime_ms >= c.mtime_ms => Some(b),
					_ => Some(c),
				})
				.map(|c| c.index),
		}
	}
}


// vim: ts=4
