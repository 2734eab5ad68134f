//! Last-sync state persisted next to each peer
//!
//! Directory peers keep a [`SyncMetadata`] file at their root; file peers
//! keep a [`FileSyncMetadata`] sidecar beside the file. A missing artifact
//! means the peer is fresh. A present but unparseable one is an error and
//! is never treated as fresh.

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::ffi::OsString;
use std::io;
use std::path::{Path, PathBuf};
use tokio::fs as afs;

use crate::error::MetadataError;
use crate::exclusion::{METADATA_FILE_NAME, SIDECAR_EXTENSION, STAGING_SUFFIX};
use crate::manifest::Manifest;

/// State of a directory peer as of its last successful pass
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SyncMetadata {
	/// Epoch milliseconds
	pub last_sync_time: i64,
	pub manifest: Manifest,
}

/// State of a single file peer as of its last successful pass
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FileSyncMetadata {
	pub hash: String,
	pub mtime_ms: i64,
	pub size: u64,
	pub last_sync_time: i64,
}

/// Location of the metadata file inside a directory peer
pub fn metadata_path(peer: &Path) -> PathBuf {
	peer.join(METADATA_FILE_NAME)
}

/// Location of the sidecar for a file peer
pub fn sidecar_path(file: &Path) -> PathBuf {
	append_suffix(file, SIDECAR_EXTENSION)
}

fn append_suffix(path: &Path, suffix: &str) -> PathBuf {
	let mut name: OsString = path.as_os_str().to_os_string();
	name.push(suffix);
	PathBuf::from(name)
}

/// Load a directory peer's metadata, `None` when it has never been synced
pub async fn read_metadata(peer: &Path) -> Result<Option<SyncMetadata>, MetadataError> {
	read_json(&metadata_path(peer)).await
}

/// Persist a directory peer's metadata, replacing any previous copy
pub async fn write_metadata(peer: &Path, metadata: &SyncMetadata) -> Result<(), MetadataError> {
	write_json(&metadata_path(peer), metadata).await
}

/// A directory peer is fresh when it has no metadata file
pub async fn is_fresh(peer: &Path) -> Result<bool, MetadataError> {
	Ok(read_metadata(peer).await?.is_none())
}

/// Load a file peer's sidecar
pub async fn read_file_metadata(file: &Path) -> Result<Option<FileSyncMetadata>, MetadataError> {
	read_json(&sidecar_path(file)).await
}

/// Persist a file peer's sidecar
pub async fn write_file_metadata(
	file: &Path,
	metadata: &FileSyncMetadata,
) -> Result<(), MetadataError> {
	write_json(&sidecar_path(file), metadata).await
}

/// Remove whichever artifact `path` owns, forcing fresh status next pass
///
/// Returns the removed artifact path, or `None` if there was nothing to remove.
pub async fn clear(path: &Path) -> Result<Option<PathBuf>, MetadataError> {
	let target = if afs::metadata(path).await.map(|m| m.is_dir()).unwrap_or(false) {
		metadata_path(path)
	} else {
		sidecar_path(path)
	};

	match afs::remove_file(&target).await {
		Ok(()) => Ok(Some(target)),
		Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(None),
		Err(e) => Err(MetadataError::WriteFailed { path: target, source: Box::new(e) }),
	}
}

async fn read_json<T: DeserializeOwned>(path: &Path) -> Result<Option<T>, MetadataError> {
	let contents = match afs::read_to_string(path).await {
		Ok(c) => c,
		Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(None),
		Err(e) if e.kind() == io::ErrorKind::InvalidData => {
			return Err(MetadataError::Corrupted {
				path: path.to_path_buf(),
				message: format!("not valid UTF-8: {}", e),
			})
		}
		Err(e) => return Err(MetadataError::ReadFailed { path: path.to_path_buf(), source: e }),
	};

	serde_json::from_str(&contents).map(Some).map_err(|e| MetadataError::Corrupted {
		path: path.to_path_buf(),
		message: format!("Failed to parse metadata JSON: {}", e),
	})
}

async fn write_json<T: Serialize>(path: &Path, value: &T) -> Result<(), MetadataError> {
	let json = serde_json::to_string_pretty(value)
		.map_err(|e| MetadataError::WriteFailed { path: path.to_path_buf(), source: Box::new(e) })?;

	let staging = append_suffix(path, STAGING_SUFFIX);
	let write = async {
		afs::write(&staging, json).await?;
		afs::rename(&staging, path).await
	};

	if let Err(e) = write.await {
		let _ = afs::remove_file(&staging).await;
		return Err(MetadataError::WriteFailed { path: path.to_path_buf(), source: Box::new(e) });
	}
	Ok(())
}


// vim: ts=4
