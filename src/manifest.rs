//! Content-addressed manifests of directory peers

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::io;
use std::path::{Path, PathBuf};
use std::time::{SystemTime, UNIX_EPOCH};
use tokio::fs as afs;
use tokio::io::AsyncReadExt;

use crate::exclusion::{self, IgnorePatterns};
use crate::logging::*;

/// Read buffer used while hashing
const HASH_BUFFER_SIZE: usize = 64 * 1024;

/// State of one file at the moment it was observed
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FileEntry {
	/// Peer-root-relative path with forward slashes
	pub relative_path: String,
	pub size: u64,
	/// Modification time in milliseconds since the Unix epoch
	pub mtime_ms: i64,
	/// Lowercase hex BLAKE3 digest of the content
	pub hash: String,
}

impl FileEntry {
	/// Stat and hash `root/relative_path`
	pub async fn observe(root: &Path, relative_path: &str) -> io::Result<FileEntry> {
		let abs = root.join(relative_path);
		let meta = afs::symlink_metadata(&abs).await?;
		let hash = hash_file(&abs).await?;

		Ok(FileEntry {
			relative_path: relative_path.to_string(),
			size: meta.len(),
			mtime_ms: mtime_ms(&meta),
			hash,
		})
	}
}

/// Snapshot of every eligible file under one directory peer
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Manifest {
	entries: BTreeMap<String, FileEntry>,
}

impl Manifest {
	pub fn new() -> Self {
		Self::default()
	}

	pub fn get(&self, relative_path: &str) -> Option<&FileEntry> {
		self.entries.get(relative_path)
	}

	pub fn contains(&self, relative_path: &str) -> bool {
		self.entries.contains_key(relative_path)
	}

	pub fn len(&self) -> usize {
		self.entries.len()
	}

	pub fn is_empty(&self) -> bool {
		self.entries.is_empty()
	}

	/// Entries in path order
	pub fn iter(&self) -> impl Iterator<Item = &FileEntry> {
		self.entries.values()
	}

	pub fn paths(&self) -> impl Iterator<Item = &str> {
		self.entries.keys().map(|k| k.as_str())
	}

	/// Add or replace the entry for its path
	pub fn insert(&mut self, entry: FileEntry) {
		self.entries.insert(entry.relative_path.clone(), entry);
	}

	pub fn remove(&mut self, relative_path: &str) -> Option<FileEntry> {
		self.entries.remove(relative_path)
	}
}

impl FromIterator<FileEntry> for Manifest {
	fn from_iter<I: IntoIterator<Item = FileEntry>>(iter: I) -> Self {
		Manifest { entries: iter.into_iter().map(|e| (e.relative_path.clone(), e)).collect() }
	}
}

/// Walk `root` and build its manifest
///
/// Symlinks are never followed or recorded. Subdirectories and files that
/// cannot be read are skipped; only an unreadable root is an error.
pub async fn build_manifest(root: &Path, patterns: &IgnorePatterns) -> io::Result<Manifest> {
	let mut entries = Vec::new();
	let mut pending: Vec<(PathBuf, String)> = vec![(root.to_path_buf(), String::new())];
	let mut is_root = true;

	while let Some((dir, prefix)) = pending.pop() {
		let mut reader = match afs::read_dir(&dir).await {
			Ok(r) => r,
			Err(e) if is_root => return Err(e),
			Err(e) => {
				debug!("Skipping unreadable directory {}: {}", dir.display(), e);
				continue;
			}
		};
		is_root = false;

		loop {
			let entry = match reader.next_entry().await {
				Ok(Some(entry)) => entry,
				Ok(None) => break,
				Err(e) => {
					debug!("Error reading entry in {}: {}", dir.display(), e);
					break;
				}
			};

			let name = entry.file_name().to_string_lossy().into_owned();
			let relative =
				if prefix.is_empty() { name.clone() } else { format!("{}/{}", prefix, name) };

			if exclusion::should_ignore(&relative, patterns) {
				continue;
			}

			let file_type = match entry.file_type().await {
				Ok(ft) => ft,
				Err(e) => {
					debug!("Cannot stat {}: {}", entry.path().display(), e);
					continue;
				}
			};

			if file_type.is_symlink() {
				continue;
			} else if file_type.is_dir() {
				pending.push((entry.path(), relative));
			} else if file_type.is_file() {
				match FileEntry::observe(root, &relative).await {
					Ok(file_entry) => entries.push(file_entry),
					Err(e) => debug!("Skipping unreadable file {}: {}", relative, e),
				}
			}
		}
	}

	Ok(entries.into_iter().collect())
}

/// BLAKE3 digest of a file's full content, hex encoded
pub async fn hash_file(path: &Path) -> io::Result<String> {
	let mut file = afs::File::open(path).await?;
	let mut hasher = blake3::Hasher::new();
	let mut buf = vec![0u8; HASH_BUFFER_SIZE];

	loop {
		let n = file.read(&mut buf).await?;
		if n == 0 {
			break;
		}
		hasher.update(&buf[..n]);
	}

	Ok(hex::encode(hasher.finalize().as_bytes()))
}

/// Modification time of `meta` in epoch milliseconds
pub fn mtime_ms(meta: &std::fs::Metadata) -> i64 {
	match meta.modified() {
		Ok(time) => system_time_ms(time),
		Err(_) => 0,
	}
}

pub fn system_time_ms(time: SystemTime) -> i64 {
	match time.duration_since(UNIX_EPOCH) {
		Ok(d) => d.as_millis() as i64,
		Err(e) => -(e.duration().as_millis() as i64),
	}
}

/// Current wall-clock time in epoch milliseconds
pub fn now_ms() -> i64 {
	system_time_ms(SystemTime::now())
}


// vim: ts=4
