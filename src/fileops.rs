//! File copy, delete and rename with descriptive errors
//!
//! Copies land in a `.peersync-tmp` staging file next to the destination and
//! are renamed over it once complete, so a crashed pass never leaves a
//! half-written file under a synced name.

use std::io;
use std::path::{Path, PathBuf};
use tokio::fs as afs;
use tokio::io::{AsyncWriteExt, BufReader, BufWriter};

use crate::error::FileOpError;
use crate::exclusion::STAGING_SUFFIX;
use crate::logging::*;

/// Files larger than this are streamed instead of read into memory
pub const STREAM_THRESHOLD: u64 = 10 * 1024 * 1024;

/// Buffer size for streamed copies
const STREAM_BUFFER_SIZE: usize = 256 * 1024;

/// Copy `src` to `dest`, creating parent directories as needed
///
/// Returns the number of bytes copied.
pub async fn copy_file(src: &Path, dest: &Path) -> Result<u64, FileOpError> {
	let source = afs::File::open(src).await.map_err(|e| match FileOpError::from_io(src, e) {
		FileOpError::Io { path, source } => FileOpError::SourceNotReadable { path, source },
		FileOpError::PermissionDenied { path } => FileOpError::SourceNotReadable {
			path,
			source: io::Error::from(io::ErrorKind::PermissionDenied),
		},
		other => other,
	})?;
	let size = source.metadata().await.map_err(|e| FileOpError::from_io(src, e))?.len();

	ensure_writable_parent(dest).await?;

	let staging = staging_path(dest);
	let result = if size > STREAM_THRESHOLD {
		debug!("Streaming {} bytes {} -> {}", size, src.display(), dest.display());
		stream_copy(source, &staging).await
	} else {
		drop(source);
		match afs::read(src).await {
			Ok(bytes) => afs::write(&staging, bytes).await.map(|_| size),
			Err(e) => Err(e),
		}
	};

	let copied = match result {
		Ok(n) => n,
		Err(e) => {
			let _ = afs::remove_file(&staging).await;
			return Err(FileOpError::from_io(dest, e));
		}
	};

	if let Err(e) = afs::rename(&staging, dest).await {
		let _ = afs::remove_file(&staging).await;
		return Err(FileOpError::from_io(dest, e));
	}

	Ok(copied)
}

async fn stream_copy(source: afs::File, staging: &Path) -> io::Result<u64> {
	let mut reader = BufReader::with_capacity(STREAM_BUFFER_SIZE, source);
	let target = afs::File::create(staging).await?;
	let mut writer = BufWriter::with_capacity(STREAM_BUFFER_SIZE, target);

	let copied = tokio::io::copy(&mut reader, &mut writer).await?;
	writer.flush().await?;
	writer.get_mut().sync_all().await?;
	Ok(copied)
}

/// Delete `path` and prune directories it leaves empty, stopping at `root`
///
/// A file that is already gone counts as deleted. `root` itself is never removed.
pub async fn delete_file(path: &Path, root: &Path) -> Result<(), FileOpError> {
	if let Some(parent) = path.parent() {
		check_dir_writable(parent).await?;
	}

	match afs::remove_file(path).await {
		Ok(()) => {}
		Err(e) if e.kind() == io::ErrorKind::NotFound => {
			debug!("{} already deleted", path.display());
		}
		Err(e) => return Err(FileOpError::from_io(path, e)),
	}

	prune_empty_ancestors(path, root).await;
	Ok(())
}

async fn prune_empty_ancestors(path: &Path, root: &Path) {
	let mut current = path.parent();
	while let Some(dir) = current {
		if dir == root || !dir.starts_with(root) {
			break;
		}
		// Fails on non-empty directories, which ends the walk
		if afs::remove_dir(dir).await.is_err() {
			break;
		}
		debug!("Removed empty directory {}", dir.display());
		current = dir.parent();
	}
}

/// Rename `from` to `to` in place
pub async fn rename_file(from: &Path, to: &Path) -> Result<(), FileOpError> {
	ensure_writable_parent(to).await?;
	afs::rename(from, to).await.map_err(|e| FileOpError::from_io(from, e))
}

/// Create the parent of `dest` if needed and check it accepts writes
async fn ensure_writable_parent(dest: &Path) -> Result<(), FileOpError> {
	let parent = match dest.parent() {
		Some(p) if !p.as_os_str().is_empty() => p,
		_ => return Ok(()),
	};

	afs::create_dir_all(parent).await.map_err(|e| FileOpError::DestinationNotWritable {
		path: parent.to_path_buf(),
		reason: format!("cannot create directory: {}", e),
	})?;
	check_dir_writable(parent).await?;

	if let Ok(meta) = afs::metadata(dest).await {
		if meta.is_dir() {
			return Err(FileOpError::DestinationNotWritable {
				path: dest.to_path_buf(),
				reason: "a directory is in the way".to_string(),
			});
		}
		if meta.permissions().readonly() {
			return Err(FileOpError::DestinationNotWritable {
				path: dest.to_path_buf(),
				reason: "file is read-only".to_string(),
			});
		}
	}
	Ok(())
}

async fn check_dir_writable(dir: &Path) -> Result<(), FileOpError> {
	match afs::metadata(dir).await {
		Ok(meta) if meta.permissions().readonly() => Err(FileOpError::DestinationNotWritable {
			path: dir.to_path_buf(),
			reason: "directory is read-only".to_string(),
		}),
		Ok(_) => Ok(()),
		Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
		Err(e) => Err(FileOpError::from_io(dir, e)),
	}
}

fn staging_path(dest: &Path) -> PathBuf {
	let mut name = dest.as_os_str().to_os_string();
	name.push(STAGING_SUFFIX);
	PathBuf::from(name)
}

#[cfg(test)]
mod tests {
	use super::*;
	use std::fs;
	use tempfile::TempDir;

	#[tokio::test]
	async fn test_copy_creates_parents() {
		let dir = TempDir::new().unwrap();
		let src = dir.path().join("src.txt");
		fs::write(&src, "payload").unwrap();
		let dest = dir.path().join("a/b/c/dest.txt");

		let n = copy_file(&src, &dest).await.unwrap();

		assert_eq!(n, 7);
		assert_eq!(fs::read_to_string(&dest).unwrap(), "payload");
		assert!(!dir.path().join("a/b/c/dest.txt.peersync-tmp").exists());
	}

	#[tokio::test]
	async fn test_copy_overwrites_existing() {
		let dir = TempDir::new().unwrap();
		let src = dir.path().join("src.txt");
		let dest = dir.path().join("dest.txt");
		fs::write(&src, "new").unwrap();
		fs::write(&dest, "old content").unwrap();

		copy_file(&src, &dest).await.unwrap();
		assert_eq!(fs::read_to_string(&dest).unwrap(), "new");
	}

	#[tokio::test]
	async fn test_copy_large_file_streams() {
		let dir = TempDir::new().unwrap();
		let src = dir.path().join("big.bin");
		let data: Vec<u8> = (0..(STREAM_THRESHOLD as usize + 4096)).map(|i| (i % 251) as u8).collect();
		fs::write(&src, &data).unwrap();
		let dest = dir.path().join("out/big.bin");

		let n = copy_file(&src, &dest).await.unwrap();

		assert_eq!(n, data.len() as u64);
		assert_eq!(fs::read(&dest).unwrap(), data);
	}

	#[tokio::test]
	async fn test_copy_missing_source_is_descriptive() {
		let dir = TempDir::new().unwrap();
		let result = copy_file(&dir.path().join("nope"), &dir.path().join("dest")).await;

		match result {
			Err(FileOpError::SourceNotReadable { path, .. }) => assert!(path.ends_with("nope")),
			other => panic!("unexpected result: {:?}", other),
		}
	}

	#[tokio::test]
	async fn test_delete_prunes_empty_ancestors_but_not_root() {
		let dir = TempDir::new().unwrap();
		let root = dir.path().join("peer");
		fs::create_dir_all(root.join("x/y")).unwrap();
		fs::write(root.join("x/y/only.txt"), "1").unwrap();
		fs::write(root.join("top.txt"), "2").unwrap();

		delete_file(&root.join("x/y/only.txt"), &root).await.unwrap();

		assert!(!root.join("x").exists());
		assert!(root.exists());
		assert!(root.join("top.txt").exists());

		delete_file(&root.join("top.txt"), &root).await.unwrap();
		assert!(root.exists());
	}

	#[tokio::test]
	async fn test_delete_keeps_non_empty_ancestor() {
		let dir = TempDir::new().unwrap();
		let root = dir.path();
		fs::create_dir_all(root.join("x")).unwrap();
		fs::write(root.join("x/a.txt"), "a").unwrap();
		fs::write(root.join("x/b.txt"), "b").unwrap();

		delete_file(&root.join("x/a.txt"), root).await.unwrap();
		assert!(root.join("x/b.txt").exists());
	}

	#[tokio::test]
	async fn test_delete_missing_is_ok() {
		let dir = TempDir::new().unwrap();
		assert!(delete_file(&dir.path().join("ghost.txt"), dir.path()).await.is_ok());
	}

	#[tokio::test]
	async fn test_rename_file() {
		let dir = TempDir::new().unwrap();
		fs::write(dir.path().join("a.txt"), "a").unwrap();

		rename_file(&dir.path().join("a.txt"), &dir.path().join("b.txt")).await.unwrap();

		assert!(!dir.path().join("a.txt").exists());
		assert_eq!(fs::read_to_string(dir.path().join("b.txt")).unwrap(), "a");
	}
}

// vim: ts=4
