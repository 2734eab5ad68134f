//! Error types for PeerSync operations

use std::error::Error;
use std::fmt;
use std::io;
use std::path::{Path, PathBuf};

/// Main error type for sync operations
///
/// Only `PeerUnusable` and `Metadata` abort a pass; everything else is
/// caught per file and recorded in the pass result.
#[derive(Debug)]
pub enum SyncError {
	/// A declared peer cannot be established as a usable location
	PeerUnusable { path: PathBuf, reason: String },

	/// Metadata store error (nested)
	Metadata(MetadataError),

	/// File operation error (nested)
	FileOp(FileOpError),

	/// Configuration error (nested)
	Config(ConfigError),

	/// Ignore pattern error (nested)
	Exclusion(ExclusionError),

	/// Daemon lifecycle error (nested)
	Lifecycle(LifecycleError),

	/// Filesystem watcher could not be set up
	Watch(notify::Error),

	/// I/O error
	Io(io::Error),

	/// Generic error message
	Other { message: String },
}

impl fmt::Display for SyncError {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		match self {
			SyncError::PeerUnusable { path, reason } => {
				write!(f, "Peer {} is unusable: {}", path.display(), reason)
			}
			SyncError::Metadata(e) => write!(f, "Metadata error: {}", e),
			SyncError::FileOp(e) => write!(f, "File operation failed: {}", e),
			SyncError::Config(e) => write!(f, "Configuration error: {}", e),
			SyncError::Exclusion(e) => write!(f, "Ignore pattern error: {}", e),
			SyncError::Lifecycle(e) => write!(f, "Daemon error: {}", e),
			SyncError::Watch(e) => write!(f, "Watcher error: {}", e),
			SyncError::Io(e) => write!(f, "I/O error: {}", e),
			SyncError::Other { message } => write!(f, "{}", message),
		}
	}
}

impl Error for SyncError {
	fn source(&self) -> Option<&(dyn Error + 'static)> {
		match self {
			SyncError::Metadata(e) => Some(e),
			SyncError::FileOp(e) => Some(e),
			SyncError::Config(e) => Some(e),
			SyncError::Exclusion(e) => Some(e),
			SyncError::Lifecycle(e) => Some(e),
			SyncError::Watch(e) => Some(e),
			SyncError::Io(e) => Some(e),
			_ => None,
		}
	}
}

impl From<io::Error> for SyncError {
	fn from(e: io::Error) -> Self {
		SyncError::Io(e)
	}
}

impl From<String> for SyncError {
	fn from(e: String) -> Self {
		SyncError::Other { message: e }
	}
}

impl From<MetadataError> for SyncError {
	fn from(e: MetadataError) -> Self {
		SyncError::Metadata(e)
	}
}

impl From<FileOpError> for SyncError {
	fn from(e: FileOpError) -> Self {
		SyncError::FileOp(e)
	}
}

impl From<ConfigError> for SyncError {
	fn from(e: ConfigError) -> Self {
		SyncError::Config(e)
	}
}

impl From<ExclusionError> for SyncError {
	fn from(e: ExclusionError) -> Self {
		SyncError::Exclusion(e)
	}
}

impl From<LifecycleError> for SyncError {
	fn from(e: LifecycleError) -> Self {
		SyncError::Lifecycle(e)
	}
}

impl From<notify::Error> for SyncError {
	fn from(e: notify::Error) -> Self {
		SyncError::Watch(e)
	}
}

/// Metadata store errors
#[derive(Debug)]
pub enum MetadataError {
	/// Metadata file exists but could not be read
	ReadFailed { path: PathBuf, source: io::Error },

	/// Metadata file is present but unparseable
	Corrupted { path: PathBuf, message: String },

	/// Failed to persist metadata
	WriteFailed { path: PathBuf, source: Box<dyn Error + Send + Sync> },
}

impl fmt::Display for MetadataError {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		match self {
			MetadataError::ReadFailed { path, source } => {
				write!(f, "Failed to read {}: {}", path.display(), source)
			}
			MetadataError::Corrupted { path, message } => {
				write!(f, "Metadata file {} is corrupted: {}", path.display(), message)
			}
			MetadataError::WriteFailed { path, source } => {
				write!(f, "Failed to write {}: {}", path.display(), source)
			}
		}
	}
}

impl Error for MetadataError {}

/// File copy/delete/hash errors
#[derive(Debug)]
pub enum FileOpError {
	/// Source file cannot be opened for reading
	SourceNotReadable { path: PathBuf, source: io::Error },

	/// Destination (or its parent directory) is not writable
	DestinationNotWritable { path: PathBuf, reason: String },

	/// File is locked or busy (held by another process)
	Locked { path: PathBuf, source: io::Error },

	/// Permission denied on a path
	PermissionDenied { path: PathBuf },

	/// Any other I/O failure on a path
	Io { path: PathBuf, source: io::Error },
}

impl FileOpError {
	/// Classify an I/O error that happened on `path`
	pub fn from_io(path: &Path, e: io::Error) -> Self {
		if is_lock_error(&e) {
			FileOpError::Locked { path: path.to_path_buf(), source: e }
		} else if e.kind() == io::ErrorKind::PermissionDenied {
			FileOpError::PermissionDenied { path: path.to_path_buf() }
		} else {
			FileOpError::Io { path: path.to_path_buf(), source: e }
		}
	}

	/// True for errors expected to clear up by the next pass
	pub fn is_transient(&self) -> bool {
		matches!(self, FileOpError::Locked { .. } | FileOpError::PermissionDenied { .. })
	}
}

impl fmt::Display for FileOpError {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		match self {
			FileOpError::SourceNotReadable { path, source } => {
				write!(f, "Source {} is not readable: {}", path.display(), source)
			}
			FileOpError::DestinationNotWritable { path, reason } => {
				write!(f, "Destination {} is not writable: {}", path.display(), reason)
			}
			FileOpError::Locked { path, source } => {
				write!(f, "File {} is locked or in use: {}", path.display(), source)
			}
			FileOpError::PermissionDenied { path } => {
				write!(f, "Permission denied: {}", path.display())
			}
			FileOpError::Io { path, source } => write!(f, "{}: {}", path.display(), source),
		}
	}
}

impl Error for FileOpError {}

#[cfg(unix)]
fn is_lock_error(e: &io::Error) -> bool {
	matches!(e.raw_os_error(), Some(code) if code == libc::EBUSY || code == libc::ETXTBSY || code == libc::EAGAIN)
}

#[cfg(windows)]
fn is_lock_error(e: &io::Error) -> bool {
	// ERROR_SHARING_VIOLATION, ERROR_LOCK_VIOLATION
	matches!(e.raw_os_error(), Some(32) | Some(33))
}

#[cfg(not(any(unix, windows)))]
fn is_lock_error(_e: &io::Error) -> bool {
	false
}

/// Configuration loading and validation errors
#[derive(Debug)]
pub enum ConfigError {
	/// Config file could not be read
	ReadFailed { path: PathBuf, source: io::Error },

	/// Config file could not be parsed
	ParseFailed { path: PathBuf, message: String },

	/// Config is syntactically valid but semantically wrong
	Invalid { message: String },
}

impl fmt::Display for ConfigError {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		match self {
			ConfigError::ReadFailed { path, source } => {
				write!(f, "Cannot read config {}: {}", path.display(), source)
			}
			ConfigError::ParseFailed { path, message } => {
				write!(f, "Cannot parse config {}: {}", path.display(), message)
			}
			ConfigError::Invalid { message } => write!(f, "Invalid configuration: {}", message),
		}
	}
}

impl Error for ConfigError {}

/// Errors that can occur while compiling ignore patterns
#[derive(Debug)]
pub enum ExclusionError {
	/// Failed to parse a glob pattern
	InvalidPattern(String),
}

impl fmt::Display for ExclusionError {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		match self {
			ExclusionError::InvalidPattern(msg) => {
				write!(f, "Invalid ignore pattern: {}", msg)
			}
		}
	}
}

impl Error for ExclusionError {}

/// Daemon lifecycle and PID file errors
#[derive(Debug)]
pub enum LifecycleError {
	/// Requested state change is not allowed from the current state
	IllegalTransition { from: String, to: String },

	/// Another live daemon holds the PID file
	AlreadyRunning { pid: u32, path: PathBuf },

	/// PID file could not be read, written or removed
	PidFile { path: PathBuf, source: io::Error },
}

impl fmt::Display for LifecycleError {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		match self {
			LifecycleError::IllegalTransition { from, to } => {
				write!(f, "Illegal lifecycle transition {} -> {}", from, to)
			}
			LifecycleError::AlreadyRunning { pid, path } => {
				write!(f, "Daemon already running with PID {} ({})", pid, path.display())
			}
			LifecycleError::PidFile { path, source } => {
				write!(f, "PID file {}: {}", path.display(), source)
			}
		}
	}
}

impl Error for LifecycleError {}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn test_permission_denied_classification() {
		let e = io::Error::new(io::ErrorKind::PermissionDenied, "nope");
		let op = FileOpError::from_io(Path::new("a.txt"), e);
		assert!(matches!(op, FileOpError::PermissionDenied { .. }));
		assert!(op.is_transient());
	}

	#[cfg(unix)]
	#[test]
	fn test_busy_is_lock_error() {
		let e = io::Error::from_raw_os_error(libc::EBUSY);
		let op = FileOpError::from_io(Path::new("a.txt"), e);
		assert!(matches!(op, FileOpError::Locked { .. }));
	}

	#[test]
	fn test_not_found_is_plain_io() {
		let e = io::Error::new(io::ErrorKind::NotFound, "gone");
		let op = FileOpError::from_io(Path::new("a.txt"), e);
		assert!(matches!(op, FileOpError::Io { .. }));
		assert!(!op.is_transient());
	}

	#[test]
	fn test_sync_error_display_nests() {
		let err: SyncError =
			MetadataError::Corrupted { path: PathBuf::from("/p/.peersync.json"), message: "eof".into() }
				.into();
		let text = err.to_string();
		assert!(text.contains("corrupted"));
		assert!(text.contains(".peersync.json"));
	}
}

// vim: ts=4
