//! Conflict artifacts and resolution

use chrono::{DateTime, SecondsFormat, Utc};
use std::path::{Path, PathBuf};

pub mod resolver;

pub use resolver::{ConflictResolver, PairOutcome};

use crate::exclusion::CONFLICT_MARKER;

/// Timestamp used in conflict names: ISO-8601 with `:` and `.` turned into `-`
pub fn conflict_timestamp(at: DateTime<Utc>) -> String {
	at.to_rfc3339_opts(SecondsFormat::Millis, true).replace(|c: char| c == ':' || c == '.', "-")
}

/// Sibling path that preserves a losing copy of `path`
///
/// `dir/report.final.pdf` becomes `dir/report.final.conflict-<ts>.pdf`.
pub fn conflict_path(path: &Path, timestamp: &str) -> PathBuf {
	let stem = path.file_stem().map(|s| s.to_string_lossy().into_owned()).unwrap_or_default();
	let ext = path.extension().map(|e| format!(".{}", e.to_string_lossy())).unwrap_or_default();
	path.with_file_name(format!("{}{}{}{}", stem, CONFLICT_MARKER, timestamp, ext))
}

/// First conflict path for `path` that does not exist yet
pub fn unused_conflict_path(path: &Path, at: DateTime<Utc>) -> PathBuf {
	let timestamp = conflict_timestamp(at);
	let mut candidate = conflict_path(path, &timestamp);
	let mut n = 1;
	while candidate.exists() {
		candidate = conflict_path(path, &format!("{}-{}", timestamp, n));
		n += 1;
	}
	candidate
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::exclusion::{should_ignore, IgnorePatterns};
	use chrono::TimeZone;
	use tempfile::TempDir;

	fn fixed_time() -> DateTime<Utc> {
		Utc.with_ymd_and_hms(2026, 10, 15, 8, 30, 0).unwrap() + chrono::Duration::milliseconds(123)
	}

	#[test]
	fn test_conflict_timestamp_format() {
		assert_eq!(conflict_timestamp(fixed_time()), "2026-10-15T08-30-00-123Z");
	}

	#[test]
	fn test_conflict_path_keeps_extension() {
		let p = conflict_path(Path::new("dir/report.final.pdf"), "TS");
		assert_eq!(p, PathBuf::from("dir/report.final.conflict-TS.pdf"));
	}

	#[test]
	fn test_conflict_path_without_extension() {
		assert_eq!(conflict_path(Path::new("Makefile"), "TS"), PathBuf::from("Makefile.conflict-TS"));
		assert_eq!(conflict_path(Path::new(".bashrc"), "TS"), PathBuf::from(".bashrc.conflict-TS"));
	}

	#[test]
	fn test_conflict_artifacts_are_ignored() {
		let p = conflict_path(Path::new("notes.txt"), &conflict_timestamp(fixed_time()));
		let name = p.to_string_lossy().into_owned();
		assert!(should_ignore(&name, &IgnorePatterns::empty()));
	}

	#[test]
	fn test_unused_conflict_path_avoids_collision() {
		let dir = TempDir::new().unwrap();
		let original = dir.path().join("a.txt");
		let first = unused_conflict_path(&original, fixed_time());
		std::fs::write(&first, "taken").unwrap();

		let second = unused_conflict_path(&original, fixed_time());
		assert_ne!(first, second);
		assert!(second.to_string_lossy().contains("-123Z-1"));
	}
}

// vim: ts=4
