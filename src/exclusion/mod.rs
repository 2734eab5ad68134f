//! Ignore filter
//!
//! `should_ignore` is the one predicate deciding which paths take part in
//! syncing. The manifest builder and the change watcher both call it; a
//! path that one of them accepts and the other drops turns our own
//! metadata and conflict artifacts into content, which then syncs forever.

mod patterns;

pub use patterns::IgnorePatterns;

/// Directory metadata file, stored at each directory peer's root
pub const METADATA_FILE_NAME: &str = ".peersync.json";

/// Extension appended to a peer file's path to form its sidecar
pub const SIDECAR_EXTENSION: &str = ".peersync";

/// Metadata names written by earlier releases
pub const LEGACY_METADATA_NAMES: &[&str] = &[".sync-metadata.json", ".syncmeta"];

/// Substring present in every conflict artifact name
pub const CONFLICT_MARKER: &str = ".conflict-";

/// Suffix of in-progress copies and metadata writes
pub const STAGING_SUFFIX: &str = ".peersync-tmp";

/// Check whether a single file or directory name is one of our own artifacts
pub fn is_sync_artifact(name: &str) -> bool {
	if name == METADATA_FILE_NAME || is_dotted_derivative(name, METADATA_FILE_NAME) {
		return true;
	}
	if name.ends_with(SIDECAR_EXTENSION) || name.ends_with(STAGING_SUFFIX) {
		return true;
	}
	if LEGACY_METADATA_NAMES
		.iter()
		.any(|legacy| name == *legacy || is_dotted_derivative(name, legacy))
	{
		return true;
	}
	name.contains(CONFLICT_MARKER)
}

fn is_dotted_derivative(name: &str, base: &str) -> bool {
	name.len() > base.len() && name.starts_with(base) && name.as_bytes()[base.len()] == b'.'
}

/// Decide whether a peer-relative, forward-slash path is excluded from sync
///
/// Every component is checked against the built-in artifact rules, so
/// anything below an ignored directory is ignored too. User patterns
/// are applied to the whole path.
pub fn should_ignore(relative_path: &str, patterns: &IgnorePatterns) -> bool {
	let trimmed = relative_path.trim_start_matches("./").trim_matches('/');
	if trimmed.is_empty() {
		return false;
	}
	if trimmed.split('/').any(is_sync_artifact) {
		return true;
	}
	patterns.is_match(trimmed)
}

/// Convert a native relative path into the forward-slash form used as manifest key
pub fn normalize_relative(path: &std::path::Path) -> String {
	path.components()
		.filter_map(|c| match c {
			std::path::Component::Normal(part) => Some(part.to_string_lossy().into_owned()),
			_ => None,
		})
		.collect::<Vec<_>>()
		.join("/")
}

#[cfg(test)]
mod tests {
	use super::*;
	use std::path::Path;

	fn no_patterns() -> IgnorePatterns {
		IgnorePatterns::empty()
	}

	#[test]
	fn test_artifacts_always_ignored() {
		let names = [
			".peersync.json",
			".peersync.json.bak",
			".peersync.json.conflict-2026-01-01T00-00-00-000Z",
			"notes.txt.peersync",
			"deep/dir/report.pdf.peersync",
			".sync-metadata.json",
			".sync-metadata.json.old",
			".syncmeta",
			".syncmeta.1",
			"doc.conflict-2026-10-15T08-30-00-123Z.txt",
			"sub/readme.conflict-x.md",
			"big.iso.peersync-tmp",
			".peersync.json.peersync-tmp",
		];
		for name in names {
			assert!(should_ignore(name, &no_patterns()), "{} should be ignored", name);
		}
	}

	#[test]
	fn test_lookalike_user_files_kept() {
		let names = [
			"notasync.txt",
			"peersync.json",
			"my.peersync.json.txt",
			"peersync-notes.md",
			"conflict-resolution.txt",
			"syncmeta.txt",
			"dir/file.txt",
		];
		for name in names {
			assert!(!should_ignore(name, &no_patterns()), "{} should not be ignored", name);
		}
	}

	#[test]
	fn test_ignored_directory_hides_children() {
		assert!(should_ignore("a.conflict-1/child.txt", &no_patterns()));
	}

	#[test]
	fn test_user_patterns() {
		let patterns = IgnorePatterns::new(&["*.log".to_string(), ".git".to_string()]).unwrap();

		assert!(should_ignore("server.log", &patterns));
		assert!(should_ignore("logs/today.log", &patterns));
		assert!(should_ignore(".git", &patterns));
		assert!(!should_ignore("logbook.txt", &patterns));
	}

	#[test]
	fn test_leading_dot_slash_and_empty() {
		assert!(should_ignore("./.peersync.json", &no_patterns()));
		assert!(!should_ignore("", &no_patterns()));
	}

	#[test]
	fn test_normalize_relative() {
		assert_eq!(normalize_relative(Path::new("a/b/c.txt")), "a/b/c.txt");
		assert_eq!(normalize_relative(Path::new("./x.txt")), "x.txt");
	}
}

// vim: ts=4
