//! User-configured ignore globs, compiled with globset

use crate::error::ExclusionError;
use globset::{GlobBuilder, GlobSet, GlobSetBuilder};

/// Compiled set of user ignore patterns for one sync set
///
/// Matching is case-sensitive and `*` also matches names starting with a dot.
/// A pattern is tried against the whole peer-relative path and against its
/// final component, so `build` skips every directory named `build`.
#[derive(Debug, Clone)]
pub struct IgnorePatterns {
	patterns: Vec<String>,
	set: GlobSet,
}

impl IgnorePatterns {
	/// Compile the given glob patterns
	pub fn new(patterns: &[String]) -> Result<Self, ExclusionError> {
		let mut builder = GlobSetBuilder::new();

		for pattern in patterns {
			let glob = GlobBuilder::new(pattern)
				.case_insensitive(false)
				.literal_separator(false)
				.build()
				.map_err(|e| ExclusionError::InvalidPattern(format!("{}: {}", pattern, e)))?;
			builder.add(glob);
		}

		let set = builder.build().map_err(|e| {
			ExclusionError::InvalidPattern(format!("Failed to build pattern set: {}", e))
		})?;

		Ok(Self { patterns: patterns.to_vec(), set })
	}

	/// A pattern set that matches nothing
	pub fn empty() -> Self {
		Self { patterns: Vec::new(), set: GlobSet::empty() }
	}

	pub fn is_empty(&self) -> bool {
		self.patterns.is_empty()
	}

	/// The source patterns, in configured order
	pub fn patterns(&self) -> &[String] {
		&self.patterns
	}

	/// Check a forward-slash relative path against the patterns
	pub fn is_match(&self, relative_path: &str) -> bool {
		if self.patterns.is_empty() {
			return false;
		}
		if self.set.is_match(relative_path) {
			return true;
		}
		match relative_path.rsplit_once('/') {
			Some((_, name)) => self.set.is_match(name),
			None => false,
		}
	}
}

impl Default for IgnorePatterns {
	fn default() -> Self {
		Self::empty()
	}
}


// vim: ts=4
