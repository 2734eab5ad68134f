//! Consolidated strategy and mode enums
//!
//! Each enum has a `FromStr` implementation for CLI and config parsing and
//! serializes in kebab-case.

use serde::{Deserialize, Serialize};
use std::str::FromStr;

// ============================================================================
// CONFLICT RESOLUTION
// ============================================================================

/// Strategy for resolving a path that changed on more than one peer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "kebab-case")]
pub enum ConflictResolution {
	/// Rename the losing copy to a `.conflict-<timestamp>` sibling, keep both
	#[default]
	#[serde(alias = "keepboth", alias = "both")]
	KeepBoth,

	/// Newest modification time overwrites the other side in place
	#[serde(alias = "lww", alias = "newest")]
	LastWriteWins,
}

impl FromStr for ConflictResolution {
	type Err = String;

	fn from_str(s: &str) -> Result<Self, Self::Err> {
		match s.to_lowercase().as_str() {
			"keep-both" | "keepboth" | "both" => Ok(Self::KeepBoth),
			"last-write-wins" | "lww" | "newest" => Ok(Self::LastWriteWins),
			_ => Err(format!(
				"Unknown conflict resolution: {}. Valid options: keep-both, last-write-wins",
				s
			)),
		}
	}
}

impl std::fmt::Display for ConflictResolution {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		match self {
			Self::KeepBoth => write!(f, "keep-both"),
			Self::LastWriteWins => write!(f, "last-write-wins"),
		}
	}
}

// ============================================================================
// SYNC SET TYPE
// ============================================================================

/// What kind of peers a sync set holds
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "kebab-case")]
pub enum SyncSetType {
	/// Every peer is a directory tree
	#[default]
	#[serde(alias = "dir")]
	Directory,

	/// Every peer is a single file
	File,
}

impl FromStr for SyncSetType {
	type Err = String;

	fn from_str(s: &str) -> Result<Self, Self::Err> {
		match s.to_lowercase().as_str() {
			"directory" | "dir" => Ok(Self::Directory),
			"file" => Ok(Self::File),
			_ => Err(format!("Unknown sync set type: {}. Valid options: directory, file", s)),
		}
	}
}

impl std::fmt::Display for SyncSetType {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		match self {
			Self::Directory => write!(f, "directory"),
			Self::File => write!(f, "file"),
		}
	}
}

// ============================================================================
// WATCH MODE
// ============================================================================

/// How the daemon learns about changes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "kebab-case")]
pub enum WatchMode {
	/// OS change notifications
	#[default]
	Native,

	/// Periodic full passes
	#[serde(alias = "polling")]
	Poll,
}

impl FromStr for WatchMode {
	type Err = String;

	fn from_str(s: &str) -> Result<Self, Self::Err> {
		match s.to_lowercase().as_str() {
			"native" | "watch" => Ok(Self::Native),
			"poll" | "polling" => Ok(Self::Poll),
			_ => Err(format!("Unknown watch mode: {}. Valid options: native, poll", s)),
		}
	}
}

impl std::fmt::Display for WatchMode {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		match self {
			Self::Native => write!(f, "native"),
			Self::Poll => write!(f, "poll"),
		}
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn test_conflict_resolution_parse() {
		assert_eq!(ConflictResolution::from_str("keep-both").unwrap(), ConflictResolution::KeepBoth);
		assert_eq!(
			ConflictResolution::from_str("LWW").unwrap(),
			ConflictResolution::LastWriteWins
		);
		assert!(ConflictResolution::from_str("prefer-first").is_err());
	}

	#[test]
	fn test_display_roundtrips_through_from_str() {
		for strategy in [ConflictResolution::KeepBoth, ConflictResolution::LastWriteWins] {
			assert_eq!(ConflictResolution::from_str(&strategy.to_string()).unwrap(), strategy);
		}
		for tp in [SyncSetType::Directory, SyncSetType::File] {
			assert_eq!(SyncSetType::from_str(&tp.to_string()).unwrap(), tp);
		}
	}

	#[test]
	fn test_serde_kebab_case() {
		let json = serde_json::to_string(&ConflictResolution::LastWriteWins).unwrap();
		assert_eq!(json, "\"last-write-wins\"");
		let mode: WatchMode = serde_json::from_str("\"poll\"").unwrap();
		assert_eq!(mode, WatchMode::Poll);
	}

	#[test]
	fn test_serde_accepts_aliases() {
		let strategy: ConflictResolution = serde_json::from_str("\"lww\"").unwrap();
		assert_eq!(strategy, ConflictResolution::LastWriteWins);
		let tp: SyncSetType = serde_json::from_str("\"dir\"").unwrap();
		assert_eq!(tp, SyncSetType::Directory);
	}
}

// vim: ts=4
