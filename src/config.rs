//! Configuration for PeerSync
//!
//! The configuration follows a priority chain:
//! 1. Built-in defaults (Config::default())
//! 2. Config file (~/.peersync/config.toml, or .json/.json5)
//! 3. Per-set overrides inside the file (highest priority)

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::path::{Path, PathBuf};

use crate::error::{ConfigError, ExclusionError};
use crate::exclusion::IgnorePatterns;
use crate::strategies::{ConflictResolution, SyncSetType, WatchMode};

// ============================================================================
// MAIN CONFIGURATION STRUCT
// ============================================================================

/// Process-wide configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct Config {
	/// Strategy used by sets without their own override
	pub conflict_resolution: ConflictResolution,

	/// Interval between passes in poll mode (milliseconds)
	pub poll_interval_ms: u64,

	/// Quiet period after the last change before a pass starts (milliseconds)
	pub debounce_ms: u64,

	/// How the daemon learns about changes
	pub watch_mode: WatchMode,

	/// PID file guarding against a second daemon
	pub pid_file: Option<PathBuf>,

	/// Sync sets, processed independently
	pub sync_sets: Vec<SyncSet>,
}

impl Default for Config {
	fn default() -> Self {
		Config {
			conflict_resolution: ConflictResolution::KeepBoth,
			poll_interval_ms: 5_000,
			debounce_ms: 1_000,
			watch_mode: WatchMode::Native,
			pid_file: None,
			sync_sets: vec![],
		}
	}
}

/// One group of peers kept convergent
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SyncSet {
	/// Name used in logs and on the command line
	#[serde(default)]
	pub name: Option<String>,

	#[serde(rename = "type", default)]
	pub set_type: SyncSetType,

	/// Peers in configured order
	pub paths: Vec<PathBuf>,

	/// Glob patterns excluded from sync (directory sets only)
	#[serde(default)]
	pub ignore: Vec<String>,

	#[serde(default)]
	pub conflict_resolution: Option<ConflictResolution>,

	#[serde(default)]
	pub poll_interval_ms: Option<u64>,

	#[serde(default)]
	pub watch_mode: Option<WatchMode>,
}

impl SyncSet {
	fn new(set_type: SyncSetType, paths: Vec<PathBuf>) -> Self {
		SyncSet {
			name: None,
			set_type,
			paths,
			ignore: vec![],
			conflict_resolution: None,
			poll_interval_ms: None,
			watch_mode: None,
		}
	}

	/// A set of directory peers
	pub fn directory<P: Into<PathBuf>>(paths: impl IntoIterator<Item = P>) -> Self {
		Self::new(SyncSetType::Directory, paths.into_iter().map(Into::into).collect())
	}

	/// A set of individual file peers
	pub fn file<P: Into<PathBuf>>(paths: impl IntoIterator<Item = P>) -> Self {
		Self::new(SyncSetType::File, paths.into_iter().map(Into::into).collect())
	}

	pub fn named(mut self, name: impl Into<String>) -> Self {
		self.name = Some(name.into());
		self
	}

	pub fn with_ignore<S: Into<String>>(mut self, patterns: impl IntoIterator<Item = S>) -> Self {
		self.ignore = patterns.into_iter().map(Into::into).collect();
		self
	}

	pub fn with_conflict_resolution(mut self, strategy: ConflictResolution) -> Self {
		self.conflict_resolution = Some(strategy);
		self
	}

	/// Configured name, or `set-<index>`
	pub fn display_name(&self, index: usize) -> String {
		self.name.clone().unwrap_or_else(|| format!("set-{}", index))
	}

	/// Compiled ignore patterns (always empty for file sets)
	pub fn ignore_patterns(&self) -> Result<IgnorePatterns, ExclusionError> {
		match self.set_type {
			SyncSetType::Directory => IgnorePatterns::new(&self.ignore),
			SyncSetType::File => Ok(IgnorePatterns::empty()),
		}
	}

	pub fn effective_poll_interval_ms(&self, config: &Config) -> u64 {
		self.poll_interval_ms.unwrap_or(config.poll_interval_ms)
	}

	pub fn effective_watch_mode(&self, config: &Config) -> WatchMode {
		self.watch_mode.unwrap_or(config.watch_mode)
	}

	/// Check the set is usable before any pass runs
	pub fn validate(&self, label: &str) -> Result<(), ConfigError> {
		if self.paths.len() < 2 {
			return Err(invalid(format!("{}: at least 2 paths required, got {}", label, self.paths.len())));
		}

		let mut seen = BTreeSet::new();
		for path in &self.paths {
			if path.as_os_str().is_empty() {
				return Err(invalid(format!("{}: empty path", label)));
			}
			if !seen.insert(path) {
				return Err(invalid(format!("{}: duplicate path {}", label, path.display())));
			}
		}

		if self.set_type == SyncSetType::File && !self.ignore.is_empty() {
			return Err(invalid(format!("{}: ignore patterns apply to directory sets only", label)));
		}

		if self.poll_interval_ms == Some(0) {
			return Err(invalid(format!("{}: pollIntervalMs must be > 0", label)));
		}

		self.ignore_patterns().map_err(|e| invalid(format!("{}: {}", label, e)))?;
		Ok(())
	}
}

fn invalid(message: String) -> ConfigError {
	ConfigError::Invalid { message }
}

impl Config {
	/// Default config file location (~/.peersync/config.toml)
	pub fn default_path() -> PathBuf {
		std::env::var("HOME")
			.map(|h| PathBuf::from(h).join(".peersync").join("config.toml"))
			.unwrap_or_else(|_| PathBuf::from(".peersync").join("config.toml"))
	}

	/// Read and parse a config file, choosing the format by extension
	pub fn load(path: &Path) -> Result<Config, ConfigError> {
		let contents = std::fs::read_to_string(path)
			.map_err(|e| ConfigError::ReadFailed { path: path.to_path_buf(), source: e })?;
		let mut config = Self::parse(path, &contents)?;
		config.expand_paths();
		config.validate()?;
		Ok(config)
	}

	fn parse(path: &Path, contents: &str) -> Result<Config, ConfigError> {
		let ext = path.extension().and_then(|e| e.to_str()).unwrap_or("toml");
		let parsed = match ext {
			"json" | "json5" => json5::from_str(contents).map_err(|e| e.to_string()),
			_ => toml::from_str(contents).map_err(|e| e.to_string()),
		};
		parsed.map_err(|message| ConfigError::ParseFailed { path: path.to_path_buf(), message })
	}

	fn expand_paths(&mut self) {
		let home = std::env::var("HOME").ok();
		let Some(home) = home else { return };
		for set in &mut self.sync_sets {
			for path in &mut set.paths {
				if let Ok(rest) = path.strip_prefix("~") {
					*path = PathBuf::from(&home).join(rest);
				}
			}
		}
	}

	/// Validate every sync set and the global settings
	pub fn validate(&self) -> Result<(), ConfigError> {
		if self.poll_interval_ms == 0 {
			return Err(invalid("pollIntervalMs must be > 0".to_string()));
		}

		let mut names = BTreeSet::new();
		for (index, set) in self.sync_sets.iter().enumerate() {
			let label = set.display_name(index);
			set.validate(&label)?;
			if !names.insert(label.clone()) {
				return Err(invalid(format!("duplicate sync set name {}", label)));
			}
		}
		Ok(())
	}

	/// Find a set by name, or by index when `key` is a number
	pub fn find_set(&self, key: &str) -> Option<usize> {
		self.sync_sets
			.iter()
			.enumerate()
			.position(|(i, s)| s.display_name(i) == key)
			.or_else(|| key.parse::<usize>().ok().filter(|i| *i < self.sync_sets.len()))
	}
}


// vim: ts=4
