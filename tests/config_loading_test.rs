/// Integration tests for config loading
/// Config files are read from disk, parsed by extension and validated
use std::fs;
use std::path::PathBuf;
use tempfile::TempDir;

use peersync::{Config, ConfigError, ConflictResolution, SyncEngine, SyncSetType, WatchMode};

#[test]
fn test_load_toml_config() {
	let temp_dir = TempDir::new().expect("Failed to create temp dir");
	let config_path = temp_dir.path().join("config.toml");
	fs::write(
		&config_path,
		r#"
conflictResolution = "lww"
pollIntervalMs = 2000
watchMode = "poll"

[[syncSets]]
name = "photos"
paths = ["/data/photos", "/backup/photos"]
ignore = ["*.tmp", ".cache"]

[[syncSets]]
type = "file"
paths = ["/etc/hosts.shared", "/srv/hosts.shared"]
conflictResolution = "keep-both"
pollIntervalMs = 500
"#,
	)
	.unwrap();

	let config = Config::load(&config_path).expect("Config should load");

	assert_eq!(config.conflict_resolution, ConflictResolution::LastWriteWins);
	assert_eq!(config.watch_mode, WatchMode::Poll);
	assert_eq!(config.debounce_ms, 1_000);
	assert_eq!(config.sync_sets.len(), 2);

	let photos = &config.sync_sets[0];
	assert_eq!(photos.set_type, SyncSetType::Directory);
	assert_eq!(photos.paths[1], PathBuf::from("/backup/photos"));
	assert_eq!(photos.effective_poll_interval_ms(&config), 2000);

	let hosts = &config.sync_sets[1];
	assert_eq!(hosts.display_name(1), "set-1");
	assert_eq!(hosts.effective_poll_interval_ms(&config), 500);

	let engine = SyncEngine::new(config);
	assert_eq!(engine.set_name(0), "photos");
}

#[test]
fn test_load_json_config() {
	let temp_dir = TempDir::new().unwrap();
	let config_path = temp_dir.path().join("config.json");
	fs::write(
		&config_path,
		r#"{
			"conflictResolution": "keep-both",
			"syncSets": [
				{ "type": "directory", "paths": ["/a", "/b", "/c"] }
			]
		}"#,
	)
	.unwrap();

	let config = Config::load(&config_path).unwrap();
	assert_eq!(config.sync_sets[0].paths.len(), 3);
	assert_eq!(config.conflict_resolution, ConflictResolution::KeepBoth);
}

#[test]
fn test_missing_file_is_read_error() {
	let temp_dir = TempDir::new().unwrap();
	let result = Config::load(&temp_dir.path().join("absent.toml"));
	assert!(matches!(result, Err(ConfigError::ReadFailed { .. })));
}

#[test]
fn test_invalid_sets_are_rejected_on_load() {
	let temp_dir = TempDir::new().unwrap();
	let cases = [
		("one_path.toml", "[[syncSets]]\npaths = [\"/only\"]\n"),
		("dupe.toml", "[[syncSets]]\npaths = [\"/a\", \"/a\"]\n"),
		("file_ignore.toml", "[[syncSets]]\ntype = \"file\"\npaths = [\"/a\", \"/b\"]\nignore = [\"*\"]\n"),
		("bad_glob.toml", "[[syncSets]]\npaths = [\"/a\", \"/b\"]\nignore = [\"a[\"]\n"),
	];

	for (name, body) in cases {
		let path = temp_dir.path().join(name);
		fs::write(&path, body).unwrap();
		let result = Config::load(&path);
		assert!(matches!(result, Err(ConfigError::Invalid { .. })), "{} should be invalid", name);
	}
}

#[test]
fn test_unknown_strategy_is_parse_error() {
	let temp_dir = TempDir::new().unwrap();
	let path = temp_dir.path().join("config.toml");
	fs::write(&path, "conflictResolution = \"coin-flip\"\n").unwrap();

	assert!(matches!(Config::load(&path), Err(ConfigError::ParseFailed { .. })));
}

// vim: ts=4
