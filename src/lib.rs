//! # PeerSync - Local N-Way File Synchronizer
//!
//! PeerSync keeps two or more local directories (or individual files)
//! convergent across repeated passes. Each peer remembers what it looked
//! like after the last pass, so additions, modifications and deletions can
//! be told apart from concurrent edits, which are resolved as conflicts.
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use peersync::{Config, SyncEngine, SyncSet};
//!
//! #[tokio::main]
//! async fn main() {
//!     let config = Config {
//!         sync_sets: vec![SyncSet::directory(["./dir1", "./dir2"])],
//!         ..Default::default()
//!     };
//!     let engine = SyncEngine::new(config);
//!     let result = engine.run_set(0).await;
//!     println!("{}", result);
//! }
//! ```
//!
//! ## Choosing a Conflict Strategy
//!
//! ```rust,ignore
//! use peersync::{ConflictResolution, SyncSet};
//!
//! let set = SyncSet::file(["/etc/app.conf", "/mnt/backup/app.conf"])
//!     .with_conflict_resolution(ConflictResolution::LastWriteWins);
//! ```

pub mod config;
pub mod conflict;
pub mod diff;
pub mod engine;
pub mod error;
pub mod exclusion;
pub mod fileops;
pub mod lifecycle;
pub mod logging;
pub mod manifest;
pub mod metadata;
pub mod strategies;
pub mod sync_dir;
pub mod sync_file;
pub mod types;
pub mod watch;

// Re-export commonly used types and functions
pub use config::{Config, SyncSet};
pub use engine::SyncEngine;
pub use error::{ConfigError, FileOpError, LifecycleError, MetadataError, SyncError};
pub use exclusion::{should_ignore, IgnorePatterns};
pub use manifest::{build_manifest, FileEntry, Manifest};
pub use strategies::{ConflictResolution, SyncSetType, WatchMode};
pub use types::{ActionType, SyncAction, SyncResult};

// vim: ts=4
