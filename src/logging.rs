//! Tracing re-exports and subscriber setup
//!
//! ```ignore
//! use crate::logging::*;
//!
//! info!("Pass finished");
//! ```

pub use tracing::{debug, error, info, info_span, warn};

use tracing_subscriber::EnvFilter;

/// Default filter for a `-v` count, used when `RUST_LOG` is unset
pub fn default_directive(verbose: u8) -> &'static str {
	match verbose {
		0 => "info",
		1 => "peersync=debug,info",
		_ => "trace",
	}
}

/// Install the global subscriber, writing to stderr
///
/// `RUST_LOG` wins over the verbosity flag:
///
/// ```bash
/// RUST_LOG=peersync::sync_dir=trace peersync sync
/// ```
pub fn init_tracing(verbose: u8) {
	let filter = EnvFilter::try_from_default_env()
		.unwrap_or_else(|_| EnvFilter::new(default_directive(verbose)));
	tracing_subscriber::fmt().with_env_filter(filter).with_writer(std::io::stderr).init();
}


// vim: ts=4
