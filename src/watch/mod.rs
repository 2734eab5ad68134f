//! Watch mode: change notification, debouncing and the pass loop

pub mod debounce;
pub mod watcher;

pub use debounce::TriggerScheduler;
pub use watcher::{ChangeWatcher, WatchTarget};

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::task::JoinSet;
use tokio::time::Instant;

use crate::engine::SyncEngine;
use crate::error::SyncError;
use crate::logging::*;
use crate::types::SyncResult;

/// Run passes on change until `shutdown` completes
///
/// Every set gets an initial pass right away. Afterwards a set runs again
/// once its debounce window has passed without new changes. Passes of
/// different sets may overlap; a set never has two passes at once.
/// Passes still running at shutdown are awaited.
pub async fn run_watch<F>(engine: Arc<SyncEngine>, shutdown: F) -> Result<(), SyncError>
where
	F: Future<Output = ()>,
{
	let config = engine.config();
	let mut scheduler =
		TriggerScheduler::new(engine.set_count(), Duration::from_millis(config.debounce_ms));
	let (tx, mut rx) = mpsc::unbounded_channel();
	let _watcher = ChangeWatcher::start(config, tx)?;

	for set in 0..engine.set_count() {
		scheduler.trigger_now(set);
	}

	let mut passes: JoinSet<(usize, SyncResult)> = JoinSet::new();
	tokio::pin!(shutdown);

	loop {
		let now = Instant::now();
		while let Some(set) = scheduler.take_due(now) {
			let engine = engine.clone();
			passes.spawn(async move { (set, engine.run_set(set).await) });
		}

		let deadline = scheduler.next_deadline();
		tokio::select! {
			_ = &mut shutdown => {
				info!("Shutting down, waiting for {} running passes", passes.len());
				break;
			}
			Some(set) = rx.recv() => {
				debug!("Change detected in {}", engine.set_name(set));
				scheduler.notify(set);
			}
			Some(joined) = passes.join_next(), if !passes.is_empty() => {
				match joined {
					Ok((set, _result)) => scheduler.finish(set),
					Err(e) => error!("Pass task failed: {}", e),
				}
			}
			_ = tokio::time::sleep_until(deadline.unwrap_or(now)), if deadline.is_some() => {}
		}
	}

	while let Some(joined) = passes.join_next().await {
		if let Err(e) = joined {
			error!("Pass task failed: {}", e);
		}
	}
	Ok(())
}


// vim: ts=4
