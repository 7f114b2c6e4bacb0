//! Time-based eviction of stored results.
//!
//! A background task wakes every `ttl` and removes each file in the store
//! whose last write is at least `ttl` old. [`RetentionSweeper::shutdown`]
//! returns only once that task has exited, and a sweep in progress is always
//! allowed to finish first.

use std::time::{Duration, SystemTime};

use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;

use crate::store::FileStore;

/// Outcome of one sweep pass.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct SweepStats {
    pub removed: usize,
    pub kept: usize,
    pub errors: usize,
}

/// Handle to the running sweep task.
#[derive(Debug)]
pub struct RetentionSweeper {
    stop: CancellationToken,
    handle: JoinHandle<()>,
}

impl RetentionSweeper {
    /// Spawn the sweep loop. The first pass runs one `ttl` after start.
    pub fn start(store: FileStore, ttl: Duration) -> Self {
        let stop = CancellationToken::new();
        let handle = tokio::spawn(run(store, ttl, stop.clone()));
        tracing::info!(ttl_secs = ttl.as_secs(), "Retention sweeper started");
        Self { stop, handle }
    }

    /// Stop the loop and wait for it to acknowledge.
    pub async fn shutdown(self) {
        self.stop.cancel();
        if let Err(e) = self.handle.await {
            tracing::error!(error = %e, "Retention sweeper task failed");
        }
    }
}

async fn run(store: FileStore, ttl: Duration, stop: CancellationToken) {
    let Some(first_tick) = Instant::now().checked_add(ttl) else {
        tracing::error!(ttl_secs = ttl.as_secs(), "TTL out of range, sweeping disabled");
        stop.cancelled().await;
        return;
    };
    let mut ticker = tokio::time::interval_at(first_tick, ttl);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        tokio::select! {
            biased;
            () = stop.cancelled() => break,
            _ = ticker.tick() => {
                sweep(&store, ttl).await;
            }
        }
    }

    tracing::info!("Retention sweeper stopped");
}

/// Remove every stored file at least `ttl` old.
///
/// Errors on individual entries are logged and counted; they never stop the
/// pass.
pub async fn sweep(store: &FileStore, ttl: Duration) -> SweepStats {
    let mut stats = SweepStats::default();
    tracing::debug!(dir = %store.dir().display(), "Sweep started");

    let mut entries = match tokio::fs::read_dir(store.dir()).await {
        Ok(entries) => entries,
        Err(e) => {
            tracing::error!(dir = %store.dir().display(), error = %e, "Failed to list store");
            stats.errors += 1;
            return stats;
        }
    };

    let now = SystemTime::now();
    loop {
        let entry = match entries.next_entry().await {
            Ok(Some(entry)) => entry,
            Ok(None) => break,
            Err(e) => {
                tracing::error!(error = %e, "Failed to read store entry");
                stats.errors += 1;
                break;
            }
        };
        let path = entry.path();

        let modified = match entry.metadata().await.and_then(|m| m.modified()) {
            Ok(modified) => modified,
            Err(e) => {
                tracing::error!(path = %path.display(), error = %e, "Failed to stat stored result");
                stats.errors += 1;
                continue;
            }
        };

        // A clock step backwards makes the file look fresh rather than ancient.
        let age = now.duration_since(modified).unwrap_or(Duration::ZERO);
        if age < ttl {
            stats.kept += 1;
            continue;
        }

        match tokio::fs::remove_file(&path).await {
            Ok(()) => stats.removed += 1,
            Err(e) => {
                tracing::error!(path = %path.display(), error = %e, "Failed to remove stored result");
                stats.errors += 1;
            }
        }
    }

    tracing::info!(
        removed = stats.removed,
        kept = stats.kept,
        errors = stats.errors,
        "Sweep finished"
    );
    stats
}
