//! Registry of running jobs.
//!
//! Owns the id sequence and one cancellation scope per running job. An entry
//! exists exactly while the job's fan-out is in flight; `finish` removes it.

use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};

use dashmap::DashMap;
use tokio_util::sync::CancellationToken;

/// Shared registry of job id -> cancellation scope.
#[derive(Debug, Default)]
pub struct JobRegistry {
    last_id: AtomicU64,
    active: AtomicUsize,
    jobs: DashMap<u64, CancellationToken>,
}

impl JobRegistry {
    /// Create a registry whose first issued id is `last_id + 1`.
    pub fn new(last_id: u64) -> Self {
        Self {
            last_id: AtomicU64::new(last_id),
            active: AtomicUsize::new(0),
            jobs: DashMap::new(),
        }
    }

    /// Register a new job and return its id and cancellation scope.
    ///
    /// Ids are strictly increasing and never repeat, whatever the number of
    /// concurrent callers.
    pub fn start(&self) -> (u64, CancellationToken) {
        let id = self.last_id.fetch_add(1, Ordering::SeqCst) + 1;
        let scope = CancellationToken::new();

        self.active.fetch_add(1, Ordering::SeqCst);
        self.jobs.insert(id, scope.clone());

        (id, scope)
    }

    /// Remove a finished job. Unknown ids are ignored.
    pub fn finish(&self, id: u64) {
        if self.jobs.remove(&id).is_some() {
            self.active.fetch_sub(1, Ordering::SeqCst);
        }
    }

    /// True while the job is registered (its fan-out has not concluded).
    pub fn check(&self, id: u64) -> bool {
        self.jobs.contains_key(&id)
    }

    /// Signal the job's scope. Returns false for unknown or finished jobs.
    pub fn cancel(&self, id: u64) -> bool {
        match self.jobs.get(&id) {
            Some(scope) => {
                scope.cancel();
                true
            }
            None => false,
        }
    }

    /// True when no job is running.
    pub fn is_empty(&self) -> bool {
        self.active.load(Ordering::SeqCst) == 0
    }

    pub fn active(&self) -> usize {
        self.active.load(Ordering::SeqCst)
    }

    /// The most recently issued id (or the recovered one if none issued yet).
    pub fn last_id(&self) -> u64 {
        self.last_id.load(Ordering::SeqCst)
    }
}
