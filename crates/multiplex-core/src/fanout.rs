//! Bounded concurrent fetching of one job's links.
//!
//! Every link gets its own task. A per-job semaphore caps how many of them
//! talk to the network at once, and all of them share one deadline measured
//! from the start of the job. The first failure cancels the remaining
//! siblings and the job yields no results at all.
//!
//! Scopes form a tree: the job scope (owned by the registry) is the parent of
//! the fan-out scope, which is the parent of one scope per fetch. Cancelling
//! any node stops everything below it.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

use crate::error::AppError;
use crate::models::{FetchResult, LinkSet, ResultSet};
use crate::traits::Fetcher;

/// Runs a [`LinkSet`] through a [`Fetcher`] with bounded parallelism.
#[derive(Debug, Clone)]
pub struct FanOut<F> {
    fetcher: F,
    parallelism: usize,
    deadline: Duration,
}

impl<F: Fetcher> FanOut<F> {
    /// `parallelism` is clamped to `1..=Semaphore::MAX_PERMITS`.
    pub fn new(fetcher: F, parallelism: usize, deadline: Duration) -> Self {
        Self {
            fetcher,
            parallelism: parallelism.clamp(1, Semaphore::MAX_PERMITS),
            deadline,
        }
    }

    /// Fetch every link under `scope`.
    ///
    /// Returns the results in link order, or `None` if any fetch failed,
    /// timed out, or the scope was cancelled. Never returns before every
    /// spawned task has settled.
    pub async fn execute(&self, scope: &CancellationToken, links: &LinkSet) -> Option<ResultSet> {
        let fanout_scope = scope.child_token();
        let gate = Arc::new(Semaphore::new(self.parallelism));
        let deadline = Instant::now() + self.deadline;

        let mut tasks = JoinSet::new();
        for (index, url) in links.iter().enumerate() {
            let fetch = FetchTask {
                fetcher: self.fetcher.clone(),
                gate: Arc::clone(&gate),
                scope: fanout_scope.child_token(),
                deadline,
                budget: self.deadline,
                url: url.to_string(),
            };
            tasks.spawn(async move {
                let outcome = fetch.run().await;
                (index, fetch.url, outcome)
            });
        }

        let mut slots: Vec<Option<FetchResult>> = vec![None; links.len()];
        let mut failure: Option<AppError> = None;

        while let Some(joined) = tasks.join_next().await {
            match joined {
                Ok((index, _, Ok(result))) => slots[index] = Some(result),
                Ok((_, url, Err(error))) => {
                    if failure.is_none() {
                        if scope.is_cancelled() {
                            tracing::info!(%url, "Job cancelled, stopping fetches");
                        } else {
                            tracing::warn!(%url, %error, "Fetch failed, cancelling siblings");
                        }
                        fanout_scope.cancel();
                        failure = Some(error);
                    } else {
                        tracing::debug!(%url, %error, "Sibling fetch stopped");
                    }
                }
                Err(join_error) => {
                    tracing::error!(error = %join_error, "Fetch task panicked");
                    fanout_scope.cancel();
                    failure.get_or_insert(AppError::Cancelled);
                }
            }
        }

        if failure.is_some() || scope.is_cancelled() {
            return None;
        }

        slots.into_iter().collect()
    }
}

struct FetchTask<F> {
    fetcher: F,
    gate: Arc<Semaphore>,
    scope: CancellationToken,
    deadline: Instant,
    budget: Duration,
    url: String,
}

impl<F: Fetcher> FetchTask<F> {
    async fn run(&self) -> Result<FetchResult, AppError> {
        let work = async {
            let _permit = tokio::select! {
                biased;
                () = self.scope.cancelled() => return Err(AppError::Cancelled),
                permit = Arc::clone(&self.gate).acquire_owned() => {
                    permit.map_err(|_| AppError::Cancelled)?
                }
            };

            tokio::select! {
                biased;
                () = self.scope.cancelled() => Err(AppError::Cancelled),
                result = self.fetcher.fetch(&self.url) => result,
            }
        };

        match tokio::time::timeout_at(self.deadline, work).await {
            Ok(outcome) => outcome,
            Err(_) => Err(AppError::Timeout(self.budget)),
        }
    }
}
