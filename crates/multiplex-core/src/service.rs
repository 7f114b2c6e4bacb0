use std::sync::{Arc, Mutex};
use std::time::Duration;

use crate::admission::{Admission, AdmissionSlot};
use crate::config::ServiceConfig;
use crate::error::AppError;
use crate::fanout::FanOut;
use crate::models::LinkSet;
use crate::registry::JobRegistry;
use crate::store::FileStore;
use crate::sweeper::RetentionSweeper;
use crate::traits::Fetcher;

/// Events emitted over a job's lifecycle for monitoring/logging.
#[derive(Debug, Clone)]
pub enum JobEvent {
    Submitted { job_id: u64, links: usize },
    AdmissionDenied { links: usize },
    Completed { job_id: u64, results: usize },
    Failed { job_id: u64, cancelled: bool },
    CancelRequested { job_id: u64 },
    Finished { job_id: u64 },
    DrainStarted { active: usize },
    Drained,
}

/// Trait for receiving job events (decoupled logging).
pub trait JobReporter: Send + Sync + 'static {
    fn report(&self, event: JobEvent) {
        let _ = event;
    }
}

/// Reporter that uses the `tracing` crate.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingJobReporter;

impl JobReporter for TracingJobReporter {
    fn report(&self, event: JobEvent) {
        match event {
            JobEvent::Submitted { job_id, links } => {
                tracing::info!(%job_id, %links, "Job accepted");
            }
            JobEvent::AdmissionDenied { links } => {
                tracing::warn!(%links, "Job refused, admission limit reached");
            }
            JobEvent::Completed { job_id, results } => {
                tracing::info!(%job_id, %results, "Job completed");
            }
            JobEvent::Failed { job_id, cancelled } => {
                tracing::warn!(%job_id, %cancelled, "Job produced no result");
            }
            JobEvent::CancelRequested { job_id } => {
                tracing::info!(%job_id, "Job cancellation requested");
            }
            JobEvent::Finished { job_id } => {
                tracing::debug!(%job_id, "Job released");
            }
            JobEvent::DrainStarted { active } => {
                tracing::info!(%active, "Waiting for running jobs");
            }
            JobEvent::Drained => {
                tracing::info!("All jobs finished");
            }
        }
    }
}

/// What a poll found.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PollOutcome {
    InProgress,
    /// Stored JSON array of fetch results.
    Ready(Vec<u8>),
}

/// Wires admission, registry, fan-out and storage into the job lifecycle:
/// accept → admit → register → fan-out → persist → finish → release.
pub struct JobService<F, R = TracingJobReporter>
where
    F: Fetcher,
    R: JobReporter,
{
    inner: Arc<Inner<F, R>>,
    sweeper: Mutex<Option<RetentionSweeper>>,
    max_links: usize,
    drain_interval: Duration,
}

struct Inner<F, R> {
    registry: JobRegistry,
    admission: Admission,
    fanout: FanOut<F>,
    store: FileStore,
    reporter: R,
}

impl<F: Fetcher> JobService<F> {
    /// Open the store, recover the id sequence and start the sweeper.
    pub fn start(config: &ServiceConfig, fetcher: F) -> Result<Self, AppError> {
        Self::with_reporter(config, fetcher, TracingJobReporter)
    }
}

impl<F, R> JobService<F, R>
where
    F: Fetcher,
    R: JobReporter,
{
    pub fn with_reporter(config: &ServiceConfig, fetcher: F, reporter: R) -> Result<Self, AppError> {
        let store = FileStore::open(&config.store_path)?;
        let last_id = store.last_id()?;
        tracing::info!(
            store = %store.dir().display(),
            %last_id,
            "Result store opened"
        );

        let sweeper = RetentionSweeper::start(store.clone(), config.result_ttl);

        let inner = Inner {
            registry: JobRegistry::new(last_id),
            admission: Admission::new(config.max_parallel_requests),
            fanout: FanOut::new(
                fetcher,
                config.max_parallel_fetches,
                config.fetch_timeout,
            ),
            store,
            reporter,
        };

        Ok(Self {
            inner: Arc::new(inner),
            sweeper: Mutex::new(Some(sweeper)),
            max_links: config.max_links_per_request,
            drain_interval: config.shutdown_poll_interval,
        })
    }

    /// Validate and admit a batch of links, then process it in the background.
    ///
    /// Returns the new job id as soon as the job is registered.
    pub fn submit(&self, links: Vec<String>) -> Result<u64, AppError> {
        let links = LinkSet::parse(links, self.max_links)?;

        let Some(slot) = self.inner.admission.try_acquire() else {
            self.inner
                .reporter
                .report(JobEvent::AdmissionDenied { links: links.len() });
            return Err(AppError::RateLimitExceeded);
        };

        let (job_id, scope) = self.inner.registry.start();
        self.inner.reporter.report(JobEvent::Submitted {
            job_id,
            links: links.len(),
        });

        let inner = Arc::clone(&self.inner);
        tokio::spawn(async move {
            inner.process(job_id, scope, links, slot).await;
        });

        Ok(job_id)
    }

    /// Running jobs answer `InProgress`; otherwise the stored result is read.
    pub async fn poll(&self, job_id: u64) -> Result<PollOutcome, AppError> {
        if self.inner.registry.check(job_id) {
            return Ok(PollOutcome::InProgress);
        }

        match self.inner.store.load(job_id).await? {
            Some(raw) => Ok(PollOutcome::Ready(raw)),
            None => Err(AppError::NotFound(job_id)),
        }
    }

    /// Cancel a running job. Finished and unknown jobs are `NotFound`.
    pub fn cancel(&self, job_id: u64) -> Result<(), AppError> {
        if self.inner.registry.cancel(job_id) {
            self.inner
                .reporter
                .report(JobEvent::CancelRequested { job_id });
            Ok(())
        } else {
            Err(AppError::NotFound(job_id))
        }
    }

    /// Refuse every later submission. Running jobs continue.
    pub fn stop_admitting(&self) {
        self.inner.admission.stop();
    }

    /// Wait, polling at the configured interval, until no job is running.
    pub async fn drain(&self) {
        let registry = &self.inner.registry;
        if !registry.is_empty() {
            self.inner.reporter.report(JobEvent::DrainStarted {
                active: registry.active(),
            });
        }

        while !registry.is_empty() {
            tokio::time::sleep(self.drain_interval).await;
        }
        self.inner.reporter.report(JobEvent::Drained);
    }

    /// Stop admitting, wait for running jobs and stop the sweeper.
    ///
    /// The HTTP layer stops accepting connections between
    /// [`stop_admitting`](Self::stop_admitting) and this call.
    pub async fn shutdown(&self) {
        self.stop_admitting();
        self.drain().await;

        let sweeper = match self.sweeper.lock() {
            Ok(mut guard) => guard.take(),
            Err(poisoned) => poisoned.into_inner().take(),
        };
        if let Some(sweeper) = sweeper {
            sweeper.shutdown().await;
        }
    }

    pub fn is_idle(&self) -> bool {
        self.inner.registry.is_empty()
    }

    pub fn max_links(&self) -> usize {
        self.max_links
    }
}

impl<F, R> Inner<F, R>
where
    F: Fetcher,
    R: JobReporter,
{
    async fn process(
        &self,
        job_id: u64,
        scope: tokio_util::sync::CancellationToken,
        links: LinkSet,
        slot: AdmissionSlot,
    ) {
        match self.fanout.execute(&scope, &links).await {
            Some(results) => {
                self.store.persist(job_id, &results).await;
                self.reporter.report(JobEvent::Completed {
                    job_id,
                    results: results.len(),
                });
            }
            None => self.reporter.report(JobEvent::Failed {
                job_id,
                cancelled: scope.is_cancelled(),
            }),
        }

        self.registry.finish(job_id);
        self.reporter.report(JobEvent::Finished { job_id });
        drop(slot);
    }
}
