use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use tokio::sync::Semaphore;

use crate::error::AppError;

/// Upper bound for the TTL and the fetch timeout; both end up as deadlines
/// added to `Instant::now()`.
pub const MAX_DURATION: Duration = Duration::from_secs(10 * 365 * 24 * 60 * 60);

/// Configuration of the job-processing core.
#[derive(Debug, Clone)]
pub struct ServiceConfig {
    /// Directory holding one `<id>.json` per finished job.
    pub store_path: PathBuf,
    /// Age at which stored results are evicted; also the sweep period.
    pub result_ttl: Duration,
    /// Upstream client timeout and per-job fetch deadline.
    pub fetch_timeout: Duration,
    pub max_links_per_request: usize,
    /// Concurrently processing jobs (0 = unbounded).
    pub max_parallel_requests: usize,
    /// Concurrent upstream fetches within one job.
    pub max_parallel_fetches: usize,
    pub shutdown_poll_interval: Duration,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            store_path: PathBuf::from("./store"),
            result_ttl: Duration::from_secs(3600),
            fetch_timeout: Duration::from_secs(10),
            max_links_per_request: 20,
            max_parallel_requests: 100,
            max_parallel_fetches: 4,
            shutdown_poll_interval: Duration::from_millis(100),
        }
    }
}

impl ServiceConfig {
    /// Read configuration from environment variables.
    ///
    /// - `MULTIPLEX_STORE_PATH` (default `./store`)
    /// - `MULTIPLEX_RESULT_TTL_SECS` (default 3600)
    /// - `MULTIPLEX_FETCH_TIMEOUT_MS` (default 10000)
    /// - `MULTIPLEX_MAX_LINKS_PER_REQUEST` (default 20)
    /// - `MULTIPLEX_MAX_PARALLEL_REQUESTS` (default 100, 0 = unbounded)
    /// - `MULTIPLEX_MAX_PARALLEL_FETCHES` (default 4)
    /// - `MULTIPLEX_SHUTDOWN_POLL_MS` (default 100)
    pub fn from_env() -> Result<Self, AppError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Same as [`from_env`](Self::from_env) with a custom variable source.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, AppError> {
        let defaults = Self::default();

        let config = Self {
            store_path: lookup("MULTIPLEX_STORE_PATH")
                .map(PathBuf::from)
                .unwrap_or(defaults.store_path),
            result_ttl: parse_var(&lookup, "MULTIPLEX_RESULT_TTL_SECS")?
                .map(Duration::from_secs)
                .unwrap_or(defaults.result_ttl),
            fetch_timeout: parse_var(&lookup, "MULTIPLEX_FETCH_TIMEOUT_MS")?
                .map(Duration::from_millis)
                .unwrap_or(defaults.fetch_timeout),
            max_links_per_request: parse_var(&lookup, "MULTIPLEX_MAX_LINKS_PER_REQUEST")?
                .unwrap_or(defaults.max_links_per_request),
            max_parallel_requests: parse_var(&lookup, "MULTIPLEX_MAX_PARALLEL_REQUESTS")?
                .unwrap_or(defaults.max_parallel_requests),
            max_parallel_fetches: parse_var(&lookup, "MULTIPLEX_MAX_PARALLEL_FETCHES")?
                .unwrap_or(defaults.max_parallel_fetches),
            shutdown_poll_interval: parse_var(&lookup, "MULTIPLEX_SHUTDOWN_POLL_MS")?
                .map(Duration::from_millis)
                .unwrap_or(defaults.shutdown_poll_interval),
        };

        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), AppError> {
        if self.store_path.as_os_str().is_empty() {
            return Err(AppError::ConfigError(
                "MULTIPLEX_STORE_PATH must not be empty".into(),
            ));
        }
        if self.max_links_per_request < 1 {
            return Err(AppError::ConfigError(
                "MULTIPLEX_MAX_LINKS_PER_REQUEST must be at least 1".into(),
            ));
        }
        if self.max_parallel_fetches < 1 {
            return Err(AppError::ConfigError(
                "MULTIPLEX_MAX_PARALLEL_FETCHES must be at least 1".into(),
            ));
        }
        if self.max_parallel_fetches > self.max_links_per_request {
            return Err(AppError::ConfigError(
                "MULTIPLEX_MAX_PARALLEL_FETCHES must not be greater than MULTIPLEX_MAX_LINKS_PER_REQUEST"
                    .into(),
            ));
        }
        for (name, value) in [
            ("MULTIPLEX_MAX_PARALLEL_REQUESTS", self.max_parallel_requests),
            ("MULTIPLEX_MAX_PARALLEL_FETCHES", self.max_parallel_fetches),
        ] {
            if value > Semaphore::MAX_PERMITS {
                return Err(AppError::ConfigError(format!(
                    "{name} must not exceed {}",
                    Semaphore::MAX_PERMITS
                )));
            }
        }
        for (name, value) in [
            ("MULTIPLEX_RESULT_TTL_SECS", self.result_ttl),
            ("MULTIPLEX_FETCH_TIMEOUT_MS", self.fetch_timeout),
            ("MULTIPLEX_SHUTDOWN_POLL_MS", self.shutdown_poll_interval),
        ] {
            if value.is_zero() {
                return Err(AppError::ConfigError(format!("{name} must be positive")));
            }
        }
        for (name, value) in [
            ("MULTIPLEX_RESULT_TTL_SECS", self.result_ttl),
            ("MULTIPLEX_FETCH_TIMEOUT_MS", self.fetch_timeout),
        ] {
            if value > MAX_DURATION {
                return Err(AppError::ConfigError(format!(
                    "{name} must not exceed {} seconds",
                    MAX_DURATION.as_secs()
                )));
            }
        }
        Ok(())
    }
}

fn parse_var<T: FromStr>(
    lookup: &impl Fn(&str) -> Option<String>,
    name: &str,
) -> Result<Option<T>, AppError> {
    match lookup(name) {
        None => Ok(None),
        Some(raw) => raw.trim().parse().map(Some).map_err(|_| {
            AppError::ConfigError(format!(
                "Invalid {name} '{raw}': must be a non-negative integer"
            ))
        }),
    }
}
