//! Test utilities: a handwritten mock [`Fetcher`].
//!
//! Responses are keyed by URL and may carry a delay. The mock records how many
//! fetches ran at once and how many ran to completion, so tests can assert on
//! throttling and on sibling cancellation.

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use crate::error::AppError;
use crate::models::FetchResult;
use crate::traits::Fetcher;

#[derive(Clone)]
enum Canned {
    Ok { status_code: u16, body: String },
    Err(fn() -> AppError),
}

#[derive(Clone)]
struct MockResponse {
    delay: Duration,
    canned: Canned,
}

/// Mock fetcher with per-URL canned responses.
#[derive(Clone, Default)]
pub struct MockFetcher {
    responses: Arc<Mutex<HashMap<String, MockResponse>>>,
    in_flight: Arc<AtomicUsize>,
    peak: Arc<AtomicUsize>,
    completed: Arc<AtomicUsize>,
}

impl MockFetcher {
    pub fn new() -> Self {
        Self::default()
    }

    /// Respond immediately with `status_code` and `body`.
    pub fn respond(self, url: &str, status_code: u16, body: &str) -> Self {
        self.respond_after(url, Duration::ZERO, status_code, body)
    }

    /// Respond with `status_code` and `body` after `delay`.
    pub fn respond_after(self, url: &str, delay: Duration, status_code: u16, body: &str) -> Self {
        self.insert(
            url,
            delay,
            Canned::Ok {
                status_code,
                body: body.to_string(),
            },
        )
    }

    /// Fail after `delay` with the error built by `error`.
    pub fn fail_after(self, url: &str, delay: Duration, error: fn() -> AppError) -> Self {
        self.insert(url, delay, Canned::Err(error))
    }

    fn insert(self, url: &str, delay: Duration, canned: Canned) -> Self {
        self.responses
            .lock()
            .unwrap()
            .insert(url.to_string(), MockResponse { delay, canned });
        self
    }

    /// Highest number of fetches observed running at the same time.
    pub fn peak_in_flight(&self) -> usize {
        self.peak.load(Ordering::SeqCst)
    }

    /// Fetches that ran to their response (not dropped mid-flight).
    pub fn completed(&self) -> usize {
        self.completed.load(Ordering::SeqCst)
    }

    pub fn in_flight(&self) -> usize {
        self.in_flight.load(Ordering::SeqCst)
    }
}

/// Decrements the in-flight counter even when the fetch future is dropped.
struct InFlight(Arc<AtomicUsize>);

impl Drop for InFlight {
    fn drop(&mut self) {
        self.0.fetch_sub(1, Ordering::SeqCst);
    }
}

impl Fetcher for MockFetcher {
    async fn fetch(&self, url: &str) -> Result<FetchResult, AppError> {
        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.peak.fetch_max(now, Ordering::SeqCst);
        let _guard = InFlight(Arc::clone(&self.in_flight));

        let response = self.responses.lock().unwrap().get(url).cloned();
        let Some(response) = response else {
            return Err(AppError::HttpError(format!("unexpected link {url}")));
        };

        if !response.delay.is_zero() {
            tokio::time::sleep(response.delay).await;
        }
        self.completed.fetch_add(1, Ordering::SeqCst);

        match response.canned {
            Canned::Ok { status_code, body } => Ok(FetchResult {
                url: url.to_string(),
                status_code,
                body,
            }),
            Canned::Err(error) => Err(error()),
        }
    }
}
