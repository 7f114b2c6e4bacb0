use std::time::Duration;

use multiplex_core::error::AppError;
use multiplex_core::models::FetchResult;
use multiplex_core::traits::Fetcher;
use reqwest::Client;

/// HTTP fetcher using reqwest.
///
/// Issues a GET per link and reports whatever status the upstream answers
/// with. Bodies are kept as text; invalid UTF-8 is replaced. Proxy settings
/// from the environment are ignored.
#[derive(Clone)]
pub struct ReqwestFetcher {
    client: Client,
    timeout: Duration,
}

impl ReqwestFetcher {
    pub fn new() -> Result<Self, AppError> {
        Self::with_timeout(Duration::from_secs(10))
    }

    pub fn with_timeout(timeout: Duration) -> Result<Self, AppError> {
        let client = Client::builder()
            .user_agent(concat!("Multiplex/", env!("CARGO_PKG_VERSION")))
            .timeout(timeout)
            .no_proxy()
            .build()
            .map_err(|e| AppError::HttpError(e.to_string()))?;

        Ok(Self { client, timeout })
    }

    fn classify(&self, e: reqwest::Error) -> AppError {
        if e.is_timeout() {
            AppError::Timeout(self.timeout)
        } else if e.is_connect() {
            AppError::NetworkError(format!("Connection failed: {e}"))
        } else {
            AppError::HttpError(e.to_string())
        }
    }
}

impl Fetcher for ReqwestFetcher {
    async fn fetch(&self, url: &str) -> Result<FetchResult, AppError> {
        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| self.classify(e))?;

        let status_code = response.status().as_u16();
        let body = response.bytes().await.map_err(|e| self.classify(e))?;

        tracing::debug!(%url, %status_code, bytes = body.len(), "Fetched");

        Ok(FetchResult {
            url: url.to_string(),
            status_code,
            body: String::from_utf8_lossy(&body).into_owned(),
        })
    }
}
