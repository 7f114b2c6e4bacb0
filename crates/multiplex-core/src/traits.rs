use std::future::Future;

use crate::error::AppError;
use crate::models::FetchResult;

/// Fetches a single link.
///
/// Implementations return `Ok` for any HTTP response, whatever its status.
/// Only transport failures and timeouts are errors. Dropping the returned
/// future must abort the request, which is how the fan-out cancels siblings.
pub trait Fetcher: Send + Sync + Clone + 'static {
    fn fetch(&self, url: &str) -> impl Future<Output = Result<FetchResult, AppError>> + Send;
}
