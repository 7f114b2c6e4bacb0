use multiplex_client::ReqwestFetcher;
use multiplex_core::JobService;

/// Shared application state, available to all route handlers via `State<Arc<AppState>>`.
pub struct AppState {
    pub service: JobService<ReqwestFetcher>,
    /// Prefix every route is mounted under.
    pub base_path: String,
}
