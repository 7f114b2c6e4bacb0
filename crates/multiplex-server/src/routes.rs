use std::sync::Arc;

use axum::Router;
use axum::body::Bytes;
use axum::extract::{Path, State};
use axum::http::{StatusCode, header};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};

use multiplex_core::{AppError, PollOutcome};

use crate::error::ApiError;
use crate::openapi::ApiDoc;
use crate::state::AppState;

/// Plain-text answer for a job that has not produced a result yet.
pub const IN_PROGRESS: &str = "Your request is in progress. Please, try a bit later.";

/// Build the router with every route mounted under `state.base_path`.
pub fn router(state: Arc<AppState>) -> Router {
    let base = state.base_path.as_str();
    Router::new()
        .route(&format!("{base}/links"), post(submit_links))
        .route(
            &format!("{base}/links/{{id}}"),
            get(poll_links).delete(cancel_links),
        )
        .route(&format!("{base}/docs/openapi.json"), get(openapi_json))
        .with_state(state)
}

// ---------------------------------------------------------------------------
// Links
// ---------------------------------------------------------------------------

#[utoipa::path(
    post,
    path = "/links",
    request_body(
        content = Vec<String>,
        description = "Absolute URLs to fetch",
        content_type = "application/json"
    ),
    responses(
        (status = 202, description = "Job accepted; body is the decimal job ID", body = String, content_type = "text/plain"),
        (status = 400, description = "Malformed body or invalid links", body = crate::dto::ErrorResponse),
        (status = 429, description = "Too many jobs in progress", body = crate::dto::ErrorResponse),
    ),
    tag = "links"
)]
pub async fn submit_links(
    State(state): State<Arc<AppState>>,
    body: Bytes,
) -> Result<impl IntoResponse, ApiError> {
    let links: Vec<String> = serde_json::from_slice(&body).map_err(AppError::from)?;
    let job_id = state.service.submit(links)?;
    Ok((StatusCode::ACCEPTED, job_id.to_string()))
}

#[utoipa::path(
    get,
    path = "/links/{id}",
    params(("id" = u64, Path, description = "Job ID")),
    responses(
        (status = 200, description = "Results in submission order, or the in-progress notice as text/plain", body = Vec<crate::dto::FetchResultDoc>),
        (status = 400, description = "Invalid job ID", body = crate::dto::ErrorResponse),
        (status = 404, description = "Unknown, failed, cancelled or expired job", body = crate::dto::ErrorResponse),
    ),
    tag = "links"
)]
pub async fn poll_links(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Response, ApiError> {
    let job_id = parse_job_id(&id)?;
    let response = match state.service.poll(job_id).await? {
        PollOutcome::InProgress => IN_PROGRESS.into_response(),
        PollOutcome::Ready(raw) => {
            ([(header::CONTENT_TYPE, "application/json")], raw).into_response()
        }
    };
    Ok(response)
}

#[utoipa::path(
    delete,
    path = "/links/{id}",
    params(("id" = u64, Path, description = "Job ID")),
    responses(
        (status = 204, description = "Cancellation requested"),
        (status = 400, description = "Invalid job ID", body = crate::dto::ErrorResponse),
        (status = 404, description = "No running job with this ID", body = crate::dto::ErrorResponse),
    ),
    tag = "links"
)]
pub async fn cancel_links(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<StatusCode, ApiError> {
    let job_id = parse_job_id(&id)?;
    state.service.cancel(job_id)?;
    Ok(StatusCode::NO_CONTENT)
}

// ---------------------------------------------------------------------------
// Docs
// ---------------------------------------------------------------------------

async fn openapi_json(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    axum::Json(ApiDoc::for_base_path(&state.base_path))
}

fn parse_job_id(raw: &str) -> Result<u64, AppError> {
    let invalid = || AppError::InvalidJobId(raw.to_string());
    if raw.is_empty() || !raw.bytes().all(|b| b.is_ascii_digit()) {
        return Err(invalid());
    }
    raw.parse().map_err(|_| invalid())
}
