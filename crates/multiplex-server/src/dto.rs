use serde::Serialize;

/// Body of every non-2xx JSON response.
#[derive(Debug, Serialize, utoipa::ToSchema)]
pub struct ErrorResponse {
    pub error: String,
    pub message: String,
}

/// One entry of a finished job's result array, in submission order.
///
/// Only used to describe the stored document in the OpenAPI output; the
/// handler streams the persisted bytes as they are.
#[derive(Debug, Serialize, utoipa::ToSchema)]
#[schema(as = FetchResult)]
pub struct FetchResultDoc {
    /// Link as submitted.
    #[schema(example = "https://example.com/a")]
    pub url: String,
    /// Upstream HTTP status.
    #[schema(example = 200)]
    pub status_code: u16,
    /// Response body as text.
    pub body: String,
}
