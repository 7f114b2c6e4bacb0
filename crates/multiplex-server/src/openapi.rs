use utoipa::OpenApi;
use utoipa::openapi::server::Server;

#[derive(OpenApi)]
#[openapi(
    info(
        title = "Multiplex API",
        version = "0.1.0",
        description = "Fetches batches of URLs concurrently and keeps the results for a while."
    ),
    paths(
        crate::routes::submit_links,
        crate::routes::poll_links,
        crate::routes::cancel_links,
    ),
    components(schemas(crate::dto::FetchResultDoc, crate::dto::ErrorResponse)),
    tags((name = "links", description = "Link batch jobs"))
)]
pub struct ApiDoc;

impl ApiDoc {
    /// The document with its server URL set to the configured base path.
    pub fn for_base_path(base_path: &str) -> utoipa::openapi::OpenApi {
        let mut doc = Self::openapi();
        let url = if base_path.is_empty() { "/" } else { base_path };
        doc.servers = Some(vec![Server::new(url)]);
        doc
    }
}
