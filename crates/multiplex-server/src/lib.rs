//! HTTP surface of Multiplex: routes, error mapping, OpenAPI document and the
//! serve loop with graceful shutdown.

pub mod config;
pub mod dto;
pub mod error;
pub mod openapi;
pub mod routes;
pub mod state;

use std::future::Future;
use std::sync::Arc;

use anyhow::Context;
use axum::Router;
use tokio::net::TcpListener;
use tower_http::limit::RequestBodyLimitLayer;
use tower_http::trace::{DefaultMakeSpan, DefaultOnResponse, TraceLayer};
use tracing::Level;

use crate::state::AppState;

/// Upper bound on a submission body.
const MAX_BODY_BYTES: usize = 1024 * 1024;

/// Router with request tracing and the body size limit applied.
pub fn app(state: Arc<AppState>) -> Router {
    routes::router(state)
        .layer(RequestBodyLimitLayer::new(MAX_BODY_BYTES))
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(DefaultMakeSpan::new().level(Level::INFO))
                .on_response(DefaultOnResponse::new().level(Level::INFO)),
        )
}

/// Serve `state` on `listener` until `shutdown` resolves, then drain.
///
/// Once the signal fires no new jobs are admitted and the listener stops
/// accepting connections. After in-flight requests are answered, every
/// admitted job is awaited and the retention sweeper is stopped.
pub async fn run(
    listener: TcpListener,
    state: Arc<AppState>,
    shutdown: impl Future<Output = ()> + Send + 'static,
) -> anyhow::Result<()> {
    let addr = listener.local_addr()?;
    tracing::info!(%addr, base_path = %state.base_path, "HTTP server listening");

    let signalled = Arc::clone(&state);
    let served = axum::serve(listener, app(Arc::clone(&state)))
        .with_graceful_shutdown(async move {
            shutdown.await;
            tracing::info!("Graceful shutdown started");
            signalled.service.stop_admitting();
        })
        .await
        .context("HTTP server failed");

    state.service.shutdown().await;
    tracing::info!("Graceful shutdown finished");

    served
}
