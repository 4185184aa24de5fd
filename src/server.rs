use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::{Context, Result};
use axum::extract::State;
use axum::http::HeaderName;
use axum::response::IntoResponse;
use axum::routing::get;
use axum::{Json, Router};
use tower_http::cors::CorsLayer;
use tracing::info;

use crate::pipeline::Pipeline;

pub const TRAFFIC_ROUTE: &str = "/api/traffic-updates";

/// Response header telling callers whether the body is live or fallback data.
pub const REPORT_SOURCE_HEADER: HeaderName = HeaderName::from_static("x-report-source");

pub fn router(pipeline: Arc<Pipeline>) -> Router {
    Router::new()
        .route(TRAFFIC_ROUTE, get(traffic_updates))
        // Any origin, method and header, credentials included.
        .layer(CorsLayer::very_permissive())
        .with_state(pipeline)
}

/// Always 200: pipeline failures are answered with the fallback catalog.
async fn traffic_updates(State(pipeline): State<Arc<Pipeline>>) -> impl IntoResponse {
    let outcome = pipeline.run().await;
    (
        [(REPORT_SOURCE_HEADER, outcome.source.as_str())],
        Json(outcome.report),
    )
}

pub async fn serve(addr: SocketAddr, pipeline: Arc<Pipeline>) -> Result<()> {
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("Failed to bind {}", addr))?;
    info!("Serving {} on http://{}", TRAFFIC_ROUTE, listener.local_addr()?);

    axum::serve(listener, router(pipeline))
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server error")
}

async fn shutdown_signal() {
    if tokio::signal::ctrl_c().await.is_ok() {
        info!("Shutdown requested");
    }
}

// ── Tests ──
