use crate::api::{handlers, AppState};
use crate::mcp;
use axum::{
    routing::{get, post},
    Router,
};
use tower_http::{
    cors::CorsLayer,
    trace::{DefaultMakeSpan, DefaultOnResponse, TraceLayer},
};

/// Build the main API router
pub fn build_router(state: AppState) -> Router {
    Router::new()
        // Health endpoints
        .route("/health", get(handlers::health_check))
        .route("/health/live", get(handlers::health_check))
        .route("/health/ready", get(handlers::readiness_check))
        // Prometheus scrape endpoint
        .route("/metrics", get(handlers::metrics))
        // MCP JSON-RPC endpoint
        .route("/mcp", post(mcp::handle_mcp))
        // REST mirror of the tool surface
        .route("/v1/tools", get(handlers::list_tools))
        .route("/v1/tools/:name", post(handlers::call_tool))
        // Add state
        .with_state(state)
        // Add middleware
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(DefaultMakeSpan::new().include_headers(true))
                .on_response(DefaultOnResponse::new().include_headers(true)),
        )
        .layer(CorsLayer::permissive())
}
