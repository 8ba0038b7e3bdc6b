use search_gateway::{
    api::{build_router, AppState},
    backend::MeilisearchClient,
    config::Config,
    logging, metrics,
};
use std::sync::Arc;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Pick up MEILISEARCH_URL and friends from a local .env
    let dotenv = dotenvy::dotenv();

    // Load configuration
    let config = Config::load().unwrap_or_else(|e| {
        eprintln!("Failed to load configuration: {}", e);
        eprintln!("Using default configuration");
        Config::default()
    });
    config.validate()?;

    logging::init_tracing(&config.observability)?;

    if let Ok(path) = dotenv {
        tracing::debug!(path = %path.display(), "Loaded environment file");
    }

    tracing::info!("Starting search gateway v{}", env!("CARGO_PKG_VERSION"));
    tracing::info!("Search backend: {}", config.backend.url);

    if config.observability.metrics_enabled {
        metrics::init_metrics()?;
    }

    let backend = Arc::new(MeilisearchClient::new(&config)?);
    let addr = format!("{}:{}", config.server.host, config.server.port);

    let state = AppState::new(config, backend);
    tracing::info!(
        tools = ?state.tools.definitions().iter().map(|t| t.name.as_str()).collect::<Vec<_>>(),
        "Tools registered"
    );
    let app = build_router(state);

    // Start HTTP server
    let listener = tokio::net::TcpListener::bind(&addr).await?;

    tracing::info!("HTTP server listening on http://{}", addr);
    tracing::info!("   MCP endpoint: http://{}/mcp", addr);
    tracing::info!("   REST tools: http://{}/v1/tools", addr);
    tracing::info!("   Health check: http://{}/health", addr);
    tracing::info!("Press Ctrl+C to shutdown");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    tracing::info!("Shutdown complete");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("Failed to listen for shutdown signal: {}", e);
        std::future::pending::<()>().await;
    }
    tracing::info!("Shutdown signal received");
}
