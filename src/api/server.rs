//! itdash upload server
//!
//! HTTP surface over the four dashboard transforms. Each POST takes the
//! workbooks as multipart fields and answers with the rendered workbook.

use std::net::SocketAddr;
use std::sync::Arc;

use axum::{
    extract::DefaultBodyLimit,
    routing::{get, post},
    Router,
};
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::{info, warn};

use super::handlers;
use crate::config::DashboardConfig;

/// Largest accepted request body (all uploaded workbooks together)
pub const MAX_UPLOAD_BYTES: usize = 64 * 1024 * 1024;

/// API Server configuration
#[derive(Debug, Clone)]
pub struct ApiConfig {
    pub host: String,
    pub port: u16,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 8080,
        }
    }
}

/// Shared application state
///
/// Only the immutable vocabularies are shared; every request builds its
/// own workbook state.
#[derive(Debug, Clone)]
pub struct AppState {
    pub version: String,
    pub config: Arc<DashboardConfig>,
}

impl AppState {
    pub fn new(config: DashboardConfig) -> Self {
        Self {
            version: env!("CARGO_PKG_VERSION").to_string(),
            config: Arc::new(config),
        }
    }
}

/// Build the router with all endpoints and middleware
pub fn router(state: Arc<AppState>) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/", get(handlers::root))
        .route("/health", get(handlers::health))
        .route("/version", get(handlers::version))
        .route("/api/v1/aging", post(handlers::aging))
        .route("/api/v1/cockpit", post(handlers::cockpit))
        .route("/api/v1/stability", post(handlers::stability))
        .route("/api/v1/toxic", post(handlers::toxic))
        .with_state(state)
        .layer(DefaultBodyLimit::max(MAX_UPLOAD_BYTES))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
}

/// Run the API server until SIGINT/SIGTERM
pub async fn run_api_server(config: ApiConfig, dashboards: DashboardConfig) -> anyhow::Result<()> {
    let app = router(Arc::new(AppState::new(dashboards)));

    let addr: SocketAddr = format!("{}:{}", config.host, config.port).parse()?;
    info!("📊 itdash server starting on http://{}", addr);
    info!("   Endpoints: /api/v1/aging, /api/v1/cockpit, /api/v1/stability, /api/v1/toxic");
    info!("   Health: /health, Version: /version");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("itdash server shutdown complete");
    Ok(())
}

/// Graceful shutdown signal handler
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            warn!("failed to listen for Ctrl+C: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                warn!("failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    info!("Shutdown signal received, stopping server...");
}
