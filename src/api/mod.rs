//! Hearth HTTP API
//!
//! Dashboard-facing HTTP layer, built with Axum. The endpoint set follows
//! the generic JSON time-series datasource protocol:
//!
//! - `GET  /`            - connection probe
//! - `POST /search`      - metric label lookup
//! - `POST /query`       - evaluate query targets
//! - `POST /annotations` - annotations (empty)
//! - `POST /tag-keys`    - ad-hoc filter keys (empty)
//! - `POST /tag-values`  - ad-hoc filter values (empty)
//!
//! # Example
//!
//! ```rust,ignore
//! use hearth::api::{serve, ApiConfig, AppState};
//! use hearth::catalog::DEFAULT_CATALOG_TTL;
//! use hearth::hub::{HubClient, HubConfig};
//! use hearth::query::MetricResolver;
//! use std::sync::Arc;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let hub = Arc::new(HubClient::connect(HubConfig::default()).await?);
//!     let resolver = Arc::new(MetricResolver::new(hub, DEFAULT_CATALOG_TTL));
//!     let config = ApiConfig::default();
//!
//!     serve(AppState::new(resolver, config.clone()), &config).await?;
//!     Ok(())
//! }
//! ```

pub mod dto;
pub mod error;
pub mod routes;
pub mod state;

pub use error::{ApiError, ApiResult};
pub use state::{ApiConfig, AppState};

use axum::{
    routing::{get, post},
    Router,
};
use std::sync::Arc;
use tower_http::{cors::CorsLayer, trace::TraceLayer};

/// Build the API router with all routes and middleware
pub fn build_router(state: AppState) -> Router {
    let shared_state = Arc::new(state);

    Router::new()
        .route("/", get(routes::meta::root))
        .route("/search", post(routes::search::search_metrics))
        .route("/query", post(routes::query::query_metrics))
        .route("/annotations", post(routes::meta::annotations))
        .route("/tag-keys", post(routes::meta::tag_keys))
        .route("/tag-values", post(routes::meta::tag_values))
        .layer(TraceLayer::new_for_http())
        // Dashboards are browser apps on other origins; the original served
        // open CORS as well
        .layer(CorsLayer::permissive())
        .with_state(shared_state)
}

/// Start the API server
pub async fn serve(state: AppState, config: &ApiConfig) -> Result<(), ApiError> {
    let router = build_router(state);

    let addr = config.addr();
    let listener = tokio::net::TcpListener::bind(&addr).await?;

    tracing::info!("Hearth API listening on {}", addr);

    axum::serve(listener, router)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .map_err(|e| ApiError::Internal(format!("Server error: {}", e)))?;

    tracing::info!("Hearth API shut down gracefully");
    Ok(())
}

/// Wait for shutdown signal
async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("Failed to install signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    tracing::info!("Shutdown signal received, starting graceful shutdown");
}
