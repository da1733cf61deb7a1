//! HTTP server for vote submission, ranking reads, health and metrics
//!
//! The router is built with Axum; browser clients are allowed through a
//! tower-http CORS layer restricted to the configured origins.

use crate::api::handlers::{
    alive_handler, entries_handler, health_handler, metrics_handler, ranking_handler,
    ready_handler, root_handler, vote_handler,
};
use crate::config::ServiceSettings;
use crate::service::app::AppState;
use anyhow::{Context, Result};
use axum::http::{header, HeaderValue, Method};
use axum::routing::{get, post};
use axum::Router;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::TcpListener;
use tokio::sync::watch;
use tower_http::cors::{AllowOrigin, Any, CorsLayer};
use tracing::{info, warn};

/// HTTP server bound to its listening socket
pub struct ApiServer {
    listener: TcpListener,
    allowed_origins: Vec<String>,
}

impl ApiServer {
    /// Bind the configured address
    pub async fn bind(settings: &ServiceSettings) -> Result<Self> {
        let addr: SocketAddr = format!("{}:{}", settings.http_host, settings.http_port)
            .parse()
            .context("Invalid HTTP server address")?;

        let listener = TcpListener::bind(addr)
            .await
            .with_context(|| format!("Failed to bind {}", addr))?;

        Ok(Self {
            listener,
            allowed_origins: settings.allowed_origins.clone(),
        })
    }

    pub fn local_addr(&self) -> Result<SocketAddr> {
        Ok(self.listener.local_addr()?)
    }

    /// Serve requests until `shutdown` turns true
    pub async fn serve(
        self,
        app_state: Arc<AppState>,
        mut shutdown: watch::Receiver<bool>,
    ) -> Result<()> {
        let addr = self.local_addr()?;
        let app = create_router(app_state).layer(cors_layer(&self.allowed_origins));

        info!("HTTP server listening on http://{}", addr);

        axum::serve(self.listener, app)
            .with_graceful_shutdown(async move {
                let _ = shutdown.wait_for(|stop| *stop).await;
                info!("HTTP server shutdown signal received");
            })
            .await?;

        info!("HTTP server stopped");
        Ok(())
    }
}

/// Create the Axum router with all endpoints
pub fn create_router(app_state: Arc<AppState>) -> Router {
    Router::new()
        .route("/", get(root_handler))
        .route("/api/vote", post(vote_handler))
        .route("/api/ranking", get(ranking_handler))
        .route("/api/entries", get(entries_handler))
        .route("/health", get(health_handler))
        .route("/ready", get(ready_handler))
        .route("/alive", get(alive_handler))
        .route("/metrics", get(metrics_handler))
        .with_state(app_state)
}

/// CORS policy for browser vote submission
pub fn cors_layer(allowed_origins: &[String]) -> CorsLayer {
    let layer = CorsLayer::new()
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers([header::CONTENT_TYPE]);

    if allowed_origins.iter().any(|origin| origin == "*") {
        return layer.allow_origin(Any);
    }

    let origins: Vec<HeaderValue> = allowed_origins
        .iter()
        .filter_map(|origin| match HeaderValue::from_str(origin) {
            Ok(value) => Some(value),
            Err(_) => {
                warn!("Ignoring invalid CORS origin: {}", origin);
                None
            }
        })
        .collect();

    layer.allow_origin(AllowOrigin::list(origins))
}
