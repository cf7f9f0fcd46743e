//! Web layer module
//!
//! HTTP facade over the size search and the blob store. Handlers stay thin:
//! they parse the request, hand the CPU-bound work to the blocking pool and
//! map typed errors onto status codes in [`responses`].
//!
//! # Routes
//!
//! - `GET  /api/health` - liveness and uptime
//! - `POST /api/compress` - multipart upload, returns a short-lived download link
//! - `GET  /api/download/{id}?token=...` - fetch a compressed result
//! - anything else under `/api` is a JSON 404; other paths serve the frontend

use anyhow::Result;
use axum::{
    Router,
    extract::DefaultBodyLimit,
    http::{HeaderValue, Method, header},
    routing::{get, post},
};
use chrono::{DateTime, Utc};
use std::net::SocketAddr;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tower::ServiceBuilder;
use tower_http::cors::CorsLayer;
use tower_http::services::{ServeDir, ServeFile};
use tower_http::trace::TraceLayer;
use tracing::{info, warn};

use crate::blob_store::BlobStore;
use crate::config::Config;

pub mod handlers;
pub mod responses;
pub mod utils;

/// Application state shared across all handlers
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub blob_store: Arc<dyn BlobStore>,
    pub start_time: DateTime<Utc>,
}

impl AppState {
    pub fn new(config: Arc<Config>, blob_store: Arc<dyn BlobStore>) -> Self {
        Self {
            config,
            blob_store,
            start_time: Utc::now(),
        }
    }
}

/// Web server configuration and setup
pub struct WebServer {
    app: Router,
    addr: SocketAddr,
}

impl WebServer {
    pub fn new(state: AppState) -> Result<Self> {
        let addr: SocketAddr = format!("{}:{}", state.config.web.host, state.config.web.port).parse()?;
        let app = create_router(state);

        Ok(Self { app, addr })
    }

    /// Serve until `cancellation_token` fires or the process receives
    /// SIGINT/SIGTERM, then drain in-flight requests
    pub async fn serve(self, cancellation_token: CancellationToken) -> Result<()> {
        let listener = tokio::net::TcpListener::bind(&self.addr)
            .await
            .map_err(|e| anyhow::anyhow!("Failed to bind to {}: {}", self.addr, e))?;

        info!("Server running on {}", self.addr);

        let shutdown_signal = async move {
            tokio::select! {
                _ = cancellation_token.cancelled() => {
                    info!("Web server received cancellation signal, shutting down gracefully");
                }
                _ = termination_signal() => {}
            }
        };

        axum::serve(listener, self.app)
            .with_graceful_shutdown(shutdown_signal)
            .await?;

        Ok(())
    }

    /// Get the host address
    pub fn host(&self) -> String {
        self.addr.ip().to_string()
    }

    /// Get the port number
    pub fn port(&self) -> u16 {
        self.addr.port()
    }
}

/// Build the full router: API routes, the static frontend and middleware
pub fn create_router(state: AppState) -> Router {
    let static_dir = state.config.web.static_dir.clone();
    let frontend = ServeDir::new(&static_dir).fallback(ServeFile::new(static_dir.join("index.html")));

    Router::new()
        .nest("/api", api_routes())
        // Client-side routing: unknown paths get index.html
        .fallback_service(frontend)
        // Outermost first
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(cors_layer(&state.config.web.frontend_url))
                .layer(DefaultBodyLimit::max(state.config.web.max_request_size)),
        )
        .with_state(state)
}

fn api_routes() -> Router<AppState> {
    Router::new()
        .route("/health", get(handlers::health::health_check))
        .route("/compress", post(handlers::compress::compress_image))
        .route("/download/{id}", get(handlers::download::download_blob))
        .fallback(handlers::api_not_found)
}

/// CORS restricted to the configured frontend origin
fn cors_layer(frontend_url: &str) -> CorsLayer {
    let layer = CorsLayer::new()
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PUT,
            Method::DELETE,
            Method::OPTIONS,
        ])
        .allow_headers([
            header::ORIGIN,
            header::CONTENT_TYPE,
            header::ACCEPT,
            header::AUTHORIZATION,
        ])
        .allow_credentials(true);

    match HeaderValue::from_str(frontend_url.trim_end_matches('/')) {
        Ok(origin) => layer.allow_origin(origin),
        Err(e) => {
            warn!("Invalid frontend_url '{}' for CORS, no cross-origin requests will be allowed: {}", frontend_url, e);
            layer
        }
    }
}

async fn termination_signal() {
    #[cfg(unix)]
    {
        use tokio::signal::unix::{SignalKind, signal};

        match (signal(SignalKind::terminate()), signal(SignalKind::interrupt())) {
            (Ok(mut sigterm), Ok(mut sigint)) => {
                tokio::select! {
                    _ = sigterm.recv() => {
                        info!("Received SIGTERM, shutting down gracefully");
                    }
                    _ = sigint.recv() => {
                        info!("Received SIGINT (Ctrl+C), shutting down gracefully");
                    }
                }
            }
            _ => {
                warn!("Failed to install signal handlers, relying on cancellation only");
                std::future::pending::<()>().await;
            }
        }
    }

    #[cfg(not(unix))]
    {
        match tokio::signal::ctrl_c().await {
            Ok(()) => info!("Received Ctrl+C, shutting down gracefully"),
            Err(e) => {
                warn!("Failed to install Ctrl+C handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    }
}
