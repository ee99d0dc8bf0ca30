//! # HTTP Server
//!
//! Combines the record, health and observability routers behind CORS and a
//! request body limit, and serves them until a shutdown signal arrives.

use std::future::Future;
use std::io;
use std::net::SocketAddr;
use std::sync::Arc;

use axum::extract::DefaultBodyLimit;
use axum::routing::get;
use axum::Router;
use tokio::net::TcpListener;
use tower_http::cors::{AllowOrigin, Any, CorsLayer};

use super::config::HttpServerConfig;
use super::observability_routes::{health_routes, observability_routes};
use super::record_routes::{home_handler, record_routes};
use crate::library::Library;
use crate::observability::{log_event, log_event_with_fields, Event};

/// HTTP server for the song library
pub struct HttpServer {
    config: HttpServerConfig,
    router: Router,
}

impl HttpServer {
    /// Create a new HTTP server with default configuration
    pub fn new(library: Arc<Library>) -> Self {
        Self::with_config(HttpServerConfig::default(), library)
    }

    /// Create a new HTTP server with custom configuration
    pub fn with_config(config: HttpServerConfig, library: Arc<Library>) -> Self {
        let router = Self::build_router(&config, library);
        Self { config, router }
    }

    /// Build the combined router with all endpoints
    fn build_router(config: &HttpServerConfig, library: Arc<Library>) -> Router {
        let cors = if config.cors_origins.is_empty() {
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any)
        } else {
            let origins: Vec<_> = config
                .cors_origins
                .iter()
                .filter_map(|s| s.parse().ok())
                .collect();

            CorsLayer::new()
                .allow_origin(AllowOrigin::list(origins))
                .allow_methods(Any)
                .allow_headers(Any)
        };

        Router::new()
            .route("/", get(home_handler))
            .merge(health_routes())
            .nest("/observability", observability_routes(Arc::clone(&library)))
            .nest("/api", record_routes(library))
            .layer(DefaultBodyLimit::max(config.body_limit_bytes))
            .layer(cors)
    }

    /// Get the socket address
    pub fn socket_addr(&self) -> String {
        self.config.socket_addr()
    }

    /// Get the router (for testing)
    pub fn router(self) -> Router {
        self.router
    }

    /// Serve until Ctrl-C
    pub async fn start(self) -> Result<(), io::Error> {
        self.start_with_shutdown(ctrl_c()).await
    }

    /// Serve until `signal` resolves, then drain in-flight requests
    pub async fn start_with_shutdown<F>(self, signal: F) -> Result<(), io::Error>
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let addr: SocketAddr = self.config.socket_addr().parse().map_err(|e| {
            io::Error::new(
                io::ErrorKind::InvalidInput,
                format!("invalid socket address '{}': {}", self.config.socket_addr(), e),
            )
        })?;

        let listener = TcpListener::bind(addr).await?;
        let bound = listener.local_addr()?.to_string();
        log_event_with_fields(Event::Serving, &[("addr", &bound)]);

        axum::serve(listener, self.router)
            .with_graceful_shutdown(signal)
            .await?;

        log_event(Event::ShutdownComplete);
        Ok(())
    }
}

async fn ctrl_c() {
    // Without a signal handler the server runs until killed
    if tokio::signal::ctrl_c().await.is_err() {
        std::future::pending::<()>().await;
    }
    log_event(Event::ShutdownStart);
}
