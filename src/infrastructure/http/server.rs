//! HTTP server for the search API.

use std::future::Future;
use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::{Context, Result};
use axum::{
    routing::{get, post},
    Router,
};
use tokio::net::TcpListener;
use tower_http::trace::TraceLayer;

use super::handlers;
use crate::domain::ports::VectorStore;
use crate::services::{IngestionService, ResilientEmbedder, RetrievalService};

/// Shared handler state. Cloned per request, so everything sits behind `Arc`.
#[derive(Clone)]
pub struct AppState {
    pub retrieval: Arc<RetrievalService>,
    pub ingestion: Arc<IngestionService>,
    pub embedder: Arc<ResilientEmbedder>,
    pub store: Arc<dyn VectorStore>,
}

/// Build the router.
pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/", get(handlers::greeting))
        .route("/health", get(handlers::health))
        .route("/search", get(handlers::search))
        .route("/ingest", post(handlers::ingest))
        .with_state(state)
        .layer(TraceLayer::new_for_http())
}

/// Search HTTP server.
pub struct HttpServer {
    addr: SocketAddr,
    router: Router,
}

impl HttpServer {
    pub fn new(bind: &str, state: AppState) -> Result<Self> {
        let addr: SocketAddr = bind
            .parse()
            .with_context(|| format!("Invalid bind address: {bind}"))?;
        Ok(Self {
            addr,
            router: build_router(state),
        })
    }

    /// Start the server, stopping when `shutdown` resolves.
    pub async fn serve_with_shutdown<F>(self, shutdown: F) -> Result<()>
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let listener = TcpListener::bind(self.addr)
            .await
            .with_context(|| format!("Failed to bind {}", self.addr))?;

        tracing::info!(addr = %self.addr, "Knowledge Bae HTTP server listening");

        axum::serve(listener, self.router)
            .with_graceful_shutdown(shutdown)
            .await
            .context("HTTP server error")?;

        tracing::info!("HTTP server stopped");
        Ok(())
    }
}
