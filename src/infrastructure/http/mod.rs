//! HTTP surface (axum)
//!
//! - `GET /` greeting
//! - `GET /health` breaker and store status
//! - `GET /search?query=&k=&min_score=` ranked chunks
//! - `POST /ingest` chunk, embed and store a document

pub mod handlers;
pub mod server;

pub use handlers::{
    ApiError, ErrorResponse, GreetingResponse, HealthResponse, IngestRequest, SearchParams,
};
pub use server::{build_router, AppState, HttpServer};
