//! Domain layer for the Knowledge Bae retrieval core
//!
//! This module contains core business logic and domain models.

pub mod errors;
pub mod models;
pub mod ports;

// Re-export error types for convenient access
pub use errors::{
    EmbeddingError, IngestionError, ResilienceError, RetrievalError, RetrievalResult, StoreError,
};
