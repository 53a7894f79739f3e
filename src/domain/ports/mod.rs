//! Port trait definitions (Hexagonal Architecture)
//!
//! This module defines async trait interfaces that infrastructure adapters must implement:
//! - EmbeddingProvider: text to vector conversion
//! - VectorStore: chunk persistence and nearest-neighbour queries
//!
//! These traits define the contracts that allow the domain to be independent
//! of specific infrastructure implementations.

pub mod embedding;
pub mod vector_store;

pub use embedding::EmbeddingProvider;
pub use vector_store::VectorStore;
