//! Infrastructure layer module
//!
//! This module contains all infrastructure adapters and external integrations:
//! - Embedding providers (OpenAI, Azure OpenAI, local hashing)
//! - Vector stores (pgvector with sqlx, in-memory)
//! - Database pool and migrations
//! - Configuration management
//! - Logging infrastructure
//! - HTTP server
//! - MCP server (stdio)
//!
//! Infrastructure implementations satisfy the port traits defined in the domain layer.

pub mod config;
pub mod database;
pub mod embeddings;
pub mod http;
pub mod logging;
pub mod mcp;
pub mod vector;
