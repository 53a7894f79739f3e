//! MCP (Model Context Protocol) surface
//!
//! Exposes `search` and `ingest` as tools for AI agents. Served over stdio by
//! `kbae mcp`; stdout carries protocol traffic so logging stays on stderr.

pub mod server;

pub use server::{IngestToolParams, KnowledgeBaeMcpServer, SearchToolOutput, SearchToolParams};
