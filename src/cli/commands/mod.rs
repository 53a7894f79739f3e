//! CLI command implementations.

pub mod ingest;
pub mod mcp;
pub mod migrate;
pub mod search;
pub mod serve;
pub mod status;
