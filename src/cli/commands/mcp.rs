use std::sync::Arc;

use anyhow::{Context, Result};
use rmcp::ServiceExt;

use crate::application::AppContext;
use crate::domain::models::Config;
use crate::infrastructure::mcp::KnowledgeBaeMcpServer;

/// Serve MCP on stdin/stdout until the client disconnects.
pub async fn execute(config: Config, migrate: bool) -> Result<()> {
    let context = AppContext::build(config, migrate).await?;
    let server = KnowledgeBaeMcpServer::new(
        Arc::clone(&context.retrieval),
        Arc::clone(&context.ingestion),
    );

    tracing::info!("Starting MCP server on stdio");
    let service = server
        .serve(rmcp::transport::stdio())
        .await
        .context("Failed to start MCP server")?;
    service.waiting().await.context("MCP server stopped")?;

    context.shutdown().await;
    Ok(())
}
