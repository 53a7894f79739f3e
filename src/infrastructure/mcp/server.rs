use std::sync::Arc;

use rmcp::{
    handler::server::{tool::ToolRouter, wrapper::Parameters},
    model::{
        CallToolResult, Content, Implementation, InitializeResult, ProtocolVersion,
        ServerCapabilities,
    },
    schemars::JsonSchema,
    tool, tool_handler, tool_router, ErrorData, ServerHandler,
};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::domain::errors::{IngestionError, RetrievalError};
use crate::domain::models::{IngestionReport, SearchRequest, SearchResult};
use crate::services::{Document, IngestionService, RetrievalService};

type ServerInfo = InitializeResult;

const INSTRUCTIONS: &str = "Knowledge Bae MCP Server - semantic search over ingested documentation. \
     Use 'search' to find the passages closest in meaning to a query and 'ingest' to add a document.";

/// MCP server over the retrieval and ingestion services.
#[derive(Clone)]
pub struct KnowledgeBaeMcpServer {
    retrieval: Arc<RetrievalService>,
    ingestion: Arc<IngestionService>,
    tool_router: ToolRouter<Self>,
}

impl KnowledgeBaeMcpServer {
    #[must_use]
    pub fn new(retrieval: Arc<RetrievalService>, ingestion: Arc<IngestionService>) -> Self {
        Self {
            retrieval,
            ingestion,
            tool_router: Self::tool_router(),
        }
    }

    pub async fn run_search(&self, params: SearchToolParams) -> Result<SearchToolOutput, ErrorData> {
        let mut request = SearchRequest::new(params.query.clone());
        if let Some(k) = params.k {
            request = request.with_k(k);
        }
        if let Some(min_score) = params.min_score {
            request = request.with_min_score(min_score);
        }

        let results = self.retrieval.search(request).await.map_err(retrieval_error)?;
        Ok(SearchToolOutput {
            query: params.query,
            results,
        })
    }

    pub async fn run_ingest(&self, params: IngestToolParams) -> Result<IngestionReport, ErrorData> {
        let mut document = Document::new(params.text);
        if let Some(description) = params.reference_description {
            document = document.with_description(description);
        }
        if let Some(link) = params.reference_link {
            document = document.with_link(link);
        }

        let report = self.ingestion.ingest(document).await.map_err(ingestion_error)?;
        if report.failures.is_empty() {
            info!(chunks = report.chunk_ids.len(), "MCP ingest complete");
        } else {
            warn!(
                stored = report.chunk_ids.len(),
                failed = report.failures.len(),
                "MCP ingest completed with failures"
            );
        }
        Ok(report)
    }
}

/// Parameters for the `search` tool.
#[derive(Debug, Clone, Deserialize, JsonSchema)]
pub struct SearchToolParams {
    /// Natural-language query.
    pub query: String,
    /// Maximum number of results (server default when omitted).
    pub k: Option<usize>,
    /// Drop results scoring below this cosine similarity.
    pub min_score: Option<f32>,
}

/// Parameters for the `ingest` tool.
#[derive(Debug, Clone, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct IngestToolParams {
    /// Document text to chunk, embed and store.
    pub text: String,
    /// Short description stored with every chunk.
    pub reference_description: Option<String>,
    /// Link back to the source stored with every chunk.
    pub reference_link: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct SearchToolOutput {
    pub query: String,
    pub results: Vec<SearchResult>,
}

fn retrieval_error(err: RetrievalError) -> ErrorData {
    match err {
        RetrievalError::InvalidQuery(message) => ErrorData::invalid_params(message, None),
        other => ErrorData::internal_error(other.to_string(), None),
    }
}

fn ingestion_error(err: IngestionError) -> ErrorData {
    match err {
        IngestionError::InvalidInput(message) => ErrorData::invalid_params(message, None),
    }
}

fn json_content(value: &impl Serialize) -> Result<CallToolResult, ErrorData> {
    let text = serde_json::to_string_pretty(value)
        .map_err(|e| ErrorData::internal_error(e.to_string(), None))?;
    Ok(CallToolResult::success(vec![Content::text(text)]))
}

#[tool_router]
impl KnowledgeBaeMcpServer {
    /// Semantic search over ingested chunks, ranked by cosine similarity.
    /// Returns JSON with the matching text, reference and score of each chunk.
    #[tool(name = "search")]
    async fn search(
        &self,
        params: Parameters<SearchToolParams>,
    ) -> Result<CallToolResult, ErrorData> {
        let output = self.run_search(params.0).await?;
        json_content(&output)
    }

    /// Split a document into chunks, embed them and store them for search.
    /// Returns the stored chunk ids and any chunks that failed.
    #[tool(name = "ingest")]
    async fn ingest(
        &self,
        params: Parameters<IngestToolParams>,
    ) -> Result<CallToolResult, ErrorData> {
        let report = self.run_ingest(params.0).await?;
        json_content(&report)
    }
}

#[tool_handler]
impl ServerHandler for KnowledgeBaeMcpServer {
    fn get_info(&self) -> ServerInfo {
        ServerInfo {
            protocol_version: ProtocolVersion::LATEST,
            capabilities: ServerCapabilities::builder().enable_tools().build(),
            server_info: Implementation {
                name: "knowledge-bae".into(),
                version: env!("CARGO_PKG_VERSION").into(),
                title: None,
                icons: None,
                website_url: None,
            },
            instructions: Some(INSTRUCTIONS.into()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::models::{ChunkingConfig, ResilienceConfig, SearchConfig};
    use crate::domain::ports::VectorStore;
    use crate::infrastructure::embeddings::LocalEmbeddingProvider;
    use crate::infrastructure::vector::MemoryVectorStore;
    use crate::services::{Chunker, ResilientEmbedder};
    use rmcp::model::ErrorCode;

    const DIMS: usize = 16;

    fn server() -> (KnowledgeBaeMcpServer, Arc<MemoryVectorStore>) {
        let store = Arc::new(MemoryVectorStore::new(DIMS));
        let embedder = Arc::new(ResilientEmbedder::new(
            Arc::new(LocalEmbeddingProvider::new(DIMS)),
            &ResilienceConfig::default(),
        ));
        let retrieval = RetrievalService::new(
            Arc::clone(&embedder),
            Arc::clone(&store) as Arc<dyn VectorStore>,
            &SearchConfig::default(),
        );
        let ingestion = IngestionService::new(
            Chunker::with_config(ChunkingConfig::with_max_chars(20)).unwrap(),
            embedder,
            Arc::clone(&store) as Arc<dyn VectorStore>,
            2,
        );
        (
            KnowledgeBaeMcpServer::new(Arc::new(retrieval), Arc::new(ingestion)),
            store,
        )
    }

    #[tokio::test]
    async fn test_ingest_then_search() {
        let (server, store) = server();

        let report = server
            .run_ingest(IngestToolParams {
                text: "The sky is blue.\n\nWater is wet.".to_string(),
                reference_description: Some("Facts".to_string()),
                reference_link: None,
            })
            .await
            .unwrap();
        assert_eq!(report.chunk_ids.len(), 2);
        assert!(report.failures.is_empty());
        assert_eq!(store.count().await.unwrap(), 2);

        let output = server
            .run_search(SearchToolParams {
                query: "The sky is blue.".to_string(),
                k: Some(1),
                min_score: None,
            })
            .await
            .unwrap();
        assert_eq!(output.results.len(), 1);
        assert!(output.results[0].text.contains("sky"));
        assert_eq!(output.results[0].reference_description.as_deref(), Some("Facts"));
    }

    #[tokio::test]
    async fn test_blank_query_is_invalid_params() {
        let (server, _) = server();

        let err = server
            .run_search(SearchToolParams {
                query: "   ".to_string(),
                k: None,
                min_score: None,
            })
            .await
            .unwrap_err();
        assert_eq!(err.code, ErrorCode::INVALID_PARAMS);
    }

    #[tokio::test]
    async fn test_empty_document_is_invalid_params() {
        let (server, store) = server();

        let err = server
            .run_ingest(IngestToolParams {
                text: String::new(),
                reference_description: None,
                reference_link: None,
            })
            .await
            .unwrap_err();
        assert_eq!(err.code, ErrorCode::INVALID_PARAMS);
        assert_eq!(store.count().await.unwrap(), 0);
    }

    #[test]
    fn test_server_info_and_tools() {
        let (server, _) = server();

        let info = server.get_info();
        assert_eq!(info.server_info.name, "knowledge-bae");
        assert!(info.capabilities.tools.is_some());

        let mut names: Vec<String> = server
            .tool_router
            .list_all()
            .into_iter()
            .map(|tool| tool.name.to_string())
            .collect();
        names.sort();
        assert_eq!(names, vec!["ingest", "search"]);
    }

    #[test]
    fn test_ingest_params_accept_camel_case() {
        let params: IngestToolParams = serde_json::from_value(serde_json::json!({
            "text": "Fire is hot.",
            "referenceLink": "https://example.com/fire"
        }))
        .unwrap();
        assert_eq!(params.reference_link.as_deref(), Some("https://example.com/fire"));
        assert!(params.reference_description.is_none());
    }
}
