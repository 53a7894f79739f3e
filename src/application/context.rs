//! Composition root.
//!
//! Every component is constructed here with its dependencies passed in
//! explicitly; nothing below this layer looks anything up by itself.

use std::sync::Arc;

use anyhow::{Context, Result};
use tracing::info;

use crate::domain::models::{Config, StoreBackend};
use crate::domain::ports::{EmbeddingProvider, VectorStore};
use crate::infrastructure::database::DatabaseConnection;
use crate::infrastructure::embeddings::create_provider;
use crate::infrastructure::http::AppState;
use crate::infrastructure::vector::{MemoryVectorStore, PgVectorStore, TableName};
use crate::services::{Chunker, IngestionService, ResilientEmbedder, RetrievalService};

/// Fully wired application components.
pub struct AppContext {
    pub config: Config,
    pub embedder: Arc<ResilientEmbedder>,
    pub store: Arc<dyn VectorStore>,
    pub retrieval: Arc<RetrievalService>,
    pub ingestion: Arc<IngestionService>,
    database: Option<DatabaseConnection>,
}

impl AppContext {
    /// Build every component from a validated configuration.
    ///
    /// With the postgres backend this connects, optionally applies the
    /// migrations, then verifies the table matches `vector_dimensions`.
    pub async fn build(config: Config, run_migrations: bool) -> Result<Self> {
        let dimensions = config.search.vector_dimensions;
        let provider = create_provider(&config.embedding, dimensions)
            .context("Failed to create embedding provider")?;

        let (store, database) = match config.store.backend {
            StoreBackend::Memory => {
                info!(dimensions, "Using in-memory vector store");
                let store: Arc<dyn VectorStore> = Arc::new(MemoryVectorStore::new(dimensions));
                (store, None)
            }
            StoreBackend::Postgres => {
                let database = DatabaseConnection::new(&config.database).await?;
                if run_migrations {
                    database.migrate().await?;
                }
                let table = TableName::parse(&config.search.collection_name)?;
                let store = PgVectorStore::new(
                    database.pool().clone(),
                    table,
                    dimensions,
                    config.search.ef_search,
                );
                store
                    .verify_schema()
                    .await
                    .context("Vector table does not match configuration")?;
                let store: Arc<dyn VectorStore> = Arc::new(store);
                (store, Some(database))
            }
        };

        let mut context = Self::from_parts(config, provider, store)?;
        context.database = database;
        Ok(context)
    }

    /// Wire the services around an already constructed provider and store.
    pub fn from_parts(
        config: Config,
        provider: Arc<dyn EmbeddingProvider>,
        store: Arc<dyn VectorStore>,
    ) -> Result<Self> {
        anyhow::ensure!(
            provider.dimension() == store.dimensions(),
            "Embedding provider '{}' produces {} dimensions but the vector store expects {}",
            provider.name(),
            provider.dimension(),
            store.dimensions()
        );

        let chunker = Chunker::with_config(config.chunking.clone())?;
        let embedder = Arc::new(ResilientEmbedder::new(provider, &config.resilience));
        let retrieval = Arc::new(RetrievalService::new(
            Arc::clone(&embedder),
            Arc::clone(&store),
            &config.search,
        ));
        let ingestion = Arc::new(IngestionService::new(
            chunker,
            Arc::clone(&embedder),
            Arc::clone(&store),
            config.resilience.max_concurrency,
        ));

        info!(
            provider = embedder.provider_name(),
            dimensions = store.dimensions(),
            max_concurrency = config.resilience.max_concurrency,
            "Application context ready"
        );

        Ok(Self {
            config,
            embedder,
            store,
            retrieval,
            ingestion,
            database: None,
        })
    }

    /// Handler state for the HTTP server
    pub fn http_state(&self) -> AppState {
        AppState {
            retrieval: Arc::clone(&self.retrieval),
            ingestion: Arc::clone(&self.ingestion),
            embedder: Arc::clone(&self.embedder),
            store: Arc::clone(&self.store),
        }
    }

    /// Close the database pool, if any.
    pub async fn shutdown(&self) {
        if let Some(database) = &self.database {
            database.close().await;
        }
    }
}
