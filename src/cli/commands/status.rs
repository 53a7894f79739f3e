use anyhow::{Context, Result};
use console::style;
use serde::Serialize;

use crate::application::AppContext;
use crate::cli::output::{output, CommandOutput};
use crate::domain::models::{Config, StoreBackend};
use crate::services::{CircuitState, CircuitStats};

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StatusOutput {
    pub provider: &'static str,
    pub store: StoreBackend,
    pub collection: String,
    pub dimensions: usize,
    pub chunk_count: u64,
    pub max_concurrency: usize,
    pub circuit: CircuitStats,
}

impl CommandOutput for StatusOutput {
    fn to_human(&self) -> String {
        let state = match self.circuit.state {
            CircuitState::Closed => style(self.circuit.state.as_str()).green(),
            CircuitState::HalfOpen => style(self.circuit.state.as_str()).yellow(),
            CircuitState::Open => style(self.circuit.state.as_str()).red().bold(),
        };

        [
            format!("Provider:        {}", self.provider),
            format!("Store:           {:?} ({})", self.store, self.collection),
            format!("Dimensions:      {}", self.dimensions),
            format!("Chunks:          {}", self.chunk_count),
            format!("Max concurrency: {}", self.max_concurrency),
            format!(
                "Circuit:         {state} (enabled: {}, opened {} time{})",
                self.circuit.enabled,
                self.circuit.open_count,
                if self.circuit.open_count == 1 { "" } else { "s" }
            ),
        ]
        .join("\n")
    }
}

pub async fn execute(config: Config, json: bool) -> Result<()> {
    let context = AppContext::build(config, false).await?;

    let status = StatusOutput {
        provider: context.embedder.provider_name(),
        store: context.config.store.backend,
        collection: context.config.search.collection_name.clone(),
        dimensions: context.store.dimensions(),
        chunk_count: context
            .store
            .count()
            .await
            .context("Failed to count chunks")?,
        max_concurrency: context.embedder.bulkhead().max_concurrency(),
        circuit: context.embedder.breaker().stats(),
    };
    context.shutdown().await;

    output(&status, json);
    Ok(())
}
