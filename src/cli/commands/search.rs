use anyhow::{Context, Result};
use comfy_table::Cell;
use serde::Serialize;

use crate::application::AppContext;
use crate::cli::output::{output, score_cell, single_line, table_with_header, truncate, CommandOutput};
use crate::domain::models::{Config, SearchRequest, SearchResult};

#[derive(Debug, Serialize)]
pub struct SearchOutput {
    pub query: String,
    pub results: Vec<SearchResult>,
}

impl CommandOutput for SearchOutput {
    fn to_human(&self) -> String {
        if self.results.is_empty() {
            return format!("No results for \"{}\".", self.query);
        }

        let mut table = table_with_header(&["#", "Score", "Text", "Reference"]);
        for (rank, result) in self.results.iter().enumerate() {
            let reference = match (&result.reference_description, &result.reference_link) {
                (Some(description), Some(link)) => format!("{description}\n{link}"),
                (Some(description), None) => description.clone(),
                (None, Some(link)) => link.clone(),
                (None, None) => "-".to_string(),
            };
            table.add_row(vec![
                Cell::new(rank + 1),
                score_cell(result.score),
                Cell::new(truncate(&single_line(&result.text), 80)),
                Cell::new(truncate(&reference, 60)),
            ]);
        }

        format!(
            "{table}\n\n{} result{} for \"{}\"",
            self.results.len(),
            if self.results.len() == 1 { "" } else { "s" },
            self.query
        )
    }
}

pub async fn execute(
    config: Config,
    query: String,
    k: Option<usize>,
    min_score: Option<f32>,
    json: bool,
) -> Result<()> {
    let context = AppContext::build(config, false).await?;

    let mut request = SearchRequest::new(query.clone());
    if let Some(k) = k {
        request = request.with_k(k);
    }
    if let Some(min_score) = min_score {
        request = request.with_min_score(min_score);
    }

    let results = context
        .retrieval
        .search(request)
        .await
        .context("Search failed")?;
    context.shutdown().await;

    output(&SearchOutput { query, results }, json);
    Ok(())
}
