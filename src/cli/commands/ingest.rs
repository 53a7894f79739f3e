use std::path::{Path, PathBuf};

use anyhow::Result;
use comfy_table::Cell;
use indicatif::ProgressBar;
use serde::Serialize;

use crate::application::AppContext;
use crate::cli::output::{create_progress_bar, output, table_with_header, truncate, CommandOutput};
use crate::domain::models::{Config, IngestionReport};
use crate::services::{Document, IngestionService};

/// Outcome for one ingested file.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FileReport {
    pub file: PathBuf,
    /// Set when the whole file was rejected (unreadable or unusable text)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(flatten)]
    pub report: IngestionReport,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct IngestOutput {
    pub files: Vec<FileReport>,
    pub total: IngestionReport,
}

impl IngestOutput {
    /// Files rejected as a whole.
    pub fn failed_files(&self) -> usize {
        self.files.iter().filter(|f| f.error.is_some()).count()
    }
}

impl CommandOutput for IngestOutput {
    fn to_human(&self) -> String {
        let mut lines = vec![format!(
            "Ingested {} of {} chunks from {} file{}",
            self.total.chunk_ids.len(),
            self.total.total_chunks,
            self.files.len(),
            if self.files.len() == 1 { "" } else { "s" }
        )];

        let failed: Vec<_> = self
            .files
            .iter()
            .flat_map(|f| f.report.failures.iter().map(move |failure| (&f.file, failure)))
            .collect();

        if !failed.is_empty() {
            let mut table = table_with_header(&["File", "Chunk", "Preview", "Reason"]);
            for (file, failure) in failed {
                table.add_row(vec![
                    Cell::new(file.display()),
                    Cell::new(failure.index),
                    Cell::new(&failure.preview),
                    Cell::new(truncate(&failure.reason, 60)),
                ]);
            }
            lines.push(format!("\nFailed chunks:\n{table}"));
        }

        let rejected: Vec<_> = self
            .files
            .iter()
            .filter_map(|f| f.error.as_ref().map(|e| (&f.file, e)))
            .collect();
        if !rejected.is_empty() {
            let mut table = table_with_header(&["File", "Error"]);
            for (file, error) in rejected {
                table.add_row(vec![Cell::new(file.display()), Cell::new(truncate(error, 80))]);
            }
            lines.push(format!("\nFailed files:\n{table}"));
        }

        lines.join("\n")
    }
}

fn default_description(path: &Path) -> String {
    path.file_name()
        .map_or_else(|| path.display().to_string(), |n| n.to_string_lossy().into_owned())
}

/// Ingest every file in order, recording file-level errors instead of
/// stopping at the first one.
pub async fn ingest_files(
    ingestion: &IngestionService,
    files: Vec<PathBuf>,
    description: Option<&str>,
    link: Option<&str>,
    progress: &ProgressBar,
) -> IngestOutput {
    let mut reports = Vec::with_capacity(files.len());
    let mut total = IngestionReport::default();

    for path in files {
        progress.set_message(path.display().to_string());

        let outcome = match tokio::fs::read_to_string(&path).await {
            Ok(text) => {
                let mut document = Document::new(text).with_description(
                    description.map_or_else(|| default_description(&path), ToString::to_string),
                );
                if let Some(link) = link {
                    document = document.with_link(link.to_string());
                }
                ingestion.ingest(document).await.map_err(|e| e.to_string())
            }
            Err(e) => Err(format!("Failed to read file: {e}")),
        };

        let file_report = match outcome {
            Ok(report) => {
                total.merge(report.clone());
                FileReport {
                    file: path,
                    error: None,
                    report,
                }
            }
            Err(error) => {
                tracing::warn!(file = %path.display(), %error, "File not ingested");
                FileReport {
                    file: path,
                    error: Some(error),
                    report: IngestionReport::default(),
                }
            }
        };
        reports.push(file_report);
        progress.inc(1);
    }

    IngestOutput {
        files: reports,
        total,
    }
}

pub async fn execute(
    config: Config,
    files: Vec<PathBuf>,
    description: Option<String>,
    link: Option<String>,
    json: bool,
) -> Result<()> {
    let context = AppContext::build(config, false).await?;
    let progress = create_progress_bar(files.len() as u64, json);

    let result = ingest_files(
        &context.ingestion,
        files,
        description.as_deref(),
        link.as_deref(),
        &progress,
    )
    .await;

    progress.finish_and_clear();
    context.shutdown().await;

    let failed_chunks = result.total.failures.len();
    let failed_files = result.failed_files();
    output(&result, json);

    if failed_chunks > 0 || failed_files > 0 {
        anyhow::bail!("{failed_chunks} chunk(s) and {failed_files} file(s) failed to ingest");
    }
    Ok(())
}
