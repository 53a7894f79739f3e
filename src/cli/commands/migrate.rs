use anyhow::Result;
use serde::Serialize;

use crate::cli::output::{output, CommandOutput};
use crate::domain::models::{Config, StoreBackend};
use crate::infrastructure::database::DatabaseConnection;

#[derive(Debug, Serialize)]
pub struct MigrateOutput {
    pub applied: bool,
}

impl CommandOutput for MigrateOutput {
    fn to_human(&self) -> String {
        "Database migrations applied.".to_string()
    }
}

pub async fn execute(config: Config, json: bool) -> Result<()> {
    anyhow::ensure!(
        config.store.backend == StoreBackend::Postgres,
        "Migrations only apply to the postgres store backend"
    );

    let database = DatabaseConnection::new(&config.database).await?;
    database.migrate().await?;
    database.close().await;

    output(&MigrateOutput { applied: true }, json);
    Ok(())
}
