use anyhow::Result;

use crate::application::AppContext;
use crate::domain::models::Config;
use crate::infrastructure::http::HttpServer;

pub async fn execute(mut config: Config, migrate: bool, bind: Option<String>) -> Result<()> {
    if let Some(bind) = bind {
        config.server.bind = bind;
    }
    let bind = config.server.bind.clone();

    let context = AppContext::build(config, migrate).await?;
    let server = HttpServer::new(&bind, context.http_state())?;

    server
        .serve_with_shutdown(async {
            if let Err(e) = tokio::signal::ctrl_c().await {
                tracing::error!(error = %e, "Failed to listen for shutdown signal");
            }
            tracing::info!("Shutdown signal received");
        })
        .await?;

    context.shutdown().await;
    Ok(())
}
