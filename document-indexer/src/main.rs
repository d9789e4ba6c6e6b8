//! Document indexer entry point.

use tracing::{error, info};

use document_indexer::telemetry::init_tracing;
use document_indexer::{Dependencies, IndexingError, LogFormat, Settings};

async fn run() -> Result<(), IndexingError> {
    let settings = Settings::from_env()?;
    let mut dependencies = Dependencies::new(settings).await?;

    dependencies.orchestrator.run().await?;
    Ok(())
}

#[tokio::main]
async fn main() {
    dotenv::dotenv().ok();
    init_tracing(LogFormat::from_env());

    info!("Starting document indexer");

    if let Err(e) = run().await {
        error!(error = %e, "Document indexer failed");
        std::process::exit(1);
    }

    info!("Document indexer stopped");
}
