use clap::Parser;
use clarion_core::storage::RedbStore;
use clarion_core::Store;
use clarion_engine::{commands, Config, Coordinator};
use clarion_model::{Completion, GeminiClient};
use std::sync::Arc;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader, BufWriter};
use tracing::{info, warn};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Logs go to stderr; stdout carries responses only
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::INFO.into()),
        )
        .init();

    let config = Config::parse();
    config.validate()?;

    info!("Starting clarion v{}", env!("CARGO_PKG_VERSION"));
    info!("Data: {:?}", config.data_dir);

    let store = Arc::new(RedbStore::open(config.db_path())?);
    let stats = store.stats()?;
    info!(
        "Database loaded: {} analyses, {} debate records",
        stats.article_count, stats.debate_count
    );

    let client: Option<Arc<dyn Completion>> = match &config.api_key {
        Some(key) => Some(Arc::new(GeminiClient::new(key.clone()))),
        None => {
            warn!("No API key configured; analyses will return neutral scores");
            None
        }
    };

    let coordinator = Coordinator::new(store, client);

    info!("Ready. Listening on stdio (one JSON request per line).");

    let stdin = tokio::io::stdin();
    let mut reader = BufReader::new(stdin).lines();
    let mut out = BufWriter::new(tokio::io::stdout());

    while let Some(line) = reader.next_line().await? {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }

        let response = commands::dispatch(&coordinator, line).await;
        let bytes = serde_json::to_vec(&response)?;
        out.write_all(&bytes).await?;
        out.write_all(b"\n").await?;
        out.flush().await?;
    }

    info!("Stdin closed. Shutting down.");
    Ok(())
}
