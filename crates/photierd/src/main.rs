use anyhow::{Context, Result};
use chrono::Local;
use photier_core::{spawn_store, Config, Database, Photier};
use photier_net::{FeedClient, HttpExtractor};
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

mod scheduler;

#[tokio::main]
async fn main() -> Result<()> {
    dotenv::dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    tracing::info!("photierd starting");

    let config = Config::load().context("failed to load configuration")?;
    let matcher = config.matcher()?;
    let db = Database::open(&config.db_path, matcher)
        .with_context(|| format!("failed to open {}", config.db_path.display()))?;
    let store = spawn_store(db)?;
    let extractor = Arc::new(HttpExtractor::from_config(&config)?);
    let feed = FeedClient::from_config(&config)?
        .context("feed_url is not configured; nothing to ingest")?;
    let photier = Photier::new(store, extractor);

    tracing::info!(
        db = %config.db_path.display(),
        tolerance = matcher.tolerance(),
        ingest_at = %config.ingest_at,
        "photierd ready"
    );

    if config.ingest_on_start {
        run_batch(&photier, &feed).await;
    }

    loop {
        let now = Local::now();
        let next = scheduler::next_run_after(&now, config.ingest_at);
        let wait = (next - now).to_std().unwrap_or_default();
        tracing::info!(next = %next, "next ingestion scheduled");

        tokio::select! {
            _ = tokio::time::sleep(wait) => run_batch(&photier, &feed).await,
            res = tokio::signal::ctrl_c() => {
                res?;
                break;
            }
        }
    }

    tracing::info!("photierd shutting down");
    Ok(())
}

async fn run_batch(photier: &Photier, feed: &FeedClient) {
    match photier.run_ingestion(feed).await {
        Ok(report) => {
            tracing::info!(
                inserted = report.inserted,
                already_known = report.already_known,
                skipped = report.skipped.len(),
                failures = report.failures.len(),
                "ingestion batch finished"
            );
        }
        // A failed feed fetch only loses this run.
        Err(e) => tracing::error!(error = %e, "ingestion batch failed"),
    }
}
