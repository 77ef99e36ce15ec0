use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use photier_core::{spawn_store, Config, Database, Photier, PhotierError};
use photier_net::{FeedClient, HttpExtractor};
use serde::Serialize;
use std::process::ExitCode;
use std::sync::Arc;

#[derive(Parser)]
#[command(name = "photier", about = "Photier face-similarity photo store")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// List stored photos
    List,
    /// Show a stored photo and the photos sharing a face with it
    Show {
        /// Photo ID
        id: i64,
    },
    /// Find stored photos sharing a face with an image URL (nothing is stored)
    Similar {
        /// Image URL (.jpg, .jpeg or .png)
        url: String,
    },
    /// Extract faces from an image URL and store the photo
    Add {
        /// Image URL (.jpg, .jpeg or .png)
        url: String,
    },
    /// Ingest the given URLs, or the configured feed when none are given
    Ingest {
        urls: Vec<String>,
    },
    /// Show photo and face counts
    Stats,
}

#[tokio::main]
async fn main() -> Result<ExitCode> {
    dotenv::dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    let config = Config::load().context("failed to load configuration")?;
    let matcher = config.matcher()?;
    let db = Database::open(&config.db_path, matcher)
        .with_context(|| format!("failed to open {}", config.db_path.display()))?;
    let photier = Photier::new(
        spawn_store(db)?,
        Arc::new(HttpExtractor::from_config(&config)?),
    );

    match cli.command {
        Commands::List => print(photier.list_photos().await),
        Commands::Show { id } => print(photier.photo_with_similar(id).await),
        Commands::Similar { url } => print(photier.similar_by_url(&url).await),
        Commands::Add { url } => print(photier.create_photo(&url).await),
        Commands::Ingest { urls } if urls.is_empty() => {
            let feed = FeedClient::from_config(&config)?
                .context("no URLs given and feed_url is not configured")?;
            print(photier.run_ingestion(&feed).await)
        }
        Commands::Ingest { urls } => print(photier.ingest_urls(urls).await),
        Commands::Stats => print(photier.stats().await),
    }
}

#[derive(Serialize)]
struct ErrorBody {
    error: photier_core::ErrorKind,
    message: String,
}

/// Pretty JSON on stdout; a failed operation prints its error kind instead
/// and exits non-zero.
fn print<T: Serialize>(result: Result<T, PhotierError>) -> Result<ExitCode> {
    match result {
        Ok(value) => {
            println!("{}", serde_json::to_string_pretty(&value)?);
            Ok(ExitCode::SUCCESS)
        }
        Err(e) => {
            let body = ErrorBody {
                error: e.kind(),
                message: e.to_string(),
            };
            println!("{}", serde_json::to_string_pretty(&body)?);
            Ok(ExitCode::FAILURE)
        }
    }
}
