mod search;
mod sources;

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

#[derive(Debug, Parser)]
#[command(name = "pricemesh")]
#[command(about = "Search every configured grocery source and compare prices")]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Run one search and print the response as JSON.
    Search {
        /// Product to search for, e.g. "amul milk".
        #[arg(long, short)]
        query: String,
        /// Latitude of the delivery location.
        #[arg(long, allow_negative_numbers = true)]
        lat: f64,
        /// Longitude of the delivery location.
        #[arg(long, allow_negative_numbers = true)]
        lon: f64,
        /// Print compact JSON on one line.
        #[arg(long)]
        compact: bool,
    },
    /// Validate the source registry and list its entries.
    Sources {
        /// Registry file; defaults to `PRICEMESH_SOURCES_PATH`.
        #[arg(long)]
        path: Option<PathBuf>,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    dotenvy::dotenv().ok();
    let config = pricemesh_core::load_app_config()?;
    let env_filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(config.log_level.clone()))?;
    // stdout carries the JSON result; logs go to stderr.
    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_writer(std::io::stderr)
        .init();

    match cli.command {
        Some(Commands::Search {
            query,
            lat,
            lon,
            compact,
        }) => search::run_search(&config, &query, lat, lon, compact).await?,
        Some(Commands::Sources { path }) => {
            let path = path.unwrap_or_else(|| config.sources_path.clone());
            sources::run_sources(&path)?;
        }
        None => println!("pricemesh: run with --help for usage"),
    }

    Ok(())
}
