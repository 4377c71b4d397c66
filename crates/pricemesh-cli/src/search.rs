//! One-shot search: the same fan-out the server runs, printed as JSON.

use pricemesh_core::{assemble_response, AppConfig, Coordinates, SearchVerdict};
use pricemesh_scraper::Orchestrator;

/// Runs a search against every configured source and prints the response
/// body to stdout.
///
/// # Errors
///
/// Returns an error if the coordinates are not finite, the registry cannot
/// be loaded, the orchestrator faults, or every source failed (after the
/// body has been printed).
pub(crate) async fn run_search(
    config: &AppConfig,
    query: &str,
    lat: f64,
    lon: f64,
    compact: bool,
) -> anyhow::Result<()> {
    let query = query.trim();
    anyhow::ensure!(!query.is_empty(), "query must not be empty");
    let coords = Coordinates::new(lat, lon)
        .ok_or_else(|| anyhow::anyhow!("lat and lon must be finite numbers"))?;

    let sources = pricemesh_core::load_sources(&config.sources_path)?;
    let orchestrator = Orchestrator::from_config(config, &sources)?;

    tracing::info!(query, sources = ?orchestrator.source_ids(), "running search");

    let outcome = orchestrator.search(query, coords).await?;
    let (verdict, body) = assemble_response(outcome.products, outcome.metadata);

    let json = if compact {
        serde_json::to_string(&body)?
    } else {
        serde_json::to_string_pretty(&body)?
    };
    println!("{json}");

    if verdict == SearchVerdict::AllSourcesFailed {
        anyhow::bail!(
            "{}",
            body.error.as_deref().unwrap_or("every source failed")
        );
    }
    Ok(())
}
