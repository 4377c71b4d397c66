use std::path::Path;

/// Loads and validates the source registry, then prints one line per source
/// in priority order.
///
/// # Errors
///
/// Returns an error if the file cannot be read or fails validation.
pub(crate) fn run_sources(path: &Path) -> anyhow::Result<()> {
    let registry = pricemesh_core::load_sources(path)?;

    let sources = registry.by_priority();

    println!("{} sources in {}", sources.len(), path.display());
    for source in sources {
        println!(
            "{:>3}  {:<16} {:<20} {:<10} {}",
            source.priority,
            source.id.as_str(),
            source.name,
            source.extractor.to_string(),
            source.search_url
        );
    }
    Ok(())
}
