pub mod config;
pub mod export;
pub mod fundamentals;
pub mod log;
pub mod metrics;
pub mod providers;
pub mod reference;
pub mod ui;

use anyhow::Result;
use std::path::Path;
use tracing::{debug, info};

/// Run the full export: load the reference table, then fetch and derive
/// metrics for every ticker, sector by sector. Only a reference-load or
/// output I/O failure aborts the run; per-ticker failures just shrink the
/// output.
pub async fn run(config_path: Option<&str>) -> Result<()> {
    info!("Sector fundamentals export starting...");

    let config = match config_path {
        Some(path) => config::AppConfig::load_from_path(path)?,
        None => config::AppConfig::load()?,
    };
    debug!("Loaded config: {config:#?}");

    // Load before touching the output directory, so a bad reference file
    // terminates the run with nothing written.
    let table = reference::ReferenceTable::load(&config.reference_path)?;

    let base_url = config
        .providers
        .yahoo
        .as_ref()
        .map_or(config::DEFAULT_YAHOO_BASE_URL, |p| &p.base_url);
    let provider = providers::yahoo_finance::YahooFundamentalsProvider::new(base_url);

    export::export_sectors(&table, &provider, Path::new(&config.output_dir)).await
}
