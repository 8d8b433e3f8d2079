use crate::fundamentals::FundamentalsProvider;
use crate::metrics::{self, CSV_HEADER};
use crate::reference::ReferenceTable;
use crate::ui;
use anyhow::{Context, Result};
use std::fs;
use std::path::Path;
use tracing::info;

/// Write one CSV of derived metrics per sector in the reference table.
///
/// Sectors run in the table's first-seen order, tickers in row order, one
/// provider call at a time. A ticker the engine produced no record for is
/// skipped without a row; the batch never aborts on a ticker.
pub async fn export_sectors(
    table: &ReferenceTable,
    provider: &dyn FundamentalsProvider,
    output_dir: &Path,
) -> Result<()> {
    fs::create_dir_all(output_dir).with_context(|| {
        format!(
            "Failed to create output directory: {}",
            output_dir.display()
        )
    })?;

    for sector in table.unique_sectors() {
        let tickers: Vec<&str> = table
            .rows_in_sector(sector)
            .iter()
            .map(|row| row.ticker.as_str())
            .collect();

        let output_path = output_dir.join(format!("{sector}.csv"));
        let mut writer = csv::Writer::from_path(&output_path)
            .with_context(|| format!("Failed to create output file: {}", output_path.display()))?;
        writer.write_record(CSV_HEADER)?;

        let pb = ui::new_progress_bar(tickers.len() as u64, true);
        pb.set_message(format!("Fetching data for {sector}"));

        let mut written = 0usize;
        for ticker in &tickers {
            if let Some(record) = metrics::derive_metrics(ticker, provider).await {
                writer.write_record(record.to_csv_row())?;
                written += 1;
            }
            pb.inc(1);
        }

        writer.flush()?;
        pb.finish_and_clear();

        info!(
            "Wrote {written}/{} tickers for {sector} to {}",
            tickers.len(),
            output_path.display()
        );
        println!(
            "{} {}",
            ui::style_text(sector, ui::StyleType::Title),
            ui::style_text(
                &format!("{written}/{} tickers", tickers.len()),
                ui::StyleType::Subtle
            )
        );
    }

    Ok(())
}
