use crate::fundamentals::{CompanySnapshot, FundamentalsProvider, RevenueSeries};
use tracing::{debug, warn};

/// Column order of every per-sector output file.
pub const CSV_HEADER: [&str; 16] = [
    "Ticker",
    "Company",
    "Exchange",
    "EPS",
    "P/E",
    "Beta",
    "Debt to Equity",
    "P/B",
    "EV/EBITDA",
    "ROE",
    "ROA",
    "Gross Profit Margin",
    "Revenue Growth Rate",
    "CAGR (5 years)",
    "CAGR (3 years)",
    "CAGR",
];

// Blend favors the longer horizon.
const BLEND_WEIGHT_3Y: f64 = 0.3;
const BLEND_WEIGHT_5Y: f64 = 0.7;

/// Revenue growth estimates derived from a [`RevenueSeries`].
///
/// All three fields share one "no estimate" representation: `None`. The
/// `N/A` text only appears at CSV serialization time.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct GrowthEstimate {
    pub cagr_5y: Option<f64>,
    pub cagr_3y: Option<f64>,
    pub blended: Option<f64>,
}

impl GrowthEstimate {
    /// Derive 5-year, 3-year and blended CAGR from an annual revenue series
    /// (most recent year first). Pure; no provider involvement.
    pub fn from_series(series: &RevenueSeries) -> Self {
        let cagr_5y = cagr(series.year(0), series.year(5), 5.0);
        let cagr_3y = cagr(series.year(0), series.year(3), 3.0);

        let blended = match (cagr_3y, cagr_5y) {
            (Some(c3), Some(c5)) => Some(BLEND_WEIGHT_3Y * c3 + BLEND_WEIGHT_5Y * c5),
            (None, Some(c5)) => Some(c5),
            (Some(c3), None) => Some(c3),
            (None, None) => None,
        };

        GrowthEstimate {
            cagr_5y,
            cagr_3y,
            blended,
        }
    }
}

/// Compound annual growth between the latest figure and one `years` back.
///
/// A missing or zero endpoint, a negative ratio, or a non-finite root all
/// yield no estimate; nothing non-real ever escapes.
fn cagr(latest: Option<f64>, base: Option<f64>, years: f64) -> Option<f64> {
    let (latest, base) = (latest?, base?);
    if latest == 0.0 || base == 0.0 {
        return None;
    }
    let ratio = latest / base;
    if ratio <= 0.0 {
        return None;
    }
    let rate = ratio.powf(1.0 / years) - 1.0;
    rate.is_finite().then_some(rate)
}

/// One output row: a ticker's snapshot plus its derived growth estimates.
#[derive(Debug, Clone, PartialEq)]
pub struct MetricsRecord {
    pub ticker: String,
    pub snapshot: CompanySnapshot,
    pub growth: GrowthEstimate,
}

impl MetricsRecord {
    /// Serialize in [`CSV_HEADER`] order, rendering every absent value as
    /// the literal `N/A`.
    pub fn to_csv_row(&self) -> Vec<String> {
        let s = &self.snapshot;
        vec![
            self.ticker.clone(),
            na_or(&s.company_name),
            na_or(&s.exchange),
            na_or(&s.eps),
            na_or(&s.pe_ratio),
            na_or(&s.beta),
            na_or(&s.debt_to_equity),
            na_or(&s.price_to_book),
            na_or(&s.ev_to_ebitda),
            na_or(&s.return_on_equity),
            na_or(&s.return_on_assets),
            na_or(&s.gross_margin),
            na_or(&s.revenue_growth),
            na_or(&self.growth.cagr_5y),
            na_or(&self.growth.cagr_3y),
            na_or(&self.growth.blended),
        ]
    }
}

fn na_or<T: ToString>(value: &Option<T>) -> String {
    value
        .as_ref()
        .map_or_else(|| "N/A".to_string(), ToString::to_string)
}

/// Derive the full metrics record for one ticker.
///
/// Provider failures never escape this boundary: a failed snapshot fetch is
/// logged and yields no record; a failed revenue fetch still yields a record
/// whose growth columns come out as `N/A`. Callers treat `None` as a normal
/// outcome and move on.
pub async fn derive_metrics(
    ticker: &str,
    provider: &dyn FundamentalsProvider,
) -> Option<MetricsRecord> {
    let snapshot = match provider.fetch_snapshot(ticker).await {
        Ok(snapshot) => snapshot,
        Err(e) => {
            warn!("Error fetching data for {ticker}: {e}");
            return None;
        }
    };

    let series = match provider.fetch_revenue_series(ticker).await {
        Ok(series) => series,
        Err(e) => {
            debug!("No revenue history for {ticker}: {e}");
            RevenueSeries::default()
        }
    };

    let growth = GrowthEstimate::from_series(&series);

    Some(MetricsRecord {
        ticker: ticker.to_string(),
        snapshot,
        growth,
    })
}
