use anyhow::{Result, anyhow};
use async_trait::async_trait;
use chrono::Utc;
use serde::Deserialize;
use tracing::{debug, instrument};

use crate::fundamentals::{CompanySnapshot, FundamentalsProvider, RevenueSeries};

const QUOTE_SUMMARY_MODULES: &str = "price,summaryDetail,defaultKeyStatistics,financialData";

// The timeseries endpoint wants an explicit window; ten years comfortably
// covers the six annual reports the growth math can use.
const REVENUE_WINDOW_YEARS: i64 = 10;

/// Yahoo Finance implementation of [`FundamentalsProvider`].
///
/// Snapshot data comes from the `quoteSummary` endpoint, revenue history
/// from the `fundamentals-timeseries` endpoint. No caching and no retries;
/// every call goes to the network.
pub struct YahooFundamentalsProvider {
    base_url: String,
}

impl YahooFundamentalsProvider {
    pub fn new(base_url: &str) -> Self {
        YahooFundamentalsProvider {
            base_url: base_url.to_string(),
        }
    }
}

#[derive(Deserialize, Debug)]
struct QuoteSummaryResponse {
    #[serde(rename = "quoteSummary")]
    quote_summary: QuoteSummaryResult,
}

#[derive(Deserialize, Debug)]
struct QuoteSummaryResult {
    result: Option<Vec<QuoteSummaryItem>>,
}

#[derive(Deserialize, Debug, Default)]
struct QuoteSummaryItem {
    price: Option<PriceModule>,
    #[serde(rename = "summaryDetail")]
    summary_detail: Option<SummaryDetailModule>,
    #[serde(rename = "defaultKeyStatistics")]
    key_statistics: Option<KeyStatisticsModule>,
    #[serde(rename = "financialData")]
    financial_data: Option<FinancialDataModule>,
}

#[derive(Deserialize, Debug, Default)]
struct PriceModule {
    #[serde(rename = "longName")]
    long_name: Option<String>,
    exchange: Option<String>,
}

#[derive(Deserialize, Debug, Default)]
struct SummaryDetailModule {
    #[serde(rename = "trailingPE")]
    trailing_pe: Option<RawValue>,
    beta: Option<RawValue>,
}

#[derive(Deserialize, Debug, Default)]
struct KeyStatisticsModule {
    #[serde(rename = "trailingEps")]
    trailing_eps: Option<RawValue>,
    #[serde(rename = "priceToBook")]
    price_to_book: Option<RawValue>,
    #[serde(rename = "enterpriseToEbitda")]
    enterprise_to_ebitda: Option<RawValue>,
}

#[derive(Deserialize, Debug, Default)]
struct FinancialDataModule {
    #[serde(rename = "debtToEquity")]
    debt_to_equity: Option<RawValue>,
    #[serde(rename = "returnOnEquity")]
    return_on_equity: Option<RawValue>,
    #[serde(rename = "returnOnAssets")]
    return_on_assets: Option<RawValue>,
    #[serde(rename = "grossMargins")]
    gross_margins: Option<RawValue>,
    #[serde(rename = "revenueGrowth")]
    revenue_growth: Option<RawValue>,
}

// Yahoo wraps numbers as {"raw": 1.23, "fmt": "1.23"}; "raw" itself can be
// absent on an otherwise present field.
#[derive(Deserialize, Debug)]
struct RawValue {
    raw: Option<f64>,
}

fn raw(value: &Option<RawValue>) -> Option<f64> {
    value.as_ref().and_then(|v| v.raw)
}

#[derive(Deserialize, Debug)]
struct TimeseriesResponse {
    timeseries: TimeseriesResult,
}

#[derive(Deserialize, Debug)]
struct TimeseriesResult {
    result: Option<Vec<TimeseriesItem>>,
}

#[derive(Deserialize, Debug, Default)]
struct TimeseriesItem {
    #[serde(rename = "annualTotalRevenue")]
    annual_total_revenue: Option<Vec<Option<RevenuePoint>>>,
}

#[derive(Deserialize, Debug)]
struct RevenuePoint {
    #[serde(rename = "reportedValue")]
    reported_value: Option<RawValue>,
}

#[async_trait]
impl FundamentalsProvider for YahooFundamentalsProvider {
    #[instrument(
        name = "YahooSnapshotFetch",
        skip(self),
        fields(ticker = %ticker)
    )]
    async fn fetch_snapshot(&self, ticker: &str) -> Result<CompanySnapshot> {
        let url = format!(
            "{}/v10/finance/quoteSummary/{}?modules={}",
            self.base_url, ticker, QUOTE_SUMMARY_MODULES
        );
        debug!("Requesting fundamentals snapshot from {}", url);

        let client = reqwest::Client::builder().user_agent("smx/1.0").build()?;
        let response = client
            .get(&url)
            .send()
            .await
            .map_err(|e| anyhow!("Request error: {} for ticker: {} URL: {}", e, ticker, url))?;

        let data = response.json::<QuoteSummaryResponse>().await?;
        let item = data
            .quote_summary
            .result
            .unwrap_or_default()
            .into_iter()
            .next()
            .ok_or_else(|| anyhow!("No fundamentals data found for ticker: {}", ticker))?;

        let price = item.price.unwrap_or_default();
        let detail = item.summary_detail.unwrap_or_default();
        let stats = item.key_statistics.unwrap_or_default();
        let financial = item.financial_data.unwrap_or_default();

        Ok(CompanySnapshot {
            company_name: price.long_name,
            exchange: price.exchange,
            eps: raw(&stats.trailing_eps),
            pe_ratio: raw(&detail.trailing_pe),
            beta: raw(&detail.beta),
            debt_to_equity: raw(&financial.debt_to_equity),
            price_to_book: raw(&stats.price_to_book),
            ev_to_ebitda: raw(&stats.enterprise_to_ebitda),
            return_on_equity: raw(&financial.return_on_equity),
            return_on_assets: raw(&financial.return_on_assets),
            gross_margin: raw(&financial.gross_margins),
            revenue_growth: raw(&financial.revenue_growth),
        })
    }

    #[instrument(
        name = "YahooRevenueFetch",
        skip(self),
        fields(ticker = %ticker)
    )]
    async fn fetch_revenue_series(&self, ticker: &str) -> Result<RevenueSeries> {
        let period2 = Utc::now().timestamp();
        let period1 = period2 - REVENUE_WINDOW_YEARS * 366 * 86_400;
        let url = format!(
            "{}/ws/fundamentals-timeseries/v1/finance/timeseries/{}?type=annualTotalRevenue&period1={}&period2={}",
            self.base_url, ticker, period1, period2
        );
        debug!("Requesting revenue history from {}", url);

        let client = reqwest::Client::builder().user_agent("smx/1.0").build()?;
        let response = client
            .get(&url)
            .send()
            .await
            .map_err(|e| anyhow!("Request error: {} for ticker: {} URL: {}", e, ticker, url))?;

        let text = response.text().await?;
        let data: TimeseriesResponse = serde_json::from_str(&text)
            .map_err(|e| anyhow!("Failed to parse JSON response for {}: {}", ticker, e))?;

        let item = data
            .timeseries
            .result
            .unwrap_or_default()
            .into_iter()
            .next()
            .ok_or_else(|| anyhow!("No revenue history found for ticker: {}", ticker))?;

        // The API reports oldest-first; the growth math indexes from the
        // most recent year.
        let mut values: Vec<Option<f64>> = item
            .annual_total_revenue
            .unwrap_or_default()
            .into_iter()
            .map(|point| point.and_then(|p| raw(&p.reported_value)))
            .collect();
        values.reverse();

        Ok(RevenueSeries::new(values))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    pub async fn create_snapshot_mock_server(ticker: &str, mock_response: &str) -> MockServer {
        let mock_server = MockServer::start().await;
        let request_path = format!("/v10/finance/quoteSummary/{ticker}");

        Mock::given(method("GET"))
            .and(path(request_path))
            .respond_with(ResponseTemplate::new(200).set_body_string(mock_response))
            .mount(&mock_server)
            .await;

        mock_server
    }

    pub async fn create_timeseries_mock_server(ticker: &str, mock_response: &str) -> MockServer {
        let mock_server = MockServer::start().await;
        let request_path = format!("/ws/fundamentals-timeseries/v1/finance/timeseries/{ticker}");

        Mock::given(method("GET"))
            .and(path(request_path))
            .respond_with(ResponseTemplate::new(200).set_body_string(mock_response))
            .mount(&mock_server)
            .await;

        mock_server
    }

    #[tokio::test]
    async fn test_successful_snapshot_fetch() {
        let mock_response = r#"{
            "quoteSummary": {
                "result": [{
                    "price": {
                        "longName": "Apple Inc.",
                        "exchange": "NMS"
                    },
                    "summaryDetail": {
                        "trailingPE": {"raw": 28.5},
                        "beta": {"raw": 1.25}
                    },
                    "defaultKeyStatistics": {
                        "trailingEps": {"raw": 6.42},
                        "priceToBook": {"raw": 44.6},
                        "enterpriseToEbitda": {"raw": 22.3}
                    },
                    "financialData": {
                        "debtToEquity": {"raw": 176.3},
                        "returnOnEquity": {"raw": 0.147},
                        "returnOnAssets": {"raw": 0.112},
                        "grossMargins": {"raw": 0.433},
                        "revenueGrowth": {"raw": 0.081}
                    }
                }],
                "error": null
            }
        }"#;

        let mock_server = create_snapshot_mock_server("AAPL", mock_response).await;
        let provider = YahooFundamentalsProvider::new(&mock_server.uri());

        let snapshot = provider.fetch_snapshot("AAPL").await.unwrap();
        assert_eq!(snapshot.company_name.as_deref(), Some("Apple Inc."));
        assert_eq!(snapshot.exchange.as_deref(), Some("NMS"));
        assert_eq!(snapshot.eps, Some(6.42));
        assert_eq!(snapshot.pe_ratio, Some(28.5));
        assert_eq!(snapshot.beta, Some(1.25));
        assert_eq!(snapshot.debt_to_equity, Some(176.3));
        assert_eq!(snapshot.price_to_book, Some(44.6));
        assert_eq!(snapshot.ev_to_ebitda, Some(22.3));
        assert_eq!(snapshot.return_on_equity, Some(0.147));
        assert_eq!(snapshot.return_on_assets, Some(0.112));
        assert_eq!(snapshot.gross_margin, Some(0.433));
        assert_eq!(snapshot.revenue_growth, Some(0.081));
    }

    #[tokio::test]
    async fn test_partial_snapshot_keeps_missing_fields_absent() {
        let mock_response = r#"{
            "quoteSummary": {
                "result": [{
                    "price": {
                        "longName": "Newly Listed Co"
                    },
                    "summaryDetail": {
                        "trailingPE": {}
                    }
                }]
            }
        }"#;

        let mock_server = create_snapshot_mock_server("NEWCO", mock_response).await;
        let provider = YahooFundamentalsProvider::new(&mock_server.uri());

        let snapshot = provider.fetch_snapshot("NEWCO").await.unwrap();
        assert_eq!(snapshot.company_name.as_deref(), Some("Newly Listed Co"));
        assert_eq!(snapshot.exchange, None);
        assert_eq!(snapshot.pe_ratio, None);
        assert_eq!(snapshot.eps, None);
        assert_eq!(snapshot.gross_margin, None);
    }

    #[tokio::test]
    async fn test_no_snapshot_data() {
        let mock_response = r#"{"quoteSummary": {"result": [], "error": null}}"#;
        let mock_server = create_snapshot_mock_server("INVALID", mock_response).await;
        let provider = YahooFundamentalsProvider::new(&mock_server.uri());

        let result = provider.fetch_snapshot("INVALID").await;
        assert!(result.is_err());
        assert_eq!(
            result.unwrap_err().to_string(),
            "No fundamentals data found for ticker: INVALID"
        );
    }

    #[tokio::test]
    async fn test_revenue_series_is_reversed_to_most_recent_first() {
        let mock_response = r#"{
            "timeseries": {
                "result": [{
                    "meta": {"symbol": ["AAPL"], "type": ["annualTotalRevenue"]},
                    "timestamp": [1514678400, 1546214400, 1577750400],
                    "annualTotalRevenue": [
                        {"asOfDate": "2017-12-31", "reportedValue": {"raw": 80.0}},
                        {"asOfDate": "2018-12-31", "reportedValue": {"raw": 90.0}},
                        {"asOfDate": "2019-12-31", "reportedValue": {"raw": 100.0}}
                    ]
                }]
            }
        }"#;

        let mock_server = create_timeseries_mock_server("AAPL", mock_response).await;
        let provider = YahooFundamentalsProvider::new(&mock_server.uri());

        let series = provider.fetch_revenue_series("AAPL").await.unwrap();
        assert_eq!(series.len(), 3);
        assert_eq!(series.year(0), Some(100.0));
        assert_eq!(series.year(2), Some(80.0));
        assert_eq!(series.year(3), None);
    }

    #[tokio::test]
    async fn test_revenue_series_preserves_null_years() {
        let mock_response = r#"{
            "timeseries": {
                "result": [{
                    "annualTotalRevenue": [
                        null,
                        {"asOfDate": "2018-12-31", "reportedValue": {"raw": 90.0}},
                        {"asOfDate": "2019-12-31", "reportedValue": {"raw": 100.0}}
                    ]
                }]
            }
        }"#;

        let mock_server = create_timeseries_mock_server("GAPPY", mock_response).await;
        let provider = YahooFundamentalsProvider::new(&mock_server.uri());

        let series = provider.fetch_revenue_series("GAPPY").await.unwrap();
        assert_eq!(series.len(), 3);
        assert_eq!(series.year(0), Some(100.0));
        assert_eq!(series.year(2), None);
    }

    #[tokio::test]
    async fn test_no_revenue_history() {
        let mock_response = r#"{"timeseries": {"result": []}}"#;
        let mock_server = create_timeseries_mock_server("INVALID", mock_response).await;
        let provider = YahooFundamentalsProvider::new(&mock_server.uri());

        let result = provider.fetch_revenue_series("INVALID").await;
        assert!(result.is_err());
        assert_eq!(
            result.unwrap_err().to_string(),
            "No revenue history found for ticker: INVALID"
        );
    }

    #[tokio::test]
    async fn test_malformed_timeseries_response() {
        let mock_response = r#"{"timeseries": "nope"}"#;
        let mock_server = create_timeseries_mock_server("BROKEN", mock_response).await;
        let provider = YahooFundamentalsProvider::new(&mock_server.uri());

        let result = provider.fetch_revenue_series("BROKEN").await;
        assert!(result.is_err());
        assert!(
            result
                .unwrap_err()
                .to_string()
                .contains("Failed to parse JSON response for BROKEN")
        );
    }
}
