use anyhow::Result;
use async_trait::async_trait;

/// Point-in-time fundamentals for a single ticker.
///
/// Every field may be missing upstream; an absent field is `None`, never an
/// error. The ticker itself is carried separately by the caller.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CompanySnapshot {
    pub company_name: Option<String>,
    pub exchange: Option<String>,
    pub eps: Option<f64>,
    pub pe_ratio: Option<f64>,
    pub beta: Option<f64>,
    pub debt_to_equity: Option<f64>,
    pub price_to_book: Option<f64>,
    pub ev_to_ebitda: Option<f64>,
    pub return_on_equity: Option<f64>,
    pub return_on_assets: Option<f64>,
    pub gross_margin: Option<f64>,
    pub revenue_growth: Option<f64>,
}

/// Annual total revenue figures, most recent year first.
///
/// The series can be short or empty, and individual years can be null
/// upstream, so elements are optional as well.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RevenueSeries {
    values: Vec<Option<f64>>,
}

impl RevenueSeries {
    pub fn new(values: Vec<Option<f64>>) -> Self {
        RevenueSeries { values }
    }

    /// Revenue `years_back` annual reports ago; `0` is the latest. `None`
    /// past the end of the series or for a null year.
    pub fn year(&self, years_back: usize) -> Option<f64> {
        self.values.get(years_back).copied().flatten()
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

impl From<Vec<f64>> for RevenueSeries {
    fn from(values: Vec<f64>) -> Self {
        RevenueSeries {
            values: values.into_iter().map(Some).collect(),
        }
    }
}

#[async_trait]
pub trait FundamentalsProvider: Send + Sync {
    /// Fetch the current fundamentals snapshot for a ticker. Errs only when
    /// the provider has no usable data for the ticker at all; partial data
    /// comes back as a snapshot with `None` fields.
    async fn fetch_snapshot(&self, ticker: &str) -> Result<CompanySnapshot>;

    /// Fetch the annual revenue history for a ticker, most recent first.
    /// Errs when no revenue history exists for the ticker.
    async fn fetch_revenue_series(&self, ticker: &str) -> Result<RevenueSeries>;
}
