//! Raw price row retrieval.
//!
//! A [`RawFetcher`] is the only boundary to the data platform. It returns rows
//! exactly as the platform delivers them; cleaning happens in
//! [`SeriesBuilder`](crate::SeriesBuilder).

mod tefas;

pub use tefas::{parse_history_json, request_windows, TefasConfig, TefasFetcher};

use serde::{Deserialize, Serialize};

use crate::types::{DateRange, FundCode};

/// A loosely typed date/price row from the platform.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RawRow {
    /// Date text, `YYYY-MM-DD` or `DD.MM.YYYY`
    pub date: String,
    /// Price text, possibly empty or malformed
    pub price: String,
}

impl RawRow {
    pub fn new(date: impl Into<String>, price: impl Into<String>) -> Self {
        Self {
            date: date.into(),
            price: price.into(),
        }
    }
}

/// Failures reported by a fetcher. Passed through to callers unchanged.
#[derive(Debug, thiserror::Error)]
pub enum FetchError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Request failed with status {status}: {body}")]
    Status { status: u16, body: String },

    #[error("Could not decode response: {0}")]
    Decode(#[from] serde_json::Error),

    #[error("Platform error: {0}")]
    Upstream(String),

    #[error("{0}")]
    Other(String),
}

/// Source of raw price rows for a fund over a date range.
///
/// One synchronous call per request; retries and timeouts are the
/// implementor's business.
pub trait RawFetcher {
    fn fetch(&self, fund_code: &FundCode, range: &DateRange) -> Result<Vec<RawRow>, FetchError>;
}

impl<F> RawFetcher for F
where
    F: Fn(&FundCode, &DateRange) -> Result<Vec<RawRow>, FetchError>,
{
    fn fetch(&self, fund_code: &FundCode, range: &DateRange) -> Result<Vec<RawRow>, FetchError> {
        self(fund_code, range)
    }
}

/// Fetcher that returns a fixed set of rows regardless of fund or range.
#[derive(Debug, Clone, Default)]
pub struct StaticFetcher {
    rows: Vec<RawRow>,
}

impl StaticFetcher {
    pub fn new(rows: Vec<RawRow>) -> Self {
        Self { rows }
    }
}

impl RawFetcher for StaticFetcher {
    fn fetch(&self, _fund_code: &FundCode, _range: &DateRange) -> Result<Vec<RawRow>, FetchError> {
        Ok(self.rows.clone())
    }
}
