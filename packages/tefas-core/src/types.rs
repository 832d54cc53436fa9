//! Core data types for TEFAS fund analysis.

use std::fmt;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::{Error, Result};

/// Shortest fund code the platform issues.
pub const MIN_FUND_CODE_LEN: usize = 2;
/// Longest fund code the platform issues.
pub const MAX_FUND_CODE_LEN: usize = 5;

/// A validated TEFAS fund code (uppercase, 2-5 ASCII alphanumerics).
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(transparent)]
pub struct FundCode(String);

impl FundCode {
    /// Parse a fund code, trimming surrounding whitespace and uppercasing.
    ///
    /// ```rust
    /// use tefas_core::FundCode;
    ///
    /// assert_eq!(FundCode::parse(" cpu ").unwrap().as_str(), "CPU");
    /// assert!(FundCode::parse("").is_err());
    /// assert!(FundCode::parse("C-PU").is_err());
    /// ```
    pub fn parse(input: &str) -> Result<Self> {
        let code = input.trim().to_uppercase();
        let invalid = |reason| Error::InvalidFundCode {
            code: input.to_string(),
            reason,
        };

        if code.is_empty() {
            return Err(invalid("fund code is empty"));
        }
        if !code.chars().all(|c| c.is_ascii_alphanumeric()) {
            return Err(invalid("fund code must be ASCII letters and digits only"));
        }
        if code.len() < MIN_FUND_CODE_LEN || code.len() > MAX_FUND_CODE_LEN {
            return Err(invalid("fund code must be 2 to 5 characters long"));
        }

        Ok(Self(code))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for FundCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// An inclusive calendar date window, checked by [`RangeResolver`](crate::RangeResolver).
///
/// Holds `start <= end`, `end <= today` and a span of at most five years at the
/// time it was resolved.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub struct DateRange {
    start: NaiveDate,
    end: NaiveDate,
}

impl DateRange {
    /// Build a range from bounds already known to satisfy the invariants.
    pub(crate) fn from_bounds(start: NaiveDate, end: NaiveDate) -> Self {
        debug_assert!(start <= end);
        Self { start, end }
    }

    pub fn start(&self) -> NaiveDate {
        self.start
    }

    pub fn end(&self) -> NaiveDate {
        self.end
    }

    /// Whether `date` lies within the range (both ends inclusive).
    pub fn contains(&self, date: NaiveDate) -> bool {
        self.start <= date && date <= self.end
    }

    /// Number of calendar days between start and end.
    pub fn span_days(&self) -> i64 {
        (self.end - self.start).num_days()
    }
}

impl fmt::Display for DateRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}..={}", self.start, self.end)
    }
}

/// A single daily price observation.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PricePoint {
    #[serde(rename = "Date")]
    pub date: NaiveDate,
    #[serde(rename = "Price")]
    pub price: f64,
}

impl PricePoint {
    /// Create a price point, rejecting non-positive or non-finite prices.
    pub fn new(date: NaiveDate, price: f64) -> Result<Self> {
        if !price.is_finite() || price <= 0.0 {
            return Err(Error::InvalidSeries {
                reason: format!("price {price} on {date} is not a positive number"),
            });
        }
        Ok(Self { date, price })
    }
}

/// Price observations in strictly ascending date order.
///
/// Serializes as a list of `{"Date", "Price"}` rows.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(try_from = "Vec<PricePoint>", into = "Vec<PricePoint>")]
pub struct PriceSeries {
    points: Vec<PricePoint>,
}

impl PriceSeries {
    /// Validate a caller-built table: dates strictly ascending, prices positive.
    pub fn from_points(points: Vec<PricePoint>) -> Result<Self> {
        for point in &points {
            PricePoint::new(point.date, point.price)?;
        }
        if let Some(pair) = points.windows(2).find(|w| w[0].date >= w[1].date) {
            return Err(Error::InvalidSeries {
                reason: format!(
                    "dates must be strictly ascending, found {} followed by {}",
                    pair[0].date, pair[1].date
                ),
            });
        }
        Ok(Self { points })
    }

    /// Wrap points that were sorted, deduplicated and filtered by the caller.
    pub(crate) fn from_sorted(points: Vec<PricePoint>) -> Self {
        debug_assert!(points.windows(2).all(|w| w[0].date < w[1].date));
        Self { points }
    }

    pub fn points(&self) -> &[PricePoint] {
        &self.points
    }

    pub fn iter(&self) -> std::slice::Iter<'_, PricePoint> {
        self.points.iter()
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    pub fn first(&self) -> Option<&PricePoint> {
        self.points.first()
    }

    pub fn last(&self) -> Option<&PricePoint> {
        self.points.last()
    }

    /// Prices in date order.
    pub fn prices(&self) -> Vec<f64> {
        self.points.iter().map(|p| p.price).collect()
    }

    /// Render as `Date,Price` CSV with a header row.
    pub fn to_csv(&self) -> String {
        let mut out = String::from("Date,Price\n");
        for point in &self.points {
            out.push_str(&format!("{},{}\n", point.date, point.price));
        }
        out
    }
}

impl TryFrom<Vec<PricePoint>> for PriceSeries {
    type Error = Error;

    fn try_from(points: Vec<PricePoint>) -> Result<Self> {
        Self::from_points(points)
    }
}

impl From<PriceSeries> for Vec<PricePoint> {
    fn from(series: PriceSeries) -> Self {
        series.points
    }
}

impl<'a> IntoIterator for &'a PriceSeries {
    type Item = &'a PricePoint;
    type IntoIter = std::slice::Iter<'a, PricePoint>;

    fn into_iter(self) -> Self::IntoIter {
        self.points.iter()
    }
}

/// Performance statistics derived from a price series.
///
/// Ratios are plain fractions (`0.15` means 15%). `volatility` and
/// `sharpe_ratio` are `None` when they cannot be computed meaningfully.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StatisticsResult {
    /// Fund the statistics belong to
    pub fund_code: String,
    /// Last price over first price, minus one
    pub total_return: f64,
    /// Annualized sample standard deviation of daily returns
    pub volatility: Option<f64>,
    /// Compound annual growth rate over the calendar period
    pub cagr: f64,
    /// Annualized mean return over annualized volatility
    pub sharpe_ratio: Option<f64>,
    /// Calendar days between first and last observation
    pub period_days: i64,
    /// Number of price observations
    pub observations: usize,
    pub first_date: NaiveDate,
    pub last_date: NaiveDate,
    pub first_price: f64,
    pub last_price: f64,
    pub min_price: f64,
    pub max_price: f64,
    pub mean_price: f64,
}

/// API response wrapper used by the command line output.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiResponse<T> {
    pub ok: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl<T> ApiResponse<T> {
    /// Create a successful response.
    pub fn ok(data: T) -> Self {
        Self {
            ok: true,
            data: Some(data),
            error: None,
        }
    }

    /// Create an error response.
    pub fn err(error: impl Into<String>) -> Self {
        Self {
            ok: false,
            data: None,
            error: Some(error.into()),
        }
    }
}
