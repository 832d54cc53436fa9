//! TEFAS Core - Fund price history and performance statistics.
//!
//! This crate downloads daily price observations for a fund listed on TEFAS
//! (the Turkish fund data platform) and derives standard performance metrics:
//!
//! - **Range resolution**: caller dates checked against the five-year history window
//! - **Series building**: raw platform rows cleaned into an ordered price series
//! - **Statistics**: total return, annualized volatility, CAGR, Sharpe ratio
//!
//! # Example
//!
//! ```rust
//! use chrono::NaiveDate;
//! use tefas_core::{RawRow, StaticFetcher, Tefas};
//!
//! let fetcher = StaticFetcher::new(vec![
//!     RawRow::new("2024-01-02", "10.0"),
//!     RawRow::new("2024-01-03", "10.5"),
//!     RawRow::new("2024-01-04", "10.2"),
//! ]);
//! let today = NaiveDate::from_ymd_opt(2024, 6, 1).unwrap();
//! let tefas = Tefas::with_today(fetcher, today);
//!
//! let series = tefas.download("CPU", Some("2024-01-01"), None).unwrap();
//! assert_eq!(series.len(), 3);
//!
//! let stats = tefas.get_statistics(&series, "CPU").unwrap();
//! assert!((stats.total_return - 0.02).abs() < 1e-12);
//! ```

pub mod api;
pub mod cache;
pub mod fetch;
pub mod range;
pub mod series;
pub mod statistics;
pub mod types;

use chrono::NaiveDate;

// Re-export commonly used types
pub use types::{ApiResponse, DateRange, FundCode, PricePoint, PriceSeries, StatisticsResult};

// Re-export main functionality
pub use api::{download, get_statistics, popular_funds, Tefas};
pub use cache::SeriesCache;
pub use fetch::{FetchError, RawFetcher, RawRow, StaticFetcher, TefasConfig, TefasFetcher};
pub use range::{parse_date, platform_today, RangeResolver, MAX_HISTORY_YEARS};
pub use series::SeriesBuilder;
pub use statistics::{StatisticsEngine, TRADING_DAYS_PER_YEAR};

/// Error types for tefas-core operations.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("Invalid fund code {code:?}: {reason}")]
    InvalidFundCode { code: String, reason: &'static str },

    #[error("Invalid date {input:?}: expected YYYY-MM-DD")]
    InvalidDate { input: String },

    #[error("Invalid range: start {start} is after end {end}")]
    InvalidRange { start: NaiveDate, end: NaiveDate },

    #[error("Range too long: {start} to {end} exceeds {max_years} years of history")]
    RangeTooLong {
        start: NaiveDate,
        end: NaiveDate,
        max_years: u32,
    },

    #[error("Range ends in the future: end {end} is after today {today}")]
    FutureRange { end: NaiveDate, today: NaiveDate },

    #[error("Empty series for {fund_code}: {points} usable price points")]
    EmptySeries { fund_code: String, points: usize },

    #[error("Insufficient data for {metric}: {points} points, need at least {required}")]
    InsufficientData {
        metric: &'static str,
        points: usize,
        required: usize,
    },

    #[error("Degenerate range: first and last observation both on {date}")]
    DegenerateRange { date: NaiveDate },

    #[error("{metric} is not finite for this series")]
    NonFiniteResult { metric: &'static str },

    #[error("Invalid series: {reason}")]
    InvalidSeries { reason: String },

    #[error("Fetch error: {0}")]
    Fetch(#[from] FetchError),
}

/// Result type for tefas-core operations.
pub type Result<T> = std::result::Result<T, Error>;
