//! Fund performance statistics.
//!
//! Provides total return, annualized volatility, CAGR and Sharpe ratio
//! calculations over a [`PriceSeries`].

use crate::types::{PricePoint, PriceSeries, StatisticsResult};
use crate::{Error, Result};

/// Trading days used to annualize daily returns.
pub const TRADING_DAYS_PER_YEAR: f64 = 252.0;

/// Calendar days per year used by CAGR (accounts for leap years).
pub const DAYS_PER_YEAR: f64 = 365.25;

/// Price points needed for any statistic.
const MIN_POINTS: usize = 2;

/// Price points needed for volatility and Sharpe ratio (two daily returns).
const MIN_POINTS_FOR_DISPERSION: usize = 3;

/// Total return between two prices as a fraction (0.25 for 25%).
pub fn total_return(first_price: f64, last_price: f64) -> f64 {
    last_price / first_price - 1.0
}

/// Simple returns between consecutive prices: `p[i] / p[i-1] - 1`.
pub fn daily_returns(prices: &[f64]) -> Vec<f64> {
    prices.windows(2).map(|w| w[1] / w[0] - 1.0).collect()
}

/// Calculate annualized volatility from prices.
///
/// Sample standard deviation (divide by `n - 1`) of the daily returns,
/// scaled by `sqrt(252)`.
///
/// # Errors
///
/// [`Error::InsufficientData`] for fewer than 3 prices.
pub fn annualized_volatility(prices: &[f64]) -> Result<f64> {
    require_points("volatility", prices.len(), MIN_POINTS_FOR_DISPERSION)?;
    Ok(volatility_of_returns(&daily_returns(prices)))
}

/// Calculate the Sharpe ratio from prices.
///
/// # Arguments
///
/// * `prices` - Prices in date order
/// * `risk_free_rate` - Annual risk-free rate (e.g., 0.04 for 4%)
///
/// # Returns
///
/// `(mean(r) * 252 - risk_free_rate) / volatility`, or `None` when the
/// volatility is zero.
pub fn sharpe_ratio(prices: &[f64], risk_free_rate: f64) -> Result<Option<f64>> {
    require_points("sharpe ratio", prices.len(), MIN_POINTS_FOR_DISPERSION)?;
    let returns = daily_returns(prices);
    let volatility = volatility_of_returns(&returns);
    Ok(sharpe_from_returns(&returns, volatility, risk_free_rate))
}

/// Calculate Compound Annual Growth Rate between two observations.
///
/// `(last / first) ^ (365.25 / period_days) - 1`
///
/// # Errors
///
/// [`Error::DegenerateRange`] when both observations fall on the same day,
/// [`Error::InvalidRange`] when `last` precedes `first`, and
/// [`Error::NonFiniteResult`] when the growth rate overflows `f64`.
pub fn cagr(first: &PricePoint, last: &PricePoint) -> Result<f64> {
    let period_days = (last.date - first.date).num_days();
    if period_days == 0 {
        return Err(Error::DegenerateRange { date: first.date });
    }
    if period_days < 0 {
        return Err(Error::InvalidRange {
            start: first.date,
            end: last.date,
        });
    }

    let value = (last.price / first.price).powf(DAYS_PER_YEAR / period_days as f64) - 1.0;
    if !value.is_finite() {
        return Err(Error::NonFiniteResult { metric: "cagr" });
    }
    Ok(value)
}

fn require_points(metric: &'static str, points: usize, required: usize) -> Result<()> {
    if points < required {
        return Err(Error::InsufficientData {
            metric,
            points,
            required,
        });
    }
    Ok(())
}

fn mean(values: &[f64]) -> f64 {
    values.iter().sum::<f64>() / values.len() as f64
}

/// Annualized sample standard deviation. Needs at least two returns.
fn volatility_of_returns(returns: &[f64]) -> f64 {
    let mean = mean(returns);
    let variance =
        returns.iter().map(|r| (r - mean).powi(2)).sum::<f64>() / (returns.len() - 1) as f64;

    variance.sqrt() * TRADING_DAYS_PER_YEAR.sqrt()
}

/// Volatility at or below rounding noise for returns of this size counts as zero.
fn is_zero_volatility(volatility: f64, mean_return: f64) -> bool {
    let noise = f64::EPSILON * 16.0 * mean_return.abs().max(1.0) * TRADING_DAYS_PER_YEAR.sqrt();
    !volatility.is_finite() || volatility <= noise
}

fn sharpe_from_returns(returns: &[f64], volatility: f64, risk_free_rate: f64) -> Option<f64> {
    let mean_return = mean(returns);
    if is_zero_volatility(volatility, mean_return) {
        return None;
    }
    Some((mean_return * TRADING_DAYS_PER_YEAR - risk_free_rate) / volatility)
}

/// Computes [`StatisticsResult`]s from price series.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StatisticsEngine {
    risk_free_rate: f64,
}

impl Default for StatisticsEngine {
    fn default() -> Self {
        Self::new()
    }
}

impl StatisticsEngine {
    /// Engine with a zero risk-free rate.
    pub fn new() -> Self {
        Self {
            risk_free_rate: 0.0,
        }
    }

    /// Use an annual risk-free rate (e.g., 0.04 for 4%) in the Sharpe ratio.
    pub fn with_risk_free_rate(mut self, risk_free_rate: f64) -> Self {
        self.risk_free_rate = risk_free_rate;
        self
    }

    pub fn risk_free_rate(&self) -> f64 {
        self.risk_free_rate
    }

    /// Calculate all statistics for a series.
    ///
    /// Needs at least two points. With exactly two points, or with a
    /// zero-variance series for the Sharpe ratio, the dispersion based
    /// fields are `None` rather than an error. A CAGR too large for `f64`
    /// fails with [`Error::NonFiniteResult`].
    ///
    /// ```rust
    /// use chrono::NaiveDate;
    /// use tefas_core::{PricePoint, PriceSeries, StatisticsEngine};
    ///
    /// let day = |d| NaiveDate::from_ymd_opt(2022, 1, d).unwrap();
    /// let series = PriceSeries::from_points(vec![
    ///     PricePoint::new(day(1), 10.0).unwrap(),
    ///     PricePoint::new(day(2), 11.0).unwrap(),
    ///     PricePoint::new(day(3), 9.9).unwrap(),
    /// ])
    /// .unwrap();
    ///
    /// let stats = StatisticsEngine::new().compute(&series, "CPU").unwrap();
    /// assert!((stats.total_return + 0.01).abs() < 1e-12);
    /// assert_eq!(stats.period_days, 2);
    /// ```
    pub fn compute(&self, series: &PriceSeries, fund_code: &str) -> Result<StatisticsResult> {
        let fund_code = fund_code.trim();
        if fund_code.is_empty() {
            return Err(Error::InvalidFundCode {
                code: fund_code.to_string(),
                reason: "fund code is empty",
            });
        }

        let points = series.points();
        let (first, last) = match (points.first(), points.last()) {
            (Some(first), Some(last)) if points.len() >= MIN_POINTS => (first, last),
            _ => {
                return Err(Error::EmptySeries {
                    fund_code: fund_code.to_string(),
                    points: points.len(),
                })
            }
        };

        let prices = series.prices();
        let returns = daily_returns(&prices);

        let volatility = if prices.len() >= MIN_POINTS_FOR_DISPERSION {
            Some(volatility_of_returns(&returns))
        } else {
            tracing::debug!(
                "Volatility and Sharpe ratio undefined for {}: {} points",
                fund_code,
                prices.len()
            );
            None
        };
        let sharpe_ratio =
            volatility.and_then(|v| sharpe_from_returns(&returns, v, self.risk_free_rate));

        let min_price = prices.iter().copied().fold(f64::INFINITY, f64::min);
        let max_price = prices.iter().copied().fold(f64::NEG_INFINITY, f64::max);

        let result = StatisticsResult {
            fund_code: fund_code.to_string(),
            total_return: total_return(first.price, last.price),
            volatility,
            cagr: cagr(first, last)?,
            sharpe_ratio,
            period_days: (last.date - first.date).num_days(),
            observations: prices.len(),
            first_date: first.date,
            last_date: last.date,
            first_price: first.price,
            last_price: last.price,
            min_price,
            max_price,
            mean_price: mean(&prices),
        };

        tracing::debug!(
            "Statistics for {}: total return {:.4}, CAGR {:.4} over {} days",
            result.fund_code,
            result.total_return,
            result.cagr,
            result.period_days
        );
        Ok(result)
    }
}
