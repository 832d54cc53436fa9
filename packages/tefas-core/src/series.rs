//! Turning raw platform rows into an ordered price series.

use std::collections::btree_map::Entry;
use std::collections::BTreeMap;

use chrono::NaiveDate;

use crate::fetch::{RawFetcher, RawRow};
use crate::types::{DateRange, FundCode, PricePoint, PriceSeries};
use crate::{Error, Result};

/// Date formats the platform has been seen to use.
const DATE_FORMATS: [&str; 2] = ["%Y-%m-%d", "%d.%m.%Y"];

/// Why a raw row was left out of the series.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Skip {
    BadDate,
    BadPrice,
    NonPositive,
    OutOfRange,
    Duplicate,
}

#[derive(Debug, Default)]
struct SkipCounts {
    bad_date: usize,
    bad_price: usize,
    non_positive: usize,
    out_of_range: usize,
    duplicate: usize,
}

impl SkipCounts {
    fn record(&mut self, skip: Skip) {
        match skip {
            Skip::BadDate => self.bad_date += 1,
            Skip::BadPrice => self.bad_price += 1,
            Skip::NonPositive => self.non_positive += 1,
            Skip::OutOfRange => self.out_of_range += 1,
            Skip::Duplicate => self.duplicate += 1,
        }
    }

    fn total(&self) -> usize {
        self.bad_date + self.bad_price + self.non_positive + self.out_of_range + self.duplicate
    }
}

/// Builds a [`PriceSeries`] from whatever a [`RawFetcher`] returns.
///
/// Rows with an unreadable date, an unreadable or non-positive price, or a
/// date outside the requested range are dropped. For repeated dates the
/// first row in fetch order wins. Nothing is interpolated: days without
/// trading have no point.
#[derive(Debug, Clone)]
pub struct SeriesBuilder<F> {
    fetcher: F,
}

impl<F: RawFetcher> SeriesBuilder<F> {
    pub fn new(fetcher: F) -> Self {
        Self { fetcher }
    }

    /// Fetch and clean the series for `fund_code` over `range`.
    ///
    /// Fails with [`Error::InvalidFundCode`] before any fetch, passes fetch
    /// failures through as [`Error::Fetch`], and fails with
    /// [`Error::EmptySeries`] when no row survives cleaning.
    pub fn build(&self, fund_code: &str, range: DateRange) -> Result<PriceSeries> {
        let code = FundCode::parse(fund_code)?;
        self.build_for(&code, range)
    }

    /// Same as [`SeriesBuilder::build`] for an already validated code.
    pub fn build_for(&self, code: &FundCode, range: DateRange) -> Result<PriceSeries> {
        tracing::debug!("Requesting {} prices for {}", code, range);
        let rows = self.fetcher.fetch(code, &range)?;
        let fetched = rows.len();

        let (series, skipped) = clean_rows(rows, &range);

        if skipped.total() > 0 {
            tracing::info!(
                "Dropped {} of {} rows for {} \
                 (bad date {}, bad price {}, non-positive {}, out of range {}, duplicate {})",
                skipped.total(),
                fetched,
                code,
                skipped.bad_date,
                skipped.bad_price,
                skipped.non_positive,
                skipped.out_of_range,
                skipped.duplicate,
            );
        }

        if series.is_empty() {
            return Err(Error::EmptySeries {
                fund_code: code.to_string(),
                points: 0,
            });
        }

        tracing::info!("Prepared {} price points for {} in {}", series.len(), code, range);
        Ok(series)
    }
}

fn clean_rows(rows: Vec<RawRow>, range: &DateRange) -> (PriceSeries, SkipCounts) {
    let mut kept: BTreeMap<NaiveDate, f64> = BTreeMap::new();
    let mut skipped = SkipCounts::default();

    for row in rows {
        match parse_row(&row, range) {
            Ok((date, price)) => match kept.entry(date) {
                Entry::Vacant(slot) => {
                    slot.insert(price);
                }
                Entry::Occupied(_) => {
                    tracing::debug!("Skipping duplicate row for {}", date);
                    skipped.record(Skip::Duplicate);
                }
            },
            Err(skip) => {
                tracing::debug!("Skipping row {:?}: {:?}", row, skip);
                skipped.record(skip);
            }
        }
    }

    let points = kept
        .into_iter()
        .map(|(date, price)| PricePoint { date, price })
        .collect();

    (PriceSeries::from_sorted(points), skipped)
}

fn parse_row(row: &RawRow, range: &DateRange) -> std::result::Result<(NaiveDate, f64), Skip> {
    let date = parse_row_date(&row.date).ok_or(Skip::BadDate)?;
    let price = parse_price(&row.price).ok_or(Skip::BadPrice)?;
    if price <= 0.0 {
        return Err(Skip::NonPositive);
    }
    if !range.contains(date) {
        return Err(Skip::OutOfRange);
    }
    Ok((date, price))
}

fn parse_row_date(text: &str) -> Option<NaiveDate> {
    let text = text.trim();
    DATE_FORMATS
        .iter()
        .find_map(|format| NaiveDate::parse_from_str(text, format).ok())
}

/// Parse price text; accepts `.` or a single `,` as the decimal separator.
fn parse_price(text: &str) -> Option<f64> {
    let text = text.trim();
    if text.is_empty() {
        return None;
    }

    let value = if !text.contains('.') && text.matches(',').count() == 1 {
        text.replace(',', ".").parse::<f64>().ok()?
    } else {
        text.parse::<f64>().ok()?
    };

    value.is_finite().then_some(value)
}
