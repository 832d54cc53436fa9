//! In-memory store of previously built price series.

use std::collections::HashMap;

use chrono::NaiveDate;

use crate::types::{DateRange, FundCode, PriceSeries};

/// Series keyed by `(fund code, range)`, valid for a single platform day.
///
/// Every access takes the current date; when it differs from the day the
/// entries were stored on, the whole store is dropped first, since a new
/// trading day can add or restate prices.
#[derive(Debug, Default)]
pub struct SeriesCache {
    as_of: Option<NaiveDate>,
    entries: HashMap<(FundCode, DateRange), PriceSeries>,
}

impl SeriesCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Look up a series stored earlier today.
    pub fn get(
        &mut self,
        fund_code: &FundCode,
        range: &DateRange,
        today: NaiveDate,
    ) -> Option<PriceSeries> {
        self.roll_to(today);
        self.entries.get(&(fund_code.clone(), *range)).cloned()
    }

    /// Store a series built today.
    pub fn insert(
        &mut self,
        fund_code: FundCode,
        range: DateRange,
        series: PriceSeries,
        today: NaiveDate,
    ) {
        self.roll_to(today);
        self.entries.insert((fund_code, range), series);
    }

    /// Drop every entry for one fund.
    pub fn invalidate(&mut self, fund_code: &FundCode) {
        self.entries.retain(|(code, _), _| code != fund_code);
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    fn roll_to(&mut self, today: NaiveDate) {
        if self.as_of == Some(today) {
            return;
        }
        if !self.entries.is_empty() {
            tracing::debug!("Dropping {} cached series from {:?}", self.entries.len(), self.as_of);
            self.clear();
        }
        self.as_of = Some(today);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::PricePoint;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn sample() -> (FundCode, DateRange, PriceSeries) {
        let code = FundCode::parse("CPU").unwrap();
        let range = DateRange::from_bounds(date(2024, 1, 1), date(2024, 1, 31));
        let series =
            PriceSeries::from_points(vec![PricePoint::new(date(2024, 1, 2), 1.0).unwrap()])
                .unwrap();
        (code, range, series)
    }

    #[test]
    fn test_hit_on_same_day() {
        let (code, range, series) = sample();
        let today = date(2024, 2, 1);
        let mut cache = SeriesCache::new();

        assert!(cache.get(&code, &range, today).is_none());
        cache.insert(code.clone(), range, series.clone(), today);
        assert_eq!(cache.get(&code, &range, today), Some(series));
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn test_key_includes_range() {
        let (code, range, series) = sample();
        let today = date(2024, 2, 1);
        let mut cache = SeriesCache::new();
        cache.insert(code.clone(), range, series, today);

        let other = DateRange::from_bounds(date(2024, 1, 1), date(2024, 1, 30));
        assert!(cache.get(&code, &other, today).is_none());
    }

    #[test]
    fn test_new_day_invalidates() {
        let (code, range, series) = sample();
        let mut cache = SeriesCache::new();
        cache.insert(code.clone(), range, series, date(2024, 2, 1));

        assert!(cache.get(&code, &range, date(2024, 2, 2)).is_none());
        assert!(cache.is_empty());
    }

    #[test]
    fn test_clear() {
        let (code, range, series) = sample();
        let today = date(2024, 2, 1);
        let mut cache = SeriesCache::new();
        cache.insert(code.clone(), range, series, today);

        cache.clear();
        assert!(cache.is_empty());
        assert!(cache.get(&code, &range, today).is_none());
    }

    #[test]
    fn test_invalidate_fund() {
        let (code, range, series) = sample();
        let today = date(2024, 2, 1);
        let other = FundCode::parse("AAK").unwrap();
        let mut cache = SeriesCache::new();
        cache.insert(code.clone(), range, series.clone(), today);
        cache.insert(other.clone(), range, series, today);

        cache.invalidate(&code);
        assert!(cache.get(&code, &range, today).is_none());
        assert!(cache.get(&other, &range, today).is_some());
    }
}
