//! Programmatic entry points: download a fund's prices, compute its statistics.

use std::sync::{Mutex, MutexGuard, PoisonError};

use chrono::NaiveDate;

use crate::cache::SeriesCache;
use crate::fetch::{RawFetcher, TefasConfig, TefasFetcher};
use crate::range::RangeResolver;
use crate::series::SeriesBuilder;
use crate::statistics::StatisticsEngine;
use crate::types::{DateRange, FundCode, PriceSeries, StatisticsResult};
use crate::Result;

/// Well-known TEFAS funds (code, name).
pub const POPULAR_FUNDS: [(&str, &str); 10] = [
    ("CPU", "Garanti Portföy Teknoloji"),
    ("AAK", "Ak Portföy Konut Gayrimenkul"),
    ("AFA", "Ak Portföy Altın Katılım"),
    ("GAH", "Garanti Portföy Altın"),
    ("TKB", "Taksit Endeksi"),
    ("YAS", "Yapı Kredi Portföy Altın"),
    ("APE", "Ak Portföy Petrol"),
    ("GMF", "Garanti Portföy Büyüme"),
    ("GPB", "Garanti Portföy Birinci"),
    ("AEF", "Ak Portföy Enflasyon Korumalı"),
];

pub fn popular_funds() -> &'static [(&'static str, &'static str)] {
    &POPULAR_FUNDS
}

/// Fund price client: range resolution, series building and statistics
/// over one [`RawFetcher`].
#[derive(Debug)]
pub struct Tefas<F> {
    builder: SeriesBuilder<F>,
    engine: StatisticsEngine,
    today: Option<NaiveDate>,
    cache: Option<Mutex<SeriesCache>>,
}

impl<F: RawFetcher> Tefas<F> {
    /// Client that reads the platform date on every request.
    pub fn new(fetcher: F) -> Self {
        Self {
            builder: SeriesBuilder::new(fetcher),
            engine: StatisticsEngine::new(),
            today: None,
            cache: None,
        }
    }

    /// Client with a fixed "today".
    pub fn with_today(fetcher: F, today: NaiveDate) -> Self {
        Self {
            today: Some(today),
            ..Self::new(fetcher)
        }
    }

    /// Keep built series for the rest of the platform day.
    pub fn with_cache(mut self) -> Self {
        self.cache = Some(Mutex::new(SeriesCache::new()));
        self
    }

    pub fn with_engine(mut self, engine: StatisticsEngine) -> Self {
        self.engine = engine;
        self
    }

    fn resolver(&self) -> RangeResolver {
        self.today.map_or_else(RangeResolver::platform, RangeResolver::new)
    }

    /// Download the price series for `fund_code`.
    ///
    /// `start` and `end` are `YYYY-MM-DD`; `end` defaults to today and
    /// `start` to five years before `end`.
    pub fn download(
        &self,
        fund_code: &str,
        start: Option<&str>,
        end: Option<&str>,
    ) -> Result<PriceSeries> {
        let code = FundCode::parse(fund_code)?;
        let resolver = self.resolver();
        let range = resolver.resolve_str(start, end)?;
        self.download_range(&code, range, resolver.today())
    }

    /// Same as [`Tefas::download`] with typed dates.
    pub fn download_dates(
        &self,
        fund_code: &str,
        start: Option<NaiveDate>,
        end: Option<NaiveDate>,
    ) -> Result<PriceSeries> {
        let code = FundCode::parse(fund_code)?;
        let resolver = self.resolver();
        let range = resolver.resolve(start, end)?;
        self.download_range(&code, range, resolver.today())
    }

    fn download_range(
        &self,
        code: &FundCode,
        range: DateRange,
        today: NaiveDate,
    ) -> Result<PriceSeries> {
        if let Some(cache) = &self.cache {
            if let Some(series) = lock(cache).get(code, &range, today) {
                tracing::debug!("Using cached {} prices for {}", code, range);
                return Ok(series);
            }
        }

        let series = self.builder.build_for(code, range)?;

        if let Some(cache) = &self.cache {
            lock(cache).insert(code.clone(), range, series.clone(), today);
        }
        Ok(series)
    }

    /// Compute statistics for a series returned by [`Tefas::download`] or
    /// built with [`PriceSeries::from_points`].
    pub fn get_statistics(
        &self,
        series: &PriceSeries,
        fund_code: &str,
    ) -> Result<StatisticsResult> {
        self.engine.compute(series, fund_code)
    }
}

fn lock(cache: &Mutex<SeriesCache>) -> MutexGuard<'_, SeriesCache> {
    cache.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Download a fund's prices from TEFAS using [`TefasConfig::from_env`].
pub fn download(fund_code: &str, start: Option<&str>, end: Option<&str>) -> Result<PriceSeries> {
    let fetcher = TefasFetcher::new(TefasConfig::from_env())?;
    Tefas::new(fetcher).download(fund_code, start, end)
}

/// Compute statistics for a price series with a zero risk-free rate.
pub fn get_statistics(series: &PriceSeries, fund_code: &str) -> Result<StatisticsResult> {
    StatisticsEngine::new().compute(series, fund_code)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fetch::{FetchError, RawRow, StaticFetcher};
    use crate::Error;
    use std::cell::Cell;

    type FetchResult = std::result::Result<Vec<RawRow>, FetchError>;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn rows() -> Vec<RawRow> {
        vec![
            RawRow::new("2022-01-03", "9.9"),
            RawRow::new("2022-01-01", "10.0"),
            RawRow::new("2022-01-02", "11.0"),
        ]
    }

    #[test]
    fn test_download_and_statistics() {
        let tefas = Tefas::with_today(StaticFetcher::new(rows()), date(2022, 6, 1));
        let series = tefas.download("cpu", Some("2022-01-01"), Some("2022-01-31")).unwrap();
        assert_eq!(series.prices(), vec![10.0, 11.0, 9.9]);

        let stats = tefas.get_statistics(&series, "CPU").unwrap();
        assert!((stats.total_return + 0.01).abs() < 1e-12);
        assert_eq!(stats.period_days, 2);
        assert_eq!(stats, get_statistics(&series, "CPU").unwrap());
    }

    #[test]
    fn test_download_is_deterministic() {
        let tefas = Tefas::with_today(StaticFetcher::new(rows()), date(2022, 6, 1));
        let first = tefas.download("CPU", None, None).unwrap();
        let second = tefas.download("CPU", None, None).unwrap();
        assert_eq!(first.to_csv(), second.to_csv());
        assert_eq!(first, second);
    }

    #[test]
    fn test_download_validation_errors() {
        let tefas = Tefas::with_today(StaticFetcher::new(rows()), date(2022, 6, 1));

        assert!(matches!(tefas.download("", None, None), Err(Error::InvalidFundCode { .. })));
        assert!(matches!(
            tefas.download("CPU", Some("2022/01/01"), None),
            Err(Error::InvalidDate { .. })
        ));
        assert!(matches!(
            tefas.download("CPU", Some("2022-02-01"), Some("2022-01-01")),
            Err(Error::InvalidRange { .. })
        ));
        assert!(matches!(
            tefas.download("CPU", Some("2017-01-01"), None),
            Err(Error::RangeTooLong { .. })
        ));
        assert!(matches!(
            tefas.download("CPU", None, Some("2022-06-02")),
            Err(Error::FutureRange { .. })
        ));
    }

    #[test]
    fn test_download_empty() {
        let tefas = Tefas::with_today(StaticFetcher::default(), date(2022, 6, 1));
        let err = tefas.download("CPU", None, None).unwrap_err();
        assert!(matches!(err, Error::EmptySeries { points: 0, .. }));
    }

    #[test]
    fn test_download_dates() {
        let tefas = Tefas::with_today(StaticFetcher::new(rows()), date(2022, 6, 1));
        let series = tefas
            .download_dates("CPU", Some(date(2022, 1, 2)), None)
            .unwrap();
        assert_eq!(series.len(), 2);
    }

    #[test]
    fn test_cache_avoids_refetch() {
        let calls = Cell::new(0);
        let fetcher = |_: &FundCode, _: &DateRange| -> FetchResult {
            calls.set(calls.get() + 1);
            Ok(rows())
        };

        let tefas = Tefas::with_today(fetcher, date(2022, 6, 1)).with_cache();
        let first = tefas.download("CPU", None, None).unwrap();
        let second = tefas.download("CPU", None, None).unwrap();
        assert_eq!(first, second);
        assert_eq!(calls.get(), 1);

        tefas.download("CPU", Some("2022-01-02"), None).unwrap();
        assert_eq!(calls.get(), 2);
    }

    #[test]
    fn test_no_cache_by_default() {
        let calls = Cell::new(0);
        let fetcher = |_: &FundCode, _: &DateRange| -> FetchResult {
            calls.set(calls.get() + 1);
            Ok(rows())
        };

        let tefas = Tefas::with_today(fetcher, date(2022, 6, 1));
        tefas.download("CPU", None, None).unwrap();
        tefas.download("CPU", None, None).unwrap();
        assert_eq!(calls.get(), 2);
    }

    #[test]
    fn test_custom_engine() {
        let tefas = Tefas::with_today(StaticFetcher::new(rows()), date(2022, 6, 1))
            .with_engine(StatisticsEngine::new().with_risk_free_rate(0.15));
        let series = tefas.download("CPU", None, None).unwrap();
        let stats = tefas.get_statistics(&series, "CPU").unwrap();

        let vol = stats.volatility.unwrap();
        assert!(stats.sharpe_ratio.unwrap() < 0.0);
        assert!((stats.sharpe_ratio.unwrap() * vol + 0.15).abs() < 1e-9);
    }

    #[test]
    fn test_platform_date_rejects_future_end() {
        let tefas = Tefas::new(StaticFetcher::new(rows()));
        let tomorrow = RangeResolver::platform().today().succ_opt().unwrap();
        let err = tefas.download_dates("CPU", None, Some(tomorrow)).unwrap_err();
        assert!(matches!(err, Error::FutureRange { .. }));
    }

    #[test]
    fn test_popular_funds_are_valid_codes() {
        assert_eq!(popular_funds().len(), 10);
        for (code, name) in popular_funds() {
            assert_eq!(FundCode::parse(code).unwrap().as_str(), *code);
            assert!(!name.is_empty());
        }
    }
}
