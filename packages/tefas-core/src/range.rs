//! Date range resolution against the platform's history window.

use chrono::{FixedOffset, Months, NaiveDate, Utc};

use crate::types::DateRange;
use crate::{Error, Result};

/// Years of history the platform serves.
pub const MAX_HISTORY_YEARS: u32 = 5;

/// TEFAS publishes prices on Istanbul time (UTC+03:00, no DST).
const PLATFORM_UTC_OFFSET_SECS: i32 = 3 * 3600;

/// Today's calendar date on the platform.
pub fn platform_today() -> NaiveDate {
    let now = Utc::now();
    match FixedOffset::east_opt(PLATFORM_UTC_OFFSET_SECS) {
        Some(offset) => now.with_timezone(&offset).date_naive(),
        None => now.date_naive(),
    }
}

/// Parse an ISO `YYYY-MM-DD` date string.
pub fn parse_date(input: &str) -> Result<NaiveDate> {
    NaiveDate::parse_from_str(input.trim(), "%Y-%m-%d").map_err(|_| Error::InvalidDate {
        input: input.to_string(),
    })
}

/// Earliest start date allowed for a window ending on `end`.
///
/// Calendar arithmetic: a window ending on Feb 29 may start on Feb 28 five years earlier.
pub fn earliest_start(end: NaiveDate) -> NaiveDate {
    end.checked_sub_months(Months::new(12 * MAX_HISTORY_YEARS))
        .unwrap_or(NaiveDate::MIN)
}

/// Checks caller-supplied dates against the history window.
///
/// Never clamps: a request outside the window is an error, not a silently
/// different range.
#[derive(Debug, Clone, Copy)]
pub struct RangeResolver {
    today: NaiveDate,
}

impl RangeResolver {
    /// Create a resolver with a fixed notion of "today".
    pub fn new(today: NaiveDate) -> Self {
        Self { today }
    }

    /// Create a resolver using the platform-local current date.
    pub fn platform() -> Self {
        Self::new(platform_today())
    }

    pub fn today(&self) -> NaiveDate {
        self.today
    }

    /// Resolve optional bounds into a checked [`DateRange`].
    ///
    /// `end` defaults to today, `start` to five years before `end`.
    ///
    /// ```rust
    /// use chrono::NaiveDate;
    /// use tefas_core::RangeResolver;
    ///
    /// let today = NaiveDate::from_ymd_opt(2024, 6, 1).unwrap();
    /// let range = RangeResolver::new(today).resolve(None, None).unwrap();
    /// assert_eq!(range.start(), NaiveDate::from_ymd_opt(2019, 6, 1).unwrap());
    /// assert_eq!(range.end(), today);
    /// ```
    pub fn resolve(&self, start: Option<NaiveDate>, end: Option<NaiveDate>) -> Result<DateRange> {
        let end = end.unwrap_or(self.today);
        let earliest = earliest_start(end);
        let start = start.unwrap_or(earliest);

        if start > end {
            return Err(Error::InvalidRange { start, end });
        }
        if end > self.today {
            return Err(Error::FutureRange {
                end,
                today: self.today,
            });
        }
        if start < earliest {
            return Err(Error::RangeTooLong {
                start,
                end,
                max_years: MAX_HISTORY_YEARS,
            });
        }

        Ok(DateRange::from_bounds(start, end))
    }

    /// Resolve `YYYY-MM-DD` strings; see [`RangeResolver::resolve`].
    pub fn resolve_str(&self, start: Option<&str>, end: Option<&str>) -> Result<DateRange> {
        let start = start.map(parse_date).transpose()?;
        let end = end.map(parse_date).transpose()?;
        self.resolve(start, end)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn resolver() -> RangeResolver {
        RangeResolver::new(date(2024, 6, 1))
    }

    #[test]
    fn test_valid_bounds_are_returned_unchanged() {
        let resolver = resolver();
        let today = resolver.today();
        let earliest = earliest_start(today);

        // Walk a grid of (start, end) pairs inside the window
        let mut end = today;
        while end > earliest {
            let floor = earliest_start(end);
            for offset in [0, 1, 30, 365, 1000] {
                let start = end - Duration::days(offset);
                if start < floor {
                    continue;
                }
                let range = resolver.resolve(Some(start), Some(end)).unwrap();
                assert_eq!((range.start(), range.end()), (start, end));
            }
            end -= Duration::days(97);
        }
    }

    #[test]
    fn test_defaults() {
        let range = resolver().resolve(None, None).unwrap();
        assert_eq!(range.end(), date(2024, 6, 1));
        assert_eq!(range.start(), date(2019, 6, 1));

        let range = resolver().resolve(None, Some(date(2023, 3, 15))).unwrap();
        assert_eq!(range.start(), date(2018, 3, 15));

        let range = resolver().resolve(Some(date(2024, 1, 1)), None).unwrap();
        assert_eq!(range.start(), date(2024, 1, 1));
        assert_eq!(range.end(), date(2024, 6, 1));
    }

    #[test]
    fn test_end_before_start_is_invalid() {
        let x = date(2024, 3, 10);
        let err = resolver()
            .resolve(Some(x), Some(x - Duration::days(1)))
            .unwrap_err();
        assert!(matches!(err, Error::InvalidRange { start, end } if start == x && end == date(2024, 3, 9)));
    }

    #[test]
    fn test_single_day_range() {
        let x = date(2024, 3, 10);
        let range = resolver().resolve(Some(x), Some(x)).unwrap();
        assert_eq!(range.span_days(), 0);
    }

    #[test]
    fn test_five_years_plus_one_day_is_too_long() {
        let end = date(2024, 6, 1);
        assert!(resolver().resolve(Some(date(2019, 6, 1)), Some(end)).is_ok());

        let err = resolver()
            .resolve(Some(date(2019, 5, 31)), Some(end))
            .unwrap_err();
        assert!(matches!(err, Error::RangeTooLong { max_years: 5, .. }));
    }

    #[test]
    fn test_leap_day_end() {
        let resolver = RangeResolver::new(date(2024, 12, 31));
        let end = date(2024, 2, 29);
        assert!(resolver.resolve(Some(date(2019, 2, 28)), Some(end)).is_ok());
        assert!(matches!(
            resolver.resolve(Some(date(2019, 2, 27)), Some(end)),
            Err(Error::RangeTooLong { .. })
        ));
    }

    #[test]
    fn test_future_end_is_rejected() {
        let err = resolver()
            .resolve(Some(date(2024, 5, 1)), Some(date(2024, 6, 2)))
            .unwrap_err();
        assert!(matches!(
            err,
            Error::FutureRange { end, today } if end == date(2024, 6, 2) && today == date(2024, 6, 1)
        ));

        assert!(matches!(
            resolver().resolve(None, Some(date(2025, 1, 1))),
            Err(Error::FutureRange { .. })
        ));
    }

    #[test]
    fn test_resolve_str() {
        let range = resolver()
            .resolve_str(Some("2024-01-02"), Some(" 2024-02-03 "))
            .unwrap();
        assert_eq!(range.start(), date(2024, 1, 2));
        assert_eq!(range.end(), date(2024, 2, 3));

        let err = resolver().resolve_str(Some("02.01.2024"), None).unwrap_err();
        assert!(matches!(err, Error::InvalidDate { input } if input == "02.01.2024"));
    }
}
