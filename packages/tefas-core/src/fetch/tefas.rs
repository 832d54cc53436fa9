//! HTTP fetcher for the TEFAS historical price endpoint.

use std::env;
use std::time::Duration;

use chrono::{DateTime, Duration as DateDelta};
use reqwest::blocking::Client;
use serde::Deserialize;
use serde_json::Value;

use super::{FetchError, RawFetcher, RawRow};
use crate::types::{DateRange, FundCode};

pub const DEFAULT_BASE_URL: &str = "https://www.tefas.gov.tr";
pub const DEFAULT_TIMEOUT_SECS: u64 = 30;
/// The endpoint refuses long queries, so ranges are split into windows of this many days.
pub const DEFAULT_WINDOW_DAYS: i64 = 90;

const HISTORY_PATH: &str = "/api/DB/BindHistoryInfo";
const REFERER_PATH: &str = "/TarihselVeriler.aspx";
const DEFAULT_FUND_TYPE: &str = "YAT";
const DEFAULT_USER_AGENT: &str =
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/124.0 Safari/537.36";

/// Settings for [`TefasFetcher`].
#[derive(Debug, Clone, PartialEq)]
pub struct TefasConfig {
    /// Scheme and host of the platform, without a trailing path
    pub base_url: String,
    /// Per-request timeout
    pub timeout: Duration,
    /// Maximum calendar days covered by one request
    pub window_days: i64,
    /// Platform fund category (`YAT` = investment funds)
    pub fund_type: String,
    pub user_agent: String,
}

impl Default for TefasConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
            window_days: DEFAULT_WINDOW_DAYS,
            fund_type: DEFAULT_FUND_TYPE.to_string(),
            user_agent: DEFAULT_USER_AGENT.to_string(),
        }
    }
}

impl TefasConfig {
    /// Defaults overridden by `TEFAS_BASE_URL`, `TEFAS_TIMEOUT_SECS` and `TEFAS_WINDOW_DAYS`.
    pub fn from_env() -> Self {
        let mut config = Self::default();

        if let Ok(url) = env::var("TEFAS_BASE_URL") {
            if !url.trim().is_empty() {
                config.base_url = url.trim().to_string();
            }
        }
        if let Ok(raw) = env::var("TEFAS_TIMEOUT_SECS") {
            match raw.trim().parse::<u64>() {
                Ok(secs) if secs > 0 => config.timeout = Duration::from_secs(secs),
                _ => tracing::warn!("Ignoring invalid TEFAS_TIMEOUT_SECS={:?}", raw),
            }
        }
        if let Ok(raw) = env::var("TEFAS_WINDOW_DAYS") {
            match raw.trim().parse::<i64>() {
                Ok(days) if days > 0 => config.window_days = days,
                _ => tracing::warn!("Ignoring invalid TEFAS_WINDOW_DAYS={:?}", raw),
            }
        }

        config
    }

    pub fn history_url(&self) -> String {
        format!("{}{}", self.base_url.trim_end_matches('/'), HISTORY_PATH)
    }

    fn referer_url(&self) -> String {
        format!("{}{}", self.base_url.trim_end_matches('/'), REFERER_PATH)
    }
}

/// Split `range` into consecutive, non-overlapping windows of at most `window_days` days each.
pub fn request_windows(range: &DateRange, window_days: i64) -> Vec<DateRange> {
    let step = DateDelta::days(window_days.max(1) - 1);
    let mut windows = Vec::new();
    let mut start = range.start();

    loop {
        let end = match start.checked_add_signed(step) {
            Some(end) if end < range.end() => end,
            _ => range.end(),
        };
        windows.push(DateRange::from_bounds(start, end));

        match end.succ_opt() {
            Some(next) if end < range.end() => start = next,
            _ => break,
        }
    }

    windows
}

#[derive(Debug, Deserialize)]
struct HistoryResponse {
    data: Option<Vec<HistoryItem>>,
}

#[derive(Debug, Deserialize)]
struct HistoryItem {
    #[serde(rename = "TARIH")]
    date: Option<Value>,
    #[serde(rename = "FIYAT")]
    price: Option<Value>,
}

/// Decode a history response body into raw rows, in response order.
///
/// `TARIH` is epoch milliseconds and becomes a `YYYY-MM-DD` date; values that
/// don't decode are passed through as text for the series builder to reject.
pub fn parse_history_json(text: &str) -> Result<Vec<RawRow>, FetchError> {
    let resp: HistoryResponse = serde_json::from_str(text)?;
    let items = resp
        .data
        .ok_or_else(|| FetchError::Upstream("response is missing the data field".to_string()))?;

    Ok(items
        .into_iter()
        .map(|item| RawRow {
            date: item.date.as_ref().map(epoch_millis_to_date).unwrap_or_default(),
            price: item.price.as_ref().map(value_text).unwrap_or_default(),
        })
        .collect())
}

fn value_text(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Number(n) => n.to_string(),
        _ => String::new(),
    }
}

fn epoch_millis_to_date(value: &Value) -> String {
    let text = value_text(value);
    text.trim()
        .parse::<i64>()
        .ok()
        .and_then(DateTime::from_timestamp_millis)
        .map(|dt| dt.date_naive().format("%Y-%m-%d").to_string())
        .unwrap_or(text)
}

/// Blocking HTTP client for the TEFAS history endpoint.
#[derive(Debug, Clone)]
pub struct TefasFetcher {
    config: TefasConfig,
    client: Client,
}

impl TefasFetcher {
    pub fn new(config: TefasConfig) -> Result<Self, FetchError> {
        let client = Client::builder()
            .timeout(config.timeout)
            .user_agent(config.user_agent.clone())
            .build()?;
        Ok(Self { config, client })
    }

    pub fn config(&self) -> &TefasConfig {
        &self.config
    }

    /// Fetch a single window in one request.
    fn fetch_window(
        &self,
        fund_code: &FundCode,
        window: &DateRange,
    ) -> Result<Vec<RawRow>, FetchError> {
        let start = window.start().format("%d.%m.%Y").to_string();
        let end = window.end().format("%d.%m.%Y").to_string();
        let form = [
            ("fontip", self.config.fund_type.as_str()),
            ("sfontur", ""),
            ("fonkod", fund_code.as_str()),
            ("fongrup", ""),
            ("bastarih", start.as_str()),
            ("bittarih", end.as_str()),
            ("fonturkod", ""),
            ("fonunvantip", ""),
        ];

        let response = self
            .client
            .post(self.config.history_url())
            .header("X-Requested-With", "XMLHttpRequest")
            .header("Referer", self.config.referer_url())
            .form(&form)
            .send()?;

        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::Status {
                status: status.as_u16(),
                body: response.text().unwrap_or_default(),
            });
        }

        parse_history_json(&response.text()?)
    }
}

impl RawFetcher for TefasFetcher {
    fn fetch(&self, fund_code: &FundCode, range: &DateRange) -> Result<Vec<RawRow>, FetchError> {
        let mut rows = Vec::new();
        for window in request_windows(range, self.config.window_days) {
            tracing::debug!("Fetching {} prices for {}", fund_code, window);
            let batch = self.fetch_window(fund_code, &window)?;
            tracing::debug!("Received {} rows for {} in {}", batch.len(), fund_code, window);
            rows.extend(batch);
        }
        Ok(rows)
    }
}
