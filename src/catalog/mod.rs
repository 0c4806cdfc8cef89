pub mod models;

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::{Duration, Instant};

use chrono::{Datelike, NaiveDate, Utc};
use serde::de::DeserializeOwned;
use thiserror::Error;

use crate::FOUNDING_YEAR;
use crate::config::CatalogConfig;
use models::{Envelope, SetlistRecord, ShowRecord, VenueRecord};

#[derive(Error, Debug)]
pub enum CatalogError {
    /// Caller error, rejected before any I/O.
    #[error("invalid argument: {0}")]
    InvalidArgument(String),
    /// The operation's cancel token was triggered.
    #[error("request cancelled")]
    Cancelled,
    /// Timeout, DNS, connection failure. The client may be unusable this
    /// session; distinct from "service reachable but says no data".
    #[error("transport failure: {0}")]
    Transport(#[from] Box<ureq::Error>),
}

pub type Result<T> = std::result::Result<T, CatalogError>;

/// Cooperative cancellation signal for network-bound operations.
#[derive(Debug, Clone, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// Sleep granularity inside the rate-limit wait, so cancellation stays prompt.
const WAIT_SLICE: Duration = Duration::from_millis(50);

/// Rate-limited client for the remote show catalog.
///
/// All requests are serialized through a single slot: the limiter mutex is
/// held across the inter-request wait, so concurrent callers queue and
/// request starts are spaced at least `min_interval` apart.
pub struct CatalogClient {
    base_url: String,
    api_key: String,
    min_interval: Duration,
    last_request: Mutex<Option<Instant>>,
}

impl CatalogClient {
    pub fn new(config: &CatalogConfig) -> Self {
        Self {
            base_url: config.base_url.trim_end_matches('/').to_string(),
            api_key: config.api_key.clone(),
            min_interval: Duration::from_millis(config.rate_limit_ms),
            last_request: Mutex::new(None),
        }
    }

    /// All shows on one date.
    pub fn get_shows(&self, date: NaiveDate, cancel: &CancelToken) -> Result<Vec<ShowRecord>> {
        let data = self.fetch::<ShowRecord>(&format!("shows/showdate/{date}.json"), cancel)?;
        Ok(data.unwrap_or_default())
    }

    /// All shows with dates in `[start, end]` inclusive.
    pub fn get_shows_range(
        &self,
        start: NaiveDate,
        end: NaiveDate,
        cancel: &CancelToken,
    ) -> Result<Vec<ShowRecord>> {
        if start > end {
            return Err(CatalogError::InvalidArgument(format!(
                "date range starts after it ends: {start} > {end}"
            )));
        }
        let data = self.fetch::<ShowRecord>(&format!("shows/daterange/{start}/{end}.json"), cancel)?;
        Ok(data.unwrap_or_default())
    }

    /// All shows in one calendar year.
    pub fn get_shows_by_year(&self, year: i32, cancel: &CancelToken) -> Result<Vec<ShowRecord>> {
        let max_year = Utc::now().year() + 1;
        if year < FOUNDING_YEAR || year > max_year {
            return Err(CatalogError::InvalidArgument(format!(
                "year {year} outside {FOUNDING_YEAR}..={max_year}"
            )));
        }
        let data = self.fetch::<ShowRecord>(&format!("shows/showyear/{year}.json"), cancel)?;
        Ok(data.unwrap_or_default())
    }

    /// The setlist for one date, if the catalog has one.
    pub fn get_setlist(
        &self,
        date: NaiveDate,
        cancel: &CancelToken,
    ) -> Result<Option<SetlistRecord>> {
        let data = self.fetch::<SetlistRecord>(&format!("setlists/showdate/{date}.json"), cancel)?;
        Ok(data.and_then(|v| v.into_iter().next()))
    }

    /// A venue by catalog id.
    pub fn get_venue(&self, venue_id: i64, cancel: &CancelToken) -> Result<Option<VenueRecord>> {
        if venue_id <= 0 {
            return Err(CatalogError::InvalidArgument(format!(
                "venue id must be positive, got {venue_id}"
            )));
        }
        let data = self.fetch::<VenueRecord>(&format!("venues/venueid/{venue_id}.json"), cancel)?;
        Ok(data.and_then(|v| v.into_iter().next()))
    }

    /// Whether the catalog is reachable and the credential is accepted.
    pub fn test_connection(&self, cancel: &CancelToken) -> bool {
        match self.fetch::<ShowRecord>(&format!("shows/showyear/{FOUNDING_YEAR}.json"), cancel) {
            Ok(Some(_)) => true,
            Ok(None) => false,
            Err(e) => {
                log::warn!("catalog connection test failed: {e}");
                false
            }
        }
    }

    /// Wait for the single request slot. The mutex is held for the whole
    /// wait; the timestamp is written before release so the next caller
    /// measures from this request's start.
    fn wait_for_slot(&self, cancel: &CancelToken) -> Result<()> {
        let mut last = self
            .last_request
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        if cancel.is_cancelled() {
            return Err(CatalogError::Cancelled);
        }
        if let Some(prev) = *last {
            let elapsed = prev.elapsed();
            if elapsed < self.min_interval {
                let mut remaining = self.min_interval - elapsed;
                while remaining > Duration::ZERO {
                    if cancel.is_cancelled() {
                        return Err(CatalogError::Cancelled);
                    }
                    let slice = remaining.min(WAIT_SLICE);
                    thread::sleep(slice);
                    remaining = remaining.saturating_sub(slice);
                }
            }
        }
        *last = Some(Instant::now());
        Ok(())
    }

    /// GET an endpoint and unwrap the response envelope.
    ///
    /// Returns `Ok(None)` for every "service says no data" case: non-2xx
    /// status, empty or malformed body, envelope error flag. Transport
    /// failures and cancellation are the only errors.
    fn fetch<T: DeserializeOwned>(&self, path: &str, cancel: &CancelToken) -> Result<Option<Vec<T>>> {
        self.wait_for_slot(cancel)?;

        let url = format!("{}/{}?apikey={}", self.base_url, path, self.api_key);
        let display_url = self.redacted_url(path);
        log::debug!("GET {display_url}");

        let mut response = match ureq::get(&url).call() {
            Ok(r) => r,
            Err(ureq::Error::StatusCode(code)) => {
                log::warn!("catalog returned HTTP {code} for {display_url}");
                return Ok(None);
            }
            Err(e) => {
                if cancel.is_cancelled() {
                    return Err(CatalogError::Cancelled);
                }
                return Err(CatalogError::Transport(Box::new(e)));
            }
        };

        let envelope: Envelope<T> = match response.body_mut().read_json() {
            Ok(env) => env,
            Err(e) => {
                log::warn!("malformed catalog payload from {display_url}: {e}");
                return Ok(None);
            }
        };

        if envelope.error {
            log::warn!(
                "catalog reported an error for {display_url}: {}",
                envelope.error_message
            );
            return Ok(None);
        }

        Ok(Some(envelope.data))
    }

    /// URL for logging. The credential never appears in log output.
    fn redacted_url(&self, path: &str) -> String {
        format!("{}/{}?apikey=***", self.base_url, path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn client_with_interval(ms: u64) -> CatalogClient {
        CatalogClient::new(&CatalogConfig {
            base_url: "http://127.0.0.1:9".to_string(),
            api_key: "sekrit".to_string(),
            rate_limit_ms: ms,
        })
    }

    fn d(y: i32, m: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, day).unwrap()
    }

    #[test]
    fn test_rate_limiter_spacing() {
        let client = client_with_interval(50);
        let cancel = CancelToken::new();

        let start = Instant::now();
        for _ in 0..4 {
            client.wait_for_slot(&cancel).unwrap();
        }
        // 4 slots need at least 3 full intervals
        assert!(start.elapsed() >= Duration::from_millis(150));
    }

    #[test]
    fn test_first_request_not_delayed() {
        let client = client_with_interval(1000);
        let cancel = CancelToken::new();

        let start = Instant::now();
        client.wait_for_slot(&cancel).unwrap();
        assert!(start.elapsed() < Duration::from_millis(100));
    }

    #[test]
    fn test_cancellation_before_wait() {
        let client = client_with_interval(1000);
        let cancel = CancelToken::new();
        cancel.cancel();

        assert!(matches!(
            client.wait_for_slot(&cancel),
            Err(CatalogError::Cancelled)
        ));
    }

    #[test]
    fn test_cancellation_during_wait() {
        let client = client_with_interval(10_000);
        let cancel = CancelToken::new();
        client.wait_for_slot(&cancel).unwrap();

        let canceller = {
            let cancel = cancel.clone();
            thread::spawn(move || {
                thread::sleep(Duration::from_millis(100));
                cancel.cancel();
            })
        };

        let start = Instant::now();
        let result = client.wait_for_slot(&cancel);
        canceller.join().unwrap();

        assert!(matches!(result, Err(CatalogError::Cancelled)));
        // Cancellation must be prompt, not after the full 10 s interval
        assert!(start.elapsed() < Duration::from_secs(2));
    }

    #[test]
    fn test_year_bounds_rejected_before_io() {
        let client = client_with_interval(0);
        let cancel = CancelToken::new();

        assert!(matches!(
            client.get_shows_by_year(1950, &cancel),
            Err(CatalogError::InvalidArgument(_))
        ));
        assert!(matches!(
            client.get_shows_by_year(Utc::now().year() + 5, &cancel),
            Err(CatalogError::InvalidArgument(_))
        ));
    }

    #[test]
    fn test_inverted_range_rejected() {
        let client = client_with_interval(0);
        let cancel = CancelToken::new();
        assert!(matches!(
            client.get_shows_range(d(2024, 9, 1), d(2024, 8, 1), &cancel),
            Err(CatalogError::InvalidArgument(_))
        ));
    }

    #[test]
    fn test_bad_venue_id_rejected() {
        let client = client_with_interval(0);
        let cancel = CancelToken::new();
        assert!(matches!(
            client.get_venue(0, &cancel),
            Err(CatalogError::InvalidArgument(_))
        ));
    }

    #[test]
    fn test_unreachable_host_is_transport_error() {
        // Port 9 (discard) is not listening; connect fails fast
        let client = client_with_interval(0);
        let cancel = CancelToken::new();
        assert!(matches!(
            client.get_shows(d(1997, 11, 22), &cancel),
            Err(CatalogError::Transport(_))
        ));
    }

    #[test]
    fn test_credential_redacted_in_log_url() {
        let client = client_with_interval(0);
        let url = client.redacted_url("shows/showdate/1997-11-22.json");
        assert!(!url.contains("sekrit"));
        assert!(url.contains("apikey=***"));
    }
}
