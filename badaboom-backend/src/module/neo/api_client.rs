//! NeoWs feed client with rate-limit tracking

use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::NaiveDate;
use reqwest::Client;
use serde_json::Value;
use std::collections::BTreeMap;
use std::time::Duration;

use super::clock::{Clock, SystemClock};
use super::error::NeoError;
use super::types::{DEFAULT_API_LOCATION, FeedPage, WeekFeed};

const RATE_LIMIT_HEADER: &str = "X-RateLimit-Remaining";
const REQUEST_TIMEOUT_SECONDS: u64 = 60;
/// The NeoWs quota resets hourly
pub const RATE_LIMIT_COOLDOWN: Duration = Duration::from_secs(60 * 60);
/// Widest window accepted by the feed endpoint, in days (inclusive)
pub const MAX_WINDOW_DAYS: i64 = 7;
/// Day requested by [`NeoWsClient::check_quota`]
const QUOTA_CHECK_DAY: (i32, u32, u32) = (2015, 12, 30);

/// Issues one `feed` request
#[async_trait]
pub trait FeedTransport: Send + Sync {
    async fn get_feed(&self, start: NaiveDate, end: NaiveDate) -> Result<FeedPage>;
}

/// reqwest-backed transport for the public NeoWs API
pub struct HttpFeedTransport {
    client: Client,
    api_location: String,
    api_key: String,
}

impl HttpFeedTransport {
    pub fn new(api_key: impl Into<String>, api_location: Option<String>) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(REQUEST_TIMEOUT_SECONDS))
            .build()
            .context("Failed to build HTTP client")?;

        Ok(Self {
            client,
            api_location: api_location.unwrap_or_else(|| DEFAULT_API_LOCATION.to_string()),
            api_key: api_key.into(),
        })
    }

    fn feed_url(&self, start: NaiveDate, end: NaiveDate) -> String {
        format!(
            "{}feed?start_date={}&end_date={}&api_key={}",
            self.api_location,
            start.format("%Y-%m-%d"),
            end.format("%Y-%m-%d"),
            self.api_key
        )
    }
}

#[async_trait]
impl FeedTransport for HttpFeedTransport {
    async fn get_feed(&self, start: NaiveDate, end: NaiveDate) -> Result<FeedPage> {
        let response = self
            .client
            .get(self.feed_url(start, end))
            .send()
            .await
            .context(format!("Failed to send feed request for {}..{}", start, end))?;

        let rate_limit_remaining = response
            .headers()
            .get(RATE_LIMIT_HEADER)
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.trim().parse::<u32>().ok());

        if !response.status().is_success() {
            return Err(anyhow::anyhow!(
                "HTTP error {} for feed {}..{}",
                response.status(),
                start,
                end
            ));
        }

        let body: Value = response
            .json()
            .await
            .context(format!("Failed to parse JSON feed for {}..{}", start, end))?;

        Ok(FeedPage {
            body,
            rate_limit_remaining,
        })
    }
}

/// Feed client that waits out an exhausted quota instead of failing
pub struct NeoWsClient<T = HttpFeedTransport, C = SystemClock> {
    transport: T,
    clock: C,
    /// Unknown until the first response
    remaining_requests: Option<u32>,
}

impl NeoWsClient {
    pub fn connect(api_key: impl Into<String>, api_location: Option<String>) -> Result<Self> {
        Ok(Self::new(
            HttpFeedTransport::new(api_key, api_location)?,
            SystemClock,
        ))
    }
}

impl<T: FeedTransport, C: Clock> NeoWsClient<T, C> {
    pub fn new(transport: T, clock: C) -> Self {
        Self {
            transport,
            clock,
            remaining_requests: None,
        }
    }

    pub fn remaining_requests(&self) -> Option<u32> {
        self.remaining_requests
    }

    pub fn clock(&self) -> &C {
        &self.clock
    }

    /// One-day request whose only purpose is reading the remaining quota
    pub async fn check_quota(&mut self) -> Result<Option<u32>> {
        let (y, m, d) = QUOTA_CHECK_DAY;
        let day = NaiveDate::from_ymd_opt(y, m, d).context("Invalid quota check date")?;
        self.request(day, day).await?;
        Ok(self.remaining_requests)
    }

    /// Fetch the NEO records of `[start, end]`, at most 7 days
    pub async fn fetch_week(&mut self, start: NaiveDate, end: NaiveDate) -> Result<WeekFeed> {
        if end < start {
            return Err(NeoError::InvalidWindow { start, end }.into());
        }
        if (end - start).num_days() >= MAX_WINDOW_DAYS {
            return Err(NeoError::WindowTooLong { start, end }.into());
        }

        let page = self.request(start, end).await?;
        let week = parse_week(page.body)?;

        tracing::debug!(
            "Fetched {} NEO records for {}..{} ({:?} requests left)",
            week.record_count(),
            start,
            end,
            self.remaining_requests
        );
        Ok(week)
    }

    async fn request(&mut self, start: NaiveDate, end: NaiveDate) -> Result<FeedPage> {
        if self.remaining_requests.is_some_and(|n| n < 1) {
            tracing::warn!(
                "NeoWs hourly request quota reached, pausing for {:?} before requesting {}..{}",
                RATE_LIMIT_COOLDOWN,
                start,
                end
            );
            self.clock.sleep(RATE_LIMIT_COOLDOWN).await;
        }

        let page = self.transport.get_feed(start, end).await?;
        self.remaining_requests = page.rate_limit_remaining;
        Ok(page)
    }
}

fn parse_week(body: Value) -> Result<WeekFeed, NeoError> {
    let malformed = |reason: String, body: &Value| NeoError::MalformedBatch {
        reason,
        batch: body.to_string(),
    };

    let Some(objects) = body.get("near_earth_objects").and_then(Value::as_object) else {
        return Err(malformed(
            "`near_earth_objects` mapping is missing".to_string(),
            &body,
        ));
    };

    let mut days = BTreeMap::new();
    for (key, records) in objects {
        let date = NaiveDate::parse_from_str(key, "%Y-%m-%d")
            .map_err(|e| malformed(format!("invalid date key `{}`: {}", key, e), &body))?;
        let records = records
            .as_array()
            .ok_or_else(|| malformed(format!("records of `{}` are not a list", key), &body))?;
        days.insert(date, records.clone());
    }

    Ok(WeekFeed { days, raw: body })
}

#[cfg(test)]
pub(crate) mod testing {
    use super::*;
    use std::collections::{HashMap, VecDeque};
    use std::sync::{Arc, Mutex};

    /// Transport answering from canned pages, recording every window asked for
    #[derive(Clone, Default)]
    pub struct ScriptedTransport {
        /// Records returned for a window starting on the key date
        pages: Arc<Mutex<HashMap<NaiveDate, Value>>>,
        /// Header values returned in order; `default_remaining` once exhausted
        remaining: Arc<Mutex<VecDeque<Option<u32>>>>,
        default_remaining: Option<u32>,
        calls: Arc<Mutex<Vec<(NaiveDate, NaiveDate)>>>,
    }

    impl ScriptedTransport {
        pub fn new() -> Self {
            Self {
                default_remaining: Some(1000),
                ..Self::default()
            }
        }

        pub fn with_page(self, start: NaiveDate, body: Value) -> Self {
            self.add_page(start, body);
            self
        }

        /// Also visible through clones already handed out
        pub fn add_page(&self, start: NaiveDate, body: Value) {
            self.pages.lock().unwrap().insert(start, body);
        }

        pub fn with_remaining(self, values: &[Option<u32>]) -> Self {
            self.remaining.lock().unwrap().extend(values.iter().copied());
            self
        }

        pub fn calls(&self) -> Vec<(NaiveDate, NaiveDate)> {
            self.calls.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl FeedTransport for ScriptedTransport {
        async fn get_feed(&self, start: NaiveDate, end: NaiveDate) -> Result<FeedPage> {
            self.calls.lock().unwrap().push((start, end));

            let body = self
                .pages
                .lock()
                .unwrap()
                .get(&start)
                .cloned()
                .unwrap_or_else(|| serde_json::json!({ "near_earth_objects": {} }));
            let rate_limit_remaining = self
                .remaining
                .lock()
                .unwrap()
                .pop_front()
                .unwrap_or(self.default_remaining);

            Ok(FeedPage {
                body,
                rate_limit_remaining,
            })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::testing::ScriptedTransport;
    use super::*;
    use crate::module::neo::clock::testing::MockClock;
    use crate::module::neo::record::fixtures::neo_record;
    use serde_json::json;

    fn day(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[tokio::test]
    async fn test_fetch_week_groups_records_by_date() {
        let body = json!({
            "element_count": 2,
            "near_earth_objects": {
                "2015-09-08": [neo_record(1, "2015-09-08")],
                "2015-09-07": [neo_record(2, "2015-09-07"), neo_record(3, "2015-09-07")]
            }
        });
        let transport = ScriptedTransport::new().with_page(day(2015, 9, 7), body);
        let mut client = NeoWsClient::new(transport.clone(), MockClock::new(day(2020, 1, 1)));

        let week = client.fetch_week(day(2015, 9, 7), day(2015, 9, 8)).await.unwrap();

        assert_eq!(week.record_count(), 3);
        assert_eq!(week.days.keys().next(), Some(&day(2015, 9, 7)));
        assert_eq!(client.remaining_requests(), Some(1000));
        assert_eq!(transport.calls(), vec![(day(2015, 9, 7), day(2015, 9, 8))]);
    }

    #[tokio::test]
    async fn test_exhausted_quota_waits_then_requests() {
        let transport = ScriptedTransport::new().with_remaining(&[Some(0), Some(999)]);
        let clock = MockClock::new(day(2020, 1, 1));
        let mut client = NeoWsClient::new(transport.clone(), clock.clone());

        client.fetch_week(day(2015, 1, 1), day(2015, 1, 7)).await.unwrap();
        assert_eq!(client.remaining_requests(), Some(0));
        assert!(clock.sleeps().is_empty());

        client.fetch_week(day(2015, 1, 8), day(2015, 1, 14)).await.unwrap();
        assert_eq!(clock.sleeps(), vec![RATE_LIMIT_COOLDOWN]);
        assert_eq!(transport.calls().len(), 2);
        assert_eq!(client.remaining_requests(), Some(999));
    }

    #[tokio::test]
    async fn test_unknown_quota_does_not_wait() {
        let transport = ScriptedTransport::new().with_remaining(&[None]);
        let clock = MockClock::new(day(2020, 1, 1));
        let mut client = NeoWsClient::new(transport, clock.clone());

        client.fetch_week(day(2015, 1, 1), day(2015, 1, 7)).await.unwrap();
        client.fetch_week(day(2015, 1, 8), day(2015, 1, 14)).await.unwrap();

        assert!(clock.sleeps().is_empty());
    }

    #[tokio::test]
    async fn test_check_quota_reads_header() {
        let transport = ScriptedTransport::new().with_remaining(&[Some(42)]);
        let mut client = NeoWsClient::new(transport.clone(), MockClock::new(day(2020, 1, 1)));

        assert_eq!(client.check_quota().await.unwrap(), Some(42));
        assert_eq!(transport.calls(), vec![(day(2015, 12, 30), day(2015, 12, 30))]);
    }

    #[tokio::test]
    async fn test_window_longer_than_a_week_is_rejected() {
        let transport = ScriptedTransport::new();
        let mut client = NeoWsClient::new(transport.clone(), MockClock::new(day(2020, 1, 1)));

        let err = client.fetch_week(day(2015, 1, 1), day(2015, 1, 8)).await.unwrap_err();

        assert!(matches!(
            err.downcast_ref::<NeoError>(),
            Some(NeoError::WindowTooLong { .. })
        ));
        assert!(transport.calls().is_empty());
    }

    #[tokio::test]
    async fn test_reversed_window_is_rejected() {
        let transport = ScriptedTransport::new();
        let mut client = NeoWsClient::new(transport.clone(), MockClock::new(day(2020, 1, 1)));

        let err = client.fetch_week(day(2015, 1, 7), day(2015, 1, 1)).await.unwrap_err();

        assert!(matches!(
            err.downcast_ref::<NeoError>(),
            Some(NeoError::InvalidWindow { .. })
        ));
        assert_eq!(err.to_string(), "feed window 2015-01-07..=2015-01-01 ends before it starts");
        assert!(transport.calls().is_empty());
    }

    #[tokio::test]
    async fn test_missing_mapping_is_malformed_batch() {
        let transport = ScriptedTransport::new()
            .with_page(day(2015, 1, 1), json!({ "error": "quota exceeded" }));
        let mut client = NeoWsClient::new(transport, MockClock::new(day(2020, 1, 1)));

        let err = client.fetch_week(day(2015, 1, 1), day(2015, 1, 7)).await.unwrap_err();

        match err.downcast_ref::<NeoError>() {
            Some(NeoError::MalformedBatch { batch, .. }) => assert!(batch.contains("quota exceeded")),
            other => panic!("unexpected error: {:?}", other),
        }
    }

    #[tokio::test]
    #[ignore] // Requires network connection and uses the public demo key
    async fn test_fetch_week_live() {
        let mut client = NeoWsClient::connect("DEMO_KEY", None).unwrap();
        let week = client.fetch_week(day(2015, 9, 7), day(2015, 9, 8)).await.unwrap();
        assert!(week.record_count() > 0);
    }
}
