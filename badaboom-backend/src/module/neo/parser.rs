//! Incremental NEO dataset cache
//!
//! [`AsteroidDatasetParser`] answers per-year queries from the local tables and
//! refills a year from the NeoWs feed, week by week, whenever the cached year is
//! missing or still holds estimated (future) approaches. A refill is built on
//! copies of the tables and only swapped in once every week was fetched and
//! both files were written.

use anyhow::{Context, Result};
use badaboom_common::{Asteroid, NeoEvent};
use chrono::{Days, NaiveDate};
use std::collections::HashSet;
use std::ops::RangeInclusive;
use tracing::{debug, error, info};

use super::api_client::{FeedTransport, HttpFeedTransport, MAX_WINDOW_DAYS, NeoWsClient};
use super::cache::NeoCache;
use super::clock::{Clock, SystemClock};
use super::error::NeoError;
use super::record::{self, FieldError};
use super::types::{NeoTables, ParserPaths, WeekFeed, YearSlice};

/// Owns the cached tables and keeps them in sync with the NeoWs feed
pub struct AsteroidDatasetParser<T = HttpFeedTransport, C = SystemClock> {
    client: NeoWsClient<T, C>,
    cache: NeoCache,
    tables: NeoTables,
    /// Ids present in `tables.asteroids`
    known_ids: HashSet<i64>,
    /// Years fetched during this session that turned out to have no events.
    /// Not persisted: a new parser refetches an empty year once, at the cost
    /// of one request per week of that year.
    empty_years: HashSet<i32>,
}

impl AsteroidDatasetParser {
    /// Parser talking to the public API, with the cache files at `paths`
    pub async fn new(
        api_key: impl Into<String>,
        paths: ParserPaths,
        api_location: Option<String>,
    ) -> Result<Self> {
        let client = NeoWsClient::connect(api_key, api_location)?;
        Self::with_client(client, NeoCache::new(paths)).await
    }
}

impl<T: FeedTransport, C: Clock> AsteroidDatasetParser<T, C> {
    pub async fn with_client(client: NeoWsClient<T, C>, cache: NeoCache) -> Result<Self> {
        let tables = cache.load().await?;
        let known_ids = tables.asteroids.iter().map(|a| a.asteroid_id).collect();

        Ok(Self {
            client,
            cache,
            tables,
            known_ids,
            empty_years: HashSet::new(),
        })
    }

    /// All cached events, sorted by date
    pub fn events(&self) -> &[NeoEvent] {
        &self.tables.events
    }

    /// All cached asteroids, sorted by id
    pub fn asteroids(&self) -> &[Asteroid] {
        &self.tables.asteroids
    }

    pub fn client_mut(&mut self) -> &mut NeoWsClient<T, C> {
        &mut self.client
    }

    /// Events of `year` and the asteroids they reference, fetching the year
    /// first when the cache cannot answer for it
    pub async fn get_year(&mut self, year: i32) -> Result<YearSlice> {
        let (begin, end) = year_bounds(year)?;

        let selected = self.tables.select(begin, end);
        if !self.needs_fetch(year, &selected) {
            return Ok(selected);
        }

        info!(
            "Refreshing NEO data for {} ({} cached events, estimation: {})",
            year,
            selected.events.len(),
            selected.has_estimation()
        );

        // One boundary for the whole year so every week is classified alike
        let today = self.client.clock().today();
        let (tables, known_ids) = self.refill(begin, end, today).await?;
        self.cache
            .save(&tables)
            .await
            .context(format!("Failed to persist NEO cache after fetching {}", year))?;

        self.tables = tables;
        self.known_ids = known_ids;

        let selected = self.tables.select(begin, end);
        if selected.events.is_empty() {
            self.empty_years.insert(year);
        }

        info!(
            "Year {} ready: {} events, {} asteroids",
            year,
            selected.events.len(),
            selected.asteroids.len()
        );
        Ok(selected)
    }

    /// Run [`Self::get_year`] over a range of years, in order
    pub async fn fetch_years(&mut self, years: RangeInclusive<i32>) -> Result<Vec<(i32, YearSlice)>> {
        let mut slices = Vec::new();
        for year in years {
            let slice = self.get_year(year).await?;
            slices.push((year, slice));
        }
        Ok(slices)
    }

    fn needs_fetch(&self, year: i32, selected: &YearSlice) -> bool {
        if selected.has_estimation() {
            return true;
        }
        selected.events.is_empty() && !self.empty_years.contains(&year)
    }

    /// New tables with `[begin, end]` replaced by freshly fetched rows
    async fn refill(
        &mut self,
        begin: NaiveDate,
        end: NaiveDate,
        today: NaiveDate,
    ) -> Result<(NeoTables, HashSet<i64>)> {
        let mut tables = NeoTables {
            events: self
                .tables
                .events
                .iter()
                .filter(|e| e.date < begin || e.date > end)
                .cloned()
                .collect(),
            asteroids: self.tables.asteroids.clone(),
        };
        let mut known_ids = self.known_ids.clone();

        for (start, stop) in weekly_windows(begin, end) {
            let week = self.client.fetch_week(start, stop).await?;
            let (events, asteroids) = rows_from_week(&week, today, &mut known_ids)?;

            debug!(
                "Week {}..{}: {} events, {} new asteroids",
                start,
                stop,
                events.len(),
                asteroids.len()
            );
            tables.events.extend(events);
            tables.asteroids.extend(asteroids);
        }

        tables.sort();
        Ok((tables, known_ids))
    }
}

/// Consecutive windows of at most 7 days covering `[begin, end]`
pub fn weekly_windows(begin: NaiveDate, end: NaiveDate) -> Vec<(NaiveDate, NaiveDate)> {
    let span = Days::new((MAX_WINDOW_DAYS - 1) as u64);
    let mut windows = Vec::new();
    let mut start = begin;

    while start <= end {
        let stop = start.checked_add_days(span).map_or(end, |d| d.min(end));
        windows.push((start, stop));
        match stop.succ_opt() {
            Some(next) => start = next,
            None => break,
        }
    }
    windows
}

fn year_bounds(year: i32) -> Result<(NaiveDate, NaiveDate)> {
    let begin = NaiveDate::from_ymd_opt(year, 1, 1);
    let end = NaiveDate::from_ymd_opt(year, 12, 31);
    begin
        .zip(end)
        .with_context(|| format!("Year {} is out of the supported date range", year))
}

/// Events of one week, plus asteroids whose id is not yet in `known_ids`.
/// New ids are added to `known_ids`.
fn rows_from_week(
    week: &WeekFeed,
    today: NaiveDate,
    known_ids: &mut HashSet<i64>,
) -> Result<(Vec<NeoEvent>, Vec<Asteroid>), NeoError> {
    let mut events = Vec::new();
    let mut asteroids = Vec::new();

    for (&date, records) in &week.days {
        for raw in records {
            let malformed = |FieldError(field): FieldError| {
                error!("Malformed NEO record, field `{}` missing or invalid", field);
                error!("Record received: {}", raw);
                error!("Batch received: {}", week.raw);
                NeoError::MalformedRecord {
                    field,
                    record: raw.to_string(),
                    batch: week.raw.to_string(),
                }
            };

            let event = record::parse_event(date, raw, today).map_err(malformed)?;
            if !known_ids.contains(&event.asteroid_id) {
                let asteroid = record::parse_asteroid(raw).map_err(malformed)?;
                known_ids.insert(asteroid.asteroid_id);
                asteroids.push(asteroid);
            }
            events.push(event);
        }
    }

    Ok((events, asteroids))
}
