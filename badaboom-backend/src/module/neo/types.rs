use badaboom_common::{Asteroid, NeoEvent};
use chrono::NaiveDate;
use serde_json::Value;
use std::collections::{BTreeMap, HashSet};
use std::path::PathBuf;

/// Default NeoWs REST root
pub const DEFAULT_API_LOCATION: &str = "https://api.nasa.gov/neo/rest/v1/";
pub const DEFAULT_NEO_FEED_PATH: &str = "neo_feed_data.csv";
pub const DEFAULT_ASTEROID_PATH: &str = "asteroid_data.csv";

/// Raw answer of one feed request
#[derive(Debug, Clone)]
pub struct FeedPage {
    pub body: Value,
    /// `X-RateLimit-Remaining`, if the header was present and numeric
    pub rate_limit_remaining: Option<u32>,
}

/// NEO records of one feed window, grouped by approach date
#[derive(Debug, Clone, Default)]
pub struct WeekFeed {
    pub days: BTreeMap<NaiveDate, Vec<Value>>,
    /// Whole response body, kept for error reports
    pub raw: Value,
}

impl WeekFeed {
    pub fn record_count(&self) -> usize {
        self.days.values().map(Vec::len).sum()
    }
}

/// The two cached tables
#[derive(Debug, Clone, Default, PartialEq)]
pub struct NeoTables {
    /// Sorted by date
    pub events: Vec<NeoEvent>,
    /// Sorted by asteroid id, ids unique
    pub asteroids: Vec<Asteroid>,
}

impl NeoTables {
    /// Restore the table orderings after rows were appended
    pub fn sort(&mut self) {
        self.events.sort_by_key(|e| e.date);
        self.asteroids.sort_by_key(|a| a.asteroid_id);
    }

    /// Events within `[start, end]` and the asteroids they reference
    pub fn select(&self, start: NaiveDate, end: NaiveDate) -> YearSlice {
        let events: Vec<NeoEvent> = self
            .events
            .iter()
            .filter(|e| e.date >= start && e.date <= end)
            .cloned()
            .collect();

        let referenced: HashSet<i64> = events.iter().map(|e| e.asteroid_id).collect();
        let asteroids = self
            .asteroids
            .iter()
            .filter(|a| referenced.contains(&a.asteroid_id))
            .cloned()
            .collect();

        YearSlice { events, asteroids }
    }
}

/// Events of one window and the asteroids referenced by them
#[derive(Debug, Clone, Default, PartialEq)]
pub struct YearSlice {
    pub events: Vec<NeoEvent>,
    pub asteroids: Vec<Asteroid>,
}

impl YearSlice {
    pub fn has_estimation(&self) -> bool {
        self.events.iter().any(|e| e.is_estimation)
    }

    pub fn into_parts(self) -> (Vec<NeoEvent>, Vec<Asteroid>) {
        (self.events, self.asteroids)
    }
}

/// Locations of the two cache files
#[derive(Debug, Clone)]
pub struct ParserPaths {
    pub neo_feed_path: PathBuf,
    pub asteroid_path: PathBuf,
}

impl Default for ParserPaths {
    fn default() -> Self {
        Self {
            neo_feed_path: PathBuf::from(DEFAULT_NEO_FEED_PATH),
            asteroid_path: PathBuf::from(DEFAULT_ASTEROID_PATH),
        }
    }
}
