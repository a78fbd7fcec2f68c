//! Near-Earth-object data from the NASA "Asteroids - NeoWs" API
//!
//! ## Main Components
//! - `NeoWsClient`: weekly feed requests, waits out the hourly quota
//! - `NeoCache`: the two CSV tables on disk
//! - `AsteroidDatasetParser`: per-year access, refetching stale years

mod types;
pub use types::*;

mod error;
pub use error::NeoError;

mod clock;
pub use clock::{Clock, SystemClock};

mod record;

mod api_client;
pub use api_client::{
    FeedTransport, HttpFeedTransport, MAX_WINDOW_DAYS, NeoWsClient, RATE_LIMIT_COOLDOWN,
};

mod cache;
pub use cache::{ASTEROID_COLUMNS, EVENT_COLUMNS, NeoCache};

mod parser;
pub use parser::{AsteroidDatasetParser, weekly_windows};
