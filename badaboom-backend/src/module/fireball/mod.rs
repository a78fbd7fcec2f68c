//! Fireball events from the JPL fireball API
//!
//! Fetches the full catalogue and parses it into [`Fireball`] rows.

mod parser;
pub use parser::parse_fireball_json;

mod api_client;
pub use api_client::{FIREBALL_API_URL, FireballClient};

pub use badaboom_common::Fireball;
