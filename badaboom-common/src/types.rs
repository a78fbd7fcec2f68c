use chrono::{NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};

/// One close approach of an asteroid, as reported by the NeoWs feed
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NeoEvent {
    /// Approach date (UTC, day precision)
    pub date: NaiveDate,
    /// Foreign key to [`Asteroid::asteroid_id`]
    pub asteroid_id: i64,
    /// NeoWs `neo_reference_id`
    pub asteroid_reference_id: i64,
    pub is_potentially_hazardous: bool,
    /// Dated on or after the day it was fetched, so the figures are a model prediction
    pub is_estimation: bool,
    /// Relative velocity in km/s
    pub relative_velocity_kms: f64,
    /// Miss distance in km
    pub miss_distance_km: f64,
}

/// Estimated diameter bounds in kilometers
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DiameterRange {
    pub min_km: f64,
    pub max_km: f64,
}

/// A distinct asteroid. First-seen attributes are kept.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(from = "AsteroidRecord", into = "AsteroidRecord")]
pub struct Asteroid {
    pub asteroid_id: i64,
    pub reference_id: i64,
    pub name: String,
    pub is_potentially_hazardous: bool,
    pub is_sentry_object: bool,
    /// Absolute magnitude (H), missing in some source records
    pub absolute_magnitude: Option<f64>,
    /// NASA JPL page for the asteroid
    pub info_url: String,
    /// Missing in some source records
    pub estimated_diameter: Option<DiameterRange>,
}

impl Asteroid {
    /// Upper diameter bound, used for size classification
    pub fn max_diameter_km(&self) -> Option<f64> {
        self.estimated_diameter.map(|d| d.max_km)
    }
}

/// Flat on-disk layout of [`Asteroid`]; the diameter pair is either both
/// empty or both filled.
#[derive(Debug, Clone, Serialize, Deserialize)]
struct AsteroidRecord {
    asteroid_id: i64,
    reference_id: i64,
    name: String,
    is_potentially_hazardous: bool,
    is_sentry_object: bool,
    absolute_magnitude: Option<f64>,
    info_url: String,
    estimated_diameter_min_km: Option<f64>,
    estimated_diameter_max_km: Option<f64>,
}

impl From<AsteroidRecord> for Asteroid {
    fn from(record: AsteroidRecord) -> Self {
        let estimated_diameter = match (
            record.estimated_diameter_min_km,
            record.estimated_diameter_max_km,
        ) {
            (Some(min_km), Some(max_km)) => Some(DiameterRange { min_km, max_km }),
            _ => None,
        };

        Self {
            asteroid_id: record.asteroid_id,
            reference_id: record.reference_id,
            name: record.name,
            is_potentially_hazardous: record.is_potentially_hazardous,
            is_sentry_object: record.is_sentry_object,
            absolute_magnitude: record.absolute_magnitude,
            info_url: record.info_url,
            estimated_diameter,
        }
    }
}

impl From<Asteroid> for AsteroidRecord {
    fn from(asteroid: Asteroid) -> Self {
        Self {
            asteroid_id: asteroid.asteroid_id,
            reference_id: asteroid.reference_id,
            name: asteroid.name,
            is_potentially_hazardous: asteroid.is_potentially_hazardous,
            is_sentry_object: asteroid.is_sentry_object,
            absolute_magnitude: asteroid.absolute_magnitude,
            info_url: asteroid.info_url,
            estimated_diameter_min_km: asteroid.estimated_diameter.map(|d| d.min_km),
            estimated_diameter_max_km: asteroid.estimated_diameter.map(|d| d.max_km),
        }
    }
}

/// Signed geographic position in degrees (south and west are negative)
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Coordinates {
    pub latitude: f64,
    pub longitude: f64,
}

/// One fireball reported by the JPL fireball API
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Fireball {
    /// Peak brightness time (UTC)
    pub date: NaiveDateTime,
    /// Total radiated energy in gigajoules
    pub energy_gj: Option<f64>,
    /// Calculated total impact energy in kilotons
    pub impact_energy_kt: Option<f64>,
    /// Latitude in degrees, unsigned
    pub latitude: Option<f64>,
    /// "N" or "S"
    pub latitude_dir: Option<String>,
    /// Longitude in degrees, unsigned
    pub longitude: Option<f64>,
    /// "E" or "W"
    pub longitude_dir: Option<String>,
    /// Altitude above the geoid in km
    pub altitude_km: Option<f64>,
    /// Velocity at peak brightness in km/s
    pub velocity_kms: Option<f64>,
}

impl Fireball {
    pub fn has_location(&self) -> bool {
        self.latitude.is_some() && self.longitude.is_some()
    }

    /// Signed coordinates, `None` when the fireball was not located.
    /// Only "N" and "E" are positive; any other direction, including a
    /// missing one, is negative.
    pub fn coordinates(&self) -> Option<Coordinates> {
        let latitude = self.latitude?;
        let longitude = self.longitude?;

        let lat_sign = if self.latitude_dir.as_deref() == Some("N") { 1.0 } else { -1.0 };
        let lon_sign = if self.longitude_dir.as_deref() == Some("E") { 1.0 } else { -1.0 };

        Some(Coordinates {
            latitude: lat_sign * latitude,
            longitude: lon_sign * longitude,
        })
    }
}
