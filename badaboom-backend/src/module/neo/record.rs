//! NeoWs record normalization
//!
//! Turns one `near_earth_objects` entry into a [`NeoEvent`] and, for asteroids
//! seen for the first time, an [`Asteroid`]. Numbers are accepted either as
//! JSON numbers or numeric strings, the feed uses both.

use badaboom_common::{Asteroid, DiameterRange, NeoEvent};
use chrono::NaiveDate;
use serde_json::Value;

const ID: &str = "/id";
const REFERENCE_ID: &str = "/neo_reference_id";
const HAZARDOUS: &str = "/is_potentially_hazardous_asteroid";
const VELOCITY_KMS: &str = "/close_approach_data/0/relative_velocity/kilometers_per_second";
const MISS_DISTANCE_KM: &str = "/close_approach_data/0/miss_distance/kilometers";
const NAME: &str = "/name";
const SENTRY: &str = "/is_sentry_object";
const JPL_URL: &str = "/nasa_jpl_url";
const MAGNITUDE: &str = "/absolute_magnitude_h";
const DIAMETER: &str = "/estimated_diameter";
const DIAMETER_MIN_KM: &str = "/estimated_diameter/kilometers/estimated_diameter_min";
const DIAMETER_MAX_KM: &str = "/estimated_diameter/kilometers/estimated_diameter_max";

/// Name of the first required field that is missing or unusable
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldError(pub String);

impl FieldError {
    fn at(pointer: &str) -> Self {
        Self(pointer.trim_start_matches('/').replace('/', "."))
    }
}

pub fn parse_event(
    date: NaiveDate,
    record: &Value,
    today: NaiveDate,
) -> Result<NeoEvent, FieldError> {
    Ok(NeoEvent {
        date,
        asteroid_id: integer(record, ID)?,
        asteroid_reference_id: integer(record, REFERENCE_ID)?,
        is_potentially_hazardous: boolean(record, HAZARDOUS)?,
        is_estimation: date >= today,
        relative_velocity_kms: float(record, VELOCITY_KMS)?,
        miss_distance_km: float(record, MISS_DISTANCE_KM)?,
    })
}

pub fn parse_asteroid(record: &Value) -> Result<Asteroid, FieldError> {
    let absolute_magnitude = match record.pointer(MAGNITUDE) {
        None | Some(Value::Null) => None,
        Some(_) => Some(float(record, MAGNITUDE)?),
    };

    let estimated_diameter = match record.pointer(DIAMETER) {
        None | Some(Value::Null) => None,
        Some(_) => Some(DiameterRange {
            min_km: float(record, DIAMETER_MIN_KM)?,
            max_km: float(record, DIAMETER_MAX_KM)?,
        }),
    };

    Ok(Asteroid {
        asteroid_id: integer(record, ID)?,
        reference_id: integer(record, REFERENCE_ID)?,
        name: string(record, NAME)?,
        is_potentially_hazardous: boolean(record, HAZARDOUS)?,
        is_sentry_object: boolean(record, SENTRY)?,
        absolute_magnitude,
        info_url: string(record, JPL_URL)?,
        estimated_diameter,
    })
}

fn field<'a>(record: &'a Value, pointer: &str) -> Result<&'a Value, FieldError> {
    record.pointer(pointer).ok_or_else(|| FieldError::at(pointer))
}

fn integer(record: &Value, pointer: &str) -> Result<i64, FieldError> {
    match field(record, pointer)? {
        Value::Number(n) => n.as_i64(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
    .ok_or_else(|| FieldError::at(pointer))
}

fn float(record: &Value, pointer: &str) -> Result<f64, FieldError> {
    match field(record, pointer)? {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
    .ok_or_else(|| FieldError::at(pointer))
}

fn boolean(record: &Value, pointer: &str) -> Result<bool, FieldError> {
    match field(record, pointer)? {
        Value::Bool(b) => Some(*b),
        Value::String(s) => s.trim().to_lowercase().parse().ok(),
        _ => None,
    }
    .ok_or_else(|| FieldError::at(pointer))
}

fn string(record: &Value, pointer: &str) -> Result<String, FieldError> {
    match field(record, pointer)? {
        Value::String(s) => Ok(s.clone()),
        _ => Err(FieldError::at(pointer)),
    }
}
