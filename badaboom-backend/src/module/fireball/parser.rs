//! JPL fireball API JSON parser
//!
//! The API answers with a `fields` header and `data` rows of strings (or null),
//! see https://ssd-api.jpl.nasa.gov/doc/fireball.html

use anyhow::{Context, Result};
use badaboom_common::Fireball;
use chrono::NaiveDateTime;
use serde::Deserialize;

/// The API reports energy in units of 10^10 J
const ENERGY_TO_GJ: f64 = 10.0;

/// Wrapper for the JSON response
#[derive(Debug, Deserialize)]
struct FireballResponse {
    fields: Vec<String>,
    #[serde(default)]
    data: Vec<Vec<Option<String>>>,
}

/// Column positions of the known fields
struct Columns {
    date: usize,
    energy: Option<usize>,
    impact_e: Option<usize>,
    lat: Option<usize>,
    lat_dir: Option<usize>,
    lon: Option<usize>,
    lon_dir: Option<usize>,
    alt: Option<usize>,
    vel: Option<usize>,
}

impl Columns {
    fn from_fields(fields: &[String]) -> Result<Self> {
        let find = |name: &str| fields.iter().position(|f| f == name);

        Ok(Self {
            date: find("date").context("Fireball response has no `date` field")?,
            energy: find("energy"),
            impact_e: find("impact-e"),
            lat: find("lat"),
            lat_dir: find("lat-dir"),
            lon: find("lon"),
            lon_dir: find("lon-dir"),
            alt: find("alt"),
            vel: find("vel"),
        })
    }
}

/// Parse the fireball API JSON into rows, energy converted to gigajoules
pub fn parse_fireball_json(json: &str) -> Result<Vec<Fireball>> {
    let resp: FireballResponse =
        serde_json::from_str(json).context("Failed to deserialize fireball JSON")?;
    let columns = Columns::from_fields(&resp.fields)?;

    resp.data
        .iter()
        .enumerate()
        .map(|(index, row)| {
            parse_row(&columns, row).context(format!("Invalid fireball row {}: {:?}", index, row))
        })
        .collect()
}

fn parse_row(columns: &Columns, row: &[Option<String>]) -> Result<Fireball> {
    let cell = |index: Option<usize>| -> Option<&str> {
        index
            .and_then(|i| row.get(i))
            .and_then(|v| v.as_deref())
            .map(str::trim)
            .filter(|v| !v.is_empty())
    };
    let number = |index: Option<usize>| -> Result<Option<f64>> {
        cell(index)
            .map(|v| v.parse::<f64>().context(format!("`{}` is not a number", v)))
            .transpose()
    };

    let date = cell(Some(columns.date)).context("Missing fireball date")?;

    Ok(Fireball {
        date: parse_date(date)?,
        energy_gj: number(columns.energy)?.map(|e| e * ENERGY_TO_GJ),
        impact_energy_kt: number(columns.impact_e)?,
        latitude: number(columns.lat)?,
        latitude_dir: cell(columns.lat_dir).map(str::to_string),
        longitude: number(columns.lon)?,
        longitude_dir: cell(columns.lon_dir).map(str::to_string),
        altitude_km: number(columns.alt)?,
        velocity_kms: number(columns.vel)?,
    })
}

/// Accepts "2021-01-01 12:34:56" as sent by the API and the ISO "T" form
fn parse_date(text: &str) -> Result<NaiveDateTime> {
    NaiveDateTime::parse_from_str(text, "%Y-%m-%d %H:%M:%S")
        .or_else(|_| NaiveDateTime::parse_from_str(text, "%Y-%m-%dT%H:%M:%S"))
        .context(format!("Invalid fireball date `{}`", text))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Datelike;

    const SAMPLE: &str = r#"{
        "signature": {"source": "NASA/JPL Fireball Data API", "version": "1.2"},
        "count": "2",
        "fields": ["date", "energy", "impact-e", "lat", "lat-dir", "lon", "lon-dir", "alt", "vel"],
        "data": [
            ["2021-01-01 00:00:00", "1.1", "2.2", "3.3", "N", "4.4", "W", "5.5", "6.6"],
            ["2021-02-01T00:00:00", null, "2.3", null, null, "4.5", "E", "", null]
        ]
    }"#;

    #[test]
    fn test_parse_fireball_json() {
        let fireballs = parse_fireball_json(SAMPLE).unwrap();
        assert_eq!(fireballs.len(), 2);

        let first = &fireballs[0];
        assert_eq!(first.date.year(), 2021);
        assert!((first.energy_gj.unwrap() - 11.0).abs() < 1e-9);
        assert_eq!(first.impact_energy_kt, Some(2.2));
        assert_eq!(first.latitude, Some(3.3));
        assert_eq!(first.latitude_dir.as_deref(), Some("N"));
        assert_eq!(first.longitude_dir.as_deref(), Some("W"));
        assert_eq!(first.altitude_km, Some(5.5));
        assert_eq!(first.velocity_kms, Some(6.6));
        assert_eq!(first.coordinates().unwrap().longitude, -4.4);

        let second = &fireballs[1];
        assert_eq!(second.date.month(), 2);
        assert_eq!(second.energy_gj, None);
        assert_eq!(second.latitude, None);
        assert_eq!(second.altitude_km, None);
        assert!(!second.has_location());
    }

    #[test]
    fn test_fields_are_matched_by_name() {
        let json = r#"{"fields": ["energy", "date"], "data": [["2.0", "2010-05-06 07:08:09"]]}"#;
        let fireballs = parse_fireball_json(json).unwrap();

        assert_eq!(fireballs[0].energy_gj, Some(20.0));
        assert_eq!(fireballs[0].velocity_kms, None);
    }

    #[test]
    fn test_bad_values_are_errors() {
        let no_date = r#"{"fields": ["energy"], "data": [["2.0"]]}"#;
        assert!(parse_fireball_json(no_date).is_err());

        let bad_number = r#"{"fields": ["date", "energy"], "data": [["2010-05-06 07:08:09", "lots"]]}"#;
        assert!(parse_fireball_json(bad_number).is_err());
    }
}
