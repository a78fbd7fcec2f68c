//! Markdown report of the biggest asteroids

use anyhow::{Context, Result};
use badaboom_common::Asteroid;
use std::path::{Path, PathBuf};
use tabled::{builder::Builder, settings::Style};

const BIGGEST_ASTEROID_HEADERS: [&str; 6] = [
    "asteroid_neo_reference_id",
    "asteroid_name",
    "estimated_diameter_min",
    "estimated_diameter_max",
    "absolute_magnitude_h",
    "links",
];

/// Table of asteroids, missing values left blank
pub fn biggest_asteroids_markdown(asteroids: &[Asteroid]) -> String {
    let optional = |v: Option<f64>| v.map(|v| v.to_string()).unwrap_or_default();

    let mut table = Builder::default();
    table.push_record(BIGGEST_ASTEROID_HEADERS);
    for a in asteroids {
        table.push_record([
            a.reference_id.to_string(),
            a.name.clone(),
            optional(a.estimated_diameter.map(|d| d.min_km)),
            optional(a.estimated_diameter.map(|d| d.max_km)),
            optional(a.absolute_magnitude),
            a.info_url.clone(),
        ]);
    }

    table.build().with(Style::markdown()).to_string()
}

pub fn report_file_name(start_year: i32, end_year: i32) -> String {
    format!("biggest_asteroid_between_{}_{}.md", start_year, end_year)
}

/// Write the table to `biggest_asteroid_between_<start>_<end>.md`
pub async fn write_asteroid_report(
    output_dir: impl AsRef<Path>,
    start_year: i32,
    end_year: i32,
    markdown: &str,
) -> Result<PathBuf> {
    let output_dir = output_dir.as_ref();
    tokio::fs::create_dir_all(output_dir)
        .await
        .context(format!("Failed to create output directory {:?}", output_dir))?;

    let path = output_dir.join(report_file_name(start_year, end_year));
    tokio::fs::write(&path, markdown)
        .await
        .context(format!("Failed to write report {:?}", path))?;

    tracing::info!("Wrote asteroid report: {:?}", path);
    Ok(path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use badaboom_common::DiameterRange;
    use tempfile::TempDir;

    #[test]
    fn test_biggest_asteroids_markdown() {
        let asteroids = vec![
            Asteroid {
                asteroid_id: 2000433,
                reference_id: 2000433,
                name: "433 Eros (A898 PA)".to_string(),
                is_potentially_hazardous: false,
                is_sentry_object: false,
                absolute_magnitude: Some(10.4),
                info_url: "http://api.nasa.gov/neo/rest/v1/neo/2000433".to_string(),
                estimated_diameter: Some(DiameterRange {
                    min_km: 22.0,
                    max_km: 49.0,
                }),
            },
            Asteroid {
                asteroid_id: 3,
                reference_id: 3,
                name: "tiny".to_string(),
                is_potentially_hazardous: false,
                is_sentry_object: false,
                absolute_magnitude: None,
                info_url: String::new(),
                estimated_diameter: None,
            },
        ];

        let table = biggest_asteroids_markdown(&asteroids);
        let lines: Vec<&str> = table.lines().collect();

        assert_eq!(lines.len(), 4);
        assert!(lines[0].starts_with("| asteroid_neo_reference_id |"));
        assert!(lines[0].contains("| links"));
        assert!(lines[1].starts_with("|--"));
        assert!(lines[2].starts_with("| 2000433 "));
        assert!(lines[2].contains("| 433 Eros (A898 PA) "));
        assert!(lines[2].contains(" 10.4 "));
        assert!(lines[2].contains("http://api.nasa.gov/neo/rest/v1/neo/2000433"));
        assert!(lines[3].starts_with("| 3 "));
        assert!(lines[3].contains("| tiny "));
    }

    #[test]
    fn test_empty_table_has_headers() {
        let table = biggest_asteroids_markdown(&[]);
        let header = table.lines().next().unwrap();
        assert!(header.starts_with("| asteroid_neo_reference_id |"));
        assert!(header.contains("estimated_diameter_max"));
        assert!(header.contains("links"));
    }

    #[tokio::test]
    async fn test_write_asteroid_report() {
        let dir = TempDir::new().unwrap();
        let path = write_asteroid_report(dir.path(), 1980, 2030, "| a |").await.unwrap();

        assert_eq!(path, dir.path().join("biggest_asteroid_between_1980_2030.md"));
        assert_eq!(std::fs::read_to_string(path).unwrap(), "| a |");
    }
}
