//! Descriptive statistics over the cached tables

use badaboom_common::{Asteroid, Coordinates, Fireball, NeoEvent};
use chrono::{Datelike, NaiveDate, NaiveDateTime};
use std::collections::{BTreeMap, HashSet};

/// Asteroid size classes on the maximum estimated diameter
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum SizeClass {
    /// < 100 m
    Small,
    /// 100 m to 500 m
    Medium,
    /// 500 m to 1 km
    Big,
    /// 1 km to 2 km
    Enormous,
    /// 2 km and more
    Gigantic,
}

impl SizeClass {
    pub const ALL: [SizeClass; 5] = [
        SizeClass::Small,
        SizeClass::Medium,
        SizeClass::Big,
        SizeClass::Enormous,
        SizeClass::Gigantic,
    ];

    pub fn classify(max_diameter_km: f64) -> Self {
        if max_diameter_km < 0.1 {
            SizeClass::Small
        } else if max_diameter_km < 0.5 {
            SizeClass::Medium
        } else if max_diameter_km < 1.0 {
            SizeClass::Big
        } else if max_diameter_km < 2.0 {
            SizeClass::Enormous
        } else {
            SizeClass::Gigantic
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            SizeClass::Small => "Asteroids with max diameter < 100m",
            SizeClass::Medium => "Asteroids with max diameter ≥ 100m and < 500m",
            SizeClass::Big => "Asteroids with max diameter ≥ 500m and < 1km",
            SizeClass::Enormous => "Asteroids with max diameter ≥ 1km and < 2km",
            SizeClass::Gigantic => "Asteroids with max diameter ≥ 2km",
        }
    }

    pub fn index(&self) -> usize {
        *self as usize
    }
}

/// Figures of one calendar year
#[derive(Debug, Clone, PartialEq)]
pub struct YearSummary {
    pub year: i32,
    pub unique_asteroids: usize,
    pub events: usize,
    pub min_miss_distance_km: Option<f64>,
    pub hazardous_events: usize,
    /// Asteroid counts indexed by [`SizeClass::index`]; asteroids without a
    /// diameter are not counted
    pub size_counts: [usize; 5],
}

impl YearSummary {
    pub fn from_slice(year: i32, events: &[NeoEvent], asteroids: &[Asteroid]) -> Self {
        let unique_asteroids = events
            .iter()
            .map(|e| e.asteroid_id)
            .collect::<HashSet<_>>()
            .len();

        let min_miss_distance_km = events
            .iter()
            .map(|e| e.miss_distance_km)
            .min_by(|a, b| a.total_cmp(b));

        let mut size_counts = [0; 5];
        for max_km in asteroids.iter().filter_map(Asteroid::max_diameter_km) {
            size_counts[SizeClass::classify(max_km).index()] += 1;
        }

        Self {
            year,
            unique_asteroids,
            events: events.len(),
            min_miss_distance_km,
            hazardous_events: events.iter().filter(|e| e.is_potentially_hazardous).count(),
            size_counts,
        }
    }

    pub fn size_count(&self, class: SizeClass) -> usize {
        self.size_counts[class.index()]
    }
}

/// Unique asteroids seen before today and expected after today
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EncounterCounts {
    /// `(until, count)` when the range starts before today
    pub observed: Option<(NaiveDate, usize)>,
    /// `(from, count)` when the range ends after today
    pub predicted: Option<(NaiveDate, usize)>,
}

pub fn encounter_counts(
    events: &[NeoEvent],
    start_year: i32,
    end_year: i32,
    today: NaiveDate,
) -> EncounterCounts {
    let begin = NaiveDate::from_ymd_opt(start_year, 1, 1).unwrap_or(NaiveDate::MIN);
    let end = NaiveDate::from_ymd_opt(end_year, 12, 31).unwrap_or(NaiveDate::MAX);

    let unique = |filter: &dyn Fn(&NeoEvent) -> bool| {
        events
            .iter()
            .filter(|e| filter(e))
            .map(|e| e.asteroid_id)
            .collect::<HashSet<_>>()
            .len()
    };

    let observed = (start_year <= today.year()).then(|| {
        let until = today.min(end);
        (until, unique(&|e: &NeoEvent| e.date >= begin && e.date < today && e.date <= end))
    });

    let predicted = (end_year >= today.year()).then(|| {
        let from = today.max(begin);
        (from, unique(&|e: &NeoEvent| e.date > from && e.date <= end))
    });

    EncounterCounts { observed, predicted }
}

/// The `n` largest asteroids met in `[start_year, end_year]`, by maximum
/// diameter; asteroids without a diameter come last
pub fn biggest_asteroids(
    events: &[NeoEvent],
    asteroids: &[Asteroid],
    start_year: i32,
    end_year: i32,
    n: usize,
) -> Vec<Asteroid> {
    let ids: HashSet<i64> = events
        .iter()
        .filter(|e| (start_year..=end_year).contains(&e.date.year()))
        .map(|e| e.asteroid_id)
        .collect();

    let mut selected: Vec<Asteroid> = asteroids
        .iter()
        .filter(|a| ids.contains(&a.asteroid_id))
        .cloned()
        .collect();

    selected.sort_by(|a, b| match (b.max_diameter_km(), a.max_diameter_km()) {
        (Some(x), Some(y)) => x.total_cmp(&y),
        (Some(_), None) => std::cmp::Ordering::Greater,
        (None, Some(_)) => std::cmp::Ordering::Less,
        (None, None) => std::cmp::Ordering::Equal,
    });
    selected.truncate(n);
    selected
}

pub fn fireballs_per_year(fireballs: &[Fireball]) -> BTreeMap<i32, usize> {
    count_per_year(fireballs.iter())
}

pub fn fireballs_without_location_per_year(fireballs: &[Fireball]) -> BTreeMap<i32, usize> {
    count_per_year(fireballs.iter().filter(|f| !f.has_location()))
}

fn count_per_year<'a>(fireballs: impl Iterator<Item = &'a Fireball>) -> BTreeMap<i32, usize> {
    let mut counts = BTreeMap::new();
    for fireball in fireballs {
        *counts.entry(fireball.date.year()).or_insert(0) += 1;
    }
    counts
}

/// One histogram bucket, `[lower, upper)` except for the last one
#[derive(Debug, Clone, PartialEq)]
pub struct HistogramBin {
    pub lower: f64,
    pub upper: f64,
    pub count: usize,
}

/// Histogram of `ln(value)` over the positive values
pub fn log_histogram(values: impl IntoIterator<Item = f64>, bins: usize) -> Vec<HistogramBin> {
    let logs: Vec<f64> = values
        .into_iter()
        .filter(|v| *v > 0.0)
        .map(f64::ln)
        .collect();

    if logs.is_empty() || bins == 0 {
        return Vec::new();
    }

    let min = logs.iter().copied().fold(f64::INFINITY, f64::min);
    let max = logs.iter().copied().fold(f64::NEG_INFINITY, f64::max);
    let width = if max > min { (max - min) / bins as f64 } else { 1.0 };

    let mut histogram: Vec<HistogramBin> = (0..bins)
        .map(|i| HistogramBin {
            lower: min + i as f64 * width,
            upper: min + (i + 1) as f64 * width,
            count: 0,
        })
        .collect();

    for value in logs {
        let index = (((value - min) / width) as usize).min(bins - 1);
        histogram[index].count += 1;
    }
    histogram
}

/// Histogram of `ln(energy_gj)`
pub fn log_energy_histogram(fireballs: &[Fireball], bins: usize) -> Vec<HistogramBin> {
    log_histogram(fireballs.iter().filter_map(|f| f.energy_gj), bins)
}

/// Histogram of `ln(impact_energy_kt)`
pub fn log_impact_energy_histogram(fireballs: &[Fireball], bins: usize) -> Vec<HistogramBin> {
    log_histogram(fireballs.iter().filter_map(|f| f.impact_energy_kt), bins)
}

const IMPACT_SIZE_SCALE: f64 = 1.25;

/// A located fireball, sized by its radiated energy
#[derive(Debug, Clone, PartialEq)]
pub struct ImpactPoint {
    pub date: NaiveDateTime,
    pub coordinates: Coordinates,
    /// `ln(energy_gj + 1) * 1.25`, zero when the energy is unknown
    pub size: f64,
}

/// Located fireballs with signed coordinates; unlocated ones are skipped
pub fn impact_points(fireballs: &[Fireball]) -> Vec<ImpactPoint> {
    fireballs
        .iter()
        .filter_map(|f| {
            let coordinates = f.coordinates()?;
            let size = f
                .energy_gj
                .filter(|e| *e >= 0.0)
                .map_or(0.0, |e| (e + 1.0).ln() * IMPACT_SIZE_SCALE);
            Some(ImpactPoint {
                date: f.date,
                coordinates,
                size,
            })
        })
        .collect()
}

/// `(min, max)` signed latitude of the points
pub fn latitude_range(points: &[ImpactPoint]) -> Option<(f64, f64)> {
    points.iter().map(|p| p.coordinates.latitude).fold(None, |range, lat| {
        Some(match range {
            None => (lat, lat),
            Some((min, max)) => (f64::min(min, lat), f64::max(max, lat)),
        })
    })
}
