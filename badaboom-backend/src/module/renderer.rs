//! Bar chart renderer
//!
//! Builds SVG bar charts from the yearly statistics and rasterizes them to PNG.

use super::stats::{HistogramBin, ImpactPoint, SizeClass, YearSummary};
use anyhow::{Context, Result};
use chrono::NaiveDate;
use resvg::tiny_skia;
use resvg::usvg::{fontdb, Options, Tree};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

pub const EVENTS_CHART_FILE: &str = "unique_events_per_year.png";
pub const SIZES_CHART_FILE: &str = "asteroid_size_per_year.png";
pub const FIREBALLS_CHART_FILE: &str = "fireballs_per_year.png";
pub const MISSING_LOCATION_CHART_FILE: &str = "fireball_missing_locations.png";
pub const ENERGY_CHART_FILE: &str = "fireball_energy_hist.png";
pub const IMPACT_ENERGY_CHART_FILE: &str = "fireball_impact_energy_hist.png";
pub const FIREBALL_MAP_FILE: &str = "fireball_map.png";

const FONTS_DIR: &str = "fonts";
const FONT_FAMILY: &str = "DejaVu Sans";

const SIZE_COLORS: [&str; 5] = ["grey", "firebrick", "blue", "black", "red"];

const WIDTH: f32 = 1350.0;
const HEIGHT: f32 = 600.0;
const MARGIN_LEFT: f32 = 80.0;
const MARGIN_RIGHT: f32 = 30.0;
const MARGIN_TOP: f32 = 90.0;
const MARGIN_BOTTOM: f32 = 70.0;
const Y_TICKS: usize = 5;
const MAX_X_LABELS: usize = 25;
const BAR_GAP: f32 = 0.15;
const GROUP_GAP: f32 = 0.1;

const MAP_WIDTH: f32 = 1000.0;
const MAP_LEFT: f32 = 20.0;
const MAP_TOP: f32 = 60.0;
const GRATICULE_STEP: i32 = 30;
const MIN_MARKER_RADIUS: f32 = 1.5;

/// How several series share one category
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BarLayout {
    Grouped,
    Stacked,
}

#[derive(Debug, Clone)]
pub struct Series {
    pub name: String,
    pub color: &'static str,
    pub values: Vec<f64>,
}

/// A bar chart, one value per category in every series
#[derive(Debug, Clone)]
pub struct BarChart {
    pub title: String,
    pub x_label: String,
    pub y_label: String,
    pub categories: Vec<String>,
    pub series: Vec<Series>,
    pub layout: BarLayout,
}

impl BarChart {
    fn plot_width() -> f32 {
        WIDTH - MARGIN_LEFT - MARGIN_RIGHT
    }

    fn plot_height() -> f32 {
        HEIGHT - MARGIN_TOP - MARGIN_BOTTOM
    }

    fn value(&self, series: usize, category: usize) -> f64 {
        self.series[series]
            .values
            .get(category)
            .copied()
            .unwrap_or(0.0)
            .max(0.0)
    }

    /// Largest bar height, a stacked bar counts as one
    fn max_value(&self) -> f64 {
        (0..self.categories.len())
            .map(|c| {
                let values = (0..self.series.len()).map(|s| self.value(s, c));
                match self.layout {
                    BarLayout::Grouped => values.fold(0.0, f64::max),
                    BarLayout::Stacked => values.sum(),
                }
            })
            .fold(0.0, f64::max)
    }

    pub fn to_svg(&self) -> String {
        let y_max = nice_ceiling(self.max_value());
        let plot_w = Self::plot_width();
        let plot_h = Self::plot_height();
        let bottom = MARGIN_TOP + plot_h;
        let scale = |v: f64| (v / y_max) as f32 * plot_h;

        let mut svg = String::new();
        svg.push_str(&format!(
            r#"<svg xmlns="http://www.w3.org/2000/svg" width="{w}" height="{h}" viewBox="0 0 {w} {h}">"#,
            w = WIDTH,
            h = HEIGHT
        ));
        svg.push_str(&format!(
            r#"<style>text {{ font-family: '{}', sans-serif; fill: #222222; }} .title {{ font-size: 20px; }} .axis {{ font-size: 12px; }} .label {{ font-size: 14px; }}</style>"#,
            FONT_FAMILY
        ));
        svg.push_str(&format!(
            r#"<rect x="0" y="0" width="{}" height="{}" fill="white"/>"#,
            WIDTH, HEIGHT
        ));
        svg.push_str(&format!(
            r#"<text x="{}" y="30" class="title">{}</text>"#,
            MARGIN_LEFT,
            escape_xml(&self.title)
        ));

        // Legend
        let mut legend_x = MARGIN_LEFT;
        for series in &self.series {
            svg.push_str(&format!(
                r#"<rect x="{}" y="48" width="14" height="14" fill="{}"/><text x="{}" y="60" class="axis">{}</text>"#,
                legend_x,
                series.color,
                legend_x + 20.0,
                escape_xml(&series.name)
            ));
            legend_x += 40.0 + series.name.chars().count() as f32 * 6.5;
        }

        // Horizontal grid and y ticks
        for tick in 0..=Y_TICKS {
            let value = y_max * tick as f64 / Y_TICKS as f64;
            let y = bottom - scale(value);
            svg.push_str(&format!(
                r##"<line x1="{}" y1="{y}" x2="{}" y2="{y}" stroke="#dddddd" stroke-width="1"/><text x="{}" y="{}" text-anchor="end" class="axis">{}</text>"##,
                MARGIN_LEFT,
                MARGIN_LEFT + plot_w,
                MARGIN_LEFT - 8.0,
                y + 4.0,
                format_tick(value),
                y = y
            ));
        }

        let band = plot_w / self.categories.len().max(1) as f32;
        let label_every = self.categories.len().div_ceil(MAX_X_LABELS).max(1);

        for (c, category) in self.categories.iter().enumerate() {
            let band_x = MARGIN_LEFT + c as f32 * band;
            let group_w = band * (1.0 - BAR_GAP);
            let group_x = band_x + band * BAR_GAP / 2.0;

            match self.layout {
                BarLayout::Grouped => {
                    let slot = group_w / self.series.len().max(1) as f32;
                    for (s, series) in self.series.iter().enumerate() {
                        let height = scale(self.value(s, c));
                        if height <= 0.0 {
                            continue;
                        }
                        svg.push_str(&bar(
                            group_x + s as f32 * slot + slot * GROUP_GAP / 2.0,
                            bottom - height,
                            slot * (1.0 - GROUP_GAP),
                            height,
                            series.color,
                        ));
                    }
                }
                BarLayout::Stacked => {
                    let mut top = bottom;
                    for (s, series) in self.series.iter().enumerate() {
                        let height = scale(self.value(s, c));
                        if height <= 0.0 {
                            continue;
                        }
                        top -= height;
                        svg.push_str(&bar(group_x, top, group_w, height, series.color));
                    }
                }
            }

            if c % label_every == 0 {
                svg.push_str(&format!(
                    r#"<text x="{}" y="{}" text-anchor="middle" class="axis">{}</text>"#,
                    band_x + band / 2.0,
                    bottom + 18.0,
                    escape_xml(category)
                ));
            }
        }

        // Axes
        svg.push_str(&format!(
            r##"<line x1="{x}" y1="{top}" x2="{x}" y2="{bottom}" stroke="#222222" stroke-width="1"/><line x1="{x}" y1="{bottom}" x2="{right}" y2="{bottom}" stroke="#222222" stroke-width="1"/>"##,
            x = MARGIN_LEFT,
            top = MARGIN_TOP,
            bottom = bottom,
            right = MARGIN_LEFT + plot_w
        ));
        svg.push_str(&format!(
            r#"<text x="{}" y="{}" text-anchor="middle" class="label">{}</text>"#,
            MARGIN_LEFT + plot_w / 2.0,
            HEIGHT - 20.0,
            escape_xml(&self.x_label)
        ));
        svg.push_str(&format!(
            r#"<text x="20" y="{y}" text-anchor="middle" class="label" transform="rotate(-90 20 {y})">{}</text>"#,
            escape_xml(&self.y_label),
            y = MARGIN_TOP + plot_h / 2.0
        ));

        svg.push_str("</svg>");
        svg
    }
}

fn bar(x: f32, y: f32, width: f32, height: f32, color: &str) -> String {
    format!(
        r#"<rect class="bar" x="{:.2}" y="{:.2}" width="{:.2}" height="{:.2}" fill="{}"/>"#,
        x, y, width, height, color
    )
}

/// Smallest 1, 2 or 5 times a power of ten not below `value`
fn nice_ceiling(value: f64) -> f64 {
    if value.is_nan() || value <= 0.0 {
        return 1.0;
    }
    let magnitude = 10f64.powf(value.log10().floor());
    [1.0, 2.0, 5.0, 10.0]
        .iter()
        .map(|step| step * magnitude)
        .find(|candidate| *candidate >= value)
        .unwrap_or(10.0 * magnitude)
}

fn format_tick(value: f64) -> String {
    if value.fract() == 0.0 {
        format!("{}", value as i64)
    } else {
        format!("{:.1}", value)
    }
}

fn escape_xml(text: &str) -> String {
    text.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
        .replace('\'', "&apos;")
}

fn map_height() -> f32 {
    MAP_WIDTH / 2.0
}

/// Equirectangular position of a signed latitude / longitude
fn project(latitude: f64, longitude: f64) -> (f32, f32) {
    let x = MAP_LEFT + ((longitude + 180.0) / 360.0) as f32 * MAP_WIDTH;
    let y = MAP_TOP + ((90.0 - latitude) / 180.0) as f32 * map_height();
    (x, y)
}

/// Impact scatter over a latitude / longitude grid
pub fn fireball_map_svg(points: &[ImpactPoint]) -> String {
    let width = MAP_WIDTH + 2.0 * MAP_LEFT;
    let height = MAP_TOP + map_height() + 20.0;

    let mut svg = String::new();
    svg.push_str(&format!(
        r#"<svg xmlns="http://www.w3.org/2000/svg" width="{w}" height="{h}" viewBox="0 0 {w} {h}">"#,
        w = width,
        h = height
    ));
    svg.push_str(&format!(
        r#"<style>text {{ font-family: '{}', sans-serif; fill: #222222; }} .title {{ font-size: 20px; }} .axis {{ font-size: 11px; fill: #777777; }}</style>"#,
        FONT_FAMILY
    ));
    svg.push_str(&format!(
        r#"<rect x="0" y="0" width="{}" height="{}" fill="white"/>"#,
        width, height
    ));
    svg.push_str(&format!(
        r#"<text x="{}" y="35" class="title">Fireball recorded impacts sorted by energy values.</text>"#,
        MAP_LEFT
    ));
    svg.push_str(&format!(
        r##"<rect x="{}" y="{}" width="{}" height="{}" fill="#dfeaf5" stroke="#222222" stroke-width="1"/>"##,
        MAP_LEFT,
        MAP_TOP,
        MAP_WIDTH,
        map_height()
    ));

    for longitude in (-180..=180).step_by(GRATICULE_STEP as usize) {
        let (x, top) = project(90.0, longitude as f64);
        let (_, bottom) = project(-90.0, longitude as f64);
        svg.push_str(&format!(
            r##"<line x1="{x}" y1="{}" x2="{x}" y2="{}" stroke="#bbbbbb" stroke-width="0.5"/><text x="{x}" y="{}" text-anchor="middle" class="axis">{}</text>"##,
            top,
            bottom,
            bottom + 14.0,
            longitude,
            x = x
        ));
    }
    for latitude in (-90..=90).step_by(GRATICULE_STEP as usize) {
        let (left, y) = project(latitude as f64, -180.0);
        let (right, _) = project(latitude as f64, 180.0);
        svg.push_str(&format!(
            r##"<line x1="{}" y1="{y}" x2="{}" y2="{y}" stroke="#bbbbbb" stroke-width="0.5"/>"##,
            left,
            right,
            y = y
        ));
    }

    for point in points {
        let (x, y) = project(point.coordinates.latitude, point.coordinates.longitude);
        let radius = (point.size as f32).max(MIN_MARKER_RADIUS);
        svg.push_str(&format!(
            r#"<circle class="impact" cx="{:.2}" cy="{:.2}" r="{:.2}" fill="firebrick" fill-opacity="0.6"><title>{}</title></circle>"#,
            x, y, radius, point.date
        ));
    }

    svg.push_str("</svg>");
    svg
}

/// Writes the statistics charts as PNG files into one directory
pub struct ChartRenderer {
    output_dir: PathBuf,
}

impl ChartRenderer {
    pub fn new(output_dir: impl AsRef<Path>) -> Self {
        Self {
            output_dir: output_dir.as_ref().to_path_buf(),
        }
    }

    pub fn output_dir(&self) -> &Path {
        &self.output_dir
    }

    /// Events and unique asteroids per year, side by side
    pub async fn render_events_per_year(
        &self,
        summaries: &[YearSummary],
        produced_on: NaiveDate,
    ) -> Result<PathBuf> {
        let chart = BarChart {
            title: format!("Past and future asteroids events. Produced on {}", produced_on),
            x_label: "Years".to_string(),
            y_label: "Count".to_string(),
            categories: summaries.iter().map(|s| s.year.to_string()).collect(),
            series: vec![
                Series {
                    name: "Number of unique events per year".to_string(),
                    color: "firebrick",
                    values: summaries.iter().map(|s| s.events as f64).collect(),
                },
                Series {
                    name: "Number of unique asteroids per year".to_string(),
                    color: "grey",
                    values: summaries.iter().map(|s| s.unique_asteroids as f64).collect(),
                },
            ],
            layout: BarLayout::Grouped,
        };
        self.render(&chart, EVENTS_CHART_FILE).await
    }

    /// Asteroid size classes per year, stacked
    pub async fn render_sizes_per_year(
        &self,
        summaries: &[YearSummary],
        produced_on: NaiveDate,
    ) -> Result<PathBuf> {
        let series = SizeClass::ALL
            .iter()
            .zip(SIZE_COLORS)
            .map(|(class, color)| Series {
                name: class.label().to_string(),
                color,
                values: summaries.iter().map(|s| s.size_count(*class) as f64).collect(),
            })
            .collect();

        let chart = BarChart {
            title: format!(
                "Past and future asteroids events sorted by size. Produced on {}",
                produced_on
            ),
            x_label: "Years".to_string(),
            y_label: "Count".to_string(),
            categories: summaries.iter().map(|s| s.year.to_string()).collect(),
            series,
            layout: BarLayout::Stacked,
        };
        self.render(&chart, SIZES_CHART_FILE).await
    }

    pub async fn render_fireballs_per_year(&self, counts: &BTreeMap<i32, usize>) -> Result<PathBuf> {
        let chart = yearly_chart("Number of fireballs detected per year.", counts);
        self.render(&chart, FIREBALLS_CHART_FILE).await
    }

    pub async fn render_fireballs_without_location(
        &self,
        counts: &BTreeMap<i32, usize>,
    ) -> Result<PathBuf> {
        let chart = yearly_chart("Recorded fireballs without location.", counts);
        self.render(&chart, MISSING_LOCATION_CHART_FILE).await
    }

    /// Histogram of log values, one bar per bin labelled with its lower bound
    pub async fn render_histogram(
        &self,
        bins: &[HistogramBin],
        title: &str,
        x_label: &str,
        file_name: &str,
    ) -> Result<PathBuf> {
        let chart = BarChart {
            title: title.to_string(),
            x_label: x_label.to_string(),
            y_label: "Occurrences".to_string(),
            categories: bins.iter().map(|b| format!("{:.1}", b.lower)).collect(),
            series: vec![Series {
                name: x_label.to_string(),
                color: "steelblue",
                values: bins.iter().map(|b| b.count as f64).collect(),
            }],
            layout: BarLayout::Grouped,
        };
        self.render(&chart, file_name).await
    }

    /// Located fireballs on a world grid, marker radius from the energy
    pub async fn render_fireball_map(&self, points: &[ImpactPoint]) -> Result<PathBuf> {
        self.write_png(&fireball_map_svg(points), FIREBALL_MAP_FILE).await
    }

    pub async fn render(&self, chart: &BarChart, file_name: &str) -> Result<PathBuf> {
        self.write_png(&chart.to_svg(), file_name).await
    }

    async fn write_png(&self, svg: &str, file_name: &str) -> Result<PathBuf> {
        tokio::fs::create_dir_all(&self.output_dir)
            .await
            .context(format!("Failed to create output directory {:?}", self.output_dir))?;

        let output_path = self.output_dir.join(file_name);
        render_svg_to_png(svg, &output_path).await?;

        tracing::info!("Generated chart: {:?}", output_path);
        Ok(output_path)
    }
}

fn yearly_chart(title: &str, counts: &BTreeMap<i32, usize>) -> BarChart {
    BarChart {
        title: title.to_string(),
        x_label: "year".to_string(),
        y_label: "Occurrences".to_string(),
        categories: counts.keys().map(|y| y.to_string()).collect(),
        series: vec![Series {
            name: "Occurrences".to_string(),
            color: "steelblue",
            values: counts.values().map(|c| *c as f64).collect(),
        }],
        layout: BarLayout::Grouped,
    }
}

async fn render_svg_to_png(svg_content: &str, output_path: &Path) -> Result<()> {
    let mut fontdb = fontdb::Database::new();
    fontdb.load_system_fonts();
    fontdb.load_fonts_dir(FONTS_DIR);
    tracing::debug!("Loaded {} font faces", fontdb.len());

    let mut options = Options::default();
    options.font_family = FONT_FAMILY.to_string();
    options.fontdb = std::sync::Arc::new(fontdb);

    let tree = Tree::from_str(svg_content, &options).context("Failed to parse SVG")?;

    let size = tree.size().to_int_size();
    let mut pixmap = tiny_skia::Pixmap::new(size.width(), size.height())
        .context("Failed to create pixmap")?;

    resvg::render(&tree, tiny_skia::Transform::default(), &mut pixmap.as_mut());

    let png_data = pixmap.encode_png().context("Failed to encode PNG")?;
    tokio::fs::write(output_path, png_data)
        .await
        .context(format!("Failed to write PNG file {:?}", output_path))?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn chart(layout: BarLayout) -> BarChart {
        BarChart {
            title: "Counts <per> year".to_string(),
            x_label: "Years".to_string(),
            y_label: "Count".to_string(),
            categories: vec!["2019".into(), "2020".into(), "2021".into()],
            series: vec![
                Series {
                    name: "events".into(),
                    color: "firebrick",
                    values: vec![3.0, 0.0, 7.0],
                },
                Series {
                    name: "asteroids".into(),
                    color: "grey",
                    values: vec![2.0, 1.0, 4.0],
                },
            ],
            layout,
        }
    }

    #[test]
    fn test_nice_ceiling() {
        assert_eq!(nice_ceiling(0.0), 1.0);
        assert_eq!(nice_ceiling(7.0), 10.0);
        assert_eq!(nice_ceiling(11.0), 20.0);
        assert_eq!(nice_ceiling(200.0), 200.0);
        assert_eq!(nice_ceiling(3100.0), 5000.0);
    }

    #[test]
    fn test_grouped_chart_skips_empty_bars() {
        let svg = chart(BarLayout::Grouped).to_svg();

        assert_eq!(svg.matches(r#"class="bar""#).count(), 5);
        assert!(svg.contains("Counts &lt;per&gt; year"));
        assert!(svg.contains(">2020</text>"));
        assert!(svg.starts_with("<svg"));
        assert!(svg.ends_with("</svg>"));
    }

    #[test]
    fn test_stacked_chart_scales_on_totals() {
        let stacked = chart(BarLayout::Stacked);
        assert_eq!(stacked.max_value(), 11.0);
        assert_eq!(chart(BarLayout::Grouped).max_value(), 7.0);

        // 11 rounds up to 20: the 2021 stack fills 11/20 of the plot
        let svg = stacked.to_svg();
        let top = MARGIN_TOP + BarChart::plot_height() * (1.0 - 11.0 / 20.0);
        assert!(svg.contains(&format!(r#"y="{:.2}""#, top)));
    }

    #[test]
    fn test_empty_chart() {
        let empty = BarChart {
            categories: Vec::new(),
            series: Vec::new(),
            ..chart(BarLayout::Grouped)
        };
        let svg = empty.to_svg();
        assert_eq!(svg.matches(r#"class="bar""#).count(), 0);
    }

    #[tokio::test]
    async fn test_render_png() {
        let dir = TempDir::new().unwrap();
        let renderer = ChartRenderer::new(dir.path().join("charts"));

        let summaries = vec![YearSummary {
            year: 2020,
            unique_asteroids: 2,
            events: 3,
            min_miss_distance_km: Some(1000.0),
            hazardous_events: 1,
            size_counts: [1, 1, 0, 0, 0],
        }];
        let today = NaiveDate::from_ymd_opt(2021, 1, 1).unwrap();

        let path = renderer.render_sizes_per_year(&summaries, today).await.unwrap();
        assert_eq!(path, dir.path().join("charts").join(SIZES_CHART_FILE));

        let bytes = std::fs::read(&path).unwrap();
        assert_eq!(&bytes[1..4], b"PNG");
    }

    fn impact(latitude: f64, longitude: f64, size: f64) -> ImpactPoint {
        ImpactPoint {
            date: NaiveDate::from_ymd_opt(2013, 2, 15)
                .unwrap()
                .and_hms_opt(3, 20, 33)
                .unwrap(),
            coordinates: badaboom_common::Coordinates {
                latitude,
                longitude,
            },
            size,
        }
    }

    #[test]
    fn test_map_projection() {
        assert_eq!(project(90.0, -180.0), (MAP_LEFT, MAP_TOP));
        assert_eq!(
            project(0.0, 0.0),
            (MAP_LEFT + MAP_WIDTH / 2.0, MAP_TOP + map_height() / 2.0)
        );
        assert_eq!(
            project(-45.0, -90.0),
            (MAP_LEFT + MAP_WIDTH / 4.0, MAP_TOP + map_height() * 0.75)
        );
    }

    #[test]
    fn test_fireball_map_markers() {
        let svg = fireball_map_svg(&[impact(0.0, 0.0, 5.0), impact(-45.0, -90.0, 0.0)]);

        assert_eq!(svg.matches(r#"class="impact""#).count(), 2);
        assert!(svg.contains(&format!(
            r#"cx="{:.2}" cy="{:.2}" r="5.00""#,
            MAP_LEFT + MAP_WIDTH / 2.0,
            MAP_TOP + map_height() / 2.0
        )));
        assert!(svg.contains(&format!(r#"r="{:.2}""#, MIN_MARKER_RADIUS)));
        assert!(svg.contains("<title>2013-02-15 03:20:33</title>"));
    }

    #[tokio::test]
    async fn test_render_fireball_map() {
        let dir = TempDir::new().unwrap();
        let renderer = ChartRenderer::new(dir.path());

        let path = renderer
            .render_fireball_map(&[impact(54.8, 61.1, 6.2)])
            .await
            .unwrap();
        assert_eq!(path, dir.path().join(FIREBALL_MAP_FILE));
        assert_eq!(&std::fs::read(&path).unwrap()[1..4], b"PNG");
    }
}
