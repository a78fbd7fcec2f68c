//! `badaboom`: statistics on near-Earth asteroids and fireballs from NASA data.
//!
//! ```text
//! badaboom asteroids --api-key DEMO_KEY --start-year 1980 --end-year 2030
//! badaboom fireballs --output-dir fireball_results
//! ```

use anyhow::{Context, Result, bail};
use badaboom_backend::config::{BackendConfig, DEFAULT_CONFIG_PATH};
use badaboom_backend::logging;
use badaboom_backend::module::fireball::FireballClient;
use badaboom_backend::module::neo::{AsteroidDatasetParser, Clock};
use badaboom_backend::module::renderer::{ChartRenderer, ENERGY_CHART_FILE, IMPACT_ENERGY_CHART_FILE};
use badaboom_backend::module::report::{biggest_asteroids_markdown, write_asteroid_report};
use badaboom_backend::module::stats::{
    YearSummary, biggest_asteroids, encounter_counts, fireballs_per_year,
    fireballs_without_location_per_year, impact_points, latitude_range, log_energy_histogram,
    log_impact_energy_histogram,
};
use clap::{Parser, Subcommand};
use std::path::PathBuf;

const BIGGEST_ASTEROID_COUNT: usize = 10;
const ENERGY_BINS: usize = 30;
const IMPACT_ENERGY_BINS: usize = 40;

#[derive(Parser, Debug)]
#[command(name = "badaboom", about = "Statistics and figures from NASA asteroid and fireball data")]
struct Cli {
    /// TOML config file, defaults are used when it does not exist
    #[arg(short, long, value_name = "FILE", default_value = DEFAULT_CONFIG_PATH)]
    config: PathBuf,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Gather the "Asteroids - NeoWs" feed, then draw figures and print a summary
    Asteroids {
        /// API key provided by NASA, see https://api.nasa.gov/
        #[arg(long, env = "NASA_API_KEY")]
        api_key: Option<String>,

        #[arg(long)]
        start_year: Option<i32>,

        #[arg(long)]
        end_year: Option<i32>,

        #[arg(long, value_name = "DIR")]
        output_dir: Option<PathBuf>,
    },
    /// Gather the fireball catalogue, then draw figures
    Fireballs {
        #[arg(long, value_name = "DIR")]
        output_dir: Option<PathBuf>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let mut config = BackendConfig::load_or_default(&cli.config)?;

    let _logging_guard = logging::init_logging(&config.log_dir, "badaboom", &config.log_level)?;

    match cli.command {
        Command::Asteroids {
            api_key,
            start_year,
            end_year,
            output_dir,
        } => {
            if api_key.is_some() {
                config.api_key = api_key;
            }
            config.start_year = start_year.unwrap_or(config.start_year);
            config.end_year = end_year.unwrap_or(config.end_year);
            if let Some(dir) = output_dir {
                config.output_dir = dir;
            }
            run_asteroids(&config).await
        }
        Command::Fireballs { output_dir } => {
            if let Some(dir) = output_dir {
                config.output_dir = dir;
            }
            run_fireballs(&config).await
        }
    }
}

async fn run_asteroids(config: &BackendConfig) -> Result<()> {
    let (start_year, end_year) = (config.start_year, config.end_year);
    if start_year > end_year {
        bail!("start year {} is after end year {}", start_year, end_year);
    }
    let api_key = config
        .api_key
        .clone()
        .context("A NASA API key is required (--api-key, NASA_API_KEY or api_key in the config file)")?;

    tracing::info!("Badaboom asteroids: {} to {}", start_year, end_year);

    let mut parser = AsteroidDatasetParser::new(
        api_key,
        config.parser_paths(),
        Some(config.neo_api_location.clone()),
    )
    .await?;

    match parser.client_mut().check_quota().await? {
        Some(remaining) => tracing::info!("Remaining API requests this hour: {}", remaining),
        None => tracing::info!("Remaining API requests unknown"),
    }

    let years = parser.fetch_years(start_year..=end_year).await?;
    let summaries: Vec<YearSummary> = years
        .iter()
        .map(|(year, slice)| YearSummary::from_slice(*year, &slice.events, &slice.asteroids))
        .collect();

    let today = parser.client_mut().clock().today();
    let renderer = ChartRenderer::new(&config.output_dir);
    renderer.render_events_per_year(&summaries, today).await?;
    renderer.render_sizes_per_year(&summaries, today).await?;

    let counts = encounter_counts(parser.events(), start_year, end_year, today);
    if let Some((until, observed)) = counts.observed {
        println!(
            "Unique asteroid encountered and observed from {} until {}: {}",
            start_year, until, observed
        );
    }
    if let Some((from, predicted)) = counts.predicted {
        println!(
            "Unique asteroid predicted to encounter from {} until {}: {}",
            from, end_year, predicted
        );
    }

    let biggest = biggest_asteroids(
        parser.events(),
        parser.asteroids(),
        start_year,
        end_year,
        BIGGEST_ASTEROID_COUNT,
    );
    let markdown = biggest_asteroids_markdown(&biggest);
    write_asteroid_report(&config.output_dir, start_year, end_year, &markdown).await?;

    println!("Biggest asteroids between {} and {}:", start_year, end_year);
    println!("{}", markdown);

    Ok(())
}

async fn run_fireballs(config: &BackendConfig) -> Result<()> {
    let client = FireballClient::new(Some(config.fireball_api_location.clone()))?;
    let fireballs = client.fetch_all().await?;

    let renderer = ChartRenderer::new(&config.output_dir);
    renderer
        .render_histogram(
            &log_energy_histogram(&fireballs, ENERGY_BINS),
            "Energy distribution.",
            "log(GJ)",
            ENERGY_CHART_FILE,
        )
        .await?;
    renderer
        .render_histogram(
            &log_impact_energy_histogram(&fireballs, IMPACT_ENERGY_BINS),
            "Impact energy distribution.",
            "log(kt)",
            IMPACT_ENERGY_CHART_FILE,
        )
        .await?;

    let without_location = fireballs_without_location_per_year(&fireballs);
    println!(
        "Number of fireballs not located: {}",
        without_location.values().sum::<usize>()
    );

    renderer.render_fireballs_per_year(&fireballs_per_year(&fireballs)).await?;
    renderer.render_fireballs_without_location(&without_location).await?;

    let points = impact_points(&fireballs);
    if let Some((min, max)) = latitude_range(&points) {
        println!("latitude: {} - {}", min, max);
    }
    renderer.render_fireball_map(&points).await?;

    Ok(())
}
