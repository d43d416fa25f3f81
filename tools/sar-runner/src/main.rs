//! CLI entry point: run one simulation and print the result as JSON.
//!
//! Follows the same `clap` + `anyhow` shape as `tools/sampler` and
//! `tools/distributions` in the teacher repo — parse arguments, wire the
//! library's pieces together, print or fail loudly.

use anyhow::Context;
use clap::Parser;
use sar_core::config::SimulatorConfig;
use sar_core::driver::{run_simulation, NeverCancel, SimulationRequest, SliceKind};
use sar_core::profile::{Gender, HikerProfile};
use sar_core::providers::WeatherProvider;
use sar_providers::synthetic::{BenignWeatherProvider, EmptyFeatureProvider, SeasonalWeatherProvider, SyntheticElevationProvider};
use time::format_description::well_known::Rfc3339;
use time::OffsetDateTime;
use tracing_subscriber::EnvFilter;

#[derive(clap::ValueEnum, Clone, Copy, Debug)]
enum CliGender {
    Male,
    Female,
    Other,
    Unknown,
}

impl From<CliGender> for Gender {
    fn from(g: CliGender) -> Self {
        match g {
            CliGender::Male => Gender::Male,
            CliGender::Female => Gender::Female,
            CliGender::Other => Gender::Other,
            CliGender::Unknown => Gender::Unknown,
        }
    }
}

/// Predict where a missing hiker may be, given a last-known point and
/// profile, and print a time-indexed sequence of probability grids.
#[derive(Parser, Debug)]
#[command(name = "sar-runner")]
struct Cli {
    /// Last-known latitude.
    #[arg(long)]
    lat: f64,
    /// Last-known longitude.
    #[arg(long)]
    lon: f64,
    /// Search radius around the last-known point, in kilometres.
    #[arg(long, default_value_t = 10.0)]
    radius_km: f64,
    /// Hiker experience/fitness level, 1 (novice) to 5 (expert).
    #[arg(long, default_value_t = 3)]
    skill_level: u8,
    #[arg(long)]
    age: Option<u32>,
    #[arg(long, value_enum, default_value_t = CliGender::Unknown)]
    gender: CliGender,
    /// RFC 3339 timestamp the hiker was last seen.
    #[arg(long)]
    last_seen: String,
    /// RFC 3339 timestamp to simulate up to; defaults to now.
    #[arg(long)]
    current_time: Option<String>,
    #[arg(long, default_value_t = 1000)]
    num_agents: usize,
    #[arg(long, default_value_t = 50)]
    grid_size: usize,
    /// Master RNG seed; re-running with the same seed reproduces the run.
    #[arg(long, default_value_t = 42)]
    seed: u64,
    /// Skip the seasonal weather model and use a fixed benign default.
    #[arg(long, default_value_t = false)]
    no_weather: bool,
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt().with_env_filter(EnvFilter::from_default_env()).init();

    let cli = Cli::parse();

    let time_last_seen =
        OffsetDateTime::parse(&cli.last_seen, &Rfc3339).context("invalid --last-seen timestamp")?;
    let current_time = match &cli.current_time {
        Some(s) => OffsetDateTime::parse(s, &Rfc3339).context("invalid --current-time timestamp")?,
        None => OffsetDateTime::now_utc(),
    };

    let request = SimulationRequest {
        center_lat: cli.lat,
        center_lon: cli.lon,
        radius_km: cli.radius_km,
        profile: HikerProfile { age: cli.age, gender: cli.gender.into(), skill_level: cli.skill_level },
        time_last_seen,
        current_time,
        grid_size: cli.grid_size,
    };

    let mut config = SimulatorConfig::default();
    config.num_agents = cli.num_agents;
    config.grid_size = cli.grid_size;
    config.validate().map_err(anyhow::Error::msg)?;

    let elevation = SyntheticElevationProvider::new(cli.seed as u32);
    let features = EmptyFeatureProvider;
    let weather: Box<dyn WeatherProvider> = if cli.no_weather {
        Box::new(BenignWeatherProvider)
    } else {
        Box::new(SeasonalWeatherProvider::new(cli.seed as u32))
    };

    let result = run_simulation(
        &request,
        &config,
        cli.seed,
        &elevation,
        &features,
        weather.as_ref(),
        &NeverCancel,
        SliceKind::Both,
    )?;

    let json = serde_json::to_string_pretty(&result).context("failed to serialize simulation result")?;
    println!("{json}");
    Ok(())
}
