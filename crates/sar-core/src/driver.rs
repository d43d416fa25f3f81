//! Simulation driver (C8): ties the whole pipeline together.
//!
//! Grounded in `SARSimulator.run_simulation`: compute the elapsed window,
//! seed agents, then for every timestep run the orchestrator (C6) and reduce
//! the result (C7), accumulating one `TimeSlice` per step.

use crate::agent::{initialize_agents, Agent};
use crate::config::SimulatorConfig;
use crate::density::{reduce_to_grid, reduce_to_heatmap, HeatmapPoint, ProbabilityGrid};
use crate::error::{Result, SimError};
use crate::orchestrator::{step_all, StepContext};
use crate::profile::HikerProfile;
use crate::providers::{ElevationProvider, FeatureProvider, WeatherProvider};
use crate::terrain::TerrainGrid;
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicBool, Ordering};
use time::OffsetDateTime;
use tracing::{debug, info_span};

const KM_PER_DEGREE: f64 = 111.32;
/// Bounding box padding beyond the search radius, so agents near the edge of
/// the radius still have terrain/feature data to sample from.
const BOUNDS_PADDING: f64 = 1.25;

/// A request to predict a missing hiker's location distribution.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SimulationRequest {
    pub center_lat: f64,
    pub center_lon: f64,
    pub radius_km: f64,
    pub profile: HikerProfile,
    #[serde(with = "time::serde::rfc3339")]
    pub time_last_seen: OffsetDateTime,
    #[serde(with = "time::serde::rfc3339")]
    pub current_time: OffsetDateTime,
    pub grid_size: usize,
}

impl SimulationRequest {
    fn validate(&self) -> Result<()> {
        if !(-90.0..=90.0).contains(&self.center_lat) {
            return Err(SimError::BadRequest(format!("center_lat out of range: {}", self.center_lat)));
        }
        if !(-180.0..=180.0).contains(&self.center_lon) {
            return Err(SimError::BadRequest(format!("center_lon out of range: {}", self.center_lon)));
        }
        if self.radius_km <= 0.0 {
            return Err(SimError::BadRequest("radius_km must be positive".to_string()));
        }
        if self.grid_size < 2 {
            return Err(SimError::BadRequest("grid_size must be >= 2".to_string()));
        }
        if self.current_time < self.time_last_seen {
            return Err(SimError::BadRequest("current_time precedes time_last_seen".to_string()));
        }
        Ok(())
    }
}

/// One timestep's reduced output. At least one of `grid`/`points` is
/// `Some` — `sar-runner` requests both by default, a leaner caller can ask
/// the driver for just one via [`SliceKind`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TimeSlice {
    pub time_offset_minutes: u32,
    pub grid: Option<ProbabilityGrid>,
    pub points: Option<Vec<HeatmapPoint>>,
}

/// Which density representations the driver should compute per timestep.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SliceKind {
    GridOnly,
    HeatmapOnly,
    Both,
}

/// Full result of a simulation run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SimulationResult {
    pub center_lat: f64,
    pub center_lon: f64,
    pub radius_km: f64,
    pub slices: Vec<TimeSlice>,
    pub final_positions: Vec<Agent>,
}

/// Checked between timesteps, never inside the per-agent step loop.
pub trait CancellationToken: Send + Sync {
    fn is_cancelled(&self) -> bool;
}

impl CancellationToken for AtomicBool {
    fn is_cancelled(&self) -> bool {
        self.load(Ordering::Relaxed)
    }
}

/// A token that never cancels, for callers that don't need one.
pub struct NeverCancel;

impl CancellationToken for NeverCancel {
    fn is_cancelled(&self) -> bool {
        false
    }
}

fn bounds_for(center_lat: f64, center_lon: f64, radius_km: f64) -> (f64, f64, f64, f64) {
    let padded_km = radius_km * BOUNDS_PADDING;
    let lat_delta = padded_km / KM_PER_DEGREE;
    let lon_delta = padded_km / (KM_PER_DEGREE * center_lat.to_radians().cos().max(1e-6));
    (center_lon - lon_delta, center_lat - lat_delta, center_lon + lon_delta, center_lat + lat_delta)
}

/// Total minutes to simulate forward. `simulator.py::run_simulation`
/// computes `min(elapsed_minutes + 480, 480)`, which — since elapsed
/// minutes is always non-negative — always collapses to exactly `480`
/// (the full 8h window from "now," not a window that shrinks with how
/// long the hiker has been missing).
fn elapsed_minutes(request: &SimulationRequest, max_total_minutes: u32) -> u32 {
    let raw = (request.current_time - request.time_last_seen).whole_minutes().max(0) as u32;
    (raw + max_total_minutes).min(max_total_minutes)
}

/// Run a full simulation: seed agents, load terrain/features, then step and
/// reduce once per timestep until the elapsed window is exhausted.
#[allow(clippy::too_many_arguments)]
pub fn run_simulation(
    request: &SimulationRequest,
    config: &SimulatorConfig,
    run_seed: u64,
    elevation: &dyn ElevationProvider,
    features: &dyn FeatureProvider,
    weather: &dyn WeatherProvider,
    cancellation: &dyn CancellationToken,
    slice_kind: SliceKind,
) -> Result<SimulationResult> {
    request.validate()?;

    let span = info_span!(
        "simulation",
        center_lat = request.center_lat,
        center_lon = request.center_lon,
        radius_km = request.radius_km,
    );
    let _guard = span.enter();

    let bounds = bounds_for(request.center_lat, request.center_lon, request.radius_km);

    let window = elevation.get_elevation_window(bounds)?;
    let terrain = TerrainGrid::new(window.elevation, window.rows, window.cols, window.bounds, window.resolution_m);

    let raw_features = features
        .fetch_features(bounds)
        .map_err(|e| SimError::FeatureFailure(e.to_string()))?;
    let masks = crate::features::FeatureMasks::rasterize(&raw_features, &terrain, &config.feature_buffers);

    let total_minutes = elapsed_minutes(request, config.max_total_minutes);
    let timestep_minutes = (config.timestep_seconds / 60).max(1);
    let num_steps = total_minutes / timestep_minutes;

    let mut agents = initialize_agents(
        run_seed,
        request.center_lat,
        request.center_lon,
        config.num_agents,
        config.initial_spread_deg,
        &terrain,
    );

    let tracked_id = agents.first().map(|a| a.id);
    let worker_count = if config.parallel { config.worker_count } else { 1 };

    // Weather is immutable per simulation (spec §3, §5): fetched once, up
    // front, and reused for every timestep — matching `run_simulation`'s
    // single `weather_service.get_conditions` call before the step loop.
    let weather = weather.get_conditions(
        request.center_lat,
        request.center_lon,
        Some(request.time_last_seen),
        terrain.elevation(request.center_lat, request.center_lon).map(|e| e as f32),
    );

    // `slices` holds exactly `num_steps` entries: slice 0 is the initial,
    // pre-step state, so only `num_steps - 1` further step advances are
    // taken (invariant: `slices[k].time_offset_minutes == 15*k`, and an 8h
    // cap at a 15-minute step gives exactly 32 slices, not 33).
    let mut slices = Vec::with_capacity(num_steps as usize);
    slices.push(reduce_slice(&agents, bounds, request.grid_size, slice_kind, 0));

    for step_index in 0..num_steps.saturating_sub(1) {
        if cancellation.is_cancelled() {
            return Err(SimError::Cancelled);
        }

        let ctx = StepContext {
            run_seed,
            step_index,
            terrain: &terrain,
            features: &masks,
            profile: &request.profile,
            weather: &weather,
            center_lat: request.center_lat,
            center_lon: request.center_lon,
            radius_km: request.radius_km,
            timestep_seconds: config.timestep_seconds,
            abandonment: &config.abandonment,
        };

        let events = step_all(&mut agents, &ctx, tracked_id, worker_count);
        for event in &events {
            debug!(?event, step_index, "tracked agent event");
        }

        let active = agents.iter().filter(|a| a.is_active).count();
        if active == 0 {
            debug!(step_index, "no active agents remain");
        }

        let offset_minutes = (step_index + 1) * timestep_minutes;
        slices.push(reduce_slice(&agents, bounds, request.grid_size, slice_kind, offset_minutes));
    }

    Ok(SimulationResult {
        center_lat: request.center_lat,
        center_lon: request.center_lon,
        radius_km: request.radius_km,
        slices,
        final_positions: agents,
    })
}

fn reduce_slice(
    agents: &[Agent],
    bounds: (f64, f64, f64, f64),
    grid_size: usize,
    kind: SliceKind,
    time_offset_minutes: u32,
) -> TimeSlice {
    let active: Vec<Agent> = agents.iter().filter(|a| a.is_active).copied().collect();

    let grid = matches!(kind, SliceKind::GridOnly | SliceKind::Both)
        .then(|| reduce_to_grid(&active, bounds, grid_size));
    let points = matches!(kind, SliceKind::HeatmapOnly | SliceKind::Both)
        .then(|| reduce_to_heatmap(&active, bounds, grid_size * 2));

    TimeSlice { time_offset_minutes, grid, points }
}
