//! Step kernel (C5) — advances one agent by one fixed timestep.
//!
//! This is the pure, side-effect-free (beyond mutating its own `agent`
//! argument) heart of the simulator. It never touches a shared RNG: every
//! call reseeds a small `ChaCha8Rng` from `(run_seed, agent_id, step_index)`,
//! so the exact same sequence of draws happens whether this agent is stepped
//! on the calling thread or on any worker in the orchestrator's pool.

use crate::agent::{Agent, Strategy};
use crate::config::AbandonmentTable;
use crate::features::FeatureMasks;
use crate::geo::haversine_km;
use crate::profile::HikerProfile;
use crate::terrain::TerrainGrid;
use crate::weather::Weather;
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use rand_distr::{Distribution, Normal};

const METERS_PER_DEGREE: f64 = 111_320.0;
const WEATHER_LOOKAHEAD_M: f64 = 20.0;
const DIRECTION_LOOKAHEAD_M: f64 = 50.0;

/// Structured event emitted by the kernel for the orchestrator's tracked
/// agent. Unlike the original's loosely-typed log dicts, these map directly
/// onto `tracing` events (see `orchestrator`).
#[derive(Debug, Clone, PartialEq)]
pub enum KernelEvent {
    Decision { kind: &'static str, details: String },
    Movement { distance_m: f64, direction: (f64, f64) },
    Energy { old_energy: f64, new_energy: f64 },
    Stop { reason: &'static str },
}

/// The eight compass directions as unit vectors `(east, north)`, in the
/// fixed order N, NE, E, SE, S, SW, W, NW used throughout §4.5.1.
const DIRECTIONS: [(f64, f64); 8] = {
    // sqrt(2)/2, spelled out since `f64::sqrt` isn't const-evaluable on all
    // toolchains this crate targets.
    const D: f64 = 0.707_106_781_186_547_6;
    [
        (0.0, 1.0),
        (D, D),
        (1.0, 0.0),
        (D, -D),
        (0.0, -1.0),
        (-D, -D),
        (-1.0, 0.0),
        (-D, D),
    ]
};

fn meters_to_deg_lat(m: f64) -> f64 {
    m / METERS_PER_DEGREE
}

fn meters_to_deg_lon(m: f64, lat_deg: f64) -> f64 {
    m / (METERS_PER_DEGREE * lat_deg.to_radians().cos())
}

fn rng_for_step(run_seed: u64, agent_id: u32, step_index: u32) -> ChaCha8Rng {
    let mixed = run_seed
        ^ ((agent_id as u64) << 32)
        ^ (step_index as u64).wrapping_mul(0x9E37_79B9_7F4A_7C15)
        ^ 0xD1B5_4A32_D192_ED03;
    ChaCha8Rng::seed_from_u64(mixed)
}

/// Per-direction movement weight (§4.5.1), evaluated at a ~50 m lookahead.
fn direction_weights(
    agent: &Agent,
    terrain: &TerrainGrid,
    features: &FeatureMasks,
) -> [f64; 8] {
    let mut weights = [0.0; 8];
    let (west, south, east, north) = terrain.bounds();

    for (i, &(dx, dy)) in DIRECTIONS.iter().enumerate() {
        let check_lat = agent.lat + dy * meters_to_deg_lat(DIRECTION_LOOKAHEAD_M);
        let check_lon = agent.lon + dx * meters_to_deg_lon(DIRECTION_LOOKAHEAD_M, agent.lat);

        if check_lat < south || check_lat > north || check_lon < west || check_lon > east {
            weights[i] = 0.01;
            continue;
        }

        let mut w = 1.0;

        if let Some(slope) = terrain.slope(agent.lat, agent.lon, check_lat, check_lon) {
            if slope > 0.0 {
                w *= if agent.strategy == Strategy::ViewEnhancing { 3.0 } else { 1.2 };
            } else if slope < 0.0 {
                w *= 0.8;
            }
        }

        let (row, col) = terrain.to_index_clamped(check_lat, check_lon);
        let on_path = features.trails.get(row, col) || features.roads.get(row, col);
        if on_path {
            w *= if agent.strategy == Strategy::RouteTraveling { 5.0 } else { 2.0 };
        }
        if features.rivers.get(row, col) {
            w *= 0.1;
        }
        if features.cliffs.get(row, col) {
            w *= 0.01;
        }

        weights[i] = w.max(0.01);
    }

    weights
}

/// Sample a cardinal index from normalized weights.
fn sample_weighted(weights: &[f64; 8], total: f64, rng: &mut impl Rng) -> usize {
    let mut r = rng.gen::<f64>() * total;
    for (i, &w) in weights.iter().enumerate() {
        if r < w {
            return i;
        }
        r -= w;
    }
    weights.len() - 1
}

/// Advance `agent` by one timestep in place. Returns the ordered event log
/// (empty for non-tracked agents the orchestrator discards immediately).
#[allow(clippy::too_many_arguments)]
pub fn step_agent(
    agent: &mut Agent,
    run_seed: u64,
    step_index: u32,
    terrain: &TerrainGrid,
    features: &FeatureMasks,
    profile: &HikerProfile,
    weather: &Weather,
    center_lat: f64,
    center_lon: f64,
    radius_km: f64,
    timestep_seconds: u32,
    abandonment: &AbandonmentTable,
) -> Vec<KernelEvent> {
    let mut events = Vec::new();
    let mut rng = rng_for_step(run_seed, agent.id, step_index);

    agent.steps_taken += 1;

    // 1. Time-based abandonment.
    if let Some(p_stop) = abandonment.p_stop(agent.steps_taken) {
        if rng.gen::<f64>() < p_stop {
            agent.is_active = false;
            events.push(KernelEvent::Stop { reason: "time_based_abandonment" });
            return events;
        }
    }

    // 2. Staying-put strategy.
    if agent.strategy == Strategy::StayingPut && rng.gen::<f64>() < 0.99 {
        events.push(KernelEvent::Decision { kind: "wait", details: "staying put".to_string() });
        return events;
    }

    // 3. Direction choice.
    let (mut dx, mut dy);
    if agent.strategy == Strategy::DirectionTraveling {
        let jitter = Normal::new(0.0, 0.15).unwrap().sample(&mut rng);
        let theta = agent.heading + jitter;
        dx = theta.sin();
        dy = theta.cos();
        events.push(KernelEvent::Decision {
            kind: "direction_travel",
            details: format!("heading={:.3}rad actual={:.3}rad", agent.heading, theta),
        });
    } else {
        let weights = direction_weights(agent, terrain, features);
        let total: f64 = weights.iter().sum();
        if total < 0.001 {
            agent.is_active = false;
            events.push(KernelEvent::Stop { reason: "trapped" });
            return events;
        }

        let idx = sample_weighted(&weights, total, &mut rng);
        let (base_dx, base_dy) = DIRECTIONS[idx];

        let r = if agent.strategy == Strategy::RandomWalking { 1.0 } else { profile.direction_randomness() };
        let jitter_dist = Normal::new(0.0, 0.3 * r).unwrap();
        dx = base_dx + jitter_dist.sample(&mut rng);
        dy = base_dy + jitter_dist.sample(&mut rng);

        events.push(KernelEvent::Decision {
            kind: "weighted_direction",
            details: format!("cardinal_idx={idx}"),
        });
    }

    let mag = (dx * dx + dy * dy).sqrt();
    if mag > 0.0 {
        dx /= mag;
        dy /= mag;
    }

    // 4. Speed via Tobler's hiking function.
    let tobler_lat = agent.lat + dy * meters_to_deg_lat(WEATHER_LOOKAHEAD_M);
    let tobler_lon = agent.lon + dx * meters_to_deg_lon(WEATHER_LOOKAHEAD_M, agent.lat);
    let slope = terrain.slope(agent.lat, agent.lon, tobler_lat, tobler_lon).unwrap_or(0.0) as f64;

    let v_kmh = 6.0 * (-3.5 * (slope + 0.05).abs()).exp();
    let v_mps = (v_kmh / 3.6) * (profile.speed_factor() / 1.317) * (1.0 - weather.movement_penalty()) * agent.energy;
    let distance_m = v_mps * timestep_seconds as f64;

    // 5. Candidate position.
    let dlat = distance_m * dy / METERS_PER_DEGREE;
    let dlon = distance_m * dx / (METERS_PER_DEGREE * agent.lat.to_radians().cos());
    let new_lat = agent.lat + dlat;
    let new_lon = agent.lon + dlon;

    // 6. Validation.
    let (west, south, east, north) = terrain.bounds();
    if new_lat < south || new_lat > north || new_lon < west || new_lon > east {
        agent.is_active = false;
        events.push(KernelEvent::Stop { reason: "left_bounds" });
        return events;
    }

    if haversine_km(center_lat, center_lon, new_lat, new_lon) > radius_km {
        agent.is_active = false;
        events.push(KernelEvent::Stop { reason: "exceeded_radius" });
        return events;
    }

    let Some(new_elevation) = terrain.elevation(new_lat, new_lon) else {
        agent.is_active = false;
        events.push(KernelEvent::Stop { reason: "invalid_terrain" });
        return events;
    };

    // 7. Commit.
    agent.lat = new_lat;
    agent.lon = new_lon;
    agent.elevation = new_elevation;
    events.push(KernelEvent::Movement { distance_m, direction: (dx, dy) });

    // 8. Energy.
    let old_energy = agent.energy;
    let mut loss = 0.005;
    if slope > 0.0 {
        loss += slope * 0.05;
    }
    agent.energy = (agent.energy - loss).max(0.1);
    events.push(KernelEvent::Energy { old_energy, new_energy: agent.energy });

    events
}
