//! Agent state and initialization (C4).

use crate::terrain::TerrainGrid;
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use rand_distr::{Distribution, Normal};
use serde::{Deserialize, Serialize};
use std::f64::consts::TAU;

/// Behavioral strategy, sampled once at initialization per the ISRID
/// categorical distribution (DT 55.9%, RT 37.7%, RW 5.5%, VE 0.6%, SP 0.3%).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Strategy {
    /// Direction traveling: holds a persistent heading.
    DirectionTraveling,
    /// Route traveling: strongly prefers trails/roads.
    RouteTraveling,
    /// Random walking: unbiased weighted-direction choice.
    RandomWalking,
    /// View enhancing: strong uphill bias (seeking vantage/signal).
    ViewEnhancing,
    /// Staying put: almost always remains stationary.
    StayingPut,
}

impl Strategy {
    /// Sample a strategy from the fixed categorical distribution.
    pub fn sample(rng: &mut impl Rng) -> Self {
        let r = rng.gen::<f64>() * 100.0;
        if r < 55.9 {
            Strategy::DirectionTraveling
        } else if r < 55.9 + 37.7 {
            Strategy::RouteTraveling
        } else if r < 55.9 + 37.7 + 5.5 {
            Strategy::RandomWalking
        } else if r < 55.9 + 37.7 + 5.5 + 0.6 {
            Strategy::ViewEnhancing
        } else {
            Strategy::StayingPut
        }
    }
}

/// One Monte Carlo sample of a possible hiker trajectory.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Agent {
    pub id: u32,
    pub lat: f64,
    pub lon: f64,
    pub elevation: f32,
    pub strategy: Strategy,
    /// Radians, 0 = north, clockwise.
    pub heading: f64,
    pub steps_taken: u32,
    /// In `[0.1, 1.0]`.
    pub energy: f64,
    pub is_active: bool,
}

impl Agent {
    /// Deterministic per-agent RNG, seeded from `(run_seed, agent_id)` so
    /// reproducibility survives parallel execution (see design notes §9):
    /// no global RNG is ever shared across workers.
    pub fn rng_for(run_seed: u64, agent_id: u32) -> ChaCha8Rng {
        ChaCha8Rng::seed_from_u64(run_seed ^ ((agent_id as u64) << 32) ^ 0x9E37_79B9_7F4A_7C15)
    }
}

/// Seed `num_agents` agents scattered around `(center_lat, center_lon)`.
///
/// `spread_deg` is the standard deviation (degrees) of the Gaussian initial
/// scatter (~0.000333° ≈ 30 m by default).
pub fn initialize_agents(
    run_seed: u64,
    center_lat: f64,
    center_lon: f64,
    num_agents: usize,
    spread_deg: f64,
    terrain: &TerrainGrid,
) -> Vec<Agent> {
    let normal = Normal::new(0.0, spread_deg).expect("spread_deg must be finite and positive");

    (0..num_agents)
        .map(|i| {
            let id = i as u32;
            let mut rng = Agent::rng_for(run_seed, id);

            let lat = center_lat + normal.sample(&mut rng);
            let lon = center_lon + normal.sample(&mut rng);
            let elevation = terrain.elevation(lat, lon).unwrap_or(0.0);
            let strategy = Strategy::sample(&mut rng);
            let heading = rng.gen::<f64>() * TAU;

            Agent {
                id,
                lat,
                lon,
                elevation,
                strategy,
                heading,
                steps_taken: 0,
                energy: 1.0,
                is_active: true,
            }
        })
        .collect()
}
