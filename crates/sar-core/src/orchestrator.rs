//! Per-timestep orchestration (C6).
//!
//! Splits a population of agents into one distinguished "tracked" agent,
//! always stepped synchronously so its event log can be inspected, and the
//! rest, stepped in parallel over a `rayon` pool when the `threading` feature
//! is enabled. Because [`crate::kernel::step_agent`] reseeds its RNG from
//! `(run_seed, agent_id, step_index)`, the result is identical no matter how
//! the work is chunked or in what order agents are visited — parallelism
//! only changes wall-clock time, never outcome.

use crate::agent::Agent;
use crate::config::AbandonmentTable;
use crate::features::FeatureMasks;
use crate::kernel::{step_agent, KernelEvent};
use crate::profile::HikerProfile;
use crate::terrain::TerrainGrid;
use crate::weather::Weather;

/// Everything a single timestep needs beyond the agent population itself.
#[derive(Debug, Clone, Copy)]
pub struct StepContext<'a> {
    pub run_seed: u64,
    pub step_index: u32,
    pub terrain: &'a TerrainGrid,
    pub features: &'a FeatureMasks,
    pub profile: &'a HikerProfile,
    pub weather: &'a Weather,
    pub center_lat: f64,
    pub center_lon: f64,
    pub radius_km: f64,
    pub timestep_seconds: u32,
    pub abandonment: &'a AbandonmentTable,
}

/// Advance every active agent in `agents` by one timestep.
///
/// `tracked_id`, if present and still active, is always stepped on the
/// calling thread first; its event log is returned. All other agents are
/// stepped with their events discarded, via the worker pool when
/// `worker_count > 1` and the `threading` feature is compiled in, or
/// sequentially otherwise.
pub fn step_all(agents: &mut [Agent], ctx: &StepContext<'_>, tracked_id: Option<u32>, worker_count: usize) -> Vec<KernelEvent> {
    let mut tracked_events = Vec::new();

    if let Some(tid) = tracked_id {
        if let Some(agent) = agents.iter_mut().find(|a| a.id == tid && a.is_active) {
            tracked_events = run_one(agent, ctx);
        }
    }

    #[cfg(feature = "threading")]
    {
        if worker_count > 1 {
            step_rest_parallel(agents, ctx, tracked_id, worker_count);
            return tracked_events;
        }
    }
    #[cfg(not(feature = "threading"))]
    {
        let _ = worker_count;
    }

    step_rest_sequential(agents, ctx, tracked_id);
    tracked_events
}

fn run_one(agent: &mut Agent, ctx: &StepContext<'_>) -> Vec<KernelEvent> {
    step_agent(
        agent,
        ctx.run_seed,
        ctx.step_index,
        ctx.terrain,
        ctx.features,
        ctx.profile,
        ctx.weather,
        ctx.center_lat,
        ctx.center_lon,
        ctx.radius_km,
        ctx.timestep_seconds,
        ctx.abandonment,
    )
}

fn step_rest_sequential(agents: &mut [Agent], ctx: &StepContext<'_>, tracked_id: Option<u32>) {
    for agent in agents.iter_mut() {
        if !agent.is_active || Some(agent.id) == tracked_id {
            continue;
        }
        let _ = step_agent(
            agent,
            ctx.run_seed,
            ctx.step_index,
            ctx.terrain,
            ctx.features,
            ctx.profile,
            ctx.weather,
            ctx.center_lat,
            ctx.center_lon,
            ctx.radius_km,
            ctx.timestep_seconds,
            ctx.abandonment,
        );
    }
}

#[cfg(feature = "threading")]
fn step_rest_parallel(agents: &mut [Agent], ctx: &StepContext<'_>, tracked_id: Option<u32>, worker_count: usize) {
    use rayon::prelude::*;

    // Work-stealing chunks of `max(1, |others| / (4*W))` (§4.6), not coarse
    // `|agents| / W` chunks — four chunks per worker so a worker that
    // finishes its first chunk early can steal from a slower one.
    let others_len = agents.len().saturating_sub(tracked_id.is_some() as usize);
    let chunk_len = (others_len / (4 * worker_count.max(1))).max(1);

    agents.par_chunks_mut(chunk_len).for_each(|chunk| {
        for agent in chunk.iter_mut() {
            if !agent.is_active || Some(agent.id) == tracked_id {
                continue;
            }
            let _ = step_agent(
                agent,
                ctx.run_seed,
                ctx.step_index,
                ctx.terrain,
                ctx.features,
                ctx.profile,
                ctx.weather,
                ctx.center_lat,
                ctx.center_lon,
                ctx.radius_km,
                ctx.timestep_seconds,
                ctx.abandonment,
            );
        }
    });
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::agent::initialize_agents;
    use crate::config::FeatureBuffers;
    use crate::profile::Gender;

    fn terrain() -> TerrainGrid {
        TerrainGrid::flat(200, 200, (-0.2, -0.2, 0.2, 0.2), 30.0, 1000.0)
    }

    fn features(terrain: &TerrainGrid) -> FeatureMasks {
        FeatureMasks::rasterize(&Default::default(), terrain, &FeatureBuffers::default())
    }

    fn profile() -> HikerProfile {
        HikerProfile { age: Some(35), gender: Gender::Unknown, skill_level: 3 }
    }

    #[test]
    fn sequential_and_chunked_produce_identical_positions() {
        let terrain = terrain();
        let features = features(&terrain);
        let profile = profile();
        let weather = Weather::benign_default();
        let abandonment = AbandonmentTable::default();

        let mut a = initialize_agents(42, 0.0, 0.0, 64, 0.000_333, &terrain);
        let mut b = a.clone();

        let ctx = StepContext {
            run_seed: 42,
            step_index: 0,
            terrain: &terrain,
            features: &features,
            profile: &profile,
            weather: &weather,
            center_lat: 0.0,
            center_lon: 0.0,
            radius_km: 20.0,
            timestep_seconds: 900,
            abandonment: &abandonment,
        };

        step_all(&mut a, &ctx, None, 1);
        step_all(&mut b, &ctx, None, 8);

        for (x, y) in a.iter().zip(b.iter()) {
            assert_eq!(x.lat, y.lat);
            assert_eq!(x.lon, y.lon);
            assert_eq!(x.is_active, y.is_active);
        }
    }

    #[test]
    fn tracked_agent_produces_events_others_do_not() {
        let terrain = terrain();
        let features = features(&terrain);
        let profile = profile();
        let weather = Weather::benign_default();
        let abandonment = AbandonmentTable::default();

        let mut agents = initialize_agents(7, 0.0, 0.0, 16, 0.000_333, &terrain);
        let ctx = StepContext {
            run_seed: 7,
            step_index: 0,
            terrain: &terrain,
            features: &features,
            profile: &profile,
            weather: &weather,
            center_lat: 0.0,
            center_lon: 0.0,
            radius_km: 20.0,
            timestep_seconds: 900,
            abandonment: &abandonment,
        };

        let events = step_all(&mut agents, &ctx, Some(0), 4);
        assert!(!events.is_empty());
    }

    #[test]
    fn inactive_agents_are_left_untouched() {
        let terrain = terrain();
        let features = features(&terrain);
        let profile = profile();
        let weather = Weather::benign_default();
        let abandonment = AbandonmentTable::default();

        let mut agents = initialize_agents(3, 0.0, 0.0, 8, 0.000_333, &terrain);
        agents[0].is_active = false;
        let frozen = (agents[0].lat, agents[0].lon);

        let ctx = StepContext {
            run_seed: 3,
            step_index: 0,
            terrain: &terrain,
            features: &features,
            profile: &profile,
            weather: &weather,
            center_lat: 0.0,
            center_lon: 0.0,
            radius_km: 20.0,
            timestep_seconds: 900,
            abandonment: &abandonment,
        };

        step_all(&mut agents, &ctx, None, 4);
        assert_eq!((agents[0].lat, agents[0].lon), frozen);
    }
}
