//! Tunables for the simulator.
//!
//! The three stop-probability tiers and the initial-spread sigma are called
//! out in the design notes as empirical calibration inputs, not invariants —
//! they live here rather than as inline constants in `kernel` so a caller can
//! override them (e.g. to refit against new ISRID data) without touching the
//! simulation logic itself.

use serde::{Deserialize, Serialize};

/// Time-based abandonment probabilities, keyed by step-count tier.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AbandonmentTable {
    /// Steps above which tier 1 applies (exclusive lower bound).
    pub tier_1_steps: u32,
    /// Steps above which tier 2 applies.
    pub tier_2_steps: u32,
    /// Steps above which tier 3 applies.
    pub tier_3_steps: u32,
    pub tier_1_p: f64,
    pub tier_2_p: f64,
    pub tier_3_p: f64,
}

impl Default for AbandonmentTable {
    fn default() -> Self {
        Self {
            tier_1_steps: 4,
            tier_2_steps: 20,
            tier_3_steps: 96,
            tier_1_p: 0.005,
            tier_2_p: 0.02,
            tier_3_p: 0.05,
        }
    }
}

impl AbandonmentTable {
    /// Stop probability for the given step count, or `None` if no tier applies
    /// (`steps_taken <= tier_1_steps`).
    pub fn p_stop(&self, steps_taken: u32) -> Option<f64> {
        if steps_taken > self.tier_3_steps {
            Some(self.tier_3_p)
        } else if steps_taken > self.tier_2_steps {
            Some(self.tier_2_p)
        } else if steps_taken > self.tier_1_steps {
            Some(self.tier_1_p)
        } else {
            None
        }
    }
}

/// Buffer radii (metres) used by the feature rasterizer, per feature class.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FeatureBuffers {
    pub trails: f64,
    pub roads: f64,
    pub rivers: f64,
    pub cliffs: f64,
}

impl Default for FeatureBuffers {
    fn default() -> Self {
        Self {
            trails: 10.0,
            roads: 15.0,
            rivers: 20.0,
            cliffs: 10.0,
        }
    }
}

/// Full simulator configuration. Constructed from defaults and optionally
/// overridden from environment variables (see [`SimulatorConfig::from_env`]).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SimulatorConfig {
    /// Number of Monte Carlo agents seeded per run.
    pub num_agents: usize,
    /// Fixed timestep, in seconds (spec: 900s / 15 min).
    pub timestep_seconds: u32,
    /// Hard cap on total simulated minutes (spec: 480 / 8h).
    pub max_total_minutes: u32,
    /// Output probability grid edge length.
    pub grid_size: usize,
    /// Worker pool size for the step orchestrator; 1 disables parallelism.
    pub worker_count: usize,
    /// Whether the orchestrator should use the worker pool at all.
    pub parallel: bool,
    pub abandonment: AbandonmentTable,
    /// Standard deviation, in degrees, of the initial agent scatter (~30 m).
    pub initial_spread_deg: f64,
    pub feature_buffers: FeatureBuffers,
}

impl Default for SimulatorConfig {
    fn default() -> Self {
        Self {
            num_agents: 1000,
            timestep_seconds: 900,
            max_total_minutes: 480,
            grid_size: 50,
            worker_count: std::thread::available_parallelism()
                .map(|n| n.get().min(8))
                .unwrap_or(1),
            parallel: true,
            abandonment: AbandonmentTable::default(),
            initial_spread_deg: 0.000_333,
            feature_buffers: FeatureBuffers::default(),
        }
    }
}

impl SimulatorConfig {
    /// Overlay values from environment variables onto the defaults.
    /// Malformed values are silently ignored and the default is kept.
    pub fn from_env() -> Self {
        let mut config = Self::default();

        if let Ok(val) = std::env::var("SAR_NUM_AGENTS") {
            if let Ok(n) = val.parse() {
                config.num_agents = n;
            }
        }
        if let Ok(val) = std::env::var("SAR_TIMESTEP_SECONDS") {
            if let Ok(n) = val.parse() {
                config.timestep_seconds = n;
            }
        }
        if let Ok(val) = std::env::var("SAR_MAX_TOTAL_MINUTES") {
            if let Ok(n) = val.parse() {
                config.max_total_minutes = n;
            }
        }
        if let Ok(val) = std::env::var("SAR_GRID_SIZE") {
            if let Ok(n) = val.parse() {
                config.grid_size = n;
            }
        }
        if let Ok(val) = std::env::var("SAR_WORKER_COUNT") {
            if let Ok(n) = val.parse() {
                config.worker_count = n;
            }
        }
        if let Ok(val) = std::env::var("SAR_PARALLEL") {
            config.parallel = val.to_lowercase() == "true" || val == "1";
        }

        config
    }

    /// Validate invariants that the driver relies on (grid_size >= 2, etc).
    /// Request-level validation (center/radius bounds) lives in `driver`.
    pub fn validate(&self) -> Result<(), String> {
        if self.num_agents == 0 {
            return Err("num_agents must be > 0".to_string());
        }
        if self.grid_size < 2 {
            return Err("grid_size must be >= 2".to_string());
        }
        if self.timestep_seconds == 0 {
            return Err("timestep_seconds must be > 0".to_string());
        }
        Ok(())
    }
}
