//! Error types for the simulator core.

use thiserror::Error;

pub use crate::providers::ProviderError;

/// Errors that can abort a simulation run.
///
/// `DegenerateStep` is deliberately absent here: a single agent failing to
/// advance is not surfaced as an error, it deactivates the agent (see
/// `kernel::step_agent`) and is logged at `debug` level.
#[derive(Error, Debug)]
pub enum SimError {
    /// The request failed basic range/domain validation.
    #[error("bad request: {0}")]
    BadRequest(String),

    /// The elevation provider could not produce a window for the requested bounds.
    #[error("elevation provider failed: {0}")]
    ElevationFailure(#[from] ProviderError),

    /// The feature provider raised an error (rare — empty results are preferred
    /// by convention, see `sar-providers::traits::FeatureProvider`).
    #[error("feature provider failed: {0}")]
    FeatureFailure(String),

    /// The weather provider raised an error. In practice weather providers are
    /// expected never to fail (they fall back to a benign default instead).
    #[error("weather provider failed: {0}")]
    WeatherFailure(String),

    /// The run was cancelled via the caller's cancellation token.
    #[error("simulation cancelled")]
    Cancelled,
}

pub type Result<T> = std::result::Result<T, SimError>;
