//! Collaborator traits (§6): the seams between the simulator core and
//! external data acquisition.
//!
//! These live in `sar-core` rather than in `sar-providers` itself so that
//! [`crate::driver`] can take `&dyn ElevationProvider` (etc.) without a
//! dependency cycle; `sar-providers` depends on `sar-core` and implements
//! these traits, then re-exports them for callers who only ever need the
//! trait names, not the rest of the simulator.

use crate::features::RawFeatures;
use crate::weather::Weather;
use std::time::Duration;
use thiserror::Error;
use time::OffsetDateTime;

/// Errors raised by an [`ElevationProvider`] (or, loosely, any provider that
/// legitimately has nothing reasonable to fall back to).
#[derive(Error, Debug, Clone)]
pub enum ProviderError {
    #[error("bounds unavailable: {0}")]
    BoundsUnavailable(String),
    #[error("provider timeout after {0:?}")]
    ProviderTimeout(Duration),
}

/// A rectangular elevation window, row-major, north-up, matching
/// [`crate::terrain::TerrainGrid`]'s internal layout.
#[derive(Debug, Clone)]
pub struct ElevationWindow {
    pub elevation: Vec<f32>,
    pub rows: usize,
    pub cols: usize,
    /// `(west, south, east, north)`.
    pub bounds: (f64, f64, f64, f64),
    pub resolution_m: f64,
    pub nodata: f32,
}

/// Supplies a rectangular elevation raster for a requested bounding box.
pub trait ElevationProvider: Send + Sync {
    fn get_elevation_window(&self, bounds: (f64, f64, f64, f64)) -> Result<ElevationWindow, ProviderError>;
}

/// Supplies linear features (trails, roads, rivers, cliffs) for a requested
/// bounding box. By convention implementations prefer returning empty
/// `Vec`s over an error — a provider failure should degrade the feature
/// masks to all-false rather than abort the run.
pub trait FeatureProvider: Send + Sync {
    fn fetch_features(&self, bounds: (f64, f64, f64, f64)) -> Result<RawFeatures, ProviderError>;
}

/// Supplies weather conditions at a point and moment. Implementations never
/// fail: on any internal error they fall back to [`Weather::benign_default`].
pub trait WeatherProvider: Send + Sync {
    fn get_conditions(&self, lat: f64, lon: f64, when: Option<OffsetDateTime>, elevation_m: Option<f32>) -> Weather;
}
