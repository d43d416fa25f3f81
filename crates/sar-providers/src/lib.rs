//! Reference collaborator implementations for `sar-core`.
//!
//! The trait definitions themselves ([`ElevationProvider`], [`FeatureProvider`],
//! [`WeatherProvider`]) live in `sar-core::providers` — re-exported here as
//! `traits` so callers who only need the provider seam don't have to reach
//! into the simulator crate directly. [`synthetic`] holds deterministic
//! fallback implementations used by `sar-runner` and integration tests when
//! no real DEM cache, OSM extract, or weather feed is wired in.

pub mod traits {
    pub use sar_core::providers::{ElevationProvider, ElevationWindow, FeatureProvider, ProviderError, WeatherProvider};
}

pub mod synthetic;
