//! A deterministic, seeded fallback terrain source.
//!
//! Not a DEM reader: it synthesizes smooth fractal relief with `noise`'s
//! `Fbm<Perlin>` generator, the same family `terra-core::noise` builds its
//! planet-scale heightfields from, scaled down to "plausible enough for a
//! hiking-speed simulation" rather than planetary terrain synthesis — no
//! plate tectonics, no hydraulic erosion, just smoothed noise plus a single
//! ridge term so slope-dependent behavior (Tobler speed, uphill direction
//! bias) has something non-trivial to react to in tests and local runs.

use noise::{Fbm, NoiseFn, Perlin};
use sar_core::providers::{ElevationProvider, ElevationWindow, ProviderError};
use sar_core::terrain::NODATA;

#[derive(Debug, Clone, Copy)]
pub struct SyntheticElevationProvider {
    seed: u32,
    resolution: usize,
    base_elevation_m: f64,
    relief_m: f64,
    frequency: f64,
}

impl Default for SyntheticElevationProvider {
    fn default() -> Self {
        Self {
            seed: 1,
            resolution: 200,
            base_elevation_m: 1000.0,
            relief_m: 300.0,
            frequency: 6.0,
        }
    }
}

impl SyntheticElevationProvider {
    pub fn new(seed: u32) -> Self {
        Self { seed, ..Self::default() }
    }

    pub fn with_resolution(mut self, resolution: usize) -> Self {
        self.resolution = resolution.max(2);
        self
    }

    pub fn with_relief(mut self, base_elevation_m: f64, relief_m: f64) -> Self {
        self.base_elevation_m = base_elevation_m;
        self.relief_m = relief_m;
        self
    }
}

impl ElevationProvider for SyntheticElevationProvider {
    fn get_elevation_window(&self, bounds: (f64, f64, f64, f64)) -> Result<ElevationWindow, ProviderError> {
        let (west, south, east, north) = bounds;
        if !(east > west && north > south) {
            return Err(ProviderError::BoundsUnavailable(format!(
                "degenerate bounds: {bounds:?}"
            )));
        }

        let fbm = Fbm::<Perlin>::new(self.seed);
        let rows = self.resolution;
        let cols = self.resolution;
        let mut elevation = vec![0.0f32; rows * cols];

        for row in 0..rows {
            let v = row as f64 / (rows - 1).max(1) as f64;
            for col in 0..cols {
                let u = col as f64 / (cols - 1).max(1) as f64;
                let nx = u * self.frequency;
                let ny = v * self.frequency;
                let fractal = fbm.get([nx, ny]);
                let ridge = (v * std::f64::consts::PI * 2.0).sin() * 0.3;
                let value = self.base_elevation_m + self.relief_m * (fractal + ridge);
                elevation[row * cols + col] = value as f32;
            }
        }

        let resolution_m = sar_core::geo::haversine_m(south, west, north, west) / rows as f64;

        Ok(ElevationWindow { elevation, rows, cols, bounds, resolution_m, nodata: NODATA })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn same_seed_is_deterministic() {
        let provider = SyntheticElevationProvider::new(7).with_resolution(40);
        let bounds = (-1.0, -1.0, 1.0, 1.0);
        let a = provider.get_elevation_window(bounds).unwrap();
        let b = provider.get_elevation_window(bounds).unwrap();
        assert_eq!(a.elevation, b.elevation);
    }

    #[test]
    fn different_seeds_diverge() {
        let bounds = (-1.0, -1.0, 1.0, 1.0);
        let a = SyntheticElevationProvider::new(1).with_resolution(40).get_elevation_window(bounds).unwrap();
        let b = SyntheticElevationProvider::new(2).with_resolution(40).get_elevation_window(bounds).unwrap();
        assert_ne!(a.elevation, b.elevation);
    }

    #[test]
    fn degenerate_bounds_are_rejected() {
        let provider = SyntheticElevationProvider::default();
        assert!(provider.get_elevation_window((1.0, 1.0, 1.0, 1.0)).is_err());
    }

    #[test]
    fn elevation_values_stay_within_plausible_range() {
        let provider = SyntheticElevationProvider::new(3).with_resolution(50).with_relief(1000.0, 400.0);
        let window = provider.get_elevation_window((-1.0, -1.0, 1.0, 1.0)).unwrap();
        for &v in &window.elevation {
            assert!(v > 0.0 && v < 2000.0, "implausible elevation: {v}");
        }
    }
}
