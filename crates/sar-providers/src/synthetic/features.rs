//! Fixed-set and empty-set feature providers.

use sar_core::features::RawFeatures;
use sar_core::providers::{FeatureProvider, ProviderError};

/// Returns a caller-supplied, fixed feature set regardless of the requested
/// bounds — useful for scenario tests that need a known trail/river layout.
#[derive(Debug, Clone, Default)]
pub struct StaticFeatureProvider {
    features: RawFeatures,
}

impl StaticFeatureProvider {
    pub fn new(features: RawFeatures) -> Self {
        Self { features }
    }
}

impl FeatureProvider for StaticFeatureProvider {
    fn fetch_features(&self, _bounds: (f64, f64, f64, f64)) -> Result<RawFeatures, ProviderError> {
        Ok(self.features.clone())
    }
}

/// Always returns four empty linestring lists — the provider-failure
/// fallback, and the default for runs with no feature data at all.
#[derive(Debug, Clone, Copy, Default)]
pub struct EmptyFeatureProvider;

impl FeatureProvider for EmptyFeatureProvider {
    fn fetch_features(&self, _bounds: (f64, f64, f64, f64)) -> Result<RawFeatures, ProviderError> {
        Ok(RawFeatures::default())
    }
}
