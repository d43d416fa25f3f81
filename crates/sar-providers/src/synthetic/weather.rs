//! Weather providers.
//!
//! `SeasonalWeatherProvider` ports the seasonal/diurnal/elevation-lapse
//! model from the original Python simulator's `weather.py`: a base
//! temperature per season, a day/night offset, a standard lapse rate for
//! elevation, elevation-gated precipitation odds, and elevation-scaled wind
//! capped at 20 m/s. It never fails — on any internal inconsistency it falls
//! through to [`sar_core::weather::Weather::benign_default`].

use sar_core::providers::WeatherProvider;
use sar_core::weather::Weather;
use time::OffsetDateTime;

const LAPSE_RATE_C_PER_KM: f64 = 6.5;
const MAX_WIND_MS: f64 = 20.0;

/// Deterministic seasonal/diurnal weather model, seeded so repeated calls
/// for the same place and time always agree (no wall-clock or OS rng).
#[derive(Debug, Clone, Copy)]
pub struct SeasonalWeatherProvider {
    seed: u32,
}

impl Default for SeasonalWeatherProvider {
    fn default() -> Self {
        Self { seed: 1 }
    }
}

impl SeasonalWeatherProvider {
    pub fn new(seed: u32) -> Self {
        Self { seed }
    }

    fn base_temp_c(month: u8) -> f64 {
        match month {
            12 | 1 | 2 => -5.0,
            3..=5 => 10.0,
            6..=8 => 22.0,
            9..=11 => 8.0,
            _ => 12.0,
        }
    }

    fn diurnal_offset_c(hour: u8) -> f64 {
        if (6..20).contains(&hour) {
            3.0
        } else {
            -5.0
        }
    }

    fn unit_hash(&self, lat: f64, lon: f64, salt: u64) -> f64 {
        let mut x = lat.to_bits()
            ^ lon.to_bits().rotate_left(17)
            ^ salt.wrapping_mul(0x9E37_79B9_7F4A_7C15)
            ^ (self.seed as u64).wrapping_mul(0xD1B5_4A32_D192_ED03);
        x ^= x >> 33;
        x = x.wrapping_mul(0xFF51_AFD7_ED55_8CCD);
        x ^= x >> 33;
        x = x.wrapping_mul(0xC4CE_B9FE_1A85_EC53);
        x ^= x >> 33;
        (x >> 11) as f64 / (1u64 << 53) as f64
    }
}

impl WeatherProvider for SeasonalWeatherProvider {
    fn get_conditions(&self, lat: f64, lon: f64, when: Option<OffsetDateTime>, elevation_m: Option<f32>) -> Weather {
        let (month, hour) = match when {
            Some(t) => (t.month() as u8, t.hour()),
            None => (7, 12),
        };
        let elevation_km = elevation_m.unwrap_or(0.0) as f64 / 1000.0;

        let temperature_c =
            Self::base_temp_c(month) + Self::diurnal_offset_c(hour) - elevation_km * LAPSE_RATE_C_PER_KM;

        let precip_chance = (0.1 + elevation_km * 0.08).min(0.5);
        let precip_roll = self.unit_hash(lat, lon, month as u64 * 31 + hour as u64);
        let precipitation_mm_per_h = if precip_roll < precip_chance {
            self.unit_hash(lat, lon, precip_roll.to_bits()) * 8.0
        } else {
            0.0
        };

        let wind_ms = (2.0 + elevation_km * 3.0).min(MAX_WIND_MS);

        Weather { temperature_c, precipitation_mm_per_h, wind_ms }
    }
}

/// Always returns the flat default (15 C, 0 mm/h, 0 m/s).
#[derive(Debug, Clone, Copy, Default)]
pub struct BenignWeatherProvider;

impl WeatherProvider for BenignWeatherProvider {
    fn get_conditions(&self, _lat: f64, _lon: f64, _when: Option<OffsetDateTime>, _elevation_m: Option<f32>) -> Weather {
        Weather::benign_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use time::macros::datetime;

    #[test]
    fn winter_night_is_colder_than_summer_noon() {
        let provider = SeasonalWeatherProvider::new(1);
        let winter_night = provider.get_conditions(45.0, -110.0, Some(datetime!(2026-01-15 02:00 UTC)), Some(500.0));
        let summer_noon = provider.get_conditions(45.0, -110.0, Some(datetime!(2026-07-15 13:00 UTC)), Some(500.0));
        assert!(winter_night.temperature_c < summer_noon.temperature_c);
    }

    #[test]
    fn higher_elevation_is_colder() {
        let provider = SeasonalWeatherProvider::new(1);
        let when = Some(datetime!(2026-07-15 13:00 UTC));
        let valley = provider.get_conditions(45.0, -110.0, when, Some(0.0));
        let summit = provider.get_conditions(45.0, -110.0, when, Some(3000.0));
        assert!(summit.temperature_c < valley.temperature_c);
    }

    #[test]
    fn wind_never_exceeds_cap() {
        let provider = SeasonalWeatherProvider::new(1);
        let extreme = provider.get_conditions(45.0, -110.0, None, Some(20_000.0));
        assert!(extreme.wind_ms <= MAX_WIND_MS + 1e-9);
    }

    #[test]
    fn same_inputs_are_deterministic() {
        let provider = SeasonalWeatherProvider::new(42);
        let when = Some(datetime!(2026-03-10 08:00 UTC));
        let a = provider.get_conditions(44.27, -71.3, when, Some(1200.0));
        let b = provider.get_conditions(44.27, -71.3, when, Some(1200.0));
        assert_eq!(a.temperature_c, b.temperature_c);
        assert_eq!(a.precipitation_mm_per_h, b.precipitation_mm_per_h);
        assert_eq!(a.wind_ms, b.wind_ms);
    }

    #[test]
    fn benign_provider_is_constant() {
        let provider = BenignWeatherProvider;
        let w = provider.get_conditions(0.0, 0.0, None, Some(5000.0));
        assert_eq!(w, Weather::benign_default());
    }
}
