//! Hiker profile and its derived movement parameters.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Gender {
    Male,
    Female,
    Other,
    Unknown,
}

/// A missing hiker's known attributes, as supplied in a `SimulationRequest`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct HikerProfile {
    pub age: Option<u32>,
    pub gender: Gender,
    /// Experience/fitness level, 1 (novice) to 5 (expert).
    pub skill_level: u8,
}

impl HikerProfile {
    fn age_scale(&self) -> f64 {
        match self.age {
            Some(age) if age < 18 => 0.8,
            Some(age) if (60..=70).contains(&age) => 0.7,
            Some(age) if age > 70 => 0.5,
            _ => 1.0,
        }
    }

    /// `(0.6 + 0.1 * skill) * age_scale`.
    pub fn speed_factor(&self) -> f64 {
        (0.6 + 0.1 * self.skill_level as f64) * self.age_scale()
    }

    /// `1 - 0.2 * (skill - 1)`.
    pub fn direction_randomness(&self) -> f64 {
        1.0 - 0.2 * (self.skill_level as f64 - 1.0)
    }

    /// `0.5` for skill >= 4, else `0.8`. Exposed for callers that want to
    /// reason about trail affinity directly; the step kernel derives its
    /// trail weighting from `strategy` rather than this value.
    pub fn trail_preference(&self) -> f64 {
        if self.skill_level >= 4 {
            0.5
        } else {
            0.8
        }
    }
}
