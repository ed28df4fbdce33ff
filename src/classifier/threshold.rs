//! Deterministic threshold classifier

use serde::{Deserialize, Serialize};

use super::FatigueClassifier;
use crate::types::{FeatureVector, Verdict};

/// Default hold-time threshold in seconds
pub const DEFAULT_HOLD_THRESHOLD_SEC: f64 = 0.175;

/// Default flight-time threshold in seconds
pub const DEFAULT_FLIGHT_THRESHOLD_SEC: f64 = 0.270;

/// Flags fatigue when either mean timing exceeds its threshold
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ThresholdClassifier {
    /// Mean hold time above which the user counts as fatigued
    pub hold_time_sec: f64,
    /// Mean flight time above which the user counts as fatigued
    pub flight_time_sec: f64,
}

impl Default for ThresholdClassifier {
    fn default() -> Self {
        Self::new(DEFAULT_HOLD_THRESHOLD_SEC, DEFAULT_FLIGHT_THRESHOLD_SEC)
    }
}

impl ThresholdClassifier {
    pub fn new(hold_time_sec: f64, flight_time_sec: f64) -> Self {
        Self {
            hold_time_sec,
            flight_time_sec,
        }
    }

    pub fn hold_threshold(&self) -> f64 {
        self.hold_time_sec
    }

    pub fn flight_threshold(&self) -> f64 {
        self.flight_time_sec
    }
}

impl FatigueClassifier for ThresholdClassifier {
    fn predict(&self, features: &FeatureVector) -> Verdict {
        let is_fatigued = features.mean_hold_time > self.hold_time_sec
            || features.mean_flight_time > self.flight_time_sec;
        Verdict::new(is_fatigued, None)
    }

    fn name(&self) -> &'static str {
        "threshold"
    }
}
