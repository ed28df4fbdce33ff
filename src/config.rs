//! Monitor configuration
//!
//! Tunables for the monitor loop, classifier fallback and notifier. Every field
//! has a default, so a partial JSON file only overrides what it names.

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::classifier::ThresholdClassifier;
use crate::error::FatigueError;

/// Default polling cadence in seconds
pub const DEFAULT_POLL_INTERVAL_SEC: u64 = 10;

/// Default event window in seconds
pub const DEFAULT_WINDOW_SEC: f64 = 60.0;

/// Default minimum number of hold samples needed to classify a window
pub const DEFAULT_MIN_HOLD_SAMPLES: usize = 5;

/// Default cooldown used by the monitor (one minute)
pub const DEFAULT_MONITOR_MIN_INTERVAL_SEC: f64 = 60.0;

/// Default time a prompt stays up before it dismisses itself
pub const DEFAULT_AUTO_DISMISS_SEC: u64 = 20;

pub const DEFAULT_PROMPT_MESSAGE: &str =
    "Your keystrokes look a little stiff. How tired do you feel right now? (1 = fresh, 5 = exhausted)";

/// Configuration for [`MonitorLoop`](crate::monitor::MonitorLoop) and the notifier
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MonitorConfig {
    /// Seconds between evaluation cycles
    pub poll_interval_sec: u64,
    /// Length of the trailing event window in seconds
    pub window_sec: f64,
    /// Windows with fewer hold samples are reported as insufficient data
    pub min_hold_samples: usize,
    /// Minimum spacing between interventions in seconds
    pub min_interval_sec: f64,
    /// Fallback thresholds when no model is available
    pub thresholds: ThresholdClassifier,
    /// Optional logistic-regression model file
    pub model_path: Option<PathBuf>,
    /// Keystroke log written by the recorder
    pub event_log_path: PathBuf,
    /// Where self-reported severity scores are appended
    pub feedback_log_path: PathBuf,
    /// Prompt shown when an intervention fires
    pub prompt_message: String,
    /// Seconds before an unanswered prompt is dismissed
    pub auto_dismiss_sec: u64,
}

impl Default for MonitorConfig {
    fn default() -> Self {
        Self {
            poll_interval_sec: DEFAULT_POLL_INTERVAL_SEC,
            window_sec: DEFAULT_WINDOW_SEC,
            min_hold_samples: DEFAULT_MIN_HOLD_SAMPLES,
            min_interval_sec: DEFAULT_MONITOR_MIN_INTERVAL_SEC,
            thresholds: ThresholdClassifier::default(),
            model_path: None,
            event_log_path: PathBuf::from("keystroke_log.csv"),
            feedback_log_path: PathBuf::from("feedback_log.csv"),
            prompt_message: DEFAULT_PROMPT_MESSAGE.to_string(),
            auto_dismiss_sec: DEFAULT_AUTO_DISMISS_SEC,
        }
    }
}

impl MonitorConfig {
    /// Load and validate a configuration file
    pub fn load(path: &Path) -> Result<Self, FatigueError> {
        let json = fs::read_to_string(path)?;
        Self::from_json(&json)
    }

    pub fn from_json(json: &str) -> Result<Self, FatigueError> {
        let config: MonitorConfig = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    pub fn to_json(&self) -> Result<String, FatigueError> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Check that every tunable is usable
    pub fn validate(&self) -> Result<(), FatigueError> {
        if self.poll_interval_sec == 0 {
            return Err(FatigueError::InvalidConfig(
                "poll_interval_sec must be positive".to_string(),
            ));
        }
        if !(self.window_sec.is_finite() && self.window_sec > 0.0) {
            return Err(FatigueError::InvalidConfig(format!(
                "window_sec must be a positive number, got {}",
                self.window_sec
            )));
        }
        if self.min_hold_samples == 0 {
            return Err(FatigueError::InvalidConfig(
                "min_hold_samples must be at least 1".to_string(),
            ));
        }
        if !(self.min_interval_sec.is_finite() && self.min_interval_sec >= 0.0) {
            return Err(FatigueError::InvalidConfig(format!(
                "min_interval_sec must be a non-negative number, got {}",
                self.min_interval_sec
            )));
        }
        let thresholds = [
            self.thresholds.hold_time_sec,
            self.thresholds.flight_time_sec,
        ];
        if thresholds.iter().any(|t| !(t.is_finite() && *t >= 0.0)) {
            return Err(FatigueError::InvalidConfig(
                "thresholds must be non-negative numbers".to_string(),
            ));
        }
        if self.auto_dismiss_sec == 0 {
            return Err(FatigueError::InvalidConfig(
                "auto_dismiss_sec must be positive".to_string(),
            ));
        }
        Ok(())
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_secs(self.poll_interval_sec)
    }

    pub fn auto_dismiss(&self) -> Duration {
        Duration::from_secs(self.auto_dismiss_sec)
    }
}
