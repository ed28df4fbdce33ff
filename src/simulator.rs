//! Synthetic keystroke sessions
//!
//! Generates alert or fatigued typing with normally distributed hold and
//! flight times. Used to produce training logs and exercise the pipeline
//! without a keyboard hook.

use std::f64::consts::TAU;
use std::fmt;
use std::str::FromStr;

use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::error::FatigueError;
use crate::types::KeyEvent;

/// Home-row keys the simulated typist presses
pub const SIMULATED_KEYS: [&str; 9] = ["a", "s", "d", "f", "g", "h", "j", "k", "l"];

/// Typing condition of a simulated user
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionCondition {
    Alert,
    Fatigued,
}

/// Mean and standard deviation of one timing distribution, in seconds
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TimingProfile {
    pub mean: f64,
    pub stddev: f64,
}

impl SessionCondition {
    pub fn hold_profile(&self) -> TimingProfile {
        match self {
            SessionCondition::Alert => TimingProfile { mean: 0.10, stddev: 0.01 },
            SessionCondition::Fatigued => TimingProfile { mean: 0.14, stddev: 0.03 },
        }
    }

    pub fn flight_profile(&self) -> TimingProfile {
        match self {
            SessionCondition::Alert => TimingProfile { mean: 0.15, stddev: 0.02 },
            SessionCondition::Fatigued => TimingProfile { mean: 0.25, stddev: 0.05 },
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            SessionCondition::Alert => "alert",
            SessionCondition::Fatigued => "fatigued",
        }
    }
}

impl fmt::Display for SessionCondition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SessionCondition {
    type Err = FatigueError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "alert" => Ok(SessionCondition::Alert),
            "fatigued" => Ok(SessionCondition::Fatigued),
            other => Err(FatigueError::ParseError(format!(
                "unknown session condition '{}'",
                other
            ))),
        }
    }
}

/// Generate a typing session starting at `start` lasting about `duration_sec`.
///
/// Each keystroke waits one flight time, presses a random key and releases it
/// one hold time later. Events alternate PRESS/RELEASE in timestamp order.
pub fn generate_session<R: Rng + ?Sized>(
    condition: SessionCondition,
    start: f64,
    duration_sec: f64,
    rng: &mut R,
) -> Vec<KeyEvent> {
    let hold = condition.hold_profile();
    let flight = condition.flight_profile();
    let end = start + duration_sec;

    let mut events = Vec::new();
    let mut now = start;
    while now < end {
        let key = SIMULATED_KEYS[rng.gen_range(0..SIMULATED_KEYS.len())];
        let hold_time = sample_abs_normal(rng, hold);
        let flight_time = sample_abs_normal(rng, flight);

        let pressed_at = now + flight_time;
        let released_at = pressed_at + hold_time;
        events.push(KeyEvent::press(pressed_at, key));
        events.push(KeyEvent::release(released_at, key));
        now = released_at;
    }
    events
}

/// |N(mean, stddev)| via the Box-Muller transform
fn sample_abs_normal<R: Rng + ?Sized>(rng: &mut R, profile: TimingProfile) -> f64 {
    // 1 - u keeps the argument of ln in (0, 1]
    let u1: f64 = 1.0 - rng.gen::<f64>();
    let u2: f64 = rng.gen();
    let z = (-2.0 * u1.ln()).sqrt() * (TAU * u2).cos();
    (profile.mean + profile.stddev * z).abs()
}
