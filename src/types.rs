//! Core data types
//!
//! This module defines the keystroke events, derived timing features, verdicts and
//! intervention records that flow through the fatigue pipeline.

use serde::{Deserialize, Deserializer, Serialize};
use std::fmt;
use uuid::Uuid;

use crate::error::FatigueError;

/// Physical key transition
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum KeyEventKind {
    Press,
    Release,
}

impl KeyEventKind {
    /// Parse the event-log spelling (`PRESS` / `RELEASE`)
    pub fn parse(value: &str) -> Option<Self> {
        match value.trim() {
            "PRESS" => Some(KeyEventKind::Press),
            "RELEASE" => Some(KeyEventKind::Release),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            KeyEventKind::Press => "PRESS",
            KeyEventKind::Release => "RELEASE",
        }
    }
}

/// A single key transition captured by the external recorder
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct KeyEvent {
    /// Seconds since the Unix epoch
    pub timestamp: f64,
    /// Press or release
    #[serde(rename = "event_type")]
    pub kind: KeyEventKind,
    /// Key identifier as reported by the recorder
    pub key_code: String,
}

impl KeyEvent {
    pub fn new(timestamp: f64, kind: KeyEventKind, key_code: impl Into<String>) -> Self {
        Self {
            timestamp,
            kind,
            key_code: key_code.into(),
        }
    }

    pub fn press(timestamp: f64, key_code: impl Into<String>) -> Self {
        Self::new(timestamp, KeyEventKind::Press, key_code)
    }

    pub fn release(timestamp: f64, key_code: impl Into<String>) -> Self {
        Self::new(timestamp, KeyEventKind::Release, key_code)
    }
}

/// Keystroke timing features computed over one event window
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct FeatureVector {
    /// Mean press-to-release duration in seconds
    pub mean_hold_time: f64,
    /// Mean release-to-next-press duration in seconds
    pub mean_flight_time: f64,
    /// Number of press/release pairs behind `mean_hold_time`
    pub hold_sample_count: usize,
}

impl FeatureVector {
    /// Features in model order: `[mean_hold_time, mean_flight_time]`
    pub fn as_array(&self) -> [f64; 2] {
        [self.mean_hold_time, self.mean_flight_time]
    }
}

/// Classification result for one feature vector
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Verdict {
    pub is_fatigued: bool,
    /// Probability of fatigue; only the probabilistic classifier reports it
    #[serde(skip_serializing_if = "Option::is_none")]
    pub confidence: Option<f64>,
}

impl Verdict {
    pub fn new(is_fatigued: bool, confidence: Option<f64>) -> Self {
        Self {
            is_fatigued,
            confidence,
        }
    }
}

impl fmt::Display for Verdict {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = if self.is_fatigued { "fatigued" } else { "alert" };
        match self.confidence {
            // Report the probability of the predicted class
            Some(p) if self.is_fatigued => write!(f, "{} ({:.0}%)", label, p * 100.0),
            Some(p) => write!(f, "{} ({:.0}%)", label, (1.0 - p) * 100.0),
            None => write!(f, "{}", label),
        }
    }
}

/// Why the intervention policy fired or held back
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DecisionReason {
    /// The previous intervention is too recent
    Cooldown,
    /// Fewer than two consecutive fatigued verdicts
    NotEnoughEvidence,
    /// Intervention fires
    Triggered,
}

impl fmt::Display for DecisionReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = match self {
            DecisionReason::Cooldown => "cooldown period",
            DecisionReason::NotEnoughEvidence => "not enough evidence",
            DecisionReason::Triggered => "fatigue detected continuously",
        };
        f.write_str(text)
    }
}

/// Outcome of `InterventionPolicy::decide`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct InterventionDecision {
    pub trigger: bool,
    pub reason: DecisionReason,
}

impl InterventionDecision {
    pub fn hold(reason: DecisionReason) -> Self {
        Self {
            trigger: false,
            reason,
        }
    }

    pub fn triggered() -> Self {
        Self {
            trigger: true,
            reason: DecisionReason::Triggered,
        }
    }
}

/// Message handed to the notifier when an intervention fires
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InterventionRequest {
    pub id: Uuid,
    /// Seconds since the Unix epoch at which the decision was made
    pub created_at: f64,
    pub features: FeatureVector,
    pub verdict: Verdict,
    /// Prompt shown to the user
    pub message: String,
}

impl InterventionRequest {
    pub fn new(created_at: f64, features: FeatureVector, verdict: Verdict, message: &str) -> Self {
        Self {
            id: Uuid::new_v4(),
            created_at,
            features,
            verdict,
            message: message.to_string(),
        }
    }
}

/// Self-reported fatigue severity (1 = fresh, 5 = exhausted)
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize)]
#[serde(transparent)]
pub struct Severity(u8);

/// Lowest score that counts as a fatigued self-report
pub const FATIGUED_SEVERITY: u8 = 4;

impl Severity {
    pub fn new(score: u8) -> Result<Self, FatigueError> {
        if (1..=5).contains(&score) {
            Ok(Self(score))
        } else {
            Err(FatigueError::InvalidSeverity(score))
        }
    }

    pub fn value(&self) -> u8 {
        self.0
    }

    /// Whether the user reported being fatigued (score of 4 or 5)
    pub fn indicates_fatigue(&self) -> bool {
        self.0 >= FATIGUED_SEVERITY
    }
}

impl<'de> Deserialize<'de> for Severity {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let score = u8::deserialize(deserializer)?;
        Severity::new(score).map_err(serde::de::Error::custom)
    }
}

/// One row of the feedback log
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeedbackRecord {
    /// Seconds since the Unix epoch at which the user answered
    pub timestamp: f64,
    #[serde(rename = "fatigue_score")]
    pub score: Severity,
    pub mean_hold_time: f64,
    pub mean_flight_time: f64,
    #[serde(rename = "is_fatigued_pred", deserialize_with = "deserialize_flag")]
    pub predicted_fatigued: bool,
}

impl FeedbackRecord {
    /// Build the record for a user's answer to an intervention prompt
    pub fn from_response(request: &InterventionRequest, score: Severity, answered_at: f64) -> Self {
        Self {
            timestamp: answered_at,
            score,
            mean_hold_time: request.features.mean_hold_time,
            mean_flight_time: request.features.mean_flight_time,
            predicted_fatigued: request.verdict.is_fatigued,
        }
    }
}

/// Accepts the boolean spellings found in existing feedback logs
fn deserialize_flag<'de, D: Deserializer<'de>>(deserializer: D) -> Result<bool, D::Error> {
    let raw = String::deserialize(deserializer)?;
    match raw.trim() {
        "true" | "True" | "TRUE" | "1" => Ok(true),
        "false" | "False" | "FALSE" | "0" => Ok(false),
        other => Err(serde::de::Error::custom(format!(
            "invalid boolean value: {}",
            other
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_key_event_kind_parse() {
        assert_eq!(KeyEventKind::parse("PRESS"), Some(KeyEventKind::Press));
        assert_eq!(KeyEventKind::parse(" RELEASE "), Some(KeyEventKind::Release));
        assert_eq!(KeyEventKind::parse("press"), None);
        assert_eq!(KeyEventKind::parse(""), None);
    }

    #[test]
    fn test_key_event_serialization() {
        let event = KeyEvent::press(1000.5, "a");
        let json = serde_json::to_string(&event).unwrap();
        assert_eq!(
            json,
            r#"{"timestamp":1000.5,"event_type":"PRESS","key_code":"a"}"#
        );

        let parsed: KeyEvent = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, event);
    }

    #[test]
    fn test_severity_bounds() {
        assert!(Severity::new(0).is_err());
        assert!(Severity::new(6).is_err());
        assert!(!Severity::new(3).unwrap().indicates_fatigue());
        assert!(Severity::new(4).unwrap().indicates_fatigue());
        assert!(Severity::new(5).unwrap().indicates_fatigue());
    }

    #[test]
    fn test_verdict_display() {
        assert_eq!(Verdict::new(true, None).to_string(), "fatigued");
        assert_eq!(Verdict::new(true, Some(0.8)).to_string(), "fatigued (80%)");
        assert_eq!(Verdict::new(false, Some(0.25)).to_string(), "alert (75%)");
    }

    #[test]
    fn test_feedback_record_from_response() {
        let features = FeatureVector {
            mean_hold_time: 0.2,
            mean_flight_time: 0.3,
            hold_sample_count: 12,
        };
        let request =
            InterventionRequest::new(100.0, features, Verdict::new(true, Some(0.9)), "break?");
        let record = FeedbackRecord::from_response(&request, Severity::new(4).unwrap(), 105.0);

        assert_eq!(record.timestamp, 105.0);
        assert_eq!(record.score.value(), 4);
        assert_eq!(record.mean_hold_time, 0.2);
        assert_eq!(record.mean_flight_time, 0.3);
        assert!(record.predicted_fatigued);
    }
}
