//! Keystroke timing feature extraction
//!
//! Converts an ordered window of key events into hold-time and flight-time
//! statistics. Events are expected in non-decreasing timestamp order; the
//! extractor never re-sorts them.

use std::collections::HashMap;

use crate::types::{FeatureVector, KeyEvent, KeyEventKind};

/// Feature extractor for keystroke windows
pub struct FeatureExtractor;

impl FeatureExtractor {
    /// Compute timing features for an ordered event window
    pub fn compute(events: &[KeyEvent]) -> FeatureVector {
        let holds = hold_times(events);
        let flights = flight_times(events);

        FeatureVector {
            mean_hold_time: mean(&holds),
            mean_flight_time: mean(&flights),
            hold_sample_count: holds.len(),
        }
    }
}

/// Hold times for every press that has a later release of the same key.
///
/// Each press is paired with the first release of its key whose timestamp is
/// strictly greater. Releases are not consumed, so rapid repeats of one key may
/// pair several presses with the same release.
pub fn hold_times(events: &[KeyEvent]) -> Vec<f64> {
    let mut releases: HashMap<&str, Vec<f64>> = HashMap::new();
    for event in events.iter().filter(|e| e.kind == KeyEventKind::Release) {
        releases
            .entry(event.key_code.as_str())
            .or_default()
            .push(event.timestamp);
    }

    events
        .iter()
        .filter(|e| e.kind == KeyEventKind::Press)
        .filter_map(|press| {
            releases
                .get(press.key_code.as_str())?
                .iter()
                .find(|&&released_at| released_at > press.timestamp)
                .map(|released_at| released_at - press.timestamp)
        })
        .collect()
}

/// Flight times for every release immediately followed by a press, regardless of key
pub fn flight_times(events: &[KeyEvent]) -> Vec<f64> {
    events
        .windows(2)
        .filter(|pair| pair[0].kind == KeyEventKind::Release && pair[1].kind == KeyEventKind::Press)
        .map(|pair| pair[1].timestamp - pair[0].timestamp)
        .collect()
}

fn mean(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    values.iter().sum::<f64>() / values.len() as f64
}
