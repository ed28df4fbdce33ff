//! Fatigue classifiers
//!
//! Both classifiers implement [`FatigueClassifier`], so the monitor never needs
//! to know which one is active. Selection happens once, at configuration time,
//! in [`load_classifier`].

pub mod probabilistic;
pub mod threshold;

use std::path::Path;

use tracing::{info, warn};

use crate::types::{FeatureVector, Verdict};

pub use probabilistic::{ClassifierModel, ProbabilisticClassifier};
pub use threshold::{ThresholdClassifier, DEFAULT_FLIGHT_THRESHOLD_SEC, DEFAULT_HOLD_THRESHOLD_SEC};

/// Turns timing features into a fatigue verdict
pub trait FatigueClassifier: Send + Sync {
    /// Classify one feature vector
    fn predict(&self, features: &FeatureVector) -> Verdict;

    /// Short name for logs and status reports
    fn name(&self) -> &'static str;
}

/// Pick the learned model when it loads, otherwise fall back to thresholds.
///
/// A missing or corrupt model is never fatal.
pub fn load_classifier(
    model_path: Option<&Path>,
    fallback: ThresholdClassifier,
) -> Box<dyn FatigueClassifier> {
    let Some(path) = model_path else {
        info!(
            target: "fatigue::classifier",
            hold_threshold = fallback.hold_threshold(),
            flight_threshold = fallback.flight_threshold(),
            "no model configured, using threshold classifier"
        );
        return Box::new(fallback);
    };

    match ProbabilisticClassifier::load(path) {
        Ok(classifier) => {
            info!(target: "fatigue::classifier", path = %path.display(), "loaded fatigue model");
            Box::new(classifier)
        }
        Err(e) => {
            warn!(
                target: "fatigue::classifier",
                error = %e,
                hold_threshold = fallback.hold_threshold(),
                flight_threshold = fallback.flight_threshold(),
                "falling back to threshold classifier"
            );
            Box::new(fallback)
        }
    }
}
