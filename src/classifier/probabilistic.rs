//! Logistic-regression fatigue classifier
//!
//! The model is trained elsewhere and persisted as JSON. Inference standardizes
//! the two timing features, applies the linear model and squashes the result
//! through a sigmoid.

use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use super::FatigueClassifier;
use crate::error::FatigueError;
use crate::types::{FeatureVector, Verdict};

/// Probability at or above which a window counts as fatigued
pub const DECISION_BOUNDARY: f64 = 0.5;

/// Persisted logistic-regression parameters.
///
/// Feature order is `[mean_hold_time, mean_flight_time]`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClassifierModel {
    pub feature_means: [f64; 2],
    pub feature_stddevs: [f64; 2],
    pub weights: [f64; 2],
    pub bias: f64,
}

impl ClassifierModel {
    /// Load a model from a JSON file
    pub fn load(path: &Path) -> Result<Self, FatigueError> {
        let json = fs::read_to_string(path).map_err(|e| {
            FatigueError::ModelUnavailable(format!("{}: {}", path.display(), e))
        })?;
        Self::from_json(&json)
            .map_err(|e| FatigueError::ModelUnavailable(format!("{}: {}", path.display(), e)))
    }

    /// Save the model as pretty-printed JSON
    pub fn save(&self, path: &Path) -> Result<(), FatigueError> {
        fs::write(path, self.to_json()?)?;
        Ok(())
    }

    pub fn from_json(json: &str) -> Result<Self, FatigueError> {
        let model: ClassifierModel = serde_json::from_str(json)?;
        model.validate()?;
        Ok(model)
    }

    pub fn to_json(&self) -> Result<String, FatigueError> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Reject parameters that would make predictions meaningless
    pub fn validate(&self) -> Result<(), FatigueError> {
        let all_finite = self
            .feature_means
            .iter()
            .chain(self.feature_stddevs.iter())
            .chain(self.weights.iter())
            .chain(std::iter::once(&self.bias))
            .all(|v| v.is_finite());
        if !all_finite {
            return Err(FatigueError::ModelUnavailable(
                "model parameters must be finite".to_string(),
            ));
        }
        if self.feature_stddevs.iter().any(|s| *s < 0.0) {
            return Err(FatigueError::ModelUnavailable(
                "feature standard deviations must not be negative".to_string(),
            ));
        }
        Ok(())
    }

    /// Probability that the given features come from a fatigued user
    pub fn probability(&self, features: &FeatureVector) -> f64 {
        let z = features
            .as_array()
            .iter()
            .enumerate()
            .map(|(i, x)| self.weights[i] * standardize(*x, self.feature_means[i], self.feature_stddevs[i]))
            .sum::<f64>()
            + self.bias;
        sigmoid(z)
    }
}

/// Scale a feature to zero mean and unit variance; a zero deviation scales by 1
fn standardize(x: f64, mean: f64, stddev: f64) -> f64 {
    let scale = if stddev == 0.0 { 1.0 } else { stddev };
    (x - mean) / scale
}

fn sigmoid(z: f64) -> f64 {
    1.0 / (1.0 + (-z).exp())
}

/// Classifier backed by a loaded [`ClassifierModel`]
#[derive(Debug, Clone)]
pub struct ProbabilisticClassifier {
    model: ClassifierModel,
}

impl ProbabilisticClassifier {
    pub fn new(model: ClassifierModel) -> Result<Self, FatigueError> {
        model.validate()?;
        Ok(Self { model })
    }

    /// Load the model file; any failure surfaces as `ModelUnavailable`
    pub fn load(path: &Path) -> Result<Self, FatigueError> {
        Self::new(ClassifierModel::load(path)?)
    }

    pub fn model(&self) -> &ClassifierModel {
        &self.model
    }
}

impl FatigueClassifier for ProbabilisticClassifier {
    fn predict(&self, features: &FeatureVector) -> Verdict {
        let probability = self.model.probability(features);
        Verdict::new(probability >= DECISION_BOUNDARY, Some(probability))
    }

    fn name(&self) -> &'static str {
        "probabilistic"
    }
}
