//! Synheart Fatigue - Keystroke-dynamics fatigue inference with just-in-time interventions
//!
//! A monitor periodically pulls the recent keystroke window, reduces it to
//! timing features and classifies the user as alert or fatigued. An
//! intervention policy decides when a break prompt is warranted, and the
//! notifier shows it without stalling the monitor.
//!
//! Pipeline: event log → feature extraction → classification → intervention policy → notifier
//!
//! ## Modules
//!
//! - **Features**: hold and flight times from PRESS/RELEASE events
//! - **Classifier**: fixed thresholds or a persisted logistic-regression model
//! - **Policy**: cooldown plus two consecutive fatigued verdicts
//! - **Monitor**: the periodic loop tying the stages together

pub mod classifier;
pub mod clock;
pub mod config;
pub mod error;
pub mod features;
pub mod monitor;
pub mod notifier;
pub mod policy;
pub mod simulator;
pub mod store;
pub mod types;

pub use classifier::{
    load_classifier, ClassifierModel, FatigueClassifier, ProbabilisticClassifier,
    ThresholdClassifier,
};
pub use config::MonitorConfig;
pub use error::FatigueError;
pub use features::FeatureExtractor;
pub use monitor::{CycleOutcome, MonitorHandle, MonitorLoop};
pub use notifier::{
    spawn_notifier, ChannelNotifier, LogSurface, Notifier, PromptSurface, TerminalSurface,
};
pub use policy::{InterventionPolicy, InterventionState};
pub use types::{
    DecisionReason, FeatureVector, FeedbackRecord, InterventionDecision, InterventionRequest,
    KeyEvent, KeyEventKind, Severity, Verdict,
};

/// Crate version reported by the CLI and doctor checks
pub const FATIGUE_VERSION: &str = env!("CARGO_PKG_VERSION");

/// Producer name for reports
pub const PRODUCER_NAME: &str = "synheart-fatigue";
