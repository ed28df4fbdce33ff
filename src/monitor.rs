//! Monitor loop
//!
//! Every poll interval the monitor pulls the trailing event window, extracts
//! timing features, classifies them and asks the intervention policy whether
//! to prompt the user. Triggered interventions are handed to the notifier
//! without waiting for the user.
//!
//! Pipeline: Event source → FeatureExtractor → FatigueClassifier → InterventionPolicy → Notifier

use std::path::Path;
use std::sync::{Arc, Mutex};

use serde::Serialize;
use tokio::sync::watch;
use tokio::task::{JoinError, JoinHandle};
use tokio::time::MissedTickBehavior;
use tracing::{debug, info, warn};

use crate::classifier::{load_classifier, FatigueClassifier};
use crate::clock::{Clock, SystemClock};
use crate::config::MonitorConfig;
use crate::error::FatigueError;
use crate::features::FeatureExtractor;
use crate::notifier::Notifier;
use crate::policy::InterventionPolicy;
use crate::store::{CsvEventLog, EventSource};
use crate::types::{FeatureVector, InterventionDecision, InterventionRequest, KeyEvent, Verdict};

/// Result of one evaluation cycle
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum CycleOutcome {
    /// The event source could not be read; nothing was evaluated
    SourceFailed,
    /// Too few hold samples to classify; the policy was not consulted
    InsufficientData {
        event_count: usize,
        hold_samples: usize,
        required: usize,
    },
    /// Features were classified and the policy decided
    Evaluated {
        features: FeatureVector,
        verdict: Verdict,
        decision: InterventionDecision,
    },
}

impl CycleOutcome {
    pub fn triggered(&self) -> bool {
        matches!(self, CycleOutcome::Evaluated { decision, .. } if decision.trigger)
    }
}

/// Periodic driver that owns the intervention policy.
///
/// The loop is the only caller of [`InterventionPolicy::decide`]. Running two
/// loops requires two independent instances.
pub struct MonitorLoop {
    config: MonitorConfig,
    source: Arc<Mutex<Box<dyn EventSource>>>,
    classifier: Box<dyn FatigueClassifier>,
    policy: InterventionPolicy,
    notifier: Arc<dyn Notifier>,
    clock: Arc<dyn Clock>,
}

impl MonitorLoop {
    pub fn new(
        config: MonitorConfig,
        source: Box<dyn EventSource>,
        classifier: Box<dyn FatigueClassifier>,
        notifier: Arc<dyn Notifier>,
    ) -> Self {
        let policy = InterventionPolicy::new(config.min_interval_sec);
        Self {
            config,
            source: Arc::new(Mutex::new(source)),
            classifier,
            policy,
            notifier,
            clock: Arc::new(SystemClock),
        }
    }

    /// Build a loop over the configured CSV event log and classifier
    pub fn from_config(
        config: MonitorConfig,
        notifier: Arc<dyn Notifier>,
    ) -> Result<Self, FatigueError> {
        config.validate()?;
        let source = Box::new(CsvEventLog::new(&config.event_log_path));
        let classifier = load_classifier(config.model_path.as_deref(), config.thresholds);
        Ok(Self::new(config, source, classifier, notifier))
    }

    /// Replace the clock (tests, replays)
    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    /// Run one cycle at the current clock time
    pub fn run_cycle(&mut self) -> CycleOutcome {
        let now = self.clock.now();
        self.evaluate_at(now)
    }

    /// Run one cycle as if the current time were `now`
    pub fn evaluate_at(&mut self, now: f64) -> CycleOutcome {
        let window = read_window(&self.source, now - self.config.window_sec);
        self.evaluate_window(now, window)
    }

    /// Run one cycle at the current clock time, reading the event log on the
    /// blocking pool
    pub async fn poll_once(&mut self) -> CycleOutcome {
        let now = self.clock.now();
        let since = now - self.config.window_sec;
        let source = Arc::clone(&self.source);
        let window = tokio::task::spawn_blocking(move || read_window(&source, since))
            .await
            .unwrap_or_else(|e| Err(FatigueError::SourceUnavailable(e.to_string())));
        self.evaluate_window(now, window)
    }

    fn evaluate_window(
        &mut self,
        now: f64,
        window: Result<Vec<KeyEvent>, FatigueError>,
    ) -> CycleOutcome {
        let events = match window {
            Ok(events) => events,
            Err(e) => {
                warn!(target: "fatigue::monitor", error = %e, "failed to read event window");
                return CycleOutcome::SourceFailed;
            }
        };

        let features = FeatureExtractor::compute(&events);
        if features.hold_sample_count < self.config.min_hold_samples {
            debug!(
                target: "fatigue::monitor",
                events = events.len(),
                hold_samples = features.hold_sample_count,
                required = self.config.min_hold_samples,
                "collecting data"
            );
            return CycleOutcome::InsufficientData {
                event_count: events.len(),
                hold_samples: features.hold_sample_count,
                required: self.config.min_hold_samples,
            };
        }

        let verdict = self.classifier.predict(&features);
        info!(
            target: "fatigue::monitor",
            mean_hold_time = features.mean_hold_time,
            mean_flight_time = features.mean_flight_time,
            hold_samples = features.hold_sample_count,
            classifier = self.classifier.name(),
            "{}",
            verdict
        );

        let decision = self.policy.decide(verdict.is_fatigued, now);
        if decision.trigger {
            info!(target: "fatigue::monitor", reason = %decision.reason, "dispatching intervention");
            let request =
                InterventionRequest::new(now, features, verdict, &self.config.prompt_message);
            if let Err(e) = self.notifier.dispatch(request) {
                warn!(target: "fatigue::monitor", error = %e, "failed to dispatch intervention");
            }
        } else {
            debug!(target: "fatigue::monitor", reason = %decision.reason, "no intervention");
        }

        CycleOutcome::Evaluated {
            features,
            verdict,
            decision,
        }
    }

    /// Reload the classifier from `model_path`, falling back to thresholds
    pub fn reload_classifier(&mut self, model_path: Option<&Path>) {
        self.classifier = load_classifier(model_path, self.config.thresholds);
        self.config.model_path = model_path.map(Path::to_path_buf);
    }

    /// Poll until `shutdown` turns true or its sender is dropped
    pub async fn run(mut self, mut shutdown: watch::Receiver<bool>) -> Self {
        let mut interval = tokio::time::interval(self.config.poll_interval());
        interval.set_missed_tick_behavior(MissedTickBehavior::Delay);

        info!(
            target: "fatigue::monitor",
            poll_interval_sec = self.config.poll_interval_sec,
            window_sec = self.config.window_sec,
            min_interval_sec = self.config.min_interval_sec,
            classifier = self.classifier.name(),
            "fatigue monitor started"
        );

        loop {
            tokio::select! {
                _ = interval.tick() => {
                    self.poll_once().await;
                }
                changed = shutdown.changed() => {
                    if changed.is_err() || *shutdown.borrow() {
                        break;
                    }
                }
            }
        }

        info!(target: "fatigue::monitor", "fatigue monitor stopped");
        self
    }

    /// Start the loop on the tokio runtime
    pub fn spawn(self) -> MonitorHandle {
        let (stop_tx, stop_rx) = watch::channel(false);
        let join = tokio::spawn(self.run(stop_rx));
        MonitorHandle { stop_tx, join }
    }

    pub fn config(&self) -> &MonitorConfig {
        &self.config
    }

    pub fn policy(&self) -> &InterventionPolicy {
        &self.policy
    }

    pub fn classifier_name(&self) -> &'static str {
        self.classifier.name()
    }
}

fn read_window(
    source: &Mutex<Box<dyn EventSource>>,
    since: f64,
) -> Result<Vec<KeyEvent>, FatigueError> {
    let mut source = source
        .lock()
        .map_err(|_| FatigueError::SourceUnavailable("event source lock poisoned".to_string()))?;
    source.events_since(since)
}

/// Handle to a spawned [`MonitorLoop`].
///
/// Dropping the handle also stops the loop.
pub struct MonitorHandle {
    stop_tx: watch::Sender<bool>,
    join: JoinHandle<MonitorLoop>,
}

impl MonitorHandle {
    /// Ask the loop to stop after its current cycle
    pub fn stop(&self) {
        // Err only means the loop already exited
        let _ = self.stop_tx.send(true);
    }

    /// Wait for the loop to exit after [`stop`](Self::stop), returning its final state
    pub async fn join(self) -> Result<MonitorLoop, JoinError> {
        let MonitorHandle { stop_tx, join } = self;
        let finished = join.await;
        drop(stop_tx);
        finished
    }

    /// Stop the loop and wait for it
    pub async fn shutdown(self) -> Result<MonitorLoop, JoinError> {
        self.stop();
        self.join().await
    }
}
