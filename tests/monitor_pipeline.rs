//! End-to-end checks: CSV event log → monitor → notifier → CSV feedback log

use std::sync::Arc;
use std::time::Duration;

use pretty_assertions::assert_eq;
use rand::rngs::StdRng;
use rand::SeedableRng;
use tempfile::tempdir;

use synheart_fatigue::clock::ManualClock;
use synheart_fatigue::simulator::{generate_session, SessionCondition};
use synheart_fatigue::store::{CsvEventLog, CsvFeedbackStore, FeedbackStore};
use synheart_fatigue::{
    spawn_notifier, CycleOutcome, DecisionReason, InterventionRequest, MonitorConfig, MonitorLoop,
    PromptSurface, ThresholdClassifier,
};

struct AlwaysTired;

impl PromptSurface for AlwaysTired {
    fn present(&self, _request: &InterventionRequest, _timeout: Duration) -> Option<u8> {
        Some(5)
    }
}

fn config_in(dir: &std::path::Path) -> MonitorConfig {
    MonitorConfig {
        event_log_path: dir.join("keystroke_log.csv"),
        feedback_log_path: dir.join("feedback_log.csv"),
        min_interval_sec: 60.0,
        // Between the simulated alert (0.10 / 0.15 s) and fatigued (0.14 / 0.25 s) means
        thresholds: ThresholdClassifier::new(0.12, 0.20),
        ..MonitorConfig::default()
    }
}

#[tokio::test]
async fn fatigued_session_prompts_once_and_records_answer() {
    let dir = tempdir().unwrap();
    let config = config_in(dir.path());

    let mut rng = StdRng::seed_from_u64(11);
    let events = generate_session(SessionCondition::Fatigued, 1000.0, 120.0, &mut rng);
    CsvEventLog::create(&config.event_log_path)
        .unwrap()
        .append(&events)
        .unwrap();

    let feedback = Box::new(CsvFeedbackStore::new(&config.feedback_log_path));
    let (notifier, notifier_task) =
        spawn_notifier(Arc::new(AlwaysTired), feedback, Duration::from_secs(5));

    let clock = Arc::new(ManualClock::new(1060.0));
    let mut monitor = MonitorLoop::from_config(config.clone(), Arc::new(notifier))
        .unwrap()
        .with_clock(clock.clone());

    let mut triggers = 0;
    for _ in 0..6 {
        let outcome = monitor.run_cycle();
        assert!(matches!(outcome, CycleOutcome::Evaluated { .. }));
        if outcome.triggered() {
            triggers += 1;
        }
        clock.advance(10.0);
    }
    // 1060 evaluates, 1070 triggers, 1080..1110 are inside the 60 s cooldown
    assert_eq!(triggers, 1);

    drop(monitor);
    let store = notifier_task.await.unwrap();
    let records = store.read_all().unwrap();
    assert_eq!(records.len(), 1);
    assert_eq!(records[0].score.value(), 5);
    assert!(records[0].predicted_fatigued);

    let on_disk = CsvFeedbackStore::new(&config.feedback_log_path)
        .read_all()
        .unwrap();
    assert_eq!(on_disk, records);
}

#[tokio::test]
async fn alert_session_never_prompts() {
    let dir = tempdir().unwrap();
    let config = config_in(dir.path());

    let mut rng = StdRng::seed_from_u64(12);
    let events = generate_session(SessionCondition::Alert, 1000.0, 120.0, &mut rng);
    CsvEventLog::create(&config.event_log_path)
        .unwrap()
        .append(&events)
        .unwrap();

    let feedback = Box::new(CsvFeedbackStore::new(&config.feedback_log_path));
    let (notifier, notifier_task) =
        spawn_notifier(Arc::new(AlwaysTired), feedback, Duration::from_secs(5));
    let mut monitor = MonitorLoop::from_config(config.clone(), Arc::new(notifier)).unwrap();

    for now in [1060.0, 1070.0, 1080.0] {
        match monitor.evaluate_at(now) {
            CycleOutcome::Evaluated {
                verdict, decision, ..
            } => {
                assert!(!verdict.is_fatigued);
                assert_eq!(decision.reason, DecisionReason::NotEnoughEvidence);
            }
            other => panic!("unexpected outcome: {:?}", other),
        }
    }

    drop(monitor);
    notifier_task.await.unwrap();
    assert!(!config.feedback_log_path.exists());
}

#[tokio::test]
async fn missing_event_log_reports_insufficient_data() {
    let dir = tempdir().unwrap();
    let config = config_in(dir.path());

    let (notifier, _task) = spawn_notifier(
        Arc::new(AlwaysTired),
        Box::new(CsvFeedbackStore::new(&config.feedback_log_path)),
        Duration::from_secs(1),
    );
    let mut monitor = MonitorLoop::from_config(config, Arc::new(notifier)).unwrap();

    assert_eq!(
        monitor.evaluate_at(2000.0),
        CycleOutcome::InsufficientData {
            event_count: 0,
            hold_samples: 0,
            required: 5,
        }
    );
}

#[test]
fn invalid_config_is_rejected() {
    let (notifier, _rx) = synheart_fatigue::ChannelNotifier::channel();
    let config = MonitorConfig {
        poll_interval_sec: 0,
        ..MonitorConfig::default()
    };
    assert!(MonitorLoop::from_config(config, Arc::new(notifier)).is_err());
}
