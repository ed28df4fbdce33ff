//! Fatigue CLI - Command-line interface for Synheart Fatigue
//!
//! Commands:
//! - monitor: Watch the keystroke log and prompt for breaks until Ctrl-C
//! - analyze: Classify a whole keystroke log once
//! - simulate: Write a synthetic keystroke log
//! - feedback: Summarize self-reported fatigue scores
//! - doctor: Diagnose configuration, model and log files

use clap::{Parser, Subcommand, ValueEnum};
use rand::rngs::StdRng;
use rand::SeedableRng;
use std::io;
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::sync::Arc;
use std::time::Duration;
use tracing::info;
use tracing_subscriber::EnvFilter;

use synheart_fatigue::classifier::{load_classifier, ClassifierModel, FatigueClassifier};
use synheart_fatigue::config::MonitorConfig;
use synheart_fatigue::monitor::MonitorLoop;
use synheart_fatigue::notifier::{spawn_notifier, LogSurface, PromptSurface, TerminalSurface};
use synheart_fatigue::simulator::{generate_session, SessionCondition};
use synheart_fatigue::store::{CsvEventLog, CsvFeedbackStore, FeedbackStore};
use synheart_fatigue::types::{FeatureVector, Verdict};
use synheart_fatigue::{FatigueError, FeatureExtractor, FATIGUE_VERSION, PRODUCER_NAME};

/// Fatigue - Keystroke-dynamics fatigue monitor with just-in-time break prompts
#[derive(Parser)]
#[command(name = "fatigue")]
#[command(author = "Synheart AI Inc")]
#[command(version = FATIGUE_VERSION)]
#[command(about = "Infer fatigue from keystroke timing and prompt for breaks", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Watch the keystroke log and prompt for breaks until Ctrl-C
    Monitor {
        /// JSON configuration file
        #[arg(short, long)]
        config: Option<PathBuf>,

        /// Keystroke log to watch
        #[arg(long)]
        event_log: Option<PathBuf>,

        /// Feedback log to append answers to
        #[arg(long)]
        feedback_log: Option<PathBuf>,

        /// Logistic-regression model file
        #[arg(long)]
        model: Option<PathBuf>,

        /// Seconds between evaluation cycles
        #[arg(long)]
        poll_interval: Option<u64>,

        /// Minimum seconds between interventions
        #[arg(long)]
        min_interval: Option<f64>,

        /// Where prompts are shown
        #[arg(long, value_enum, default_value = "terminal")]
        surface: SurfaceKind,
    },

    /// Classify a whole keystroke log once
    Analyze {
        /// Keystroke CSV log
        #[arg(short, long)]
        input: PathBuf,

        /// Logistic-regression model file
        #[arg(long)]
        model: Option<PathBuf>,

        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Write a synthetic keystroke log
    Simulate {
        /// Output CSV path
        #[arg(short, long)]
        output: PathBuf,

        /// Typing condition to simulate
        #[arg(long, value_enum)]
        condition: ConditionArg,

        /// Session length in seconds
        #[arg(long, default_value = "60")]
        duration: f64,

        /// Timestamp of the session start
        #[arg(long, default_value = "1000")]
        start: f64,

        /// RNG seed for reproducible sessions
        #[arg(long)]
        seed: Option<u64>,
    },

    /// Summarize self-reported fatigue scores
    Feedback {
        /// Feedback CSV log
        #[arg(short, long)]
        input: PathBuf,

        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Diagnose configuration, model and log files
    Doctor {
        /// JSON configuration file
        #[arg(short, long)]
        config: Option<PathBuf>,

        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
}

#[derive(Clone, ValueEnum)]
enum SurfaceKind {
    /// Ask on the terminal and read the score from stdin
    Terminal,
    /// Only log prompts; never records feedback
    Log,
}

#[derive(Clone, Copy, ValueEnum)]
enum ConditionArg {
    Alert,
    Fatigued,
}

impl From<ConditionArg> for SessionCondition {
    fn from(arg: ConditionArg) -> Self {
        match arg {
            ConditionArg::Alert => SessionCondition::Alert,
            ConditionArg::Fatigued => SessionCondition::Fatigued,
        }
    }
}

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(io::stderr)
        .init();

    let cli = Cli::parse();

    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("{}", serde_json::to_string(&CliError::from(e)).unwrap_or_else(|_| "Unknown error".to_string()));
            ExitCode::FAILURE
        }
    }
}

fn run(cli: Cli) -> Result<(), FatigueCliError> {
    match cli.command {
        Commands::Monitor {
            config,
            event_log,
            feedback_log,
            model,
            poll_interval,
            min_interval,
            surface,
        } => {
            let mut config = load_config(config.as_deref())?;
            if let Some(path) = event_log {
                config.event_log_path = path;
            }
            if let Some(path) = feedback_log {
                config.feedback_log_path = path;
            }
            if model.is_some() {
                config.model_path = model;
            }
            if let Some(secs) = poll_interval {
                config.poll_interval_sec = secs;
            }
            if let Some(secs) = min_interval {
                config.min_interval_sec = secs;
            }
            config.validate()?;
            cmd_monitor(config, surface)
        }

        Commands::Analyze { input, model, json } => cmd_analyze(&input, model.as_deref(), json),

        Commands::Simulate {
            output,
            condition,
            duration,
            start,
            seed,
        } => cmd_simulate(&output, condition.into(), duration, start, seed),

        Commands::Feedback { input, json } => cmd_feedback(&input, json),

        Commands::Doctor { config, json } => cmd_doctor(config.as_deref(), json),
    }
}

fn load_config(path: Option<&Path>) -> Result<MonitorConfig, FatigueCliError> {
    match path {
        Some(path) => Ok(MonitorConfig::load(path)?),
        None => Ok(MonitorConfig::default()),
    }
}

fn cmd_monitor(config: MonitorConfig, surface: SurfaceKind) -> Result<(), FatigueCliError> {
    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()?;

    let surface: Arc<dyn PromptSurface> = match surface {
        SurfaceKind::Terminal => Arc::new(TerminalSurface::stdin()),
        SurfaceKind::Log => Arc::new(LogSurface),
    };

    let result = runtime.block_on(async move {
        let feedback = Box::new(CsvFeedbackStore::new(&config.feedback_log_path));
        let (notifier, notifier_task) = spawn_notifier(surface, feedback, config.auto_dismiss());
        let auto_dismiss = config.auto_dismiss();

        let monitor = MonitorLoop::from_config(config, Arc::new(notifier))?;
        let handle = monitor.spawn();

        tokio::signal::ctrl_c().await?;
        info!(target: "fatigue::cli", "interrupt received, stopping monitor");

        let monitor = handle
            .shutdown()
            .await
            .map_err(|e| FatigueCliError::Task(e.to_string()))?;
        // Dropping the loop releases the last notifier handle
        drop(monitor);

        // A prompt that is still up dismisses itself within auto_dismiss
        let _ = tokio::time::timeout(auto_dismiss + Duration::from_secs(1), notifier_task).await;
        Ok::<(), FatigueCliError>(())
    });

    // A prompt still on screen must not delay exit
    runtime.shutdown_timeout(Duration::from_secs(1));
    result
}

fn cmd_analyze(input: &Path, model: Option<&Path>, json: bool) -> Result<(), FatigueCliError> {
    let events = CsvEventLog::new(input).read_all()?;
    if events.is_empty() {
        return Err(FatigueCliError::NoEvents);
    }

    let features = FeatureExtractor::compute(&events);
    let classifier = load_classifier(model, MonitorConfig::default().thresholds);
    let verdict = classifier.predict(&features);

    let report = AnalysisReport {
        event_count: events.len(),
        features,
        classifier: classifier.name().to_string(),
        verdict,
    };

    if json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        println!("Keystroke Analysis");
        println!("==================");
        println!("Events:           {}", report.event_count);
        println!("Hold samples:     {}", report.features.hold_sample_count);
        println!("Mean hold time:   {:.4} s", report.features.mean_hold_time);
        println!("Mean flight time: {:.4} s", report.features.mean_flight_time);
        println!("Classifier:       {}", report.classifier);
        println!("Verdict:          {}", report.verdict);
    }

    Ok(())
}

fn cmd_simulate(
    output: &Path,
    condition: SessionCondition,
    duration: f64,
    start: f64,
    seed: Option<u64>,
) -> Result<(), FatigueCliError> {
    if !(duration.is_finite() && duration > 0.0) {
        return Err(FatigueCliError::InvalidArgument(format!(
            "duration must be a positive number, got {}",
            duration
        )));
    }

    let mut rng = match seed {
        Some(seed) => StdRng::seed_from_u64(seed),
        None => StdRng::from_entropy(),
    };
    let events = generate_session(condition, start, duration, &mut rng);

    let log = CsvEventLog::create(output)?;
    log.append(&events)?;

    info!(
        target: "fatigue::cli",
        path = %log.path().display(),
        condition = %condition,
        events = events.len(),
        "wrote simulated session"
    );
    Ok(())
}

fn cmd_feedback(input: &Path, json: bool) -> Result<(), FatigueCliError> {
    let records = CsvFeedbackStore::new(input).read_all()?;

    let total = records.len();
    let reported_fatigued = records.iter().filter(|r| r.score.indicates_fatigue()).count();
    let predicted_fatigued = records.iter().filter(|r| r.predicted_fatigued).count();
    let agreeing = records
        .iter()
        .filter(|r| r.score.indicates_fatigue() == r.predicted_fatigued)
        .count();

    let summary = FeedbackSummary {
        total,
        mean_score: (total > 0).then(|| {
            records.iter().map(|r| f64::from(r.score.value())).sum::<f64>() / total as f64
        }),
        reported_fatigued,
        predicted_fatigued,
        agreement: (total > 0).then(|| agreeing as f64 / total as f64),
    };

    if json {
        println!("{}", serde_json::to_string_pretty(&summary)?);
    } else {
        println!("Feedback Summary");
        println!("================");
        println!("Responses:          {}", summary.total);
        match summary.mean_score {
            Some(mean) => println!("Mean score:         {:.2}", mean),
            None => println!("Mean score:         n/a"),
        }
        println!("Reported fatigued:  {}", summary.reported_fatigued);
        println!("Predicted fatigued: {}", summary.predicted_fatigued);
        match summary.agreement {
            Some(agreement) => println!("Agreement:          {:.0}%", agreement * 100.0),
            None => println!("Agreement:          n/a"),
        }
    }

    Ok(())
}

fn cmd_doctor(config_path: Option<&Path>, json: bool) -> Result<(), FatigueCliError> {
    let mut checks: Vec<DoctorCheck> = Vec::new();

    checks.push(DoctorCheck {
        name: "fatigue_version".to_string(),
        status: CheckStatus::Ok,
        message: format!("Fatigue version {}", FATIGUE_VERSION),
    });

    let config = match config_path {
        Some(path) => match MonitorConfig::load(path) {
            Ok(config) => {
                checks.push(DoctorCheck {
                    name: "config".to_string(),
                    status: CheckStatus::Ok,
                    message: format!("Configuration {} is valid", path.display()),
                });
                config
            }
            Err(e) => {
                checks.push(DoctorCheck {
                    name: "config".to_string(),
                    status: CheckStatus::Error,
                    message: format!("Invalid configuration: {}", e),
                });
                MonitorConfig::default()
            }
        },
        None => {
            checks.push(DoctorCheck {
                name: "config".to_string(),
                status: CheckStatus::Ok,
                message: "No configuration file, using defaults".to_string(),
            });
            MonitorConfig::default()
        }
    };

    checks.push(match &config.model_path {
        Some(path) => match ClassifierModel::load(path) {
            Ok(_) => DoctorCheck {
                name: "model".to_string(),
                status: CheckStatus::Ok,
                message: format!("Model {} loads", path.display()),
            },
            Err(e) => DoctorCheck {
                name: "model".to_string(),
                status: CheckStatus::Warning,
                message: format!("{}; threshold classifier will be used", e),
            },
        },
        None => DoctorCheck {
            name: "model".to_string(),
            status: CheckStatus::Ok,
            message: format!(
                "No model configured, thresholds hold > {:.3} s or flight > {:.3} s",
                config.thresholds.hold_threshold(),
                config.thresholds.flight_threshold()
            ),
        },
    });

    let event_log = &config.event_log_path;
    checks.push(if !event_log.exists() {
        DoctorCheck {
            name: "event_log".to_string(),
            status: CheckStatus::Warning,
            message: format!("{} does not exist yet", event_log.display()),
        }
    } else {
        match CsvEventLog::new(event_log).read_all() {
            Ok(events) => DoctorCheck {
                name: "event_log".to_string(),
                status: CheckStatus::Ok,
                message: format!("{} readable ({} events)", event_log.display(), events.len()),
            },
            Err(e) => DoctorCheck {
                name: "event_log".to_string(),
                status: CheckStatus::Error,
                message: format!("Cannot read {}: {}", event_log.display(), e),
            },
        }
    });

    let feedback_log = &config.feedback_log_path;
    checks.push(if !feedback_log.exists() {
        DoctorCheck {
            name: "feedback_log".to_string(),
            status: CheckStatus::Ok,
            message: format!("{} will be created on first answer", feedback_log.display()),
        }
    } else {
        match CsvFeedbackStore::new(feedback_log).read_all() {
            Ok(records) => DoctorCheck {
                name: "feedback_log".to_string(),
                status: CheckStatus::Ok,
                message: format!("{} readable ({} responses)", feedback_log.display(), records.len()),
            },
            Err(e) => DoctorCheck {
                name: "feedback_log".to_string(),
                status: CheckStatus::Error,
                message: format!("Cannot read {}: {}", feedback_log.display(), e),
            },
        }
    });

    let report = DoctorReport {
        producer: PRODUCER_NAME.to_string(),
        version: FATIGUE_VERSION.to_string(),
        checks,
    };

    if json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        println!("Fatigue Doctor Report");
        println!("=====================");
        println!("Producer: {}", report.producer);
        println!("Version:  {}", report.version);
        println!("\nChecks:");

        for check in &report.checks {
            let status_icon = match check.status {
                CheckStatus::Ok => "[OK]",
                CheckStatus::Warning => "[WARN]",
                CheckStatus::Error => "[ERR]",
            };
            println!("  {} {}: {}", status_icon, check.name, check.message);
        }
    }

    let has_errors = report.checks.iter().any(|c| matches!(c.status, CheckStatus::Error));
    if has_errors {
        Err(FatigueCliError::DoctorFailed)
    } else {
        Ok(())
    }
}

// Error types

#[derive(Debug)]
enum FatigueCliError {
    Io(io::Error),
    Fatigue(FatigueError),
    Json(serde_json::Error),
    Task(String),
    InvalidArgument(String),
    NoEvents,
    DoctorFailed,
}

impl From<io::Error> for FatigueCliError {
    fn from(e: io::Error) -> Self {
        FatigueCliError::Io(e)
    }
}

impl From<FatigueError> for FatigueCliError {
    fn from(e: FatigueError) -> Self {
        FatigueCliError::Fatigue(e)
    }
}

impl From<serde_json::Error> for FatigueCliError {
    fn from(e: serde_json::Error) -> Self {
        FatigueCliError::Json(e)
    }
}

#[derive(serde::Serialize)]
struct CliError {
    code: String,
    message: String,
    hint: Option<String>,
}

impl From<FatigueCliError> for CliError {
    fn from(e: FatigueCliError) -> Self {
        match e {
            FatigueCliError::Io(e) => CliError {
                code: "IO_ERROR".to_string(),
                message: e.to_string(),
                hint: Some("Check file paths and permissions".to_string()),
            },
            FatigueCliError::Fatigue(e) => {
                let (code, hint) = match &e {
                    FatigueError::InvalidConfig(_) => {
                        ("INVALID_CONFIG", "Run 'fatigue doctor --config <file>' for details")
                    }
                    FatigueError::ModelUnavailable(_) => {
                        ("MODEL_UNAVAILABLE", "Check the model path or omit --model")
                    }
                    FatigueError::Csv(_) | FatigueError::ParseError(_) => {
                        ("PARSE_ERROR", "Ensure the log has timestamp,event_type,key_code columns")
                    }
                    _ => ("FATIGUE_ERROR", "Check input files and configuration"),
                };
                CliError {
                    code: code.to_string(),
                    message: e.to_string(),
                    hint: Some(hint.to_string()),
                }
            }
            FatigueCliError::Json(e) => CliError {
                code: "JSON_ERROR".to_string(),
                message: e.to_string(),
                hint: Some("Check JSON syntax".to_string()),
            },
            FatigueCliError::Task(msg) => CliError {
                code: "TASK_FAILED".to_string(),
                message: msg,
                hint: None,
            },
            FatigueCliError::InvalidArgument(msg) => CliError {
                code: "INVALID_ARGUMENT".to_string(),
                message: msg,
                hint: Some("Run with --help for usage".to_string()),
            },
            FatigueCliError::NoEvents => CliError {
                code: "NO_EVENTS".to_string(),
                message: "No key events found in input".to_string(),
                hint: Some("Ensure the log is not empty".to_string()),
            },
            FatigueCliError::DoctorFailed => CliError {
                code: "DOCTOR_FAILED".to_string(),
                message: "One or more health checks failed".to_string(),
                hint: Some("Review the doctor report for details".to_string()),
            },
        }
    }
}

// Report types

#[derive(serde::Serialize)]
struct AnalysisReport {
    event_count: usize,
    features: FeatureVector,
    classifier: String,
    verdict: Verdict,
}

#[derive(serde::Serialize)]
struct FeedbackSummary {
    total: usize,
    mean_score: Option<f64>,
    reported_fatigued: usize,
    predicted_fatigued: usize,
    agreement: Option<f64>,
}

#[derive(serde::Serialize)]
struct DoctorReport {
    producer: String,
    version: String,
    checks: Vec<DoctorCheck>,
}

#[derive(serde::Serialize)]
struct DoctorCheck {
    name: String,
    status: CheckStatus,
    message: String,
}

#[derive(serde::Serialize)]
enum CheckStatus {
    Ok,
    Warning,
    Error,
}
