//! Intervention dispatch
//!
//! The monitor hands each [`InterventionRequest`] to a [`Notifier`] and moves
//! on. The default notifier forwards requests over a channel to a background
//! task, which shows the prompt on a [`PromptSurface`] and records whatever
//! severity the user reports in a [`FeedbackStore`].

use std::io::{self, BufRead};
use std::sync::{mpsc as std_mpsc, Arc, Mutex};
use std::time::Duration;

use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::clock::unix_now;
use crate::error::FatigueError;
use crate::store::FeedbackStore;
use crate::types::{FeedbackRecord, InterventionRequest, Severity};

/// Extra time a surface gets past its deadline before the prompt is abandoned
pub const PROMPT_GRACE: Duration = Duration::from_millis(250);

/// Receives intervention requests without blocking the caller
pub trait Notifier: Send + Sync {
    fn dispatch(&self, request: InterventionRequest) -> Result<(), FatigueError>;
}

/// Notifier backed by an unbounded channel
#[derive(Debug, Clone)]
pub struct ChannelNotifier {
    tx: mpsc::UnboundedSender<InterventionRequest>,
}

impl ChannelNotifier {
    /// Create a notifier and the receiving end of its channel
    pub fn channel() -> (Self, mpsc::UnboundedReceiver<InterventionRequest>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx }, rx)
    }
}

impl Notifier for ChannelNotifier {
    fn dispatch(&self, request: InterventionRequest) -> Result<(), FatigueError> {
        self.tx
            .send(request)
            .map_err(|_| FatigueError::NotifierClosed)
    }
}

/// Where prompts are shown to the user.
///
/// `present` runs on the blocking pool and must return within `timeout`:
/// the raw 1-5 score, or `None` when the prompt was dismissed or timed out.
/// A surface that overruns its deadline by more than [`PROMPT_GRACE`] is
/// abandoned and its answer dropped.
pub trait PromptSurface: Send + Sync + 'static {
    fn present(&self, request: &InterventionRequest, timeout: Duration) -> Option<u8>;
}

/// Surface that only writes the prompt to the log
#[derive(Debug, Clone, Copy, Default)]
pub struct LogSurface;

impl PromptSurface for LogSurface {
    fn present(&self, request: &InterventionRequest, _timeout: Duration) -> Option<u8> {
        info!(
            target: "fatigue::notifier",
            request_id = %request.id,
            mean_hold_time = request.features.mean_hold_time,
            mean_flight_time = request.features.mean_flight_time,
            "{}",
            request.message
        );
        None
    }
}

/// Prompt on stderr and take the answer from a stream of input lines.
///
/// Lines come from one long-lived reader, so a prompt that times out leaves
/// nothing behind to swallow the answer to the next one. Lines typed while no
/// prompt is showing are discarded.
pub struct TerminalSurface {
    lines: Mutex<std_mpsc::Receiver<String>>,
}

impl TerminalSurface {
    pub fn new(lines: std_mpsc::Receiver<String>) -> Self {
        Self {
            lines: Mutex::new(lines),
        }
    }

    /// Surface fed by a thread that reads stdin for the life of the process
    pub fn stdin() -> Self {
        let (tx, rx) = std_mpsc::channel();
        std::thread::spawn(move || {
            for line in io::stdin().lock().lines() {
                let Ok(line) = line else { break };
                if tx.send(line).is_err() {
                    break;
                }
            }
        });
        Self::new(rx)
    }
}

impl PromptSurface for TerminalSurface {
    fn present(&self, request: &InterventionRequest, timeout: Duration) -> Option<u8> {
        let lines = match self.lines.lock() {
            Ok(lines) => lines,
            Err(poisoned) => poisoned.into_inner(),
        };
        while lines.try_recv().is_ok() {}

        eprintln!("\n{}", request.message);
        eprint!("score (1-5)> ");

        let line = lines.recv_timeout(timeout).ok()?;
        line.trim().parse().ok()
    }
}

/// Start the background notifier task.
///
/// The task owns `feedback` and is its only writer. It exits when every
/// [`ChannelNotifier`] clone has been dropped.
pub fn spawn_notifier(
    surface: Arc<dyn PromptSurface>,
    feedback: Box<dyn FeedbackStore>,
    auto_dismiss: Duration,
) -> (ChannelNotifier, JoinHandle<Box<dyn FeedbackStore>>) {
    let (notifier, rx) = ChannelNotifier::channel();
    let handle = tokio::spawn(run_notifier(rx, surface, feedback, auto_dismiss));
    (notifier, handle)
}

async fn run_notifier(
    mut rx: mpsc::UnboundedReceiver<InterventionRequest>,
    surface: Arc<dyn PromptSurface>,
    mut feedback: Box<dyn FeedbackStore>,
    auto_dismiss: Duration,
) -> Box<dyn FeedbackStore> {
    while let Some(request) = rx.recv().await {
        let Some(score) = ask(&surface, &request, auto_dismiss).await else {
            continue;
        };

        let record = FeedbackRecord::from_response(&request, score, unix_now());
        match feedback.append(&record) {
            Ok(()) => info!(
                target: "fatigue::notifier",
                request_id = %request.id,
                score = score.value(),
                "recorded fatigue feedback"
            ),
            // Losing one answer is acceptable; the monitor keeps running
            Err(e) => warn!(
                target: "fatigue::notifier",
                request_id = %request.id,
                error = %e,
                "failed to record feedback"
            ),
        }
    }
    debug!(target: "fatigue::notifier", "notifier channel closed");
    feedback
}

/// Show one prompt and wait for a valid score or the auto-dismiss timeout
async fn ask(
    surface: &Arc<dyn PromptSurface>,
    request: &InterventionRequest,
    auto_dismiss: Duration,
) -> Option<Severity> {
    let surface = Arc::clone(surface);
    let shown = request.clone();
    let prompt = tokio::task::spawn_blocking(move || surface.present(&shown, auto_dismiss));

    let raw = match tokio::time::timeout(auto_dismiss + PROMPT_GRACE, prompt).await {
        Ok(Ok(Some(raw))) => raw,
        Ok(Ok(None)) => {
            debug!(target: "fatigue::notifier", request_id = %request.id, "prompt dismissed");
            return None;
        }
        Ok(Err(e)) => {
            warn!(target: "fatigue::notifier", error = %e, "prompt surface failed");
            return None;
        }
        Err(_) => {
            warn!(
                target: "fatigue::notifier",
                request_id = %request.id,
                "prompt surface overran its deadline, answer dropped"
            );
            return None;
        }
    };

    match Severity::new(raw) {
        Ok(score) => Some(score),
        Err(e) => {
            warn!(target: "fatigue::notifier", error = %e, "ignoring invalid score");
            None
        }
    }
}
