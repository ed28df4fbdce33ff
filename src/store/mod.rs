//! External stores
//!
//! The keystroke event log feeds the monitor; the feedback log collects the
//! user's answers to intervention prompts. Both sit behind small traits so the
//! decision core never touches file formats.

pub mod event_log;
pub mod feedback;

pub use event_log::{CsvEventLog, EventSource, MemoryEventLog};
pub use feedback::{CsvFeedbackStore, FeedbackStore, MemoryFeedbackStore};
