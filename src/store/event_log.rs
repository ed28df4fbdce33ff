//! Keystroke event sources
//!
//! The recorder appends one CSV row per key transition:
//! `timestamp,event_type,key_code`. Rows that cannot be parsed are skipped
//! individually; the rest of the window is still returned.

use std::fs::{File, OpenOptions};
use std::path::{Path, PathBuf};

use serde::Deserialize;
use tracing::debug;

use crate::error::FatigueError;
use crate::types::{KeyEvent, KeyEventKind};

/// Time-windowed access to recorded key events
pub trait EventSource: Send {
    /// All events with `timestamp > since`, in recorded order
    fn events_since(&mut self, since: f64) -> Result<Vec<KeyEvent>, FatigueError>;
}

/// Raw CSV row before validation
#[derive(Debug, Deserialize)]
struct EventRow {
    timestamp: String,
    event_type: String,
    key_code: String,
}

impl EventRow {
    fn into_event(self) -> Option<KeyEvent> {
        let timestamp: f64 = self.timestamp.trim().parse().ok()?;
        if !timestamp.is_finite() {
            return None;
        }
        let kind = KeyEventKind::parse(&self.event_type)?;
        Some(KeyEvent::new(timestamp, kind, self.key_code))
    }
}

/// Event log stored as CSV on disk
#[derive(Debug, Clone)]
pub struct CsvEventLog {
    path: PathBuf,
}

impl CsvEventLog {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Read every well-formed event in the log; a missing file reads as empty
    pub fn read_all(&self) -> Result<Vec<KeyEvent>, FatigueError> {
        self.read_filtered(f64::NEG_INFINITY)
    }

    fn read_filtered(&self, since: f64) -> Result<Vec<KeyEvent>, FatigueError> {
        if !self.path.exists() {
            return Ok(Vec::new());
        }

        let mut reader = csv::ReaderBuilder::new()
            .flexible(true)
            .from_path(&self.path)?;

        let mut events = Vec::new();
        let mut skipped = 0usize;
        for row in reader.deserialize::<EventRow>() {
            match row.ok().and_then(EventRow::into_event) {
                Some(event) if event.timestamp > since => events.push(event),
                Some(_) => {}
                None => skipped += 1,
            }
        }

        if skipped > 0 {
            debug!(
                target: "fatigue::store",
                path = %self.path.display(),
                skipped,
                "skipped malformed event rows"
            );
        }
        Ok(events)
    }

    /// Append events, writing the header when the log is created
    pub fn append(&self, events: &[KeyEvent]) -> Result<(), FatigueError> {
        let is_new = !self.path.exists();
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)?;
        let mut writer = csv::Writer::from_writer(file);

        if is_new {
            writer.write_record(["timestamp", "event_type", "key_code"])?;
        }
        for event in events {
            writer.write_record([
                event.timestamp.to_string().as_str(),
                event.kind.as_str(),
                event.key_code.as_str(),
            ])?;
        }
        writer.flush()?;
        Ok(())
    }

    /// Create an empty log containing only the header
    pub fn create(path: impl Into<PathBuf>) -> Result<Self, FatigueError> {
        let log = Self::new(path);
        let mut writer = csv::Writer::from_writer(File::create(&log.path)?);
        writer.write_record(["timestamp", "event_type", "key_code"])?;
        writer.flush()?;
        Ok(log)
    }
}

impl EventSource for CsvEventLog {
    fn events_since(&mut self, since: f64) -> Result<Vec<KeyEvent>, FatigueError> {
        self.read_filtered(since)
    }
}

/// In-memory event log
#[derive(Debug, Clone, Default)]
pub struct MemoryEventLog {
    events: Vec<KeyEvent>,
}

impl MemoryEventLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, event: KeyEvent) {
        self.events.push(event);
    }

    pub fn len(&self) -> usize {
        self.events.len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }
}

impl From<Vec<KeyEvent>> for MemoryEventLog {
    fn from(events: Vec<KeyEvent>) -> Self {
        Self { events }
    }
}

impl EventSource for MemoryEventLog {
    fn events_since(&mut self, since: f64) -> Result<Vec<KeyEvent>, FatigueError> {
        Ok(self
            .events
            .iter()
            .filter(|e| e.timestamp > since)
            .cloned()
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use tempfile::tempdir;

    #[test]
    fn test_missing_file_reads_empty() {
        let dir = tempdir().unwrap();
        let mut log = CsvEventLog::new(dir.path().join("keystroke_log.csv"));
        assert!(log.events_since(0.0).unwrap().is_empty());
    }

    #[test]
    fn test_reads_recorder_format() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("keystroke_log.csv");
        std::fs::write(
            &path,
            "timestamp,event_type,key_code\n\
             1000.0,PRESS,a\n\
             1000.1,RELEASE,a\n\
             1000.2,PRESS,Key.space\n\
             1000.35,RELEASE,Key.space\n",
        )
        .unwrap();

        let events = CsvEventLog::new(&path).read_all().unwrap();
        assert_eq!(
            events,
            vec![
                KeyEvent::press(1000.0, "a"),
                KeyEvent::release(1000.1, "a"),
                KeyEvent::press(1000.2, "Key.space"),
                KeyEvent::release(1000.35, "Key.space"),
            ]
        );
    }

    #[test]
    fn test_malformed_rows_are_skipped() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("keystroke_log.csv");
        std::fs::write(
            &path,
            "timestamp,event_type,key_code\n\
             1000.0,PRESS,a\n\
             not-a-time,RELEASE,a\n\
             1000.1,TAP,a\n\
             1000.15\n\
             NaN,PRESS,b\n\
             1000.2,RELEASE,a\n",
        )
        .unwrap();

        let events = CsvEventLog::new(&path).read_all().unwrap();
        assert_eq!(
            events,
            vec![KeyEvent::press(1000.0, "a"), KeyEvent::release(1000.2, "a")]
        );
    }

    #[test]
    fn test_events_since_is_exclusive() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("keystroke_log.csv");
        let mut log = CsvEventLog::new(&path);
        log.append(&[
            KeyEvent::press(10.0, "a"),
            KeyEvent::release(20.0, "a"),
            KeyEvent::press(30.0, "b"),
        ])
        .unwrap();

        let events = log.events_since(20.0).unwrap();
        assert_eq!(events, vec![KeyEvent::press(30.0, "b")]);
    }

    #[test]
    fn test_append_writes_header_once() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("keystroke_log.csv");
        let log = CsvEventLog::new(&path);
        log.append(&[KeyEvent::press(1.0, ",")]).unwrap();
        log.append(&[KeyEvent::release(1.5, ",")]).unwrap();

        let contents = std::fs::read_to_string(&path).unwrap();
        assert_eq!(contents.matches("timestamp,event_type,key_code").count(), 1);

        let events = log.read_all().unwrap();
        assert_eq!(events.len(), 2);
        assert_eq!(events[0].key_code, ",");
    }

    #[test]
    fn test_create_writes_header_only() {
        let dir = tempdir().unwrap();
        let log = CsvEventLog::create(dir.path().join("log.csv")).unwrap();
        assert!(log.read_all().unwrap().is_empty());
    }

    #[test]
    fn test_memory_log_window() {
        let mut log = MemoryEventLog::from(vec![
            KeyEvent::press(1.0, "a"),
            KeyEvent::release(2.0, "a"),
        ]);
        log.push(KeyEvent::press(3.0, "b"));

        assert_eq!(log.len(), 3);
        assert_eq!(log.events_since(1.5).unwrap().len(), 2);
        assert!(log.events_since(3.0).unwrap().is_empty());
    }
}
