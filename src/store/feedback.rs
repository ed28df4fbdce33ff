//! Feedback log
//!
//! Append-only record of the severity scores users give in response to
//! intervention prompts. The notifier task is the only writer; a second
//! concurrent writer on the same file is not supported.

use std::fs::OpenOptions;
use std::path::PathBuf;

use crate::error::FatigueError;
use crate::types::FeedbackRecord;

/// Append-only store for feedback records
pub trait FeedbackStore: Send {
    fn append(&mut self, record: &FeedbackRecord) -> Result<(), FatigueError>;

    fn read_all(&self) -> Result<Vec<FeedbackRecord>, FatigueError>;
}

/// Feedback log stored as CSV on disk
#[derive(Debug, Clone)]
pub struct CsvFeedbackStore {
    path: PathBuf,
}

impl CsvFeedbackStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

impl FeedbackStore for CsvFeedbackStore {
    fn append(&mut self, record: &FeedbackRecord) -> Result<(), FatigueError> {
        let is_new = !self.path.exists();
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)?;
        let mut writer = csv::WriterBuilder::new()
            .has_headers(is_new)
            .from_writer(file);
        writer.serialize(record)?;
        writer.flush()?;
        Ok(())
    }

    /// Every record in the log; a missing file reads as empty
    fn read_all(&self) -> Result<Vec<FeedbackRecord>, FatigueError> {
        if !self.path.exists() {
            return Ok(Vec::new());
        }
        let mut reader = csv::Reader::from_path(&self.path)?;
        let mut records = Vec::new();
        for row in reader.deserialize() {
            records.push(row?);
        }
        Ok(records)
    }
}

/// In-memory feedback log
#[derive(Debug, Clone, Default)]
pub struct MemoryFeedbackStore {
    records: Vec<FeedbackRecord>,
}

impl MemoryFeedbackStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl FeedbackStore for MemoryFeedbackStore {
    fn append(&mut self, record: &FeedbackRecord) -> Result<(), FatigueError> {
        self.records.push(record.clone());
        Ok(())
    }

    fn read_all(&self) -> Result<Vec<FeedbackRecord>, FatigueError> {
        Ok(self.records.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Severity;
    use pretty_assertions::assert_eq;
    use tempfile::tempdir;

    fn record(score: u8) -> FeedbackRecord {
        FeedbackRecord {
            timestamp: 1_700_000_000.5,
            score: Severity::new(score).unwrap(),
            mean_hold_time: 0.19,
            mean_flight_time: 0.31,
            predicted_fatigued: true,
        }
    }

    #[test]
    fn test_append_and_read_back() {
        let dir = tempdir().unwrap();
        let mut store = CsvFeedbackStore::new(dir.path().join("feedback_log.csv"));

        store.append(&record(4)).unwrap();
        store.append(&record(2)).unwrap();

        let records = store.read_all().unwrap();
        assert_eq!(records, vec![record(4), record(2)]);
    }

    #[test]
    fn test_header_matches_feedback_schema() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("feedback_log.csv");
        let mut store = CsvFeedbackStore::new(&path);
        store.append(&record(3)).unwrap();
        store.append(&record(5)).unwrap();

        let contents = std::fs::read_to_string(&path).unwrap();
        let mut lines = contents.lines();
        assert_eq!(
            lines.next(),
            Some("timestamp,fatigue_score,mean_hold_time,mean_flight_time,is_fatigued_pred")
        );
        assert_eq!(lines.count(), 2);
    }

    #[test]
    fn test_reads_capitalized_booleans() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("feedback_log.csv");
        std::fs::write(
            &path,
            "timestamp,fatigue_score,mean_hold_time,mean_flight_time,is_fatigued_pred\n\
             1700000000.0,5,0.2,0.3,True\n\
             1700000100.0,1,0.1,0.15,False\n",
        )
        .unwrap();

        let records = CsvFeedbackStore::new(&path).read_all().unwrap();
        assert_eq!(records.len(), 2);
        assert!(records[0].predicted_fatigued);
        assert!(!records[1].predicted_fatigued);
        assert_eq!(records[1].score.value(), 1);
    }

    #[test]
    fn test_out_of_range_score_is_an_error() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("feedback_log.csv");
        std::fs::write(
            &path,
            "timestamp,fatigue_score,mean_hold_time,mean_flight_time,is_fatigued_pred\n\
             1700000000.0,9,0.2,0.3,True\n",
        )
        .unwrap();

        assert!(CsvFeedbackStore::new(&path).read_all().is_err());
    }

    #[test]
    fn test_write_failure_is_reported() {
        let dir = tempdir().unwrap();
        // A directory cannot be opened for appending
        let mut store = CsvFeedbackStore::new(dir.path());
        assert!(matches!(store.append(&record(3)), Err(FatigueError::Io(_))));
    }

    #[test]
    fn test_missing_file_reads_empty() {
        let dir = tempdir().unwrap();
        let store = CsvFeedbackStore::new(dir.path().join("none.csv"));
        assert!(store.read_all().unwrap().is_empty());
    }

    #[test]
    fn test_memory_store() {
        let mut store = MemoryFeedbackStore::new();
        store.append(&record(4)).unwrap();
        assert_eq!(store.read_all().unwrap(), vec![record(4)]);
    }
}
