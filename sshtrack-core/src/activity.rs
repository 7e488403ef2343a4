//! Bounded record of recent synchronisation outcomes, kept for display.

use chrono::{DateTime, Local};
use std::fmt;
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ActionKind {
    Upload,
    UploadError,
    MakeDirectory,
    Remove,
    RemoveError,
    RemoveDirectory,
    Move,
}

impl ActionKind {
    pub fn label(&self) -> &'static str {
        match self {
            ActionKind::Upload => "upload",
            ActionKind::UploadError => "upload-error",
            ActionKind::MakeDirectory => "make-directory",
            ActionKind::Remove => "remove",
            ActionKind::RemoveError => "remove-error",
            ActionKind::RemoveDirectory => "remove-directory",
            ActionKind::Move => "move",
        }
    }

    pub fn is_error(&self) -> bool {
        matches!(self, ActionKind::UploadError | ActionKind::RemoveError)
    }
}

impl fmt::Display for ActionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ActivityRecord {
    pub at: DateTime<Local>,
    pub action: ActionKind,
    pub source: PathBuf,
}

impl ActivityRecord {
    pub fn new(action: ActionKind, source: impl Into<PathBuf>) -> Self {
        Self {
            at: Local::now(),
            action,
            source: source.into(),
        }
    }

    pub fn date(&self) -> String {
        self.at.format("%Y-%m-%d").to_string()
    }

    pub fn time(&self) -> String {
        self.at.format("%H:%M:%S").to_string()
    }
}

/// Append-only log holding at most `keep_last` records, oldest first.
#[derive(Debug, Clone)]
pub struct ActivityLog {
    keep_last: usize,
    records: Vec<ActivityRecord>,
}

impl ActivityLog {
    pub const DEFAULT_KEEP_LAST: usize = 25;

    pub fn new(keep_last: usize) -> Self {
        Self {
            keep_last,
            records: Vec::with_capacity(keep_last.saturating_add(1).min(1024)),
        }
    }

    pub fn record(&mut self, action: ActionKind, source: &Path) {
        self.push(ActivityRecord::new(action, source));
    }

    pub fn push(&mut self, record: ActivityRecord) {
        self.records.push(record);
        if self.records.len() > self.keep_last {
            let excess = self.records.len() - self.keep_last;
            self.records.drain(..excess);
        }
    }

    pub fn records(&self) -> &[ActivityRecord] {
        &self.records
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

impl Default for ActivityLog {
    fn default() -> Self {
        Self::new(Self::DEFAULT_KEEP_LAST)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sources(log: &ActivityLog) -> Vec<String> {
        log.records()
            .iter()
            .map(|r| r.source.to_string_lossy().into_owned())
            .collect()
    }

    #[test]
    fn keeps_insertion_order() {
        let mut log = ActivityLog::new(5);
        log.record(ActionKind::Upload, Path::new("/a"));
        log.record(ActionKind::Remove, Path::new("/b"));
        log.record(ActionKind::Move, Path::new("/c"));
        assert_eq!(sources(&log), vec!["/a", "/b", "/c"]);
        assert_eq!(log.records()[1].action, ActionKind::Remove);
    }

    #[test]
    fn drops_oldest_past_retention() {
        let mut log = ActivityLog::new(3);
        for i in 0..4 {
            log.record(ActionKind::Upload, Path::new(&format!("/f{i}")));
        }
        assert_eq!(log.len(), 3);
        assert_eq!(sources(&log), vec!["/f1", "/f2", "/f3"]);

        for i in 4..10 {
            log.record(ActionKind::Upload, Path::new(&format!("/f{i}")));
            assert!(log.len() <= 3);
        }
        assert_eq!(sources(&log), vec!["/f7", "/f8", "/f9"]);
    }

    #[test]
    fn default_retention() {
        let mut log = ActivityLog::default();
        for i in 0..40 {
            log.record(ActionKind::Upload, Path::new(&format!("/f{i}")));
        }
        assert_eq!(log.len(), 25);
        assert_eq!(log.records()[0].source, PathBuf::from("/f15"));
    }

    #[test]
    fn labels() {
        assert_eq!(ActionKind::RemoveDirectory.to_string(), "remove-directory");
        assert_eq!(ActionKind::RemoveError.label(), "remove-error");
        assert!(ActionKind::RemoveError.is_error());
        assert!(!ActionKind::Move.is_error());
    }

    #[test]
    fn date_and_time_columns() {
        let rec = ActivityRecord::new(ActionKind::Upload, "/x");
        assert_eq!(rec.date().len(), 10);
        assert_eq!(rec.time().len(), 8);
        assert_eq!(rec.time().matches(':').count(), 2);
    }
}
