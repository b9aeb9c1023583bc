use chrono::{DateTime, Utc};
use std::path::PathBuf;

/// Directory name holding the organization's repository listing pages.
pub const REPOS_DIR: &str = "repos";

/// Name of the CSV file the summarizer writes at the archive root.
pub const SUMMARY_FILE_NAME: &str = "workflow_runs.csv";

/// One file to persist, relative to the archive root.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArchiveEntry {
    pub path: PathBuf,
    pub content: String,
}

impl ArchiveEntry {
    pub fn new(path: impl Into<PathBuf>, content: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            content: content.into(),
        }
    }
}

/// Label of one extraction run, `YYYYMMDD-HHMMSSZ` in UTC.
///
/// Labels of later runs always sort after labels of earlier ones.
pub fn timestamp_label(at: DateTime<Utc>) -> String {
    at.format("%Y%m%d-%H%M%SZ").to_string()
}
