//! Outcome types for a multi-URL run.

use std::path::PathBuf;

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct BatchResult {
    pub success: u32,
    pub failed: u32,
    pub skipped: u32,
}

impl BatchResult {
    pub fn all_ok(&self) -> bool {
        self.failed == 0
    }
}

/// What to do with one line of the URL list.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UrlTarget {
    Mmsh { url: String, file_name: String },
    Unsupported { url: String, scheme: String },
    Invalid { line: String },
}

#[derive(Debug, Clone)]
pub struct FinishedDownload {
    pub path: PathBuf,
    pub bytes: u64,
    pub packets: u64,
}
