//! Logging configuration from TOML (`[logging]` section)

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Where logs and turn transcripts go
///
/// # Example
///
/// ```toml
/// [logging]
/// transcript = "~/.local/share/exec-insights/transcript.jsonl"
/// file = "insights.log"
/// ```
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FileLoggingConfig {
    /// JSONL transcript of turns, plans, step results and answers
    pub transcript: Option<PathBuf>,
    /// Diagnostic log file (tracing output)
    pub file: Option<PathBuf>,
}

impl FileLoggingConfig {
    /// Transcript path with a leading `~` expanded.
    pub fn transcript_path(&self) -> Option<PathBuf> {
        self.transcript.as_deref().map(expand_home)
    }

    pub fn file_path(&self) -> Option<PathBuf> {
        self.file.as_deref().map(expand_home)
    }
}

fn expand_home(path: &std::path::Path) -> PathBuf {
    match (path.strip_prefix("~"), dirs::home_dir()) {
        (Ok(rest), Some(home)) => home.join(rest),
        _ => path.to_path_buf(),
    }
}
