//! Append-only record of inference calls.
//!
//! Entries are newline-delimited JSON so a failed generation can be
//! diagnosed after the fact from the exact prompt and reply:
//!
//! ```jsonl
//! {"schema_version":1,"ts_epoch_ms":1707900000000,"target":"open","outcome":"success",...}
//! {"schema_version":1,"ts_epoch_ms":1707900060000,"target":"read","outcome":"parse_failed",...}
//! ```
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::PathBuf;

pub const LM_LOG_SCHEMA_VERSION: u32 = 1;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LmOutcome {
    Success,
    /// The model answered but the reply held no parseable array.
    ParseFailed,
    /// The inference call itself failed.
    CallFailed,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LmLogEntry {
    pub schema_version: u32,
    pub ts_epoch_ms: u64,
    pub target: String,
    pub model: String,
    pub backend: String,
    pub duration_ms: u64,
    pub prompt_bytes: usize,
    pub response_bytes: usize,
    pub outcome: LmOutcome,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    pub prompt: String,
    pub response: String,
}

#[derive(Debug, Clone)]
pub struct LmLog {
    path: PathBuf,
}

impl LmLog {
    pub fn new(path: PathBuf) -> Self {
        Self { path }
    }

    pub fn append(&self, entry: &LmLogEntry) -> Result<()> {
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)
                .with_context(|| format!("create {}", parent.display()))?;
        }
        let mut line = serde_json::to_string(entry).context("serialize LM log entry")?;
        line.push('\n');
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .with_context(|| format!("open {}", self.path.display()))?;
        file.write_all(line.as_bytes())
            .with_context(|| format!("append to {}", self.path.display()))?;
        Ok(())
    }

    #[cfg(test)]
    pub fn read_entries(&self) -> Result<Vec<LmLogEntry>> {
        let text = fs::read_to_string(&self.path)
            .with_context(|| format!("read {}", self.path.display()))?;
        text.lines()
            .filter(|line| !line.trim().is_empty())
            .map(|line| serde_json::from_str(line).context("parse LM log line"))
            .collect()
    }
}
