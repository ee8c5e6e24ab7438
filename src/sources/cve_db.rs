//! CVE lookups against a local JSON dump.
use super::{DocumentSource, MAX_SOURCE_CHARS};
use crate::util::truncate_chars;
use anyhow::{Context, Result};
use regex::Regex;
use serde::Deserialize;
use std::fs;
use std::path::PathBuf;

#[derive(Debug, Deserialize)]
struct CveEntry {
    id: String,
    #[serde(default)]
    description: String,
}

/// Reads an array of `{ "id", "description" }` entries and reports those whose
/// description names the queried target as a whole word.
#[derive(Debug, Clone, Default)]
pub struct CveDatabaseSource {
    dump: Option<PathBuf>,
}

impl CveDatabaseSource {
    pub fn new(dump: Option<PathBuf>) -> Self {
        Self { dump }
    }
}

impl DocumentSource for CveDatabaseSource {
    fn fetch(&self, query: &str) -> Result<String> {
        let Some(path) = &self.dump else {
            return Ok(String::new());
        };
        let bytes = fs::read(path).with_context(|| format!("read {}", path.display()))?;
        let entries: Vec<CveEntry> =
            serde_json::from_slice(&bytes).context("parse CVE dump JSON")?;

        let pattern = Regex::new(&format!(r"(?i)\b{}\b", regex::escape(query)))
            .context("compile CVE match pattern")?;
        let lines: Vec<String> = entries
            .iter()
            .filter(|entry| pattern.is_match(&entry.description))
            .map(|entry| format!("{}: {}", entry.id, entry.description.trim()))
            .collect();

        Ok(truncate_chars(&lines.join("\n"), MAX_SOURCE_CHARS))
    }

    fn is_available(&self) -> bool {
        self.dump.as_ref().is_some_and(|path| path.is_file())
    }
}
