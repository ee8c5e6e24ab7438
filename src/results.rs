//! Reading the engine's result file.
//!
//! The engine owns the result schema; only the pass/fail tally is read here.
use anyhow::{anyhow, Context, Result};
use serde_json::Value;
use std::fmt;
use std::fs;
use std::path::Path;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ResultSummary {
    pub passed: usize,
    pub total: usize,
}

impl fmt::Display for ResultSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Tests passed: {}/{}", self.passed, self.total)
    }
}

pub fn load_results(path: &Path) -> Result<Value> {
    let bytes = fs::read(path).with_context(|| format!("read {}", path.display()))?;
    serde_json::from_slice(&bytes)
        .with_context(|| format!("parse results JSON {}", path.display()))
}

/// The per-scenario records: a top-level array, or the `results` array of a
/// top-level object.
pub fn result_records(results: &Value) -> Result<&[Value]> {
    match results {
        Value::Array(records) => Ok(records.as_slice()),
        Value::Object(map) => match map.get("results") {
            Some(Value::Array(records)) => Ok(records.as_slice()),
            _ => Err(anyhow!("results object has no `results` array")),
        },
        _ => Err(anyhow!("results file is neither an array nor an object")),
    }
}

/// Count records whose `passed` field is boolean `true`.
pub fn summarize(records: &[Value]) -> ResultSummary {
    let passed = records
        .iter()
        .filter(|record| record.get("passed").and_then(Value::as_bool) == Some(true))
        .count();
    ResultSummary {
        passed,
        total: records.len(),
    }
}
