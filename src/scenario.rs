//! Scenario records and the scenario file.
//!
//! Records are kept as open JSON objects: the model may emit extra fields and
//! the execution engine owns the stricter schema, so nothing is dropped on the
//! way through.
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fs;
use std::path::{Path, PathBuf};

/// Keys a record must carry to be handed to the execution engine.
pub const REQUIRED_FIELDS: [&str; 3] = ["id", "description", "expected_result"];

/// Expected outcome of running a scenario.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExpectedResult {
    Success,
    Error,
}

/// A single declarative test case for a target.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Scenario(Map<String, Value>);

impl Scenario {
    pub fn has_field(&self, key: &str) -> bool {
        self.0.contains_key(key)
    }

    fn str_field(&self, key: &str) -> Option<&str> {
        self.0.get(key).and_then(Value::as_str)
    }

    pub fn id(&self) -> Option<&str> {
        self.str_field("id")
    }

    pub fn description(&self) -> Option<&str> {
        self.str_field("description")
    }

    pub fn expected_result(&self) -> Option<ExpectedResult> {
        self.0
            .get("expected_result")
            .and_then(|value| serde_json::from_value(value.clone()).ok())
    }

    pub fn expected_errno(&self) -> Option<&str> {
        self.str_field("expected_errno")
    }
}

/// Validates, persists and loads scenario batches at a fixed path.
#[derive(Debug, Clone)]
pub struct ScenarioManager {
    path: PathBuf,
}

impl ScenarioManager {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Presence of every [`REQUIRED_FIELDS`] key; values are not inspected.
    pub fn validate(&self, scenario: &Scenario) -> bool {
        REQUIRED_FIELDS.iter().all(|field| scenario.has_field(field))
    }

    /// Split `scenarios` into the valid ones (in order) and a dropped count.
    pub fn partition_valid(&self, scenarios: Vec<Scenario>) -> (Vec<Scenario>, usize) {
        let total = scenarios.len();
        let valid: Vec<Scenario> = scenarios
            .into_iter()
            .filter(|scenario| self.validate(scenario))
            .collect();
        let dropped = total - valid.len();
        (valid, dropped)
    }

    /// Replace the scenario file with `scenarios` as pretty-printed JSON.
    pub fn save(&self, scenarios: &[Scenario]) -> Result<()> {
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)
                .with_context(|| format!("create {}", parent.display()))?;
        }
        let text = serde_json::to_string_pretty(scenarios).context("serialize scenarios")?;
        fs::write(&self.path, text.as_bytes())
            .with_context(|| format!("write {}", self.path.display()))?;
        Ok(())
    }

    /// Load the scenario file; a missing file is an empty batch.
    pub fn load(&self) -> Result<Vec<Scenario>> {
        if !self.path.exists() {
            return Ok(Vec::new());
        }
        let bytes =
            fs::read(&self.path).with_context(|| format!("read {}", self.path.display()))?;
        serde_json::from_slice(&bytes)
            .with_context(|| format!("parse scenarios JSON {}", self.path.display()))
    }
}
