//! Pipeline configuration.
//!
//! A JSON config file provides the baseline; CLI flags override individual
//! fields. The resolved value is validated once and never mutated afterwards.
use anyhow::{anyhow, Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

pub const LM_COMMAND_ENV: &str = "DELPHOS_LM_COMMAND";
pub const OLLAMA_HOST_ENV: &str = "OLLAMA_HOST";
const DEFAULT_OLLAMA_HOST: &str = "http://localhost:11434";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct DelphosConfig {
    // Generator settings
    pub target: String,
    pub num_scenarios: usize,
    pub model: String,
    pub test_type: String,
    pub env_hint: Option<String>,

    // Inference backend
    pub ollama_host: String,
    /// Local command used instead of the HTTP backend when set.
    pub lm_command: Option<String>,
    pub lm_log: Option<PathBuf>,

    // File paths
    pub scenarios_file: PathBuf,
    pub results_file: PathBuf,
    pub trace_log: PathBuf,

    // Execution engine
    pub engine_dir: PathBuf,
    pub toolchain: String,
    pub build_release: bool,

    // Tracer
    pub enable_tracing: bool,
    pub tracer_script: PathBuf,

    // Optional documentation back-ends
    pub cve_dump: Option<PathBuf>,
    pub kernel_docs_dir: Option<PathBuf>,
    pub kernel_repo: Option<PathBuf>,
}

impl Default for DelphosConfig {
    fn default() -> Self {
        Self {
            target: "open".to_string(),
            num_scenarios: 3,
            model: "llama3.2:3b".to_string(),
            test_type: "syscall".to_string(),
            env_hint: None,
            ollama_host: DEFAULT_OLLAMA_HOST.to_string(),
            lm_command: None,
            lm_log: None,
            scenarios_file: PathBuf::from("test_scenario.json"),
            results_file: PathBuf::from("results.json"),
            trace_log: PathBuf::from("trace.log"),
            engine_dir: PathBuf::from("orchestrator"),
            toolchain: "cargo".to_string(),
            build_release: false,
            enable_tracing: false,
            tracer_script: PathBuf::from("tracer/fileops.bt"),
            cve_dump: None,
            kernel_docs_dir: None,
            kernel_repo: None,
        }
    }
}

/// Default config location: `<config dir>/delphos/config.json`.
pub fn default_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|dir| dir.join("delphos").join("config.json"))
}

/// Load the config from `explicit`, else from the default location when it
/// exists, else fall back to built-in defaults. Environment fallbacks are
/// applied after the file is read.
pub fn load_config(explicit: Option<&Path>) -> Result<DelphosConfig> {
    let path = match explicit {
        Some(path) => Some(path.to_path_buf()),
        None => default_config_path().filter(|path| path.is_file()),
    };
    let mut config = match path {
        Some(path) => read_config(&path)?,
        None => DelphosConfig::default(),
    };
    apply_env(&mut config);
    Ok(config)
}

fn read_config(path: &Path) -> Result<DelphosConfig> {
    let bytes = fs::read(path).with_context(|| format!("read config {}", path.display()))?;
    serde_json::from_slice(&bytes)
        .with_context(|| format!("parse config JSON {}", path.display()))
}

fn apply_env(config: &mut DelphosConfig) {
    if config.lm_command.is_none() {
        config.lm_command = std::env::var(LM_COMMAND_ENV)
            .ok()
            .filter(|value| !value.trim().is_empty());
    }
    if config.ollama_host == DEFAULT_OLLAMA_HOST {
        if let Ok(host) = std::env::var(OLLAMA_HOST_ENV) {
            config.ollama_host = normalize_host(&host);
        }
    }
}

// `OLLAMA_HOST` is commonly set without a scheme (e.g. `0.0.0.0:11434`).
fn normalize_host(host: &str) -> String {
    let host = host.trim().trim_end_matches('/');
    if host.starts_with("http://") || host.starts_with("https://") {
        host.to_string()
    } else {
        format!("http://{host}")
    }
}

/// Reject configs the pipeline cannot act on.
pub fn validate_config(config: &DelphosConfig) -> Result<()> {
    if config.target.trim().is_empty() {
        return Err(anyhow!("target must not be empty"));
    }
    if config.num_scenarios == 0 {
        return Err(anyhow!("num_scenarios must be at least 1"));
    }
    if config.model.trim().is_empty() {
        return Err(anyhow!("model must not be empty"));
    }
    if config.toolchain.trim().is_empty() {
        return Err(anyhow!("toolchain must not be empty"));
    }
    if let Some(command) = &config.lm_command {
        if command.trim().is_empty() {
            return Err(anyhow!("lm_command must not be empty when set"));
        }
    }
    Ok(())
}

#[cfg(test)]
#[path = "config_tests.rs"]
mod tests;
