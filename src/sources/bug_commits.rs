//! Bug-fix history mined from a local kernel git checkout.
use super::{DocumentSource, MAX_SOURCE_CHARS};
use crate::util::truncate_chars;
use anyhow::{anyhow, Context, Result};
use std::path::PathBuf;
use std::process::Command;

const MAX_COMMITS: &str = "20";

#[derive(Debug, Clone, Default)]
pub struct BugCommitSource {
    repo: Option<PathBuf>,
}

impl BugCommitSource {
    pub fn new(repo: Option<PathBuf>) -> Self {
        Self { repo }
    }
}

impl DocumentSource for BugCommitSource {
    fn fetch(&self, query: &str) -> Result<String> {
        let Some(repo) = &self.repo else {
            return Ok(String::new());
        };
        let output = Command::new("git")
            .args(["log", "--oneline", "-n", MAX_COMMITS, "-i", "--grep"])
            .arg(query)
            .current_dir(repo)
            .output()
            .context("run git log")?;
        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(anyhow!("git log failed: {}", stderr.trim()));
        }
        Ok(truncate_chars(
            String::from_utf8_lossy(&output.stdout).trim_end(),
            MAX_SOURCE_CHARS,
        ))
    }

    fn is_available(&self) -> bool {
        self.repo
            .as_ref()
            .is_some_and(|repo| repo.join(".git").exists())
    }
}
