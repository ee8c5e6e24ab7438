//! Section-2 man pages rendered by the local `man` viewer.
use super::{DocumentSource, MAX_SOURCE_CHARS};
use crate::util::{truncate_chars, wait_with_timeout};
use anyhow::{anyhow, Context, Result};
use std::process::{Command, Stdio};
use std::time::Duration;

const FETCH_TIMEOUT: Duration = Duration::from_secs(10);
const PROBE_TIMEOUT: Duration = Duration::from_secs(5);

const SECTIONS_TO_EXTRACT: [&str; 5] = [
    "NAME",
    "SYNOPSIS",
    "DESCRIPTION",
    "RETURN VALUE",
    "ERRORS",
];

#[derive(Debug, Clone)]
pub struct ManPageSource {
    program: String,
}

impl Default for ManPageSource {
    fn default() -> Self {
        Self {
            program: "man".to_string(),
        }
    }
}

impl ManPageSource {
    #[cfg(test)]
    pub fn with_program(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
        }
    }
}

impl DocumentSource for ManPageSource {
    fn fetch(&self, query: &str) -> Result<String> {
        let child = Command::new(&self.program)
            .args(["2", query])
            .env("MANPAGER", "cat")
            .env("MANWIDTH", "80")
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .with_context(|| format!("spawn {} 2 {query}", self.program))?;

        let output = wait_with_timeout(child, FETCH_TIMEOUT)?.ok_or_else(|| {
            anyhow!(
                "{} 2 {query} timed out after {}s",
                self.program,
                FETCH_TIMEOUT.as_secs()
            )
        })?;

        if !output.status.success() {
            return Ok(format!("Error: Could not find man page for syscall '{query}'"));
        }

        Ok(parse_man_page(&String::from_utf8_lossy(&output.stdout)))
    }

    fn is_available(&self) -> bool {
        if which::which(&self.program).is_err() {
            return false;
        }
        let child = Command::new(&self.program)
            .arg("--version")
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .spawn();
        match child {
            Ok(child) => matches!(
                wait_with_timeout(child, PROBE_TIMEOUT),
                Ok(Some(output)) if output.status.success()
            ),
            Err(_) => false,
        }
    }
}

/// Keep the NAME, SYNOPSIS, DESCRIPTION, RETURN VALUE and ERRORS sections of a
/// rendered man page, capped at [`MAX_SOURCE_CHARS`].
pub fn parse_man_page(man_output: &str) -> String {
    if man_output.is_empty() {
        return String::new();
    }

    let mut extracted = Vec::new();
    let mut current: Option<&str> = None;
    let mut body = String::new();

    for line in man_output.split('\n') {
        if is_section_header(line) {
            flush_section(current, &body, &mut extracted);
            current = Some(line.trim());
            body.clear();
        } else if current.is_some_and(is_wanted) {
            body.push_str(line);
            body.push('\n');
        }
    }
    flush_section(current, &body, &mut extracted);

    truncate_chars(&extracted.join("\n\n"), MAX_SOURCE_CHARS)
}

fn flush_section(current: Option<&str>, body: &str, extracted: &mut Vec<String>) {
    if let Some(header) = current.filter(|header| is_wanted(header)) {
        if !body.is_empty() {
            extracted.push(format!("{header}:\n{body}"));
        }
    }
}

fn is_wanted(header: &str) -> bool {
    SECTIONS_TO_EXTRACT.contains(&header)
}

// Headers are unindented and fully uppercase with at least one letter.
fn is_section_header(line: &str) -> bool {
    let trimmed = line.trim();
    if trimmed.is_empty() || line.starts_with(' ') {
        return false;
    }
    trimmed.chars().any(char::is_uppercase) && !trimmed.chars().any(char::is_lowercase)
}
