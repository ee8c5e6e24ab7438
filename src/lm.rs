//! Inference back-ends for scenario generation.
//!
//! Two transports share one single-turn chat contract:
//!
//! - **HTTP**: an Ollama-compatible `/api/chat` endpoint (the default).
//! - **Command**: any local tool that reads the prompt on stdin and writes
//!   the reply on stdout (e.g. `ollama run {model}`, `llm -m {model}`,
//!   `claude -p`). `{model}` is substituted with the requested model id.
//!
//! Neither transport retries; the generator surfaces failures as-is.
use crate::config::DelphosConfig;
use anyhow::{anyhow, Context, Result};
use serde::{Deserialize, Serialize};
use std::io::Write;
use std::process::{Command, Stdio};
use std::time::{Duration, Instant};

/// Upper bound for one HTTP chat round trip; small local models can be slow.
const REQUEST_TIMEOUT: Duration = Duration::from_secs(600);

/// A single-turn chat with a language model.
pub trait InferenceClient {
    /// Send `prompt` as the only user message and return the reply text.
    fn chat(&self, model: &str, prompt: &str) -> Result<String>;

    /// Short label for diagnostics.
    fn describe(&self) -> String;
}

/// Pick the command transport when one is configured, else HTTP.
pub fn client_from_config(config: &DelphosConfig) -> Box<dyn InferenceClient> {
    match &config.lm_command {
        Some(command) => Box::new(CommandClient::new(command.clone())),
        None => Box::new(OllamaClient::new(config.ollama_host.clone())),
    }
}

#[derive(Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: [ChatMessage<'a>; 1],
    stream: bool,
}

#[derive(Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Deserialize)]
struct ChatResponse {
    message: ChatReply,
}

#[derive(Deserialize)]
struct ChatReply {
    #[serde(default)]
    content: String,
}

pub struct OllamaClient {
    host: String,
    agent: ureq::Agent,
}

impl OllamaClient {
    pub fn new(host: String) -> Self {
        let agent: ureq::Agent = ureq::Agent::config_builder()
            .timeout_global(Some(REQUEST_TIMEOUT))
            .build()
            .into();
        Self { host, agent }
    }

    fn chat_url(&self) -> String {
        format!("{}/api/chat", self.host.trim_end_matches('/'))
    }
}

impl InferenceClient for OllamaClient {
    fn chat(&self, model: &str, prompt: &str) -> Result<String> {
        let url = self.chat_url();
        let request = ChatRequest {
            model,
            messages: [ChatMessage {
                role: "user",
                content: prompt,
            }],
            stream: false,
        };

        let start = Instant::now();
        let mut response = self
            .agent
            .post(&url)
            .send_json(&request)
            .with_context(|| format!("POST {url}"))?;
        let reply: ChatResponse = response
            .body_mut()
            .read_json()
            .context("decode chat response")?;

        tracing::info!(
            elapsed_ms = start.elapsed().as_millis() as u64,
            prompt_bytes = prompt.len(),
            response_bytes = reply.message.content.len(),
            "lm chat complete"
        );
        Ok(reply.message.content)
    }

    fn describe(&self) -> String {
        format!("ollama at {}", self.host)
    }
}

pub struct CommandClient {
    command: String,
}

impl CommandClient {
    pub fn new(command: String) -> Self {
        Self { command }
    }

    fn argv(&self, model: &str) -> Result<Vec<String>> {
        let args = shell_words::split(&self.command)
            .with_context(|| format!("parse LM command: {}", self.command))?;
        if args.is_empty() {
            return Err(anyhow!("LM command is empty"));
        }
        Ok(args
            .into_iter()
            .map(|arg| arg.replace("{model}", model))
            .collect())
    }
}

impl InferenceClient for CommandClient {
    fn chat(&self, model: &str, prompt: &str) -> Result<String> {
        let args = self.argv(model)?;
        tracing::debug!(argv = ?args, "spawn LM command");

        let start = Instant::now();
        let mut child = Command::new(&args[0])
            .args(&args[1..])
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .with_context(|| format!("spawn LM command: {}", args[0]))?;

        if let Some(mut stdin) = child.stdin.take() {
            match stdin.write_all(prompt.as_bytes()) {
                // The tool may legitimately answer without reading the whole prompt.
                Err(err) if err.kind() == std::io::ErrorKind::BrokenPipe => {}
                other => other.context("write prompt to LM stdin")?,
            }
        }

        let output = child.wait_with_output().context("wait for LM command")?;
        tracing::info!(
            elapsed_ms = start.elapsed().as_millis() as u64,
            prompt_bytes = prompt.len(),
            response_bytes = output.stdout.len(),
            "lm invoke complete"
        );

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(anyhow!(
                "LM command failed with status {}: {}",
                output.status,
                stderr.trim()
            ));
        }

        String::from_utf8(output.stdout).context("decode LM stdout as UTF-8")
    }

    fn describe(&self) -> String {
        format!("command `{}`", self.command)
    }
}
