//! Scenario generation: prompt, single inference call, array extraction.
//!
//! The generator never retries and never judges scenario content; it hands
//! back whatever array the model produced, or the raw reply when there was
//! none, and leaves filtering to the scenario manager.
mod extract;
mod prompt;

use extract::extract_json_array;
use prompt::{build_prompt, PromptInputs};

use crate::context::DocumentContext;
use crate::error::{PipelineError, PipelineResult};
use crate::lm::InferenceClient;
use crate::lm_log::{LmLog, LmLogEntry, LmOutcome, LM_LOG_SCHEMA_VERSION};
use crate::scenario::Scenario;
use crate::util::now_epoch_ms;
use std::time::Instant;

/// What to ask the model for.
#[derive(Debug, Clone, Copy)]
pub struct GenerationRequest<'a> {
    pub target: &'a str,
    pub count: usize,
    pub model: &'a str,
    pub test_type: &'a str,
    pub env_hint: Option<&'a str>,
}

/// Scenarios parsed from one model reply, with the exchange that produced them.
#[derive(Debug)]
pub struct Generation {
    pub scenarios: Vec<Scenario>,
    pub prompt: String,
    pub raw_response: String,
}

pub struct ScenarioGenerator<'a> {
    client: &'a dyn InferenceClient,
    log: Option<&'a LmLog>,
}

impl<'a> ScenarioGenerator<'a> {
    pub fn new(client: &'a dyn InferenceClient) -> Self {
        Self { client, log: None }
    }

    pub fn with_log(mut self, log: Option<&'a LmLog>) -> Self {
        self.log = log;
        self
    }

    pub fn generate(
        &self,
        request: &GenerationRequest<'_>,
        context: &DocumentContext,
    ) -> PipelineResult<Generation> {
        let prompt = build_prompt(
            &PromptInputs {
                target: request.target,
                count: request.count,
                test_type: request.test_type,
                env_hint: request.env_hint,
            },
            context,
        );

        let start = Instant::now();
        let reply = self.client.chat(request.model, &prompt);
        let elapsed = start.elapsed();

        let raw_response = match reply {
            Ok(text) => text,
            Err(err) => {
                self.record(
                    request,
                    &prompt,
                    "",
                    elapsed,
                    LmOutcome::CallFailed,
                    Some(format!("{err:#}")),
                );
                return Err(PipelineError::Inference(err));
            }
        };

        match extract_json_array(&raw_response) {
            Ok(scenarios) => {
                self.record(
                    request,
                    &prompt,
                    &raw_response,
                    elapsed,
                    LmOutcome::Success,
                    None,
                );
                Ok(Generation {
                    scenarios,
                    prompt,
                    raw_response,
                })
            }
            Err(err) => {
                self.record(
                    request,
                    &prompt,
                    &raw_response,
                    elapsed,
                    LmOutcome::ParseFailed,
                    Some(err.to_string()),
                );
                Err(PipelineError::GenerationParse {
                    message: err.to_string(),
                    raw_response,
                })
            }
        }
    }

    fn record(
        &self,
        request: &GenerationRequest<'_>,
        prompt: &str,
        response: &str,
        elapsed: std::time::Duration,
        outcome: LmOutcome,
        error: Option<String>,
    ) {
        let Some(log) = self.log else {
            return;
        };
        let entry = LmLogEntry {
            schema_version: LM_LOG_SCHEMA_VERSION,
            ts_epoch_ms: now_epoch_ms().unwrap_or_default(),
            target: request.target.to_string(),
            model: request.model.to_string(),
            backend: self.client.describe(),
            duration_ms: u64::try_from(elapsed.as_millis()).unwrap_or(u64::MAX),
            prompt_bytes: prompt.len(),
            response_bytes: response.len(),
            outcome,
            error,
            prompt: prompt.to_string(),
            response: response.to_string(),
        };
        if let Err(err) = log.append(&entry) {
            tracing::warn!("failed to write LM log: {err:#}");
        }
    }
}
