//! Stage-level failures surfaced to the driver.
//!
//! Every variant is fatal to the operation that raised it except
//! [`PipelineError::SourceFetch`], which the context builder logs and drops.
use std::path::PathBuf;
use std::process::ExitStatus;

#[derive(Debug, thiserror::Error)]
pub enum PipelineError {
    /// One documentation source failed to produce text.
    #[error("failed to fetch from {source_name}: {message}")]
    SourceFetch { source_name: String, message: String },

    /// The inference service could not be reached or answered with an error.
    #[error("inference call failed: {0:#}")]
    Inference(anyhow::Error),

    /// The model answered, but no JSON array could be extracted from the reply.
    #[error("failed to parse LM response as JSON: {message}")]
    GenerationParse { message: String, raw_response: String },

    /// The model answered with an empty array.
    #[error("model returned no scenarios")]
    EmptyGeneration,

    #[error("build of execution engine failed ({status})")]
    Build { status: ExitStatus, stderr: String },

    #[error("execution engine exited with {status}")]
    Execution { status: ExitStatus, stderr: String },

    #[error("scenario file not found: {}", .0.display())]
    MissingScenarios(PathBuf),

    #[error("no results file generated at {}", .0.display())]
    MissingResults(PathBuf),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

pub type PipelineResult<T> = std::result::Result<T, PipelineError>;
