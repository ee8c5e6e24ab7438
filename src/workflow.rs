//! Command drivers: sequence context, generation, persistence and execution.
//!
//! Progress goes to stdout; diagnostics go through `tracing` on stderr.
use crate::config::DelphosConfig;
use crate::context::{ContextBuilder, DocumentContext};
use crate::error::{PipelineError, PipelineResult};
use crate::generator::{GenerationRequest, ScenarioGenerator};
use crate::lm::client_from_config;
use crate::lm_log::LmLog;
use crate::results::{load_results, result_records, summarize};
use crate::runner::{EngineRunner, RunnerConfig};
use crate::scenario::{ExpectedResult, Scenario, ScenarioManager};
use crate::tracer::Tracer;
use crate::util::preview;
use anyhow::Context;
use std::fs;
use std::path::Path;
use std::time::SystemTime;

const BANNER_WIDTH: usize = 60;
const RESPONSE_PREVIEW_BYTES: usize = 400;

/// Numbered step lines, e.g. `[2/3] Building execution engine...`.
struct Progress {
    current: usize,
    total: usize,
}

impl Progress {
    fn new(total: usize) -> Self {
        Self { current: 0, total }
    }

    fn step(&mut self, label: &str) {
        self.current += 1;
        println!("[{}/{}] {label}", self.current, self.total);
    }
}

pub fn run_generate(config: &DelphosConfig) -> PipelineResult<()> {
    let mut progress = Progress::new(1);
    generate_scenarios(config, &mut progress)
}

pub fn run_run(config: &DelphosConfig) -> PipelineResult<()> {
    let mut progress = Progress::new(2);
    execute_scenarios(config, &mut progress)?;
    display_results(&config.results_file)
}

/// Generate, build, run and summarize in one pass.
pub fn run_pipeline(config: &DelphosConfig) -> PipelineResult<()> {
    banner("Delphos - LM-Assisted Kernel Testing");
    println!();

    let mut progress = Progress::new(3);
    generate_scenarios(config, &mut progress)?;
    println!();
    execute_scenarios(config, &mut progress)?;
    display_results(&config.results_file)?;

    println!();
    banner("Pipeline Complete!");
    Ok(())
}

/// List registered sources; with `probe`, also print what each one returns.
pub fn run_sources(config: &DelphosConfig, probe: bool) -> PipelineResult<()> {
    let builder = ContextBuilder::from_config(config);
    let status = builder.source_status();
    for (name, available) in &status {
        let label = if *available { "available" } else { "unavailable" };
        println!("{name:<14} {label}");
    }
    println!(
        "{} of {} sources available",
        builder.available_sources().len(),
        status.len()
    );

    if probe {
        let context = builder.build_context(&config.target);
        println!();
        if context.is_empty() {
            println!("No documentation found for '{}'", config.target);
        }
        for (name, text) in &context {
            println!("=== {} ===\n{text}\n", name.to_uppercase());
        }
    }
    Ok(())
}

fn generate_scenarios(config: &DelphosConfig, progress: &mut Progress) -> PipelineResult<()> {
    progress.step(&format!(
        "Generating {} test scenarios for '{}'...",
        config.num_scenarios, config.target
    ));

    let context = ContextBuilder::from_config(config).build_context(&config.target);
    report_context(&context);

    let client = client_from_config(config);
    tracing::debug!(backend = %client.describe(), model = %config.model, "inference backend");
    let log = config.lm_log.clone().map(LmLog::new);
    let generator = ScenarioGenerator::new(client.as_ref()).with_log(log.as_ref());
    let request = GenerationRequest {
        target: &config.target,
        count: config.num_scenarios,
        model: &config.model,
        test_type: &config.test_type,
        env_hint: config.env_hint.as_deref(),
    };

    let generation = generator
        .generate(&request, &context)
        .inspect_err(|err| {
            if let PipelineError::GenerationParse { raw_response, .. } = err {
                println!("Raw response:\n{raw_response}");
            }
        })?;
    tracing::debug!(
        prompt_bytes = generation.prompt.len(),
        response = %preview(&generation.raw_response, RESPONSE_PREVIEW_BYTES),
        "generation complete"
    );
    if generation.scenarios.is_empty() {
        return Err(PipelineError::EmptyGeneration);
    }

    let manager = ScenarioManager::new(&config.scenarios_file);
    let (valid, dropped) = manager.partition_valid(generation.scenarios);
    if dropped > 0 {
        println!("WARNING: {dropped} invalid scenarios filtered out");
    }
    manager.save(&valid)?;

    println!("✓ Generated {} valid scenarios", valid.len());
    println!("  Saved to: {}", manager.path().display());
    for scenario in &valid {
        println!("  - {}", describe_scenario(scenario));
    }
    Ok(())
}

fn report_context(context: &DocumentContext) {
    if context.is_empty() {
        println!("  No documentation sources contributed; prompting without context");
    } else {
        let names: Vec<&str> = context.keys().map(String::as_str).collect();
        println!("  Context from: {}", names.join(", "));
    }
}

fn describe_scenario(scenario: &Scenario) -> String {
    let id = scenario.id().unwrap_or("?");
    let description = scenario.description().unwrap_or("");
    let expectation = match (scenario.expected_result(), scenario.expected_errno()) {
        (Some(ExpectedResult::Success), _) => "success".to_string(),
        (Some(ExpectedResult::Error), Some(errno)) => format!("error {errno}"),
        (Some(ExpectedResult::Error), None) => "error".to_string(),
        (None, _) => "unspecified".to_string(),
    };
    format!("{id}: {description} (expects {expectation})")
}

fn execute_scenarios(config: &DelphosConfig, progress: &mut Progress) -> PipelineResult<()> {
    let manager = ScenarioManager::new(&config.scenarios_file);
    if !manager.path().is_file() {
        return Err(PipelineError::MissingScenarios(manager.path().to_path_buf()));
    }
    let scenarios = manager.load()?;
    tracing::info!(
        count = scenarios.len(),
        path = %manager.path().display(),
        "scenarios loaded"
    );

    progress.step("Building execution engine...");
    let built = EngineRunner::new(RunnerConfig::from_config(config)).build()?;
    println!("✓ Engine built successfully");
    println!();

    progress.step(&format!("Executing {} test scenarios...", scenarios.len()));
    let previous = FileStamp::of(&config.results_file);
    let tracer = if config.enable_tracing {
        start_tracer(config)
    } else {
        None
    };
    let outcome = built.run(manager.path(), &config.results_file, false);
    if let Some(tracer) = tracer {
        if let Err(err) = tracer.stop() {
            tracing::warn!("tracer shutdown: {err:#}");
        }
        println!("  Trace written to: {}", config.trace_log.display());
    }
    let outcome = outcome?;
    tracing::debug!(
        status = %outcome.status,
        stdout_bytes = outcome.stdout.len(),
        stderr_bytes = outcome.stderr.len(),
        "engine run complete"
    );
    if !results_written(&config.results_file, previous) {
        return Err(PipelineError::MissingResults(config.results_file.clone()));
    }
    Ok(())
}

/// Modification time and length of a file, used to tell whether the engine
/// wrote its result file during this run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct FileStamp {
    modified: Option<SystemTime>,
    len: u64,
}

impl FileStamp {
    fn of(path: &Path) -> Option<Self> {
        let meta = fs::metadata(path).ok().filter(|meta| meta.is_file())?;
        Some(Self {
            modified: meta.modified().ok(),
            len: meta.len(),
        })
    }
}

// An untouched file from an earlier run is left in place but does not count.
fn results_written(path: &Path, previous: Option<FileStamp>) -> bool {
    match (FileStamp::of(path), previous) {
        (None, _) => false,
        (Some(_), None) => true,
        (Some(current), Some(previous)) => current != previous,
    }
}

fn start_tracer(config: &DelphosConfig) -> Option<Tracer> {
    match Tracer::start(&config.tracer_script, &config.trace_log) {
        Ok(tracer) => Some(tracer),
        Err(err) => {
            tracing::warn!("tracer not started, running untraced: {err:#}");
            None
        }
    }
}

fn display_results(path: &Path) -> PipelineResult<()> {
    println!();
    banner("Results Summary");

    if !path.is_file() {
        return Err(PipelineError::MissingResults(path.to_path_buf()));
    }
    let results = load_results(path)?;
    let pretty = serde_json::to_string_pretty(&results).context("format results")?;
    println!("{pretty}");

    let records = result_records(&results)?;
    println!();
    println!("{}", summarize(records));
    Ok(())
}

fn banner(title: &str) {
    let rule = "=".repeat(BANNER_WIDTH);
    println!("{rule}");
    println!("  {title}");
    println!("{rule}");
}
