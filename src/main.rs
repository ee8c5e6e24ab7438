//! Delphos: LM-assisted scenario generation and execution for kernel
//! interfaces.
//!
//! The binary gathers documentation for a target, asks a language model for
//! test scenarios, persists the valid ones, and hands them to an external
//! execution engine through files.
mod cli;
mod config;
mod context;
mod error;
mod generator;
mod lm;
mod lm_log;
mod results;
mod runner;
mod scenario;
mod sources;
mod tracer;
mod util;
mod workflow;

use clap::Parser;
use cli::{Command, RootArgs};
use config::{load_config, validate_config};
use error::PipelineResult;
use tracing_subscriber::EnvFilter;

fn main() {
    let args = RootArgs::parse();
    init_tracing(args.verbose);

    if let Err(err) = run(args) {
        eprintln!("ERROR: {err:#}");
        std::process::exit(1);
    }
}

fn run(args: RootArgs) -> PipelineResult<()> {
    let mut config = load_config(args.config.as_deref())?;
    args.apply(&mut config);
    validate_config(&config)?;
    tracing::debug!(?config, "resolved config");

    match &args.command {
        Command::Generate(_) => workflow::run_generate(&config),
        Command::Run(_) => workflow::run_run(&config),
        Command::Pipeline(_) => workflow::run_pipeline(&config),
        Command::Sources(sources) => workflow::run_sources(&config, sources.probe.is_some()),
    }
}

// `RUST_LOG` wins; otherwise warnings only, or everything with --verbose.
fn init_tracing(verbose: bool) {
    let default_level = if verbose { "debug" } else { "warn" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}
