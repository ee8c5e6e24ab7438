//! CLI argument parsing.
//!
//! Every flag is optional and overrides the matching config field; the
//! resolved config is validated once before any command runs.
use crate::config::DelphosConfig;
use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(
    name = "delphos",
    version,
    about = "LM-assisted scenario generation and execution for kernel interfaces",
    after_help = "Examples:\n  delphos generate --target open --count 5\n  delphos run --scenarios test_scenario.json --release\n  delphos pipeline --target read --lm 'ollama run {model}'\n  delphos sources",
    subcommand_required = true,
    arg_required_else_help = true
)]
pub struct RootArgs {
    /// Config file (default: <config dir>/delphos/config.json when present)
    #[arg(long, global = true, value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// Local LM command reading the prompt on stdin; `{model}` is substituted
    #[arg(long, global = true, value_name = "CMD")]
    pub lm: Option<String>,

    /// Emit debug diagnostics on stderr
    #[arg(long, short = 'v', global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    Generate(GenerateArgs),
    Run(RunArgs),
    Pipeline(PipelineArgs),
    Sources(SourcesArgs),
}

#[derive(Parser, Debug)]
#[command(about = "Generate scenarios for a target and save them")]
pub struct GenerateArgs {
    /// Scenario file to write
    #[arg(long, value_name = "PATH")]
    pub scenarios: Option<PathBuf>,

    #[command(flatten)]
    pub generation: GenerationOptions,
}

#[derive(Parser, Debug)]
#[command(about = "Build the execution engine and run a saved scenario file")]
pub struct RunArgs {
    /// Scenario file to execute
    #[arg(long, value_name = "PATH")]
    pub scenarios: Option<PathBuf>,

    #[command(flatten)]
    pub execution: ExecutionOptions,
}

#[derive(Parser, Debug)]
#[command(about = "Generate scenarios, then build and run them")]
pub struct PipelineArgs {
    /// Scenario file written by generation and read by the engine
    #[arg(long, value_name = "PATH")]
    pub scenarios: Option<PathBuf>,

    #[command(flatten)]
    pub generation: GenerationOptions,

    #[command(flatten)]
    pub execution: ExecutionOptions,
}

#[derive(Parser, Debug)]
#[command(about = "List documentation sources and whether they are available")]
pub struct SourcesArgs {
    /// Also print what each available source returns for this target
    #[arg(long, value_name = "NAME")]
    pub probe: Option<String>,
}

#[derive(Args, Debug, Default)]
pub struct GenerationOptions {
    /// Interface entry point to test (e.g. a syscall name)
    #[arg(long, value_name = "NAME")]
    pub target: Option<String>,

    /// Extra environment constraint passed to the model
    #[arg(long, value_name = "TEXT")]
    pub env_hint: Option<String>,

    /// Model identifier sent to the inference backend
    #[arg(long, value_name = "ID")]
    pub model: Option<String>,

    /// Number of scenarios to request
    #[arg(long, value_name = "N")]
    pub count: Option<usize>,

    /// Kind of test to request (syscall, ioctl, ...)
    #[arg(long, value_name = "TYPE")]
    pub test_type: Option<String>,

    /// Append each inference exchange to this JSONL file
    #[arg(long, value_name = "PATH")]
    pub lm_log: Option<PathBuf>,
}

#[derive(Args, Debug, Default)]
pub struct ExecutionOptions {
    /// Result file the engine writes
    #[arg(long, value_name = "PATH")]
    pub results: Option<PathBuf>,

    /// Build and run the engine in release mode
    #[arg(long)]
    pub release: bool,

    /// Engine source directory
    #[arg(long, value_name = "DIR")]
    pub engine_dir: Option<PathBuf>,

    /// Run the kernel tracer alongside the engine
    #[arg(long)]
    pub trace: bool,

    /// Tracer output file (implies --trace)
    #[arg(long, value_name = "PATH")]
    pub trace_log: Option<PathBuf>,
}

impl GenerationOptions {
    pub fn apply(&self, config: &mut DelphosConfig) {
        if let Some(target) = &self.target {
            config.target = target.clone();
        }
        if let Some(hint) = &self.env_hint {
            config.env_hint = Some(hint.clone());
        }
        if let Some(model) = &self.model {
            config.model = model.clone();
        }
        if let Some(count) = self.count {
            config.num_scenarios = count;
        }
        if let Some(test_type) = &self.test_type {
            config.test_type = test_type.clone();
        }
        if let Some(path) = &self.lm_log {
            config.lm_log = Some(path.clone());
        }
    }
}

impl ExecutionOptions {
    pub fn apply(&self, config: &mut DelphosConfig) {
        if let Some(path) = &self.results {
            config.results_file = path.clone();
        }
        if self.release {
            config.build_release = true;
        }
        if let Some(dir) = &self.engine_dir {
            config.engine_dir = dir.clone();
        }
        if let Some(path) = &self.trace_log {
            config.trace_log = path.clone();
            config.enable_tracing = true;
        }
        if self.trace {
            config.enable_tracing = true;
        }
    }
}

impl RootArgs {
    /// Fold global and command flags into `config`.
    pub fn apply(&self, config: &mut DelphosConfig) {
        if let Some(command) = &self.lm {
            config.lm_command = Some(command.clone());
        }
        match &self.command {
            Command::Generate(args) => {
                apply_scenarios(args.scenarios.as_ref(), config);
                args.generation.apply(config);
            }
            Command::Run(args) => {
                apply_scenarios(args.scenarios.as_ref(), config);
                args.execution.apply(config);
            }
            Command::Pipeline(args) => {
                apply_scenarios(args.scenarios.as_ref(), config);
                args.generation.apply(config);
                args.execution.apply(config);
            }
            Command::Sources(args) => {
                if let Some(target) = &args.probe {
                    config.target = target.clone();
                }
            }
        }
    }
}

fn apply_scenarios(path: Option<&PathBuf>, config: &mut DelphosConfig) {
    if let Some(path) = path {
        config.scenarios_file = path.clone();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    fn resolve(argv: &[&str]) -> DelphosConfig {
        let args = RootArgs::try_parse_from(argv).expect("parse args");
        let mut config = DelphosConfig::default();
        args.apply(&mut config);
        config
    }

    #[test]
    fn cli_definition_is_consistent() {
        RootArgs::command().debug_assert();
    }

    #[test]
    fn generate_flags_override_config() {
        let config = resolve(&[
            "delphos",
            "generate",
            "--target",
            "read",
            "--count",
            "5",
            "--env-hint",
            "no network",
            "--scenarios",
            "out/read.json",
        ]);
        assert_eq!(config.target, "read");
        assert_eq!(config.num_scenarios, 5);
        assert_eq!(config.env_hint.as_deref(), Some("no network"));
        assert_eq!(config.scenarios_file, PathBuf::from("out/read.json"));
        assert!(!config.build_release);
    }

    #[test]
    fn run_flags_override_config() {
        let config = resolve(&[
            "delphos",
            "run",
            "--release",
            "--engine-dir",
            "engine",
            "--trace-log",
            "t.log",
        ]);
        assert!(config.build_release);
        assert_eq!(config.engine_dir, PathBuf::from("engine"));
        assert!(config.enable_tracing);
        assert_eq!(config.trace_log, PathBuf::from("t.log"));
        assert_eq!(config.target, "open");
    }

    #[test]
    fn global_lm_flag_works_after_subcommand() {
        let config = resolve(&["delphos", "pipeline", "--lm", "cat", "--target", "stat"]);
        assert_eq!(config.lm_command.as_deref(), Some("cat"));
        assert_eq!(config.target, "stat");
    }

    #[test]
    fn unset_flags_keep_config_values() {
        let config = resolve(&["delphos", "pipeline"]);
        assert_eq!(config, DelphosConfig::default());
    }
}
