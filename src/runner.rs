//! Build-then-run driver for the external execution engine.
//!
//! The lifecycle is encoded in types: an [`EngineRunner`] can only be
//! built, and only a successful build yields a [`BuiltEngine`], which is
//! consumed by its single run. Running an unbuilt engine, or running twice
//! without rebuilding, does not type-check.
use crate::config::DelphosConfig;
use crate::error::{PipelineError, PipelineResult};
use crate::util::absolute_path;
use anyhow::Context;
use std::path::{Path, PathBuf};
use std::process::{Command, ExitStatus, Stdio};

/// Where and how the engine is built. Immutable once constructed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunnerConfig {
    pub engine_dir: PathBuf,
    pub release: bool,
    pub toolchain: String,
}

impl RunnerConfig {
    pub fn from_config(config: &DelphosConfig) -> Self {
        Self {
            engine_dir: config.engine_dir.clone(),
            release: config.build_release,
            toolchain: config.toolchain.clone(),
        }
    }

    fn command(&self, args: &[String]) -> Command {
        tracing::debug!(
            toolchain = %self.toolchain,
            cwd = %self.engine_dir.display(),
            ?args,
            "engine command"
        );
        let mut command = Command::new(&self.toolchain);
        command.args(args).current_dir(&self.engine_dir);
        command
    }
}

/// A successful engine run.
#[derive(Debug)]
pub struct RunOutcome {
    pub status: ExitStatus,
    /// Empty when the streams were inherited.
    pub stdout: String,
    pub stderr: String,
}

/// An engine that has not been built yet.
#[derive(Debug)]
pub struct EngineRunner {
    config: RunnerConfig,
}

impl EngineRunner {
    pub fn new(config: RunnerConfig) -> Self {
        Self { config }
    }

    /// Build the engine with captured output.
    ///
    /// A nonzero exit prints the captured stderr and yields
    /// [`PipelineError::Build`]; there is no engine to run afterwards.
    pub fn build(self) -> PipelineResult<BuiltEngine> {
        let args = build_args(self.config.release);
        let output = self
            .config
            .command(&args)
            .stdin(Stdio::null())
            .output()
            .with_context(|| format!("spawn {} build", self.config.toolchain))?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr).into_owned();
            eprintln!("Build failed:\n{stderr}");
            return Err(PipelineError::Build {
                status: output.status,
                stderr,
            });
        }
        Ok(BuiltEngine {
            config: self.config,
        })
    }
}

/// An engine whose build succeeded and which has not run yet.
#[derive(Debug)]
pub struct BuiltEngine {
    config: RunnerConfig,
}

impl BuiltEngine {
    /// Run the engine on `scenarios`, asking it to write `results`.
    ///
    /// Both paths are passed as absolute paths since the engine runs in its
    /// own directory. With `capture_output` the streams are collected and
    /// stderr is printed on failure; otherwise they are inherited.
    pub fn run(
        self,
        scenarios: &Path,
        results: &Path,
        capture_output: bool,
    ) -> PipelineResult<RunOutcome> {
        let scenarios = absolute_path(scenarios)?;
        let results = absolute_path(results)?;
        let args = run_args(self.config.release, &scenarios, &results);
        let mut command = self.config.command(&args);
        command.stdin(Stdio::null());

        let (status, stdout, stderr) = if capture_output {
            let output = command
                .output()
                .with_context(|| format!("spawn {} run", self.config.toolchain))?;
            (
                output.status,
                String::from_utf8_lossy(&output.stdout).into_owned(),
                String::from_utf8_lossy(&output.stderr).into_owned(),
            )
        } else {
            let status = command
                .status()
                .with_context(|| format!("spawn {} run", self.config.toolchain))?;
            (status, String::new(), String::new())
        };

        if !status.success() {
            if capture_output {
                eprintln!("Execution failed:\n{stderr}");
            }
            return Err(PipelineError::Execution { status, stderr });
        }
        Ok(RunOutcome {
            status,
            stdout,
            stderr,
        })
    }
}

fn build_args(release: bool) -> Vec<String> {
    let mut args = vec!["build".to_string()];
    if release {
        args.push("--release".to_string());
    }
    args
}

fn run_args(release: bool, scenarios: &Path, results: &Path) -> Vec<String> {
    let mut args = vec!["run".to_string()];
    if release {
        args.push("--release".to_string());
    }
    args.push("--".to_string());
    args.push(scenarios.display().to_string());
    args.push(results.display().to_string());
    args
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use std::os::unix::fs::PermissionsExt;

    /// Stand-in toolchain. Marker files in the engine dir force failures;
    /// `run` copies the scenario file to the results path.
    const FAKE_TOOLCHAIN: &str = r#"#!/bin/sh
echo "$@" >> invocations.log
case "$1" in
  build)
    if [ -f fail_build ]; then echo "error[E0425]: cannot find value" >&2; exit 101; fi
    exit 0 ;;
  run)
    if [ -f fail_run ]; then echo "engine panicked" >&2; exit 2; fi
    shift
    [ "$1" = "--release" ] && shift
    [ "$1" = "--" ] && shift
    cp "$1" "$2"
    echo "ran"
    exit 0 ;;
esac
exit 64
"#;

    fn engine_dir() -> tempfile::TempDir {
        let dir = tempfile::tempdir().expect("tempdir");
        let script = dir.path().join("fake-cargo");
        fs::write(&script, FAKE_TOOLCHAIN).expect("write toolchain");
        fs::set_permissions(&script, fs::Permissions::from_mode(0o755)).expect("chmod");
        dir
    }

    fn runner_for(dir: &Path, release: bool) -> EngineRunner {
        EngineRunner::new(RunnerConfig {
            engine_dir: dir.to_path_buf(),
            release,
            toolchain: dir.join("fake-cargo").display().to_string(),
        })
    }

    fn invocations(dir: &Path) -> Vec<String> {
        fs::read_to_string(dir.join("invocations.log"))
            .expect("read invocations")
            .lines()
            .map(str::to_string)
            .collect()
    }

    #[test]
    fn release_flag_follows_subcommand() {
        assert_eq!(build_args(false), vec!["build"]);
        assert_eq!(build_args(true), vec!["build", "--release"]);
        let args = run_args(true, Path::new("/a/s.json"), Path::new("/a/r.json"));
        assert_eq!(args, vec!["run", "--release", "--", "/a/s.json", "/a/r.json"]);
        let args = run_args(false, Path::new("/a/s.json"), Path::new("/a/r.json"));
        assert_eq!(args, vec!["run", "--", "/a/s.json", "/a/r.json"]);
    }

    #[test]
    fn build_then_run_passes_absolute_paths() {
        let dir = engine_dir();
        let work = tempfile::tempdir().expect("work dir");
        let scenarios = work.path().join("scenarios.json");
        let results = work.path().join("results.json");
        fs::write(&scenarios, "[]").expect("write scenarios");

        let built = runner_for(dir.path(), true).build().expect("build");
        let outcome = built.run(&scenarios, &results, true).expect("run");

        assert!(outcome.status.success());
        assert_eq!(outcome.stdout.trim(), "ran");
        assert_eq!(fs::read_to_string(&results).expect("results"), "[]");
        let calls = invocations(dir.path());
        assert_eq!(calls[0], "build --release");
        assert_eq!(
            calls[1],
            format!(
                "run --release -- {} {}",
                scenarios.display(),
                results.display()
            )
        );
    }

    #[test]
    fn failed_build_reports_stderr() {
        let dir = engine_dir();
        fs::write(dir.path().join("fail_build"), "").expect("marker");
        let err = runner_for(dir.path(), false).build().expect_err("build fails");
        match err {
            PipelineError::Build { status, stderr } => {
                assert_eq!(status.code(), Some(101));
                assert!(stderr.contains("cannot find value"));
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn nonzero_run_is_a_failure_in_both_capture_modes() {
        for capture_output in [true, false] {
            let dir = engine_dir();
            let built = runner_for(dir.path(), false).build().expect("build");
            fs::write(dir.path().join("fail_run"), "").expect("marker");
            let err = built
                .run(Path::new("s.json"), Path::new("r.json"), capture_output)
                .expect_err("run fails");
            match err {
                PipelineError::Execution { status, stderr } => {
                    assert_eq!(status.code(), Some(2));
                    assert_eq!(stderr.contains("engine panicked"), capture_output);
                }
                other => panic!("unexpected error: {other}"),
            }
        }
    }

    #[test]
    fn missing_toolchain_is_an_error_not_a_panic() {
        let dir = tempfile::tempdir().expect("tempdir");
        let runner = EngineRunner::new(RunnerConfig {
            engine_dir: dir.path().to_path_buf(),
            release: false,
            toolchain: "delphos-no-such-toolchain".to_string(),
        });
        assert!(matches!(runner.build(), Err(PipelineError::Other(_))));
    }
}
