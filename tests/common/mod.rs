//! Shared test infrastructure for integration tests.
//!
//! Each [`Workspace`] is a scratch directory holding a canned LM reply, a
//! fake engine toolchain, and a config pointing at both, so the binary can
//! be driven end to end without a model or a real engine.

use std::fs;
use std::os::unix::fs::PermissionsExt;
use std::path::{Path, PathBuf};
use std::process::{Command, Output};
use tempfile::TempDir;

/// Shell command the binary uses as its LM: ignores the prompt, prints the reply file.
pub const FAKE_LM: &str = "sh -c 'cat >/dev/null; cat reply.txt'";

const FAKE_TOOLCHAIN: &str = r#"#!/bin/sh
echo "$@" >> invocations.log
case "$1" in
  build)
    if [ -f fail_build ]; then echo "error: could not compile engine" >&2; exit 101; fi
    exit 0 ;;
  run)
    shift
    [ "$1" = "--release" ] && shift
    [ "$1" = "--" ] && shift
    [ -f "$1" ] || { echo "scenario file missing: $1" >&2; exit 3; }
    echo "engine: running $1"
    [ -f results.fixture ] && cp results.fixture "$2"
    exit 0 ;;
esac
exit 64
"#;

pub struct Workspace {
    dir: TempDir,
}

/// Captured output of one binary invocation.
#[derive(Debug)]
pub struct RunOutput {
    pub code: Option<i32>,
    pub stdout: String,
    pub stderr: String,
}

impl RunOutput {
    pub fn success(&self) -> bool {
        self.code == Some(0)
    }
}

impl From<Output> for RunOutput {
    fn from(output: Output) -> Self {
        Self {
            code: output.status.code(),
            stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
            stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
        }
    }
}

impl Workspace {
    /// Scratch dir with an `engine/` toolchain and a `config.json` using it.
    pub fn setup() -> Self {
        let dir = tempfile::tempdir().expect("create temp dir");
        let workspace = Self { dir };

        let engine = workspace.path("engine");
        fs::create_dir_all(&engine).expect("create engine dir");
        let toolchain = engine.join("fake-cargo");
        fs::write(&toolchain, FAKE_TOOLCHAIN).expect("write toolchain");
        fs::set_permissions(&toolchain, fs::Permissions::from_mode(0o755)).expect("chmod");

        let config = serde_json::json!({
            "engine_dir": engine,
            "toolchain": toolchain,
            "lm_command": FAKE_LM,
        });
        workspace.write("config.json", &config.to_string());
        workspace
    }

    pub fn root(&self) -> &Path {
        self.dir.path()
    }

    pub fn path(&self, rel: &str) -> PathBuf {
        self.dir.path().join(rel)
    }

    pub fn write(&self, rel: &str, contents: &str) -> PathBuf {
        let path = self.path(rel);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).expect("create parent dir");
        }
        fs::write(&path, contents).expect("write file");
        path
    }

    pub fn read(&self, rel: &str) -> String {
        fs::read_to_string(self.path(rel)).expect("read file")
    }

    /// Canned reply returned by [`FAKE_LM`].
    pub fn lm_reply(&self, text: &str) {
        self.write("reply.txt", text);
    }

    /// Result file the fake engine writes on `run`.
    pub fn engine_results(&self, json: &str) {
        self.write("engine/results.fixture", json);
    }

    pub fn fail_engine_build(&self) {
        self.write("engine/fail_build", "");
    }

    /// Run the binary in the workspace with `--config config.json`.
    pub fn run(&self, args: &[&str]) -> RunOutput {
        let config = self.path("config.json");
        let mut command = self.command();
        command.arg("--config").arg(&config).args(args);
        command.output().expect("run delphos").into()
    }

    /// Binary invocation isolated from the user's config and LM environment.
    pub fn command(&self) -> Command {
        let mut command = Command::new(env!("CARGO_BIN_EXE_delphos"));
        command
            .current_dir(self.root())
            .env("XDG_CONFIG_HOME", self.path("xdg"))
            .env("HOME", self.root())
            .env_remove("DELPHOS_LM_COMMAND")
            .env_remove("OLLAMA_HOST")
            .env_remove("RUST_LOG");
        command
    }
}
