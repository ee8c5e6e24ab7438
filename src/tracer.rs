//! Optional kernel tracer attached around an engine run.
use crate::util::wait_with_timeout;
use anyhow::{anyhow, Context, Result};
use std::io;
use std::path::Path;
use std::process::{Child, Command, Stdio};
use std::time::Duration;

const TRACER_PROGRAM: &str = "bpftrace";
/// How long the tracer gets to flush after SIGINT before it is killed.
const STOP_TIMEOUT: Duration = Duration::from_secs(5);

/// A running tracer process writing to a log file.
#[derive(Debug)]
pub struct Tracer {
    child: Child,
}

impl Tracer {
    /// Start `bpftrace -o <log> <script>`.
    pub fn start(script: &Path, log: &Path) -> Result<Self> {
        let args = vec![
            "-o".to_string(),
            log.display().to_string(),
            script.display().to_string(),
        ];
        Self::spawn(TRACER_PROGRAM, &args)
    }

    fn spawn(program: &str, args: &[String]) -> Result<Self> {
        tracing::debug!(program, ?args, "spawn tracer");
        let child = Command::new(program)
            .args(args)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .spawn()
            .with_context(|| format!("spawn {program}"))?;
        Ok(Self { child })
    }

    /// Interrupt the tracer so it flushes its maps, then reap it.
    pub fn stop(self) -> Result<()> {
        if let Err(err) = interrupt(self.child.id()) {
            tracing::warn!("failed to interrupt tracer: {err}");
        }
        let output = wait_with_timeout(self.child, STOP_TIMEOUT)?
            .ok_or_else(|| anyhow!("tracer did not exit after SIGINT; killed"))?;
        if !output.status.success() {
            tracing::debug!(status = %output.status, "tracer exited");
        }
        Ok(())
    }
}

/// Send SIGINT to a single process.
fn interrupt(pid: u32) -> io::Result<()> {
    // 0 and negative pids address process groups.
    let pid = libc::pid_t::try_from(pid)
        .ok()
        .filter(|pid| *pid > 0)
        .ok_or_else(|| io::Error::new(io::ErrorKind::InvalidInput, format!("bad pid {pid}")))?;
    // SAFETY: kill(2) takes plain integers and touches no memory of ours.
    let rc = unsafe { libc::kill(pid, libc::SIGINT) };
    if rc == 0 {
        Ok(())
    } else {
        Err(io::Error::last_os_error())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Instant;

    #[test]
    fn stop_interrupts_a_long_running_tracer() {
        let tracer = Tracer::spawn("sleep", &["30".to_string()]).expect("spawn sleep");
        let start = Instant::now();
        tracer.stop().expect("stop");
        assert!(start.elapsed() < Duration::from_secs(5));
    }

    #[test]
    fn stop_lets_the_tracer_flush_on_sigint() {
        let dir = tempfile::tempdir().expect("tempdir");
        let log = dir.path().join("trace.log");
        let script = format!(
            "trap 'echo flushed > {}; exit 0' INT; while :; do sleep 0.05; done",
            log.display()
        );
        let tracer =
            Tracer::spawn("sh", &["-c".to_string(), script]).expect("spawn sh");
        std::thread::sleep(Duration::from_millis(200));
        tracer.stop().expect("stop");
        let text = std::fs::read_to_string(&log).expect("trace log");
        assert_eq!(text.trim(), "flushed");
    }

    #[test]
    fn stderr_output_does_not_stall_the_tracer() {
        let dir = tempfile::tempdir().expect("tempdir");
        let marker = dir.path().join("past-stderr");
        let script = format!(
            "trap 'exit 0' INT; head -c 262144 /dev/zero >&2; touch {}; while :; do sleep 0.05; done",
            marker.display()
        );
        let tracer = Tracer::spawn("sh", &["-c".to_string(), script]).expect("spawn sh");
        let deadline = Instant::now() + Duration::from_secs(5);
        while !marker.exists() && Instant::now() < deadline {
            std::thread::sleep(Duration::from_millis(20));
        }
        let reached = marker.exists();
        tracer.stop().expect("stop");
        assert!(reached, "tracer blocked writing stderr");
    }

    #[test]
    fn interrupt_reports_missing_process() {
        let err = interrupt(i32::MAX as u32).expect_err("no such pid");
        assert_eq!(err.raw_os_error(), Some(libc::ESRCH));
    }

    #[test]
    fn interrupt_refuses_group_pids() {
        let err = interrupt(0).expect_err("pid 0");
        assert_eq!(err.kind(), io::ErrorKind::InvalidInput);
        assert!(interrupt(u32::MAX).is_err());
    }

    #[test]
    fn missing_tracer_binary_is_an_error() {
        assert!(Tracer::spawn("delphos-no-such-tracer", &[]).is_err());
    }
}
