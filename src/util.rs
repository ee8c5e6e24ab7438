use anyhow::{anyhow, Context, Result};
use std::io::Read;
use std::path::{Path, PathBuf};
use std::process::{Child, Output};
use std::thread::JoinHandle;
use std::time::{Duration, Instant};
use std::time::{SystemTime, UNIX_EPOCH};

/// Marker appended to documentation text cut at a character cap.
pub const TRUNCATION_MARKER: &str = "\n... (truncated)";

/// Cap `text` at `max_chars` characters, appending [`TRUNCATION_MARKER`] when cut.
pub fn truncate_chars(text: &str, max_chars: usize) -> String {
    match text.char_indices().nth(max_chars) {
        Some((idx, _)) => format!("{}{TRUNCATION_MARKER}", &text[..idx]),
        None => text.to_string(),
    }
}

/// Byte-bounded lossy preview, cut on a char boundary.
pub fn preview(text: &str, max_bytes: usize) -> &str {
    if text.len() <= max_bytes {
        return text;
    }
    let mut end = max_bytes;
    while !text.is_char_boundary(end) {
        end -= 1;
    }
    &text[..end]
}

/// Resolve `path` against the current directory without touching the filesystem.
pub fn absolute_path(path: &Path) -> Result<PathBuf> {
    if path.is_absolute() {
        return Ok(path.to_path_buf());
    }
    let cwd = std::env::current_dir().context("resolve current directory")?;
    Ok(cwd.join(path))
}

pub fn now_epoch_ms() -> Result<u64> {
    let elapsed = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .context("clock before epoch")?;
    u64::try_from(elapsed.as_millis()).context("epoch millis overflow u64")
}

/// Wait for `child` up to `timeout`, killing it when the bound is exceeded.
///
/// Piped streams are drained on helper threads so a chatty child cannot
/// block on a full pipe. Returns `None` on timeout.
pub fn wait_with_timeout(mut child: Child, timeout: Duration) -> Result<Option<Output>> {
    let stdout = child.stdout.take().map(drain);
    let stderr = child.stderr.take().map(drain);

    let start = Instant::now();
    let status = loop {
        if let Some(status) = child.try_wait().context("check child status")? {
            break status;
        }
        if start.elapsed() > timeout {
            let _ = child.kill();
            let _ = child.wait();
            return Ok(None);
        }
        std::thread::sleep(Duration::from_millis(25));
    };

    Ok(Some(Output {
        status,
        stdout: collect(stdout)?,
        stderr: collect(stderr)?,
    }))
}

fn drain<R: Read + Send + 'static>(mut reader: R) -> JoinHandle<std::io::Result<Vec<u8>>> {
    std::thread::spawn(move || {
        let mut buf = Vec::new();
        reader.read_to_end(&mut buf).map(|_| buf)
    })
}

fn collect(handle: Option<JoinHandle<std::io::Result<Vec<u8>>>>) -> Result<Vec<u8>> {
    let Some(handle) = handle else {
        return Ok(Vec::new());
    };
    handle
        .join()
        .map_err(|_| anyhow!("child output reader panicked"))?
        .context("read child output")
}
