//! Subprocess plumbing for the external analyzers
//!
//! Every analyzer is driven the same way:
//! 1. Build an explicit argv (no shell)
//! 2. Spawn with piped stdout/stderr and a working directory
//! 3. Drain both pipes on helper threads while polling for exit
//! 4. Kill the child on timeout or cancellation

use serde_json::Value as JsonValue;
use std::io::Read;
use std::path::Path;
use std::process::{Child, Command, Stdio};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};
use tracing::{debug, warn};

const POLL_INTERVAL: Duration = Duration::from_millis(50);

/// Shared flag used to abort a running tool from another thread
#[derive(Debug, Clone, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// Raw result from running an external tool
#[derive(Debug, Clone)]
pub struct ExternalToolResult {
    /// Whether the process ran to completion (exit code not yet interpreted)
    pub completed: bool,
    pub stdout: String,
    pub stderr: String,
    pub return_code: Option<i32>,
    pub timed_out: bool,
    pub cancelled: bool,
    /// Error message if the process could not run or was stopped
    pub error: Option<String>,
}

impl ExternalToolResult {
    /// Create a completed result
    pub fn completed(stdout: String, stderr: String, return_code: i32) -> Self {
        Self {
            completed: true,
            stdout,
            stderr,
            return_code: Some(return_code),
            timed_out: false,
            cancelled: false,
            error: None,
        }
    }

    /// Create a failed result
    pub fn failure(error: String) -> Self {
        Self {
            completed: false,
            stdout: String::new(),
            stderr: String::new(),
            return_code: None,
            timed_out: false,
            cancelled: false,
            error: Some(error),
        }
    }

    /// Create a timeout result
    pub fn timeout(tool_name: &str, timeout_secs: u64) -> Self {
        Self {
            timed_out: true,
            ..Self::failure(format!("{} analysis timed out after {}s", tool_name, timeout_secs))
        }
    }

    /// Create a cancelled result
    pub fn cancelled(tool_name: &str) -> Self {
        Self {
            cancelled: true,
            ..Self::failure(format!("{} analysis was cancelled", tool_name))
        }
    }

    /// Parse stdout as JSON
    pub fn json_output(&self) -> Option<JsonValue> {
        if self.stdout.trim().is_empty() {
            return None;
        }
        serde_json::from_str(&self.stdout).ok()
    }
}

/// Run an external tool with standard error handling
///
/// # Arguments
/// * `cmd` - Program and arguments
/// * `tool_name` - Human-readable tool name for error messages
/// * `timeout_secs` - Timeout in seconds (0 = no timeout)
/// * `cwd` - Working directory for the tool
/// * `cancel` - Optional token checked while the tool runs
pub fn run_external_tool(
    cmd: &[String],
    tool_name: &str,
    timeout_secs: u64,
    cwd: Option<&Path>,
    cancel: Option<&CancelToken>,
) -> ExternalToolResult {
    let Some((program, args)) = cmd.split_first() else {
        return ExternalToolResult::failure("Empty command".to_string());
    };

    if cancel.is_some_and(|c| c.is_cancelled()) {
        return ExternalToolResult::cancelled(tool_name);
    }

    debug!("Running {}: {} {:?}", tool_name, program, args);

    let mut command = Command::new(program);
    command
        .args(args)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped());

    if let Some(dir) = cwd {
        command.current_dir(dir);
    }

    let mut child = match command.spawn() {
        Ok(child) => child,
        Err(e) => {
            if e.kind() == std::io::ErrorKind::NotFound {
                return ExternalToolResult::failure(format!(
                    "{} not found. Please install it first.",
                    tool_name
                ));
            }
            return ExternalToolResult::failure(format!("Failed to run {}: {}", tool_name, e));
        }
    };

    // Pipes are drained concurrently so a chatty tool cannot block on a full buffer
    let stdout = drain(child.stdout.take());
    let stderr = drain(child.stderr.take());

    wait_with_deadline(&mut child, tool_name, timeout_secs, cancel, stdout, stderr)
}

fn drain<R: Read + Send + 'static>(pipe: Option<R>) -> JoinHandle<String> {
    thread::spawn(move || {
        let mut buf = Vec::new();
        if let Some(mut pipe) = pipe {
            let _ = pipe.read_to_end(&mut buf);
        }
        String::from_utf8_lossy(&buf).into_owned()
    })
}

fn collect(handle: JoinHandle<String>) -> String {
    handle.join().unwrap_or_default()
}

/// Poll the child until it exits, the deadline passes, or the token fires
fn wait_with_deadline(
    child: &mut Child,
    tool_name: &str,
    timeout_secs: u64,
    cancel: Option<&CancelToken>,
    stdout: JoinHandle<String>,
    stderr: JoinHandle<String>,
) -> ExternalToolResult {
    let start = Instant::now();
    let timeout = Duration::from_secs(timeout_secs);

    loop {
        match child.try_wait() {
            Ok(Some(status)) => {
                let stdout = collect(stdout);
                let stderr = collect(stderr);
                return ExternalToolResult::completed(stdout, stderr, status.code().unwrap_or(-1));
            }
            Ok(None) => {
                if cancel.is_some_and(|c| c.is_cancelled()) {
                    kill(child);
                    // Grandchildren may still hold the pipes; leave the readers detached
                    drop((stdout, stderr));
                    warn!("{} cancelled", tool_name);
                    return ExternalToolResult::cancelled(tool_name);
                }
                if timeout_secs > 0 && start.elapsed() > timeout {
                    kill(child);
                    // Grandchildren may still hold the pipes; leave the readers detached
                    drop((stdout, stderr));
                    warn!("{} timed out after {}s", tool_name, timeout_secs);
                    return ExternalToolResult::timeout(tool_name, timeout_secs);
                }
                thread::sleep(POLL_INTERVAL);
            }
            Err(e) => {
                kill(child);
                return ExternalToolResult::failure(format!(
                    "Failed to wait for {}: {}",
                    tool_name, e
                ));
            }
        }
    }
}

fn kill(child: &mut Child) {
    let _ = child.kill();
    let _ = child.wait();
}

/// Check if a tool is installed
pub fn is_tool_installed(tool: &str) -> bool {
    Command::new(tool)
        .arg("--version")
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .status()
        .map(|s| s.success())
        .unwrap_or(false)
}
