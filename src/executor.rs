//! Sandboxed shell-command execution
//!
//! Runs agent shell commands through the platform shell under a deadline,
//! after scanning the command string for path-shaped substrings and vetting
//! them against the directory guard. Failures never propagate as errors: the
//! `(output, exit_code)` tuple is the error channel, so a misbehaving
//! subprocess cannot crash the agent loop.

use crate::path_guard::DirectoryGuard;
use lazy_static::lazy_static;
use regex::Regex;
use std::path::Path;
use std::process::Stdio;
use std::sync::Arc;
use std::time::Duration;
use tokio::process::Command;
use tokio_util::sync::CancellationToken;

/// Captured output is truncated to this many characters
const MAX_OUTPUT_CHARS: usize = 50_000;

/// Generic failure / policy block sentinel
pub const EXIT_ERROR: i32 = -1;
/// Deadline sentinel
pub const EXIT_TIMEOUT: i32 = -2;

lazy_static! {
    // Fixed scan order: drive-letter paths, absolute Unix paths, then quoted
    // strings containing a separator. Best-effort by design; the guard is
    // consulted independently for filesystem-sensitive actions.
    static ref PATH_PATTERNS: Vec<Regex> = vec![
        Regex::new(r#"[A-Za-z]:[\\/][^\s"']*"#).unwrap(),
        Regex::new(r#"/[^\s"';|&]+"#).unwrap(),
        Regex::new(r#""([^"]*[\\/][^"]*)""#).unwrap(),
        Regex::new(r#"'([^']*[\\/][^']*)'"#).unwrap(),
    ];
}

/// Pull path-shaped candidates out of a shell command string.
pub fn extract_paths(command: &str) -> Vec<String> {
    let mut candidates = Vec::new();
    for pattern in PATH_PATTERNS.iter() {
        for caps in pattern.captures_iter(command) {
            let token = caps
                .get(1)
                .unwrap_or_else(|| caps.get(0).expect("capture 0 always present"))
                .as_str();
            if token.len() > 2 && (token.contains('/') || token.contains('\\')) {
                candidates.push(token.to_string());
            }
        }
    }
    candidates
}

/// Shell executor bound to an optional directory guard.
#[derive(Default)]
pub struct SandboxedExecutor {
    guard: Option<Arc<DirectoryGuard>>,
}

impl SandboxedExecutor {
    /// Executor with no path vetting (guard consulted elsewhere)
    pub fn new() -> Self {
        Self { guard: None }
    }

    pub fn with_guard(guard: Arc<DirectoryGuard>) -> Self {
        Self { guard: Some(guard) }
    }

    /// Run `command` in `cwd` with an upper bound of `timeout_secs`.
    ///
    /// Returns `(output, exit_code)`; exit code `-1` for blocked/failed
    /// commands, `-2` on timeout, and the process code otherwise (0 when the
    /// process reports none).
    pub async fn run(&self, command: &str, cwd: &Path, timeout_secs: u64) -> (String, i32) {
        self.run_with_cancellation(command, cwd, timeout_secs, CancellationToken::new())
            .await
    }

    /// Like [`run`](Self::run), racing execution against `cancel`. On
    /// cancellation or timeout the child is forcibly terminated, so no
    /// orphaned process survives the call.
    pub async fn run_with_cancellation(
        &self,
        command: &str,
        cwd: &Path,
        timeout_secs: u64,
        cancel: CancellationToken,
    ) -> (String, i32) {
        if let Some(guard) = &self.guard {
            for candidate in extract_paths(command) {
                if let Err(blocked) = guard.check(&candidate) {
                    tracing::warn!(%command, path = %candidate, "command blocked before spawn");
                    return (format!("BLOCKED: {}", blocked), EXIT_ERROR);
                }
            }
        }

        // Cross-platform shell execution; the shell redirects its own fd 2
        // into the stdout pipe so stderr interleaves where it was emitted
        let mut cmd = if cfg!(target_os = "windows") {
            let mut cmd = Command::new("cmd");
            cmd.arg("/C").arg(format!("({}) 2>&1", command));
            cmd
        } else {
            let mut cmd = Command::new("sh");
            cmd.arg("-c").arg(format!("exec 2>&1\n{}", command));
            cmd
        };
        cmd.current_dir(cwd)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::null())
            // Dropping the wait future on timeout/cancel must kill the child
            .kill_on_drop(true);

        let child = match cmd.spawn() {
            Ok(child) => child,
            Err(e) => return (format!("Error executing command: {}", e), EXIT_ERROR),
        };

        let deadline = Duration::from_secs(timeout_secs);
        tokio::select! {
            result = tokio::time::timeout(deadline, child.wait_with_output()) => match result {
                Ok(Ok(output)) => {
                    let text = String::from_utf8_lossy(&output.stdout).into_owned();
                    (truncate_chars(text), output.status.code().unwrap_or(0))
                }
                Ok(Err(e)) => (format!("Error executing command: {}", e), EXIT_ERROR),
                Err(_) => {
                    tracing::warn!(%command, timeout_secs, "command killed after timeout");
                    (format!("Command timed out after {}s", timeout_secs), EXIT_TIMEOUT)
                }
            },
            _ = cancel.cancelled() => {
                tracing::warn!(%command, "command cancelled, terminating child");
                ("Command cancelled".to_string(), EXIT_ERROR)
            }
        }
    }
}

fn truncate_chars(mut text: String) -> String {
    if let Some((idx, _)) = text.char_indices().nth(MAX_OUTPUT_CHARS) {
        text.truncate(idx);
    }
    text
}
