//! Process Adapter: runs one `claude` subprocess per completion request.
//!
//! The handler talks to the [`CompletionRunner`] trait; [`ClaudeCliRunner`]
//! is the production implementation. The spawning task exclusively owns the
//! child handle and its accumulators — stdout fragments are forwarded over
//! an mpsc sender in OS-delivery order, and a `tokio::select!` races reads
//! against the wall-clock timeout and the request's cancellation token.
//!
//! Arguments are always passed as an explicit vector with no shell in
//! between: the transcript is user-controlled text and must never be
//! exposed to shell interpretation.

use async_trait::async_trait;
use std::process::Stdio;
use std::time::Duration;
use tokio::io::{AsyncBufReadExt, AsyncReadExt, BufReader};
use tokio::process::Command;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

/// One flattened completion request, owned by a single runner invocation.
#[derive(Debug, Clone)]
pub struct RunnerRequest {
    pub model: String,
    pub system_prompt: Option<String>,
    pub transcript: String,
}

/// Terminal state of one subprocess run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RunStatus {
    /// Exit 0, or non-zero exit after producing output (partial success —
    /// content already flushed to the client stands).
    Stop,
    /// Killed by the wall-clock timeout.
    Timeout,
    /// No usable output; carries a classified, human-readable cause.
    Failed(String),
    /// Killed because the request was cancelled (client disconnect).
    Cancelled,
}

/// What one run produced.
#[derive(Debug, Clone)]
pub struct RunnerOutcome {
    pub status: RunStatus,
    /// Full accumulated stdout, for buffered (non-streaming) responses.
    pub output: String,
}

impl RunnerOutcome {
    pub fn failed(message: impl Into<String>) -> Self {
        Self {
            status: RunStatus::Failed(message.into()),
            output: String::new(),
        }
    }
}

/// Seam between the HTTP handlers and the subprocess. Fragments are sent
/// over `tx` as they arrive; send errors are ignored so a buffered caller
/// may simply drop the receiver and read `RunnerOutcome::output`.
#[async_trait]
pub trait CompletionRunner: Send + Sync {
    async fn run(
        &self,
        req: RunnerRequest,
        tx: mpsc::UnboundedSender<String>,
        cancel: CancellationToken,
    ) -> RunnerOutcome;
}

/// Spawns the `claude` CLI in print mode.
pub struct ClaudeCliRunner {
    bin: String,
    timeout: Duration,
    skip_permissions: bool,
}

impl ClaudeCliRunner {
    pub fn new(bin: impl Into<String>, timeout_ms: u64, skip_permissions: bool) -> Self {
        Self {
            bin: bin.into(),
            timeout: Duration::from_millis(timeout_ms),
            skip_permissions,
        }
    }
}

/// Explicit argv for one invocation. The transcript is always the final
/// positional argument.
fn build_args(req: &RunnerRequest, skip_permissions: bool) -> Vec<String> {
    let mut args = vec!["-p".to_string(), "--model".to_string(), req.model.clone()];
    if skip_permissions {
        args.push("--dangerously-skip-permissions".to_string());
    }
    if let Some(system) = &req.system_prompt {
        args.push("--system-prompt".to_string());
        args.push(system.clone());
    }
    args.push(req.transcript.clone());
    args
}

/// Map a spawn error to a user-facing message.
fn classify_spawn_error(err: &std::io::Error, bin: &str) -> String {
    if err.kind() == std::io::ErrorKind::NotFound {
        format!("{bin} CLI not found. Install it and make sure it is on your PATH")
    } else {
        format!("Failed to start {bin}: {err}")
    }
}

/// Map stderr + exit code to a user-facing message. Advisory only — it
/// never changes which terminal state was reached.
fn classify_failure(stderr: &str, code: Option<i32>) -> String {
    let lower = stderr.to_lowercase();
    if lower.contains("not authenticated") || lower.contains("login") {
        "Not authenticated. Run the claude CLI once interactively to log in".to_string()
    } else if lower.contains("rate limit") {
        "Rate limited. Wait a moment and try again".to_string()
    } else if !stderr.trim().is_empty() {
        stderr.trim().to_string()
    } else {
        match code {
            Some(code) => format!("claude exited with code {code} and no output"),
            None => "claude was terminated by a signal with no output".to_string(),
        }
    }
}

#[async_trait]
impl CompletionRunner for ClaudeCliRunner {
    async fn run(
        &self,
        req: RunnerRequest,
        tx: mpsc::UnboundedSender<String>,
        cancel: CancellationToken,
    ) -> RunnerOutcome {
        let args = build_args(&req, self.skip_permissions);
        debug!(bin = %self.bin, model = %req.model, "spawning completion subprocess");

        let mut child = match Command::new(&self.bin)
            .args(&args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
        {
            Ok(child) => child,
            Err(err) => {
                warn!(bin = %self.bin, %err, "spawn failed");
                return RunnerOutcome::failed(classify_spawn_error(&err, &self.bin));
            }
        };

        let Some(mut stdout) = child.stdout.take() else {
            return RunnerOutcome::failed("child stdout was not captured");
        };
        let Some(stderr) = child.stderr.take() else {
            return RunnerOutcome::failed("child stderr was not captured");
        };

        // Drain stderr concurrently; it is logged and kept for error
        // classification but never forwarded to the client.
        let mut stderr_task = tokio::spawn(async move {
            let mut lines = BufReader::new(stderr).lines();
            let mut collected = String::new();
            while let Ok(Some(line)) = lines.next_line().await {
                warn!(target: "vibe_proxy::subprocess", "{line}");
                collected.push_str(&line);
                collected.push('\n');
            }
            collected
        });

        let timeout = tokio::time::sleep(self.timeout);
        tokio::pin!(timeout);

        let mut output = String::new();
        let mut buf = [0u8; 8192];
        let mut timed_out = false;
        let mut cancelled = false;

        // Forward stdout fragments exactly as the OS delivers them, until
        // EOF, timeout, or cancellation — whichever comes first.
        loop {
            tokio::select! {
                read = stdout.read(&mut buf) => match read {
                    Ok(0) => break,
                    Ok(n) => {
                        let text = String::from_utf8_lossy(&buf[..n]).into_owned();
                        output.push_str(&text);
                        let _ = tx.send(text);
                    }
                    Err(err) => {
                        warn!(%err, "error reading subprocess stdout");
                        break;
                    }
                },
                () = &mut timeout => {
                    warn!(timeout_ms = self.timeout.as_millis() as u64, "subprocess timed out, killing");
                    timed_out = true;
                    let _ = child.start_kill();
                    break;
                }
                () = cancel.cancelled() => {
                    debug!("request cancelled, killing subprocess");
                    cancelled = true;
                    let _ = child.start_kill();
                    break;
                }
            }
        }

        // Reap the child under the same timeout/cancel guard: EOF on stdout
        // does not mean the child exited — it may daemonize or hang after
        // closing its pipe, and wait() alone would block unbounded.
        let exit = loop {
            tokio::select! {
                exit = child.wait() => break exit,
                () = &mut timeout, if !timed_out && !cancelled => {
                    warn!(timeout_ms = self.timeout.as_millis() as u64, "subprocess lingered past timeout after closing stdout, killing");
                    timed_out = true;
                    let _ = child.start_kill();
                }
                () = cancel.cancelled(), if !timed_out && !cancelled => {
                    debug!("request cancelled while awaiting subprocess exit, killing");
                    cancelled = true;
                    let _ = child.start_kill();
                }
            }
        };

        // A grandchild may have inherited stderr and outlive the kill; never
        // wait on the drain task past the same deadlines. Timed-out and
        // cancelled runs classify nothing, so their stderr is not needed.
        let stderr_text = if timed_out || cancelled {
            stderr_task.abort();
            String::new()
        } else {
            tokio::select! {
                collected = &mut stderr_task => collected.unwrap_or_default(),
                () = &mut timeout => {
                    stderr_task.abort();
                    String::new()
                }
                () = cancel.cancelled() => {
                    stderr_task.abort();
                    String::new()
                }
            }
        };

        if cancelled {
            return RunnerOutcome {
                status: RunStatus::Cancelled,
                output,
            };
        }
        if timed_out {
            return RunnerOutcome {
                status: RunStatus::Timeout,
                output,
            };
        }

        let status = match exit {
            Ok(status) if status.success() => RunStatus::Stop,
            Ok(status) => {
                if output.is_empty() {
                    RunStatus::Failed(classify_failure(&stderr_text, status.code()))
                } else {
                    // Partial success: content already flushed stands.
                    warn!(code = ?status.code(), "subprocess exited non-zero after producing output");
                    RunStatus::Stop
                }
            }
            Err(err) => RunStatus::Failed(format!("Failed to wait for subprocess: {err}")),
        };

        RunnerOutcome { status, output }
    }
}
