//! Process Adapter tests against real subprocesses (stub shell scripts).

#![cfg(unix)]

use std::os::unix::fs::PermissionsExt;
use std::path::PathBuf;
use std::time::Instant;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use vibe_proxy::{ClaudeCliRunner, CompletionRunner, RunStatus, RunnerRequest};

/// Write an executable stub script that stands in for the claude CLI.
fn stub_script(body: &str) -> (tempfile::TempDir, PathBuf) {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("stub.sh");
    std::fs::write(&path, format!("#!/bin/sh\n{body}\n")).unwrap();
    let mut perms = std::fs::metadata(&path).unwrap().permissions();
    perms.set_mode(0o755);
    std::fs::set_permissions(&path, perms).unwrap();
    (dir, path)
}

fn request() -> RunnerRequest {
    RunnerRequest {
        model: "sonnet".to_string(),
        system_prompt: None,
        transcript: "Human: hello".to_string(),
    }
}

async fn run(runner: &ClaudeCliRunner, req: RunnerRequest) -> (vibe_proxy::RunnerOutcome, String) {
    let (tx, mut rx) = mpsc::unbounded_channel();
    let outcome = runner.run(req, tx, CancellationToken::new()).await;
    let mut streamed = String::new();
    while let Ok(chunk) = rx.try_recv() {
        streamed.push_str(&chunk);
    }
    (outcome, streamed)
}

#[tokio::test]
async fn clean_exit_is_stop_with_full_output() {
    let (_dir, path) = stub_script("printf 'hi there'");
    let runner = ClaudeCliRunner::new(path.to_str().unwrap(), 5_000, false);
    let (outcome, streamed) = run(&runner, request()).await;
    assert_eq!(outcome.status, RunStatus::Stop);
    assert_eq!(outcome.output, "hi there");
    assert_eq!(streamed, "hi there");
}

#[tokio::test]
async fn fragments_arrive_in_order() {
    let (_dir, path) = stub_script("printf a; sleep 0.05; printf b; sleep 0.05; printf c");
    let runner = ClaudeCliRunner::new(path.to_str().unwrap(), 5_000, false);
    let (outcome, streamed) = run(&runner, request()).await;
    assert_eq!(outcome.status, RunStatus::Stop);
    // Fragment boundaries depend on pipe delivery, but order must hold.
    assert_eq!(outcome.output, "abc");
    assert_eq!(streamed, "abc");
}

#[tokio::test]
async fn transcript_is_passed_as_the_last_argument() {
    let (_dir, path) = stub_script("for last in \"$@\"; do :; done; printf '%s' \"$last\"");
    let runner = ClaudeCliRunner::new(path.to_str().unwrap(), 5_000, true);
    let mut req = request();
    req.transcript = "Human: `echo injected`; $(boom)".to_string();
    let (outcome, _) = run(&runner, req).await;
    assert_eq!(outcome.status, RunStatus::Stop);
    // Verbatim, shell metacharacters and all — no shell ever saw it.
    assert_eq!(outcome.output, "Human: `echo injected`; $(boom)");
}

#[tokio::test]
async fn timeout_kills_the_child() {
    let (_dir, path) = stub_script("sleep 30");
    let runner = ClaudeCliRunner::new(path.to_str().unwrap(), 200, false);
    let start = Instant::now();
    let (outcome, _) = run(&runner, request()).await;
    assert_eq!(outcome.status, RunStatus::Timeout);
    // Far less than the script's 30s sleep: the child was killed, not awaited.
    assert!(start.elapsed().as_secs() < 5, "took {:?}", start.elapsed());
}

#[tokio::test]
async fn output_before_timeout_is_kept() {
    let (_dir, path) = stub_script("printf early; sleep 30");
    let runner = ClaudeCliRunner::new(path.to_str().unwrap(), 300, false);
    let (outcome, streamed) = run(&runner, request()).await;
    assert_eq!(outcome.status, RunStatus::Timeout);
    assert_eq!(outcome.output, "early");
    assert_eq!(streamed, "early");
}

#[tokio::test]
async fn timeout_applies_after_child_closes_stdout() {
    // The child closes its stdout pipe but keeps running; EOF must not
    // disarm the wall-clock timeout while the exit is awaited.
    let (_dir, path) = stub_script("printf early; exec 1>&-; sleep 30");
    let runner = ClaudeCliRunner::new(path.to_str().unwrap(), 300, false);
    let start = Instant::now();
    let (outcome, streamed) = run(&runner, request()).await;
    assert_eq!(outcome.status, RunStatus::Timeout);
    assert_eq!(outcome.output, "early");
    assert_eq!(streamed, "early");
    assert!(start.elapsed().as_secs() < 5, "took {:?}", start.elapsed());
}

#[tokio::test]
async fn cancellation_applies_after_child_closes_stdout() {
    let (_dir, path) = stub_script("exec 1>&-; sleep 30");
    let runner = ClaudeCliRunner::new(path.to_str().unwrap(), 60_000, false);
    let (tx, _rx) = mpsc::unbounded_channel();
    let cancel = CancellationToken::new();

    let canceller = cancel.clone();
    tokio::spawn(async move {
        tokio::time::sleep(std::time::Duration::from_millis(100)).await;
        canceller.cancel();
    });

    let start = Instant::now();
    let outcome = runner.run(request(), tx, cancel).await;
    assert_eq!(outcome.status, RunStatus::Cancelled);
    assert!(start.elapsed().as_secs() < 5, "took {:?}", start.elapsed());
}

#[tokio::test]
async fn nonzero_exit_with_output_is_partial_success() {
    let (_dir, path) = stub_script("printf partial; exit 3");
    let runner = ClaudeCliRunner::new(path.to_str().unwrap(), 5_000, false);
    let (outcome, _) = run(&runner, request()).await;
    assert_eq!(outcome.status, RunStatus::Stop);
    assert_eq!(outcome.output, "partial");
}

#[tokio::test]
async fn nonzero_exit_without_output_is_classified_failure() {
    let (_dir, path) = stub_script("echo 'rate limit exceeded' >&2; exit 1");
    let runner = ClaudeCliRunner::new(path.to_str().unwrap(), 5_000, false);
    let (outcome, _) = run(&runner, request()).await;
    match outcome.status {
        RunStatus::Failed(msg) => assert!(msg.contains("Rate limited"), "got: {msg}"),
        other => panic!("expected Failed, got {other:?}"),
    }
}

#[tokio::test]
async fn silent_nonzero_exit_reports_the_code() {
    let (_dir, path) = stub_script("exit 7");
    let runner = ClaudeCliRunner::new(path.to_str().unwrap(), 5_000, false);
    let (outcome, _) = run(&runner, request()).await;
    assert_eq!(
        outcome.status,
        RunStatus::Failed("claude exited with code 7 and no output".to_string())
    );
}

#[tokio::test]
async fn missing_executable_is_an_install_hint() {
    let runner = ClaudeCliRunner::new("/definitely/not/a/real/binary", 5_000, false);
    let (outcome, _) = run(&runner, request()).await;
    match outcome.status {
        RunStatus::Failed(msg) => assert!(msg.contains("not found"), "got: {msg}"),
        other => panic!("expected Failed, got {other:?}"),
    }
}

#[tokio::test]
async fn cancellation_kills_the_child() {
    let (_dir, path) = stub_script("sleep 30");
    let runner = ClaudeCliRunner::new(path.to_str().unwrap(), 60_000, false);
    let (tx, _rx) = mpsc::unbounded_channel();
    let cancel = CancellationToken::new();

    let canceller = cancel.clone();
    tokio::spawn(async move {
        tokio::time::sleep(std::time::Duration::from_millis(100)).await;
        canceller.cancel();
    });

    let start = Instant::now();
    let outcome = runner.run(request(), tx, cancel).await;
    assert_eq!(outcome.status, RunStatus::Cancelled);
    assert!(start.elapsed().as_secs() < 5, "took {:?}", start.elapsed());
}
