//! End-to-end runs of the reference worker under the supervisor.

use std::sync::Arc;
use std::time::Duration;

use tokio::time::Instant;

use dyntask::protocol::LogLevel;
use dyntask::sink::LogSink;
use dyntask::supervisor::{run_worker, Outcome, SpawnConfig, DRAIN_TIMEOUT};
use dyntask::AppError;

use super::test_helpers::{probe, sink, Workspace};

const SUMMARY: &str = "processed 6 entries\nout of date: 3";

#[tokio::test]
async fn probe_walks_entries_one_at_a_time() {
    let workspace = Workspace::new();
    let sink = sink();

    let outcome = run_worker(
        &probe(&[]),
        workspace.session(),
        Arc::clone(&sink) as Arc<dyn LogSink>,
    )
    .await
    .unwrap();

    assert_eq!(outcome, Outcome::Completed);
    assert_eq!(workspace.manifest(), workspace.expected_manifest());
    assert!(sink.contains(LogLevel::Info, SUMMARY), "{:?}", sink.records());
    assert!(sink.contains(LogLevel::Trace, "probe started: incremental=true total=6"));
}

#[tokio::test]
async fn probe_bulk_request_reads_everything() {
    let workspace = Workspace::new();
    let sink = sink();

    let outcome = run_worker(
        &probe(&["--bulk"]),
        workspace.session(),
        Arc::clone(&sink) as Arc<dyn LogSink>,
    )
    .await
    .unwrap();

    assert_eq!(outcome, Outcome::Completed);
    assert_eq!(workspace.manifest(), workspace.expected_manifest());
    assert!(sink.contains(LogLevel::Info, SUMMARY), "{:?}", sink.records());
}

#[tokio::test]
async fn non_zero_exit_fails_the_run() {
    let workspace = Workspace::new();
    let sink = sink();

    let err = run_worker(
        &probe(&["--exit-code", "3"]),
        workspace.session(),
        Arc::clone(&sink) as Arc<dyn LogSink>,
    )
    .await
    .unwrap_err();

    assert!(matches!(err, AppError::WorkerExit(Some(3))), "got {err:?}");
    assert_eq!(err.to_string(), "worker: exited with code 3");
}

#[tokio::test]
async fn stderr_output_is_logged_as_error() {
    let workspace = Workspace::new();
    let sink = sink();

    run_worker(
        &probe(&["--stderr", "boom"]),
        workspace.session(),
        Arc::clone(&sink) as Arc<dyn LogSink>,
    )
    .await
    .unwrap();

    assert!(sink.contains(LogLevel::Error, "boom"), "{:?}", sink.records());
}

#[tokio::test]
async fn missing_target_can_skip_the_run() {
    let workspace = Workspace::new();
    let config = SpawnConfig {
        fail_on_missing_target: false,
        ..SpawnConfig::direct("/definitely/not/here/worker")
    };

    let outcome = run_worker(&config, workspace.session(), sink())
        .await
        .unwrap();

    assert!(matches!(outcome, Outcome::Skipped(_)));
    assert!(!workspace.output.path().join("manifest.txt").exists());
}

#[tokio::test]
async fn missing_target_fails_by_default() {
    let workspace = Workspace::new();
    let err = run_worker(
        &SpawnConfig::direct("/definitely/not/here/worker"),
        workspace.session(),
        sink(),
    )
    .await
    .unwrap_err();

    assert!(matches!(err, AppError::Config(_)));
}

#[tokio::test]
async fn request_in_flight_at_exit_still_completes() {
    let workspace = Workspace::new();
    let sink = sink();
    let started = Instant::now();

    let outcome = run_worker(
        &probe(&["--abandon", "next unchanged"]),
        workspace.session(),
        Arc::clone(&sink) as Arc<dyn LogSink>,
    )
    .await
    .unwrap();

    assert_eq!(outcome, Outcome::Completed);
    assert!(started.elapsed() < DRAIN_TIMEOUT + Duration::from_secs(2));
    assert!(sink.contains(LogLevel::Trace, "probe started: incremental=true total=6"));
    assert!(!workspace.output.path().join("manifest.txt").exists());
}

#[tokio::test]
async fn task_failure_is_reported_and_fails_the_run() {
    let workspace = Workspace::new();
    let missing = workspace.output.path().join("absent");
    let sink = sink();

    let err = run_worker(
        &probe(&[]),
        workspace.session_writing_to(&missing),
        Arc::clone(&sink) as Arc<dyn LogSink>,
    )
    .await
    .unwrap_err();

    assert!(matches!(err, AppError::WorkerExit(Some(1))), "got {err:?}");
    let records = sink.records();
    assert!(
        records
            .iter()
            .any(|(level, msg)| *level == LogLevel::Error
                && msg.starts_with("io: cannot write manifest")),
        "{records:?}"
    );
}

#[cfg(unix)]
#[tokio::test]
async fn stuck_stream_is_abandoned_after_drain_budget() {
    let workspace = Workspace::new();
    // The background `sleep` keeps stdout open after the worker exits, with
    // an unterminated line buffered, so the dispatcher cannot finish.
    let config = SpawnConfig {
        args: vec![
            "-c".into(),
            "head -n 16 >/dev/null; printf partial; sleep 5 & exit 0".into(),
        ],
        drain_timeout: Duration::from_millis(200),
        ..SpawnConfig::direct("sh")
    };
    let started = Instant::now();

    let outcome = tokio::time::timeout(
        Duration::from_secs(4),
        run_worker(&config, workspace.session(), sink()),
    )
    .await
    .expect("drain budget must bound the run")
    .unwrap();

    assert_eq!(outcome, Outcome::Completed);
    assert!(started.elapsed() < Duration::from_secs(4));
}
