//! Tests for the RunOrchestrator module

use super::builder::RunOrchestratorBuilder;
use super::executor::RunOutcome;
use crate::config::{ExperimentConfig, TimingConfig};
use crate::error::{Error, Result};
use crate::record::{NodeUsage, PodUsage};
use crate::runner::WorkloadRunner;
use crate::source::MetricsSource;

use async_trait::async_trait;
use chrono::Utc;
use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::broadcast;

// ============================================================================
// Mock MetricsSource
// ============================================================================

struct MockSource {
    polls: AtomicUsize,
}

impl MockSource {
    fn new() -> Self {
        Self {
            polls: AtomicUsize::new(0),
        }
    }
}

#[async_trait]
impl MetricsSource for MockSource {
    async fn node_usage(&self) -> Result<Vec<NodeUsage>> {
        let n = self.polls.fetch_add(1, Ordering::SeqCst);
        Ok(vec![NodeUsage {
            timestamp: Utc::now(),
            node: format!("node-{n}"),
            cpu: 1.0,
            memory: 100.0,
        }])
    }

    async fn pod_usage(&self, namespaces: &[String]) -> Result<Vec<PodUsage>> {
        Ok(vec![PodUsage {
            timestamp: Utc::now(),
            namespace: namespaces[0].clone(),
            pod: "webui-0".into(),
            cpu: 0.5,
            memory: 50.0,
        }])
    }
}

// ============================================================================
// Mock WorkloadRunner
// ============================================================================

enum Behavior {
    CompleteAfter(Duration),
    RunUntilStopped,
    Fail,
}

struct MockWorkload {
    behavior: Behavior,
}

#[async_trait]
impl WorkloadRunner for MockWorkload {
    async fn run(&self, _out_dir: &Path, mut stop: broadcast::Receiver<()>) -> Result<()> {
        match self.behavior {
            Behavior::CompleteAfter(delay) => {
                tokio::select! {
                    _ = tokio::time::sleep(delay) => Ok(()),
                    _ = stop.recv() => Ok(()),
                }
            }
            Behavior::RunUntilStopped => {
                let _ = stop.recv().await;
                Ok(())
            }
            Behavior::Fail => Err(Error::workload("generator crashed")),
        }
    }
}

// ============================================================================
// Helpers
// ============================================================================

fn test_config() -> ExperimentConfig {
    let mut config = ExperimentConfig::new("baseline", "scalebench");
    config.prometheus_url = "http://localhost:9090".into();
    config.release_name = "teastore".into();
    config
        .workload
        .params
        .insert("users".into(), serde_json::json!(50));
    config
}

fn fast_orchestrator(
    config: ExperimentConfig,
    source: Arc<MockSource>,
    behavior: Behavior,
) -> super::RunOrchestrator {
    RunOrchestratorBuilder::new()
        .config(config)
        .source(source)
        .workload(Arc::new(MockWorkload { behavior }))
        .sample_interval(Duration::from_millis(10))
        .sink_capacity(4)
        .build()
        .expect("Failed to build orchestrator")
}

fn csv_files(dir: &Path) -> Vec<std::path::PathBuf> {
    let mut files: Vec<_> = std::fs::read_dir(dir)
        .unwrap()
        .filter_map(|e| e.ok())
        .map(|e| e.path())
        .filter(|p| p.extension().is_some_and(|ext| ext == "csv"))
        .collect();
    files.sort();
    files
}

fn data_rows(path: &Path) -> usize {
    std::fs::read_to_string(path).unwrap().lines().count() - 1
}

// ============================================================================
// Builder Tests
// ============================================================================

#[test]
fn test_builder_missing_source() {
    let result = RunOrchestratorBuilder::new()
        .config(test_config())
        .workload(Arc::new(MockWorkload {
            behavior: Behavior::Fail,
        }))
        .build();

    assert!(result.is_err());
}

#[test]
fn test_builder_missing_workload() {
    let result = RunOrchestratorBuilder::new()
        .config(test_config())
        .source(Arc::new(MockSource::new()))
        .build();

    assert!(result.is_err());
}

#[test]
fn test_builder_invalid_config() {
    let mut config = test_config();
    config.prometheus_url = String::new();

    let result = RunOrchestratorBuilder::new()
        .config(config)
        .source(Arc::new(MockSource::new()))
        .workload(Arc::new(MockWorkload {
            behavior: Behavior::Fail,
        }))
        .build();

    assert!(result.is_err());
}

// ============================================================================
// Integration Tests
// ============================================================================

#[tokio::test]
async fn test_run_empty_workload_fails_before_creating_anything() {
    let mut config = test_config();
    config.workload.params.clear();
    let source = Arc::new(MockSource::new());
    let orchestrator = fast_orchestrator(config, Arc::clone(&source), Behavior::RunUntilStopped);

    let dir = tempfile::tempdir().unwrap();
    let out_dir = dir.path().join("run");
    let result = orchestrator.run(&out_dir).await;

    assert!(matches!(result, Err(Error::Config(_))));
    // No output directory, no files, no sampler activity.
    assert!(!out_dir.exists());
    assert_eq!(source.polls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn test_run_completes_and_flushes_all_telemetry() {
    let source = Arc::new(MockSource::new());
    let orchestrator = fast_orchestrator(
        test_config(),
        Arc::clone(&source),
        Behavior::CompleteAfter(Duration::from_millis(80)),
    );

    let dir = tempfile::tempdir().unwrap();
    let outcome = orchestrator.run(dir.path()).await.expect("Run failed");

    assert_eq!(outcome, RunOutcome::Completed);
    assert!(dir.path().join("experiment.json").exists());

    let files = csv_files(dir.path());
    assert_eq!(files.len(), 2);
    // Every poll produced one node record, all durably written.
    assert_eq!(data_rows(&files[0]), source.polls.load(Ordering::SeqCst));
}

#[tokio::test]
async fn test_interrupt_cancels_run_cleanly() {
    let source = Arc::new(MockSource::new());
    let orchestrator = fast_orchestrator(
        test_config(),
        Arc::clone(&source),
        Behavior::RunUntilStopped,
    );
    let interrupt = orchestrator.interrupt_handle();

    let dir = tempfile::tempdir().unwrap();
    let out_dir = dir.path().to_path_buf();
    let run = tokio::spawn(async move { orchestrator.run(&out_dir).await });

    tokio::time::sleep(Duration::from_millis(100)).await;
    interrupt.interrupt();

    let outcome = run
        .await
        .expect("Run task panicked")
        .expect("Run returned an error on cancellation");
    assert_eq!(outcome, RunOutcome::Cancelled);

    // Both sink files fully flushed, one row per poll up to the interrupt.
    let files = csv_files(dir.path());
    assert_eq!(files.len(), 2);
    let polls = source.polls.load(Ordering::SeqCst);
    assert!(polls > 0);
    assert_eq!(data_rows(&files[0]), polls);
    assert_eq!(data_rows(&files[1]), polls);
}

#[tokio::test]
async fn test_deadline_expiry_cancels_run() {
    let mut config = test_config();
    config.timing = TimingConfig {
        timeout_duration: 1,
        settle_offset: 0,
        grace_margin: 0,
        ..Default::default()
    };
    let source = Arc::new(MockSource::new());
    let orchestrator = fast_orchestrator(config, source, Behavior::RunUntilStopped);

    let dir = tempfile::tempdir().unwrap();
    let outcome = orchestrator.run(dir.path()).await.expect("Run failed");

    assert_eq!(outcome, RunOutcome::Cancelled);
}

#[tokio::test]
async fn test_repeated_interrupts_produce_single_cancellation() {
    let source = Arc::new(MockSource::new());
    let orchestrator = fast_orchestrator(
        test_config(),
        Arc::clone(&source),
        Behavior::RunUntilStopped,
    );
    let interrupt = orchestrator.interrupt_handle();

    let dir = tempfile::tempdir().unwrap();
    let out_dir = dir.path().to_path_buf();
    let run = tokio::spawn(async move { orchestrator.run(&out_dir).await });

    tokio::time::sleep(Duration::from_millis(80)).await;
    interrupt.interrupt();
    interrupt.interrupt();
    interrupt.interrupt();

    let outcome = run.await.expect("Run task panicked").expect("Run failed");
    assert_eq!(outcome, RunOutcome::Cancelled);

    // The double flush (cancel path + teardown) must not duplicate rows.
    let files = csv_files(dir.path());
    assert_eq!(data_rows(&files[0]), source.polls.load(Ordering::SeqCst));
}

#[tokio::test]
async fn test_workload_failure_propagates_after_teardown() {
    let source = Arc::new(MockSource::new());
    let orchestrator = fast_orchestrator(test_config(), source, Behavior::Fail);

    let dir = tempfile::tempdir().unwrap();
    let result = orchestrator.run(dir.path()).await;

    assert!(matches!(result, Err(Error::Workload(_))));
    // Teardown still ran: descriptor written before the failure.
    assert!(dir.path().join("experiment.json").exists());
}

#[tokio::test]
async fn test_descriptor_snapshot_written_at_start() {
    let source = Arc::new(MockSource::new());
    let orchestrator = fast_orchestrator(
        test_config(),
        source,
        Behavior::CompleteAfter(Duration::from_millis(20)),
    );

    let dir = tempfile::tempdir().unwrap();
    orchestrator.run(dir.path()).await.expect("Run failed");

    let raw = std::fs::read_to_string(dir.path().join("experiment.json")).unwrap();
    let value: serde_json::Value = serde_json::from_str(&raw).unwrap();
    assert_eq!(value["name"], "baseline");
    assert_eq!(value["workload"]["params"]["users"], 50);
}

#[tokio::test]
async fn test_orchestrator_debug_format() {
    let orchestrator = fast_orchestrator(
        test_config(),
        Arc::new(MockSource::new()),
        Behavior::RunUntilStopped,
    );

    let debug = format!("{orchestrator:?}");
    assert!(debug.contains("RunOrchestrator"));
    assert!(debug.contains("baseline"));
}
