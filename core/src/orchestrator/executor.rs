//! Orchestrator execution logic

use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use tokio::sync::{broadcast, watch};

use crate::config::ExperimentConfig;
use crate::deadline::DeadlineController;
use crate::descriptor::RunDescriptor;
use crate::error::{Error, Result};
use crate::record::{NodeUsage, PodUsage};
use crate::runner::WorkloadRunner;
use crate::sampler::ResourceSampler;
use crate::sink::BufferedSink;
use crate::source::MetricsSource;

/// Terminal state of a run
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunOutcome {
    /// The workload finished within the deadline
    Completed,
    /// The deadline or an interrupt cancelled the run; telemetry is
    /// still fully flushed
    Cancelled,
}

/// Handle for raising an external interrupt toward a running orchestrator
///
/// The embedding layer routes OS signals here; tests use it to simulate an
/// interrupt without real signals.
#[derive(Clone)]
pub struct InterruptHandle {
    tx: Arc<watch::Sender<bool>>,
}

impl InterruptHandle {
    /// Request cancellation of the run. Safe to call more than once.
    pub fn interrupt(&self) {
        let _ = self.tx.send(true);
    }
}

/// RunOrchestrator coordinates one timed benchmark run
///
/// Owns the sinks and the deadline for the duration of `run()`; the sampler
/// holds non-owning references to the sinks between start and stop.
pub struct RunOrchestrator {
    /// Run configuration
    pub(crate) config: ExperimentConfig,

    /// Metrics source polled by the sampler
    pub(crate) source: Arc<dyn MetricsSource>,

    /// Workload-execution collaborator
    pub(crate) workload: Arc<dyn WorkloadRunner>,

    /// Sampling interval
    pub(crate) sample_interval: Duration,

    /// Shared sink capacity bound
    pub(crate) sink_capacity: usize,

    /// External-interrupt flag feeding the deadline controller
    pub(crate) interrupt_tx: Arc<watch::Sender<bool>>,
}

impl RunOrchestrator {
    /// Create a new orchestrator
    ///
    /// Use `RunOrchestratorBuilder` for a more ergonomic construction.
    pub fn new(
        config: ExperimentConfig,
        source: Arc<dyn MetricsSource>,
        workload: Arc<dyn WorkloadRunner>,
        sample_interval: Duration,
        sink_capacity: usize,
    ) -> Self {
        let (interrupt_tx, _) = watch::channel(false);
        Self {
            config,
            source,
            workload,
            sample_interval,
            sink_capacity,
            interrupt_tx: Arc::new(interrupt_tx),
        }
    }

    /// Get a handle for raising an external interrupt
    pub fn interrupt_handle(&self) -> InterruptHandle {
        InterruptHandle {
            tx: Arc::clone(&self.interrupt_tx),
        }
    }

    /// Get the run configuration
    pub fn config(&self) -> &ExperimentConfig {
        &self.config
    }

    /// Execute the run: validate, sample, run the workload under a deadline,
    /// and tear down with all telemetry flushed.
    ///
    /// Cancellation (deadline expiry or interrupt) is not an error; it is
    /// reported as `RunOutcome::Cancelled` with a warning log entry.
    pub async fn run(&self, out_dir: &Path) -> Result<RunOutcome> {
        if self.config.workload.is_empty() {
            return Err(Error::config(format!(
                "cannot run {} with empty workload settings",
                self.config.name
            )));
        }

        let started_at = Utc::now();
        let stamp = started_at.format("%d_%m_%Y_%H_%M");
        std::fs::create_dir_all(out_dir)?;

        let node_sink = Arc::new(BufferedSink::<NodeUsage>::new(
            out_dir.join(format!("measurements_node_{stamp}.csv")),
            self.sink_capacity,
        ));
        let pod_sink = Arc::new(BufferedSink::<PodUsage>::new(
            out_dir.join(format!("measurements_pod_{stamp}.csv")),
            self.sink_capacity,
        ));

        RunDescriptor::snapshot(&self.config, started_at)
            .write_to(&out_dir.join("experiment.json"))?;

        tracing::debug!("starting sampler");
        let sampler = ResourceSampler::start(
            Arc::clone(&self.source),
            Arc::clone(&node_sink),
            Arc::clone(&pod_sink),
            self.config.sampling_namespaces(),
            self.sample_interval,
        );

        let deadline = self.config.timing.armed_deadline();
        let (stop_tx, stop_rx) = broadcast::channel(1);
        let controller = DeadlineController::arm(
            deadline,
            stop_tx,
            self.interrupt_tx.subscribe(),
            {
                // Cancellation path: bounded work only. Stop the sampler,
                // flush both sinks; the controller then raises the stop
                // request toward the workload runner.
                let sampler = sampler.handle();
                let node_sink = Arc::clone(&node_sink);
                let pod_sink = Arc::clone(&pod_sink);
                move || {
                    sampler.stop();
                    if let Err(e) = pod_sink.flush() {
                        tracing::error!(error = %e, "failed to flush pod sink on cancel");
                    }
                    if let Err(e) = node_sink.flush() {
                        tracing::error!(error = %e, "failed to flush node sink on cancel");
                    }
                }
            },
        );

        tracing::info!(
            experiment = %self.config.name,
            deadline_secs = deadline.as_secs(),
            "starting workload"
        );
        let workload_result = self.workload.run(out_dir, stop_rx).await;

        // Teardown runs on both paths; the cancellation callback may have
        // already stopped and flushed, in which case these are no-ops.
        tracing::info!("workload returned, stopping sampler and flushing sinks");
        sampler.shutdown().await;
        node_sink.flush()?;
        pod_sink.flush()?;

        let cancelled = controller.cancelled();
        controller.disarm();

        match workload_result {
            Ok(()) if cancelled => {
                tracing::warn!("run cancelled before workload completion");
                Ok(RunOutcome::Cancelled)
            }
            Ok(()) => {
                tracing::info!("run completed");
                Ok(RunOutcome::Completed)
            }
            Err(e) if cancelled => {
                tracing::warn!(error = %e, "workload aborted by cancellation");
                Ok(RunOutcome::Cancelled)
            }
            Err(e) => Err(e),
        }
    }
}

impl std::fmt::Debug for RunOrchestrator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RunOrchestrator")
            .field("experiment", &self.config.name)
            .field("sample_interval", &self.sample_interval)
            .field("sink_capacity", &self.sink_capacity)
            .finish()
    }
}
