//! Workload runner and configurator seams
//!
//! The generator's internals are an external collaborator; the orchestrator
//! only needs a blocking "run until done or asked to stop" call. Stop
//! requests are cooperative: the runner decides how to honor them.

use std::path::Path;
use std::process::Stdio;

use async_trait::async_trait;
use tokio::sync::broadcast;

use crate::config::{ExperimentConfig, WorkloadSettings};
use crate::error::{Error, Result};

/// Executes the workload generator for one run
#[async_trait]
pub trait WorkloadRunner: Send + Sync {
    /// Run the workload to completion, writing any generator artifacts into
    /// `out_dir`. A message on `stop` is a request to wind down early.
    async fn run(&self, out_dir: &Path, stop: broadcast::Receiver<()>) -> Result<()>;
}

/// Applies a workload variant's settings onto an experiment configuration
///
/// One explicit method per variant, replacing ad-hoc structural typing:
/// each variant knows how to configure itself onto an environment.
pub trait WorkloadConfigurator {
    /// Return the configuration with this variant's workload applied
    fn configure(&self, config: ExperimentConfig) -> ExperimentConfig;
}

/// `WorkloadRunner` that spawns the generator as a child process
///
/// Used by the CLI; the command line comes from `WorkloadSettings::command`.
/// On a stop request the child is terminated and the early exit is reported
/// as success so the orchestrator can proceed with teardown.
pub struct ProcessWorkloadRunner {
    settings: WorkloadSettings,
}

impl ProcessWorkloadRunner {
    /// Create a runner for the given workload settings
    pub fn new(settings: WorkloadSettings) -> Self {
        Self { settings }
    }
}

#[async_trait]
impl WorkloadRunner for ProcessWorkloadRunner {
    async fn run(&self, out_dir: &Path, mut stop: broadcast::Receiver<()>) -> Result<()> {
        let (program, args) = self
            .settings
            .command
            .split_first()
            .ok_or_else(|| Error::workload("no workload command configured"))?;

        tracing::info!(program, "spawning workload generator");
        let mut child = tokio::process::Command::new(program)
            .args(args)
            .env("SCALEBENCH_OUT_DIR", out_dir)
            .stdout(Stdio::inherit())
            .stderr(Stdio::inherit())
            .spawn()?;

        tokio::select! {
            status = child.wait() => {
                let status = status?;
                if status.success() {
                    Ok(())
                } else {
                    Err(Error::workload(format!(
                        "generator exited with {status}"
                    )))
                }
            }
            _ = stop.recv() => {
                tracing::warn!("stop requested, terminating workload generator");
                if let Err(e) = child.kill().await {
                    tracing::error!(error = %e, "failed to terminate generator");
                }
                Ok(())
            }
        }
    }
}
