//! Best-effort teardown of auxiliary run resources
//!
//! Every step is independent and idempotent; failures are logged and the
//! next step still runs. Nothing here ever propagates an error, so cleanup
//! can be invoked after a successful run, after a cancelled run, or
//! standalone against already-removed resources.

use std::path::Path;
use std::sync::Arc;

use crate::command::CommandRunner;
use crate::config::ExperimentConfig;

/// Pod name the colocated load generator runs under
const LOADGENERATOR_POD: &str = "loadgenerator";

/// Idempotent teardown of autoscaling artifacts, the colocated generator
/// pod, the service release, and deployment-modified working-tree files
pub struct CleanupPhase {
    config: ExperimentConfig,
    runner: Arc<dyn CommandRunner>,
}

impl CleanupPhase {
    /// Create a cleanup phase for the given run configuration
    pub fn new(config: ExperimentConfig, runner: Arc<dyn CommandRunner>) -> Self {
        Self { config, runner }
    }

    /// Run all cleanup steps. Never returns an error.
    pub async fn run(&self) {
        tracing::info!(experiment = %self.config.name, "cleaning up");

        if self.config.autoscaling {
            self.remove_autoscaling().await;
        }
        if self.config.colocated_workload {
            self.delete_workload_pod().await;
        }
        self.uninstall_release().await;
        self.revert_modified_files().await;
    }

    async fn remove_autoscaling(&self) {
        self.step(
            "remove autoscaling artifacts",
            "kubectl",
            &["delete", "hpa", "--all", "-n", &self.config.namespace],
            None,
        )
        .await;
    }

    async fn delete_workload_pod(&self) {
        let result = self
            .runner
            .run(
                "kubectl",
                &[
                    "delete",
                    "pod",
                    LOADGENERATOR_POD,
                    "-n",
                    &self.config.namespace,
                ],
                None,
            )
            .await;

        match result {
            Ok(output) if output.success => {
                tracing::debug!(pod = LOADGENERATOR_POD, "workload pod deleted");
            }
            Ok(output) if output.stderr.contains("not found") => {
                // Expected on re-runs: the pod is already gone.
                tracing::debug!(pod = LOADGENERATOR_POD, "workload pod already deleted");
            }
            Ok(output) => {
                tracing::error!(
                    pod = LOADGENERATOR_POD,
                    stderr = %output.stderr.trim(),
                    "failed to delete workload pod"
                );
            }
            Err(e) => {
                tracing::error!(error = %e, "failed to delete workload pod");
            }
        }
    }

    async fn uninstall_release(&self) {
        self.step(
            "uninstall release",
            "helm",
            &[
                "uninstall",
                &self.config.release_name,
                "-n",
                &self.config.namespace,
            ],
            None,
        )
        .await;
    }

    async fn revert_modified_files(&self) {
        for file in &self.config.modified_files {
            self.step(
                "revert modified file",
                "git",
                &["checkout", file],
                Some(&self.config.chart_path),
            )
            .await;
        }
    }

    async fn step(&self, what: &str, program: &str, args: &[&str], cwd: Option<&Path>) {
        match self.runner.run(program, args, cwd).await {
            Ok(output) if output.success => {
                tracing::debug!(step = what, "cleanup step finished");
            }
            Ok(output) => {
                tracing::error!(
                    step = what,
                    stderr = %output.stderr.trim(),
                    "cleanup step failed, continuing"
                );
            }
            Err(e) => {
                tracing::error!(step = what, error = %e, "cleanup step failed, continuing");
            }
        }
    }
}
