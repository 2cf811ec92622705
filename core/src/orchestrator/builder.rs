//! Builder pattern for RunOrchestrator construction

use std::sync::Arc;
use std::time::Duration;

use crate::config::ExperimentConfig;
use crate::error::{Error, Result};
use crate::runner::WorkloadRunner;
use crate::source::MetricsSource;

use super::executor::RunOrchestrator;

/// Default sampling interval in seconds
const DEFAULT_SAMPLE_INTERVAL: Duration = Duration::from_secs(10);

/// Default per-sink buffer capacity
const DEFAULT_SINK_CAPACITY: usize = 32;

/// Builder for creating a RunOrchestrator with proper configuration
///
/// # Example
///
/// ```ignore
/// let orchestrator = RunOrchestratorBuilder::new()
///     .config(config)
///     .source(Arc::new(PrometheusSource::new(url)))
///     .workload(workload)
///     .build()?;
/// ```
pub struct RunOrchestratorBuilder {
    config: Option<ExperimentConfig>,
    source: Option<Arc<dyn MetricsSource>>,
    workload: Option<Arc<dyn WorkloadRunner>>,
    sample_interval: Duration,
    sink_capacity: usize,
}

impl RunOrchestratorBuilder {
    /// Create a new builder with default sampling and sink parameters
    pub fn new() -> Self {
        Self {
            config: None,
            source: None,
            workload: None,
            sample_interval: DEFAULT_SAMPLE_INTERVAL,
            sink_capacity: DEFAULT_SINK_CAPACITY,
        }
    }

    /// Set the experiment configuration
    pub fn config(mut self, config: ExperimentConfig) -> Self {
        self.config = Some(config);
        self
    }

    /// Set the metrics source
    pub fn source(mut self, source: Arc<dyn MetricsSource>) -> Self {
        self.source = Some(source);
        self
    }

    /// Set the workload runner
    pub fn workload(mut self, workload: Arc<dyn WorkloadRunner>) -> Self {
        self.workload = Some(workload);
        self
    }

    /// Set the sampling interval
    pub fn sample_interval(mut self, interval: Duration) -> Self {
        self.sample_interval = interval;
        self
    }

    /// Set the per-sink buffer capacity
    pub fn sink_capacity(mut self, capacity: usize) -> Self {
        self.sink_capacity = capacity;
        self
    }

    /// Build the orchestrator
    ///
    /// # Errors
    ///
    /// Returns an error if a collaborator is missing or the configuration
    /// fails validation.
    pub fn build(self) -> Result<RunOrchestrator> {
        let config = self.config.ok_or_else(|| Error::missing_config("config"))?;
        let source = self.source.ok_or_else(|| Error::missing_config("source"))?;
        let workload = self
            .workload
            .ok_or_else(|| Error::missing_config("workload"))?;

        config.validate().map_err(|e| Error::config(e.to_string()))?;

        Ok(RunOrchestrator::new(
            config,
            source,
            workload,
            self.sample_interval,
            self.sink_capacity,
        ))
    }
}

impl Default for RunOrchestratorBuilder {
    fn default() -> Self {
        Self::new()
    }
}
