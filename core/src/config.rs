//! Experiment configuration types
//!
//! Configuration is constructed once per run as immutable value objects.
//! Mutation happens only before a run starts, through `WorkloadConfigurator`
//! implementations that consume and return the config.

use std::collections::BTreeMap;
use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Resource limits for a single workload component
///
/// CPU in millicores, memory in MiB, matching the limit tables the
/// deployment tooling consumes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResourceLimit {
    /// CPU limit in millicores
    pub cpu: u64,
    /// Memory limit in MiB
    pub memory: u64,
}

impl Default for ResourceLimit {
    fn default() -> Self {
        Self {
            cpu: 1000,
            memory: 1024,
        }
    }
}

/// Timing parameters for a run
///
/// `settle_offset` and `grace_margin` are the fixed teardown allowances; the
/// exact values are not load-bearing beyond "some grace for shutdown".
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TimingConfig {
    /// Maximum time the workload itself may run, in seconds
    pub timeout_duration: u64,

    /// Settling window before the workload starts, in seconds
    pub wait_before_workloads: u64,

    /// Settling window after the workload finishes, in seconds
    pub wait_after_workloads: u64,

    /// Fixed offset folded into the total duration, in seconds
    #[serde(default = "default_settle_offset")]
    pub settle_offset: u64,

    /// Grace margin for teardown latency, applied twice when arming
    /// the deadline, in seconds
    #[serde(default = "default_grace_margin")]
    pub grace_margin: u64,
}

fn default_settle_offset() -> u64 {
    30
}

fn default_grace_margin() -> u64 {
    60
}

impl Default for TimingConfig {
    fn default() -> Self {
        Self {
            timeout_duration: 3600,
            wait_before_workloads: 180,
            wait_after_workloads: 180,
            settle_offset: default_settle_offset(),
            grace_margin: default_grace_margin(),
        }
    }
}

impl TimingConfig {
    /// Total permitted run time in seconds: the workload timeout plus the
    /// fixed settle offset
    pub fn total_duration(&self) -> u64 {
        self.timeout_duration + self.settle_offset
    }

    /// Countdown to arm the deadline with: the total duration padded with
    /// twice the grace margin to absorb teardown latency
    pub fn armed_deadline(&self) -> Duration {
        Duration::from_secs(self.total_duration() + 2 * self.grace_margin)
    }
}

/// Settings handed to the workload generator
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct WorkloadSettings {
    /// Command line of the generator process (CLI-driven runs)
    #[serde(default)]
    pub command: Vec<String>,

    /// Generator-specific parameters, passed through opaquely
    #[serde(default)]
    pub params: BTreeMap<String, serde_json::Value>,
}

impl WorkloadSettings {
    /// True when nothing has been configured; such a run is rejected
    /// before any resource is created
    pub fn is_empty(&self) -> bool {
        self.command.is_empty() && self.params.is_empty()
    }
}

/// Full configuration for one experiment run
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExperimentConfig {
    /// Experiment name, used for logging and the run descriptor
    pub name: String,

    /// Primary namespace the service under test runs in
    pub namespace: String,

    /// Auxiliary infrastructure namespaces included in sampling
    #[serde(default)]
    pub infrastructure_namespaces: Vec<String>,

    /// Base URL of the Prometheus endpoint to sample from
    pub prometheus_url: String,

    /// Helm release to uninstall during cleanup
    pub release_name: String,

    /// Working tree of the deployed chart (cleanup reverts files here)
    #[serde(default)]
    pub chart_path: PathBuf,

    /// Files the deployment modified, reverted to baseline during cleanup
    #[serde(default)]
    pub modified_files: Vec<String>,

    /// Whether autoscaling artifacts were set up for this run
    #[serde(default)]
    pub autoscaling: bool,

    /// Whether the load generator runs colocated with the target service
    #[serde(default)]
    pub colocated_workload: bool,

    /// Free-form tags carried into the run descriptor
    #[serde(default)]
    pub tags: Vec<String>,

    /// Per-component resource limits
    #[serde(default)]
    pub resource_limits: BTreeMap<String, ResourceLimit>,

    /// Limit applied to components absent from `resource_limits`
    #[serde(default)]
    pub default_resource_limits: ResourceLimit,

    /// Workload generator settings
    #[serde(default)]
    pub workload: WorkloadSettings,

    /// Timing parameters
    #[serde(default)]
    pub timing: TimingConfig,
}

impl ExperimentConfig {
    /// Create a minimal config for the given experiment name and namespace
    pub fn new(name: impl Into<String>, namespace: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            namespace: namespace.into(),
            infrastructure_namespaces: Vec::new(),
            prometheus_url: String::new(),
            release_name: String::new(),
            chart_path: PathBuf::new(),
            modified_files: Vec::new(),
            autoscaling: false,
            colocated_workload: false,
            tags: Vec::new(),
            resource_limits: BTreeMap::new(),
            default_resource_limits: ResourceLimit::default(),
            workload: WorkloadSettings::default(),
            timing: TimingConfig::default(),
        }
    }

    /// Resource limits for a component, falling back to the default limit
    pub fn limits_for(&self, component: &str) -> ResourceLimit {
        self.resource_limits
            .get(component)
            .copied()
            .unwrap_or(self.default_resource_limits)
    }

    /// All namespaces in sampling scope: the primary namespace followed by
    /// the infrastructure namespaces
    pub fn sampling_namespaces(&self) -> Vec<String> {
        std::iter::once(self.namespace.clone())
            .chain(self.infrastructure_namespaces.iter().cloned())
            .collect()
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.name.is_empty() {
            return Err(ConfigError::MissingField("name".into()));
        }
        if self.namespace.is_empty() {
            return Err(ConfigError::MissingField("namespace".into()));
        }
        if self.prometheus_url.is_empty() {
            return Err(ConfigError::MissingField("prometheus_url".into()));
        }
        if self.timing.timeout_duration == 0 {
            return Err(ConfigError::InvalidTiming(
                "timeout_duration must be at least 1 second".into(),
            ));
        }
        Ok(())
    }
}

/// Configuration validation errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// A required field is missing or empty
    #[error("Missing field: {0}")]
    MissingField(String),

    /// Invalid timing parameters
    #[error("Invalid timing: {0}")]
    InvalidTiming(String),
}

/// Resolve the machine's public network identity via an HTTP echo service,
/// preferring the configured fallback host when the lookup fails.
pub async fn resolve_public_ip(echo_url: &str, fallback: &str) -> String {
    let lookup = async {
        reqwest::get(echo_url).await?.text().await
    };
    match lookup.await {
        Ok(ip) if !ip.trim().is_empty() => ip.trim().to_string(),
        Ok(_) => fallback.to_string(),
        Err(e) => {
            tracing::warn!(error = %e, fallback, "public IP lookup failed, using fallback");
            fallback.to_string()
        }
    }
}
