//! Run descriptor snapshot
//!
//! An immutable snapshot of the run's configuration, serialized once at run
//! start so the collected measurements stay reproducible.

use std::collections::BTreeMap;
use std::fs::File;
use std::path::Path;

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::config::{ExperimentConfig, ResourceLimit, TimingConfig, WorkloadSettings};
use crate::error::Result;

/// Immutable snapshot of a run's configuration
#[derive(Debug, Clone, Serialize)]
pub struct RunDescriptor {
    /// Experiment name
    pub name: String,
    /// Wall-clock start of the run
    pub started_at: DateTime<Utc>,
    /// Primary namespace
    pub namespace: String,
    /// Auxiliary infrastructure namespaces
    pub infrastructure_namespaces: Vec<String>,
    /// Metrics source endpoint
    pub prometheus_url: String,
    /// Whether autoscaling artifacts were set up
    pub autoscaling: bool,
    /// Whether the load generator is colocated with the target
    pub colocated_workload: bool,
    /// Free-form tags
    pub tags: Vec<String>,
    /// Per-component resource limits
    pub resource_limits: BTreeMap<String, ResourceLimit>,
    /// Default limit for unlisted components
    pub default_resource_limits: ResourceLimit,
    /// Workload generator settings
    pub workload: WorkloadSettings,
    /// Timing parameters
    pub timing: TimingConfig,
}

impl RunDescriptor {
    /// Snapshot the configuration at run start
    pub fn snapshot(config: &ExperimentConfig, started_at: DateTime<Utc>) -> Self {
        Self {
            name: config.name.clone(),
            started_at,
            namespace: config.namespace.clone(),
            infrastructure_namespaces: config.infrastructure_namespaces.clone(),
            prometheus_url: config.prometheus_url.clone(),
            autoscaling: config.autoscaling,
            colocated_workload: config.colocated_workload,
            tags: config.tags.clone(),
            resource_limits: config.resource_limits.clone(),
            default_resource_limits: config.default_resource_limits,
            workload: config.workload.clone(),
            timing: config.timing.clone(),
        }
    }

    /// Persist the snapshot as pretty-printed JSON
    pub fn write_to(&self, path: &Path) -> Result<()> {
        let file = File::create(path)?;
        serde_json::to_writer_pretty(file, self)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_snapshot_copies_config() {
        let mut config = ExperimentConfig::new("baseline", "scalebench");
        config.prometheus_url = "http://prom:9090".into();
        config.tags = vec!["run-1".into()];
        config.autoscaling = true;

        let started_at = Utc::now();
        let descriptor = RunDescriptor::snapshot(&config, started_at);

        assert_eq!(descriptor.name, "baseline");
        assert_eq!(descriptor.started_at, started_at);
        assert!(descriptor.autoscaling);
        assert_eq!(descriptor.tags, vec!["run-1".to_string()]);
    }

    #[test]
    fn test_write_produces_json() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("experiment.json");
        let config = ExperimentConfig::new("baseline", "scalebench");

        RunDescriptor::snapshot(&config, Utc::now())
            .write_to(&path)
            .unwrap();

        let raw = std::fs::read_to_string(&path).unwrap();
        let value: serde_json::Value = serde_json::from_str(&raw).unwrap();
        assert_eq!(value["name"], "baseline");
        assert_eq!(value["timing"]["timeout_duration"], 3600);
    }
}
