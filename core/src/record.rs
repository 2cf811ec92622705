//! Usage record types produced by the sampler
//!
//! Records are immutable once constructed. Their field set is fixed at
//! compile time and is used verbatim as the output table's column header.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A fixed-schema record a `BufferedSink` can durably write
pub trait Record: Send + 'static {
    /// Column names, written once as the table header
    fn fields() -> &'static [&'static str];

    /// One table row; must have the same arity as `fields()`
    fn row(&self) -> Vec<String>;
}

/// Node-level usage sample
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NodeUsage {
    /// Sample timestamp
    pub timestamp: DateTime<Utc>,
    /// Node identifier (instance label)
    pub node: String,
    /// CPU usage in cores
    pub cpu: f64,
    /// Memory usage in bytes
    pub memory: f64,
}

impl Record for NodeUsage {
    fn fields() -> &'static [&'static str] {
        &["timestamp", "node", "cpu", "memory"]
    }

    fn row(&self) -> Vec<String> {
        vec![
            self.timestamp.to_rfc3339(),
            self.node.clone(),
            self.cpu.to_string(),
            self.memory.to_string(),
        ]
    }
}

/// Pod-level usage sample
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PodUsage {
    /// Sample timestamp
    pub timestamp: DateTime<Utc>,
    /// Namespace the pod runs in
    pub namespace: String,
    /// Pod name
    pub pod: String,
    /// CPU usage in cores
    pub cpu: f64,
    /// Memory usage in bytes
    pub memory: f64,
}

impl Record for PodUsage {
    fn fields() -> &'static [&'static str] {
        &["timestamp", "namespace", "pod", "cpu", "memory"]
    }

    fn row(&self) -> Vec<String> {
        vec![
            self.timestamp.to_rfc3339(),
            self.namespace.clone(),
            self.pod.clone(),
            self.cpu.to_string(),
            self.memory.to_string(),
        ]
    }
}
