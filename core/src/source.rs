//! Metrics source abstraction and the Prometheus implementation

use std::collections::BTreeMap;

use async_trait::async_trait;
use chrono::Utc;
use serde::Deserialize;

use crate::error::{Error, Result};
use crate::record::{NodeUsage, PodUsage};

/// Source of current node- and pod-level usage
///
/// Implementations are polled by the `ResourceSampler`; a failed poll is
/// logged and skipped by the caller, so errors here never stop a run.
#[async_trait]
pub trait MetricsSource: Send + Sync {
    /// Current per-node usage
    async fn node_usage(&self) -> Result<Vec<NodeUsage>>;

    /// Current per-pod usage, restricted to the given namespaces
    async fn pod_usage(&self, namespaces: &[String]) -> Result<Vec<PodUsage>>;
}

/// `MetricsSource` backed by the Prometheus HTTP API (instant queries)
pub struct PrometheusSource {
    base_url: String,
    client: reqwest::Client,
}

#[derive(Debug, Deserialize)]
struct QueryResponse {
    status: String,
    #[serde(default)]
    data: QueryData,
}

#[derive(Debug, Default, Deserialize)]
struct QueryData {
    #[serde(default)]
    result: Vec<Sample>,
}

#[derive(Debug, Deserialize)]
struct Sample {
    metric: BTreeMap<String, String>,
    /// `[unix_timestamp, "value"]` pair as returned by the API
    value: (f64, String),
}

impl Sample {
    fn label(&self, name: &str) -> Option<&str> {
        self.metric.get(name).map(String::as_str)
    }

    fn parsed_value(&self) -> f64 {
        self.value.1.parse().unwrap_or(0.0)
    }
}

impl PrometheusSource {
    /// Create a source querying the given Prometheus base URL
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            client: reqwest::Client::new(),
        }
    }

    async fn query(&self, promql: &str) -> Result<Vec<Sample>> {
        let url = format!("{}/api/v1/query", self.base_url.trim_end_matches('/'));
        let response: QueryResponse = self
            .client
            .get(&url)
            .query(&[("query", promql)])
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;

        if response.status != "success" {
            return Err(Error::metrics(format!(
                "query {promql:?} returned status {}",
                response.status
            )));
        }
        Ok(response.data.result)
    }

    /// Join cpu and memory samples on a label key into `(cpu, memory)` pairs
    fn join_on(
        cpu: &[Sample],
        memory: &[Sample],
        key: impl Fn(&Sample) -> Option<String>,
    ) -> BTreeMap<String, (f64, f64)> {
        let mut joined: BTreeMap<String, (f64, f64)> = BTreeMap::new();
        for sample in cpu {
            if let Some(k) = key(sample) {
                joined.entry(k).or_default().0 = sample.parsed_value();
            }
        }
        for sample in memory {
            if let Some(k) = key(sample) {
                joined.entry(k).or_default().1 = sample.parsed_value();
            }
        }
        joined
    }
}

#[async_trait]
impl MetricsSource for PrometheusSource {
    async fn node_usage(&self) -> Result<Vec<NodeUsage>> {
        let cpu = self
            .query(r#"sum by (instance) (rate(node_cpu_seconds_total{mode!="idle"}[1m]))"#)
            .await?;
        let memory = self
            .query("node_memory_MemTotal_bytes - node_memory_MemAvailable_bytes")
            .await?;

        let timestamp = Utc::now();
        let joined = Self::join_on(&cpu, &memory, |s| {
            s.label("instance").map(str::to_string)
        });

        Ok(joined
            .into_iter()
            .map(|(node, (cpu, memory))| NodeUsage {
                timestamp,
                node,
                cpu,
                memory,
            })
            .collect())
    }

    async fn pod_usage(&self, namespaces: &[String]) -> Result<Vec<PodUsage>> {
        let scope = namespaces.join("|");
        let cpu = self
            .query(&format!(
                r#"sum by (namespace, pod) (rate(container_cpu_usage_seconds_total{{namespace=~"{scope}"}}[1m]))"#
            ))
            .await?;
        let memory = self
            .query(&format!(
                r#"sum by (namespace, pod) (container_memory_working_set_bytes{{namespace=~"{scope}"}})"#
            ))
            .await?;

        let timestamp = Utc::now();
        let joined = Self::join_on(&cpu, &memory, |s| {
            match (s.label("namespace"), s.label("pod")) {
                (Some(ns), Some(pod)) => Some(format!("{ns}/{pod}")),
                _ => None,
            }
        });

        Ok(joined
            .into_iter()
            .filter_map(|(key, (cpu, memory))| {
                let (namespace, pod) = key.split_once('/')?;
                Some(PodUsage {
                    timestamp,
                    namespace: namespace.to_string(),
                    pod: pod.to_string(),
                    cpu,
                    memory,
                })
            })
            .collect())
    }
}
