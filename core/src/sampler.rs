//! Background resource sampler
//!
//! Polls the metrics source on a fixed interval and appends one batch of
//! node records and one batch of pod records per tick into the two sinks.
//! The loop runs as an independent tokio task; a failed poll is logged and
//! skipped, never escalated.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;

use crate::record::{NodeUsage, PodUsage};
use crate::sink::BufferedSink;
use crate::source::MetricsSource;

/// Non-blocking stop handle for a running sampler
///
/// Cloneable so the cancellation path can request a stop without owning
/// the sampler; repeated stop requests are harmless.
#[derive(Clone)]
pub struct SamplerHandle {
    stop_tx: Arc<watch::Sender<bool>>,
}

impl SamplerHandle {
    /// Request the polling loop to stop. Safe to call more than once and
    /// after the loop has already exited.
    pub fn stop(&self) {
        let _ = self.stop_tx.send(true);
    }
}

/// Background periodic poller producing usage records
pub struct ResourceSampler {
    stop_tx: Arc<watch::Sender<bool>>,
    task: JoinHandle<()>,
}

impl ResourceSampler {
    /// Start the polling loop as a background task. Returns immediately;
    /// the loop runs until stopped.
    pub fn start(
        source: Arc<dyn MetricsSource>,
        node_sink: Arc<BufferedSink<NodeUsage>>,
        pod_sink: Arc<BufferedSink<PodUsage>>,
        namespaces: Vec<String>,
        interval: Duration,
    ) -> Self {
        let (stop_tx, mut stop_rx) = watch::channel(false);
        let stop_tx = Arc::new(stop_tx);

        let task = tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

            loop {
                tokio::select! {
                    biased;

                    changed = stop_rx.changed() => {
                        if changed.is_err() || *stop_rx.borrow() {
                            break;
                        }
                    }

                    _ = ticker.tick() => {
                        Self::sample_once(&*source, &node_sink, &pod_sink, &namespaces).await;
                    }
                }
            }
            tracing::debug!("sampler loop exited");
        });

        Self { stop_tx, task }
    }

    /// Non-blocking handle for stopping the sampler from another context
    pub fn handle(&self) -> SamplerHandle {
        SamplerHandle {
            stop_tx: Arc::clone(&self.stop_tx),
        }
    }

    /// Request a stop without waiting for the loop to exit
    pub fn stop(&self) {
        let _ = self.stop_tx.send(true);
    }

    /// Stop the loop and wait for the in-flight tick, if any, to finish
    pub async fn shutdown(self) {
        let _ = self.stop_tx.send(true);
        if let Err(e) = self.task.await {
            if !e.is_cancelled() {
                tracing::error!(error = %e, "sampler task failed");
            }
        }
    }

    async fn sample_once(
        source: &dyn MetricsSource,
        node_sink: &BufferedSink<NodeUsage>,
        pod_sink: &BufferedSink<PodUsage>,
        namespaces: &[String],
    ) {
        match source.node_usage().await {
            Ok(records) => {
                for record in records {
                    if let Err(e) = node_sink.append(record) {
                        tracing::warn!(error = %e, "failed to buffer node sample");
                    }
                }
            }
            Err(e) => tracing::warn!(error = %e, "node usage poll failed, skipping tick"),
        }

        match source.pod_usage(namespaces).await {
            Ok(records) => {
                for record in records {
                    if let Err(e) = pod_sink.append(record) {
                        tracing::warn!(error = %e, "failed to buffer pod sample");
                    }
                }
            }
            Err(e) => tracing::warn!(error = %e, "pod usage poll failed, skipping tick"),
        }
    }
}
