//! scalebench-core: Run-and-cancel orchestration for timed benchmark runs
//!
//! This crate coordinates one timed benchmark run against a deployed
//! service, providing:
//!
//! - Bounded buffered sinks with durable batch flushes
//! - Background resource sampling from a metrics source
//! - A one-shot, multi-trigger cancellation deadline
//! - Top-level run orchestration with ordered teardown
//! - Best-effort cleanup of auxiliary run resources

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod cleanup;
pub mod command;
pub mod config;
pub mod deadline;
pub mod descriptor;
pub mod error;
pub mod orchestrator;
pub mod record;
pub mod runner;
pub mod sampler;
pub mod sink;
pub mod source;

pub use cleanup::CleanupPhase;
pub use command::{CommandOutput, CommandRunner, ProcessRunner};
pub use config::{
    resolve_public_ip, ConfigError, ExperimentConfig, ResourceLimit, TimingConfig,
    WorkloadSettings,
};
pub use deadline::DeadlineController;
pub use descriptor::RunDescriptor;
pub use error::{Error, Result};
pub use orchestrator::{InterruptHandle, RunOrchestrator, RunOrchestratorBuilder, RunOutcome};
pub use record::{NodeUsage, PodUsage, Record};
pub use runner::{ProcessWorkloadRunner, WorkloadConfigurator, WorkloadRunner};
pub use sampler::{ResourceSampler, SamplerHandle};
pub use sink::BufferedSink;
pub use source::{MetricsSource, PrometheusSource};
