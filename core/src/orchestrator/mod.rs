//! Orchestrator for run lifecycle management
//!
//! The RunOrchestrator coordinates one timed benchmark run:
//! - Validating preconditions before any resource is created
//! - Wiring the two buffered sinks to the resource sampler
//! - Arming the deadline and invoking the workload runner
//! - Ordered teardown on both the success and the cancellation path
//!
//! # Example
//!
//! ```ignore
//! use scalebench_core::RunOrchestratorBuilder;
//!
//! let orchestrator = RunOrchestratorBuilder::new()
//!     .config(config)
//!     .source(source)
//!     .workload(workload)
//!     .build()?;
//!
//! let outcome = orchestrator.run(Path::new("data/default")).await?;
//! ```

mod builder;
mod executor;

pub use builder::RunOrchestratorBuilder;
pub use executor::{InterruptHandle, RunOrchestrator, RunOutcome};

#[cfg(test)]
mod tests;
