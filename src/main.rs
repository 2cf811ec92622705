//! scalebench - timed benchmark orchestration against a deployed service

use std::path::Path;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;

use scalebench_core::{
    CleanupPhase, ExperimentConfig, ProcessRunner, ProcessWorkloadRunner, PrometheusSource,
    RunOrchestratorBuilder, RunOutcome,
};

mod cli;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = cli::Cli::parse();

    let default_level = if cli.verbose {
        tracing::Level::DEBUG
    } else {
        tracing::Level::INFO
    };
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(default_level.into()),
        )
        .init();

    match cli.command {
        cli::Commands::Run { config, out } => run(&config, &out).await,
        cli::Commands::Cleanup { config } => cleanup(&config).await,
        cli::Commands::Validate { config } => validate(&config),
    }
}

fn load_config(path: &str) -> Result<ExperimentConfig> {
    let raw = std::fs::read_to_string(path)
        .with_context(|| format!("reading config file {path}"))?;
    serde_json::from_str(&raw).with_context(|| format!("parsing config file {path}"))
}

async fn run(config_path: &str, out_dir: &str) -> Result<()> {
    let config = load_config(config_path)?;
    let source = Arc::new(PrometheusSource::new(config.prometheus_url.clone()));
    let workload = Arc::new(ProcessWorkloadRunner::new(config.workload.clone()));

    let orchestrator = RunOrchestratorBuilder::new()
        .config(config)
        .source(source)
        .workload(workload)
        .build()?;

    // Route Ctrl-C into the orchestrator's explicit interrupt handle; the
    // deadline controller guarantees the cancellation runs at most once.
    let interrupt = orchestrator.interrupt_handle();
    let signal_task = tokio::spawn(async move {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "failed to listen for Ctrl-C");
            return;
        }
        tracing::info!("received Ctrl-C, cancelling run");
        interrupt.interrupt();
    });

    let outcome = orchestrator.run(Path::new(out_dir)).await?;
    signal_task.abort();

    match outcome {
        RunOutcome::Completed => tracing::info!("run completed"),
        RunOutcome::Cancelled => tracing::warn!("run cancelled, telemetry flushed"),
    }
    Ok(())
}

async fn cleanup(config_path: &str) -> Result<()> {
    let config = load_config(config_path)?;
    CleanupPhase::new(config, Arc::new(ProcessRunner)).run().await;
    Ok(())
}

fn validate(config_path: &str) -> Result<()> {
    let config = load_config(config_path)?;
    config.validate()?;
    tracing::info!(experiment = %config.name, "configuration is valid");
    Ok(())
}
