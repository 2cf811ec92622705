//! CLI argument parsing and command dispatch

use clap::{Parser, Subcommand};

#[derive(Parser)]
#[command(name = "scalebench")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Run a timed benchmark experiment
    Run {
        /// Path to the experiment configuration file
        #[arg(short, long)]
        config: String,
        /// Directory to write measurements and the run descriptor into
        #[arg(short, long, default_value = "data/default")]
        out: String,
    },
    /// Tear down auxiliary run resources
    Cleanup {
        /// Path to the experiment configuration file
        #[arg(short, long)]
        config: String,
    },
    /// Validate an experiment configuration file
    Validate {
        /// Path to the experiment configuration file
        #[arg(short, long)]
        config: String,
    },
}
