//! k8status CLI.
//!
//! Prints a one-page health report of a Kubernetes cluster and exits with
//! a code identifying the most significant kind of failure.

use std::process::ExitCode;

use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

mod commands;

use commands::run::RunCommand;

/// Kubernetes cluster health report.
#[derive(Parser)]
#[command(
    name = "k8status",
    version,
    about = "Kubernetes cluster health report",
    long_about = "Inspect nodes, storage, workloads and the Rook-Ceph and Cassandra\n\
                  subsystems of a cluster in one pass.\n\n\
                  Exit codes: 0 healthy, 1 a check could not run, 42-53 the\n\
                  first failing check in report order."
)]
#[command(propagate_version = true)]
struct Cli {
    /// Log filter for diagnostics on stderr.
    #[arg(long, global = true, env = "RUST_LOG", default_value = "warn")]
    log_level: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Inspect the cluster and print the report.
    Run(RunCommand),
}

#[tokio::main]
async fn main() -> Result<ExitCode> {
    let cli = Cli::parse();

    let filter = EnvFilter::try_new(&cli.log_level).unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    match cli.command {
        Commands::Run(cmd) => cmd.run().await,
    }
}
