//! Run command - inspect the cluster and print the report.

use std::io::Write;
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;

use anyhow::{Context, Result};
use chrono::Utc;
use clap::Args;
use tracing::info;

use k8status::config::{ColorMode, RenderOptions, StatusConfig};
use k8status::{default_checks, kubeconfig, render, run_checks, KubeCluster};

/// Inspect the cluster once.
#[derive(Args)]
pub struct RunCommand {
    /// Path to kubeconfig file.
    #[arg(long)]
    kubeconfig: Option<PathBuf>,

    /// Print a detail table for every check with offending items.
    #[arg(short, long, default_value = "false")]
    verbose: bool,

    /// When to color the output.
    #[arg(long, value_enum, default_value_t = ColorMode::Auto)]
    color: ColorMode,

    /// Output the report as JSON.
    #[arg(long, default_value = "false")]
    json: bool,
}

impl RunCommand {
    fn config(&self) -> StatusConfig {
        StatusConfig {
            kubeconfig: self.kubeconfig.clone(),
            render: RenderOptions {
                color: self.color.enabled(),
                verbose: self.verbose,
            },
            ..StatusConfig::default()
        }
    }

    /// Run the inspection and map the aggregate result to a process exit code.
    pub async fn run(&self) -> Result<ExitCode> {
        let config = self.config();
        colored::control::set_override(config.render.color);

        let client = kubeconfig::connect(config.kubeconfig.as_deref())
            .await
            .context("Failed to connect to the cluster")?;
        let cluster = Arc::new(KubeCluster::new(client));

        let checks = default_checks(&config, Utc::now());
        let report = run_checks(cluster, checks).await;
        let code = report.exit_code();

        let mut stdout = std::io::stdout().lock();
        if self.json {
            serde_json::to_writer_pretty(&mut stdout, &report)
                .context("Failed to serialize report")?;
            writeln!(stdout)?;
        } else {
            render::render(&report, config.render, &mut stdout)
                .context("Failed to write report")?;
        }

        info!(exit_code = code, "Report written");
        Ok(ExitCode::from(code))
    }
}
