//! Concurrent execution of all configured checks.

use std::sync::Arc;

use chrono::{DateTime, Local, Utc};
use futures::future::join_all;
use tracing::{debug, info, warn};

use crate::cluster::Cluster;
use crate::config::StatusConfig;
use crate::diagnostics::{DatabaseHealthCheck, StorageHealthCheck};
use crate::health::{
    Check, CronJobHealth, DaemonSetHealth, DeploymentHealth, JobHealth, NamespaceFilter,
    NamespaceHealth, NodeHealth, PodHealth, ResourceCheck, StatefulSetHealth, VolumeClaimHealth,
    VolumeHealth,
};
use crate::report::{AggregateReport, CheckOutcome};

/// Timestamp format of the first output line.
pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// The checks of a full run, in report order.
///
/// `now` is the instant cronjob schedules are projected against.
pub fn default_checks(config: &StatusConfig, now: DateTime<Utc>) -> Vec<Arc<dyn Check>> {
    let filter = NamespaceFilter::new(config.ignored_namespace_tokens.iter().cloned());

    vec![
        Arc::new(ResourceCheck::new(NodeHealth, filter.clone())),
        Arc::new(DatabaseHealthCheck::new(config.database.clone())),
        Arc::new(StorageHealthCheck::new(config.storage.clone())),
        Arc::new(ResourceCheck::new(VolumeHealth, filter.clone())),
        Arc::new(ResourceCheck::new(NamespaceHealth, filter.clone())),
        Arc::new(ResourceCheck::new(VolumeClaimHealth, filter.clone())),
        Arc::new(ResourceCheck::new(PodHealth, filter.clone())),
        Arc::new(ResourceCheck::new(JobHealth, filter.clone())),
        Arc::new(ResourceCheck::new(DeploymentHealth, filter.clone())),
        Arc::new(ResourceCheck::new(StatefulSetHealth, filter.clone())),
        Arc::new(ResourceCheck::new(DaemonSetHealth, filter.clone())),
        Arc::new(ResourceCheck::new(CronJobHealth::new(now), filter)),
    ]
}

/// Run every check on its own task and collect the outcomes.
///
/// All tasks are spawned before any is awaited. Outcomes keep the order of
/// `checks` regardless of completion order, and a task that fails or panics
/// only affects its own outcome.
pub async fn run_checks(cluster: Arc<dyn Cluster>, checks: Vec<Arc<dyn Check>>) -> AggregateReport {
    let generated_at = Local::now().format(TIMESTAMP_FORMAT).to_string();
    info!(checks = checks.len(), "Starting cluster inspection");

    let names: Vec<&'static str> = checks.iter().map(|check| check.name()).collect();
    let handles: Vec<_> = checks
        .into_iter()
        .map(|check| {
            let cluster = Arc::clone(&cluster);
            tokio::spawn(async move { check.run(cluster.as_ref()).await })
        })
        .collect();

    let outcomes = join_all(handles)
        .await
        .into_iter()
        .zip(names)
        .map(|(joined, name)| {
            let result = match joined {
                Ok(Ok(report)) => {
                    debug!(check = name, exit_code = report.exit_code(), "Check finished");
                    Ok(report)
                }
                Ok(Err(e)) => {
                    warn!(check = name, error = %e, "Check failed");
                    Err(e.to_string())
                }
                Err(e) => {
                    warn!(check = name, error = %e, "Check task aborted");
                    Err(format!("check task aborted: {e}"))
                }
            };
            CheckOutcome {
                name: name.to_string(),
                result,
            }
        })
        .collect();

    let report = AggregateReport::new(generated_at, outcomes);
    info!(exit_code = report.exit_code(), "Cluster inspection finished");
    report
}
