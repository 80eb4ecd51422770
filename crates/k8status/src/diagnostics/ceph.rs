//! Rook-Ceph storage cluster health via the toolbox pod.

use std::collections::BTreeMap;

use async_trait::async_trait;
use kube::ResourceExt;
use serde::Deserialize;
use tracing::{debug, info};

use crate::cluster::{Cluster, ExecTarget};
use crate::config::StorageConfig;
use crate::error::{Result, StatusError};
use crate::health::Check;
use crate::report::{CheckReport, FailureClass};

/// Subset of `ceph status --format json`.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct CephStatus {
    pub health: CephHealth,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct CephHealth {
    pub status: String,
    /// Keyed by check name, e.g. `OSD_DOWN`.
    #[serde(default)]
    pub checks: BTreeMap<String, CephHealthCheck>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct CephHealthCheck {
    #[serde(default)]
    pub severity: String,
    #[serde(default)]
    pub summary: CephSummary,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct CephSummary {
    #[serde(default)]
    pub message: String,
}

impl CephStatus {
    pub fn parse(output: &str) -> Result<Self> {
        Ok(serde_json::from_str(output)?)
    }

    /// Turn the parsed status into a single-item report.
    #[must_use]
    pub fn into_report(self, healthy_status: &str) -> CheckReport {
        let header = ["Check", "Severity", "Message"].map(String::from).to_vec();
        let rows = self
            .health
            .checks
            .into_iter()
            .map(|(name, check)| vec![name, check.severity, check.summary.message])
            .collect();

        if self.health.status == healthy_status {
            CheckReport {
                summary: "Ceph is healthy.".to_string(),
                header,
                total: 1,
                healthy: 1,
                ignored: 0,
                unhealthy: 0,
                rows,
                failure: None,
            }
        } else {
            CheckReport {
                summary: format!("Ceph is unhealthy ({}).", self.health.status),
                header,
                total: 1,
                healthy: 0,
                ignored: 0,
                unhealthy: 1,
                rows,
                failure: Some(FailureClass::Storage),
            }
        }
    }
}

/// Queries the Rook-Ceph toolbox for overall cluster health.
pub struct StorageHealthCheck {
    config: StorageConfig,
}

impl StorageHealthCheck {
    #[must_use]
    pub fn new(config: StorageConfig) -> Self {
        Self { config }
    }
}

#[async_trait]
impl Check for StorageHealthCheck {
    fn name(&self) -> &'static str {
        "rook-ceph"
    }

    async fn run(&self, cluster: &dyn Cluster) -> Result<CheckReport> {
        let namespace = self.config.namespace.as_str();
        if !cluster.namespace_exists(namespace).await? {
            info!(namespace, "Storage namespace not present, skipping");
            return Ok(CheckReport::not_applicable("Rook-Ceph was not found."));
        }

        let pods = cluster
            .labelled_pods(namespace, &self.config.tools_selector)
            .await?;
        let tools = pods.first().ok_or_else(|| StatusError::PodNotFound {
            namespace: namespace.to_string(),
            selector: self.config.tools_selector.clone(),
        })?;
        let pod = tools.name_any();

        debug!(namespace, pod = %pod, "Querying ceph status");
        let output = cluster
            .exec(
                ExecTarget {
                    namespace,
                    pod: &pod,
                    container: None,
                },
                &self.config.status_command,
            )
            .await?;

        Ok(CephStatus::parse(&output)?.into_report(&self.config.healthy_status))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const WARN: &str = r#"{
        "fsid": "f0c3c6a2",
        "health": {
            "status": "HEALTH_WARN",
            "checks": {
                "POOL_NO_REDUNDANCY": {
                    "severity": "HEALTH_WARN",
                    "summary": {"message": "1 pool(s) have no replicas configured", "count": 1},
                    "muted": false
                },
                "OSD_DOWN": {
                    "severity": "HEALTH_WARN",
                    "summary": {"message": "1 osds down", "count": 1},
                    "muted": false
                }
            },
            "mutes": []
        }
    }"#;

    #[test]
    fn test_healthy_cluster() {
        let status = CephStatus::parse(r#"{"health":{"status":"HEALTH_OK","checks":{}}}"#).unwrap();
        let report = status.into_report("HEALTH_OK");

        assert_eq!(report.summary, "Ceph is healthy.");
        assert_eq!(report.total, 1);
        assert_eq!(report.healthy, 1);
        assert_eq!(report.exit_code(), 0);
        assert!(report.rows.is_empty());
    }

    #[test]
    fn test_warning_lists_checks_by_name() {
        let report = CephStatus::parse(WARN).unwrap().into_report("HEALTH_OK");

        assert_eq!(report.summary, "Ceph is unhealthy (HEALTH_WARN).");
        assert_eq!(report.exit_code(), 47);
        assert_eq!(report.rows.len(), 2);
        assert_eq!(report.rows[0], vec!["OSD_DOWN", "HEALTH_WARN", "1 osds down"]);
        assert_eq!(report.rows[1][0], "POOL_NO_REDUNDANCY");
    }

    #[test]
    fn test_missing_checks_field() {
        let status = CephStatus::parse(r#"{"health":{"status":"HEALTH_ERR"}}"#).unwrap();
        assert!(status.health.checks.is_empty());
        assert_eq!(status.into_report("HEALTH_OK").unhealthy, 1);
    }

    #[test]
    fn test_garbage_output_is_an_error() {
        let err = CephStatus::parse("error: connection timed out").unwrap_err();
        assert!(matches!(err, StatusError::Payload(_)));
    }
}
