//! Daemonset scheduling state.

use async_trait::async_trait;
use k8s_openapi::api::apps::v1::DaemonSet;
use kube::ResourceExt;

use super::{count, text, Assessment, HealthCheck};
use crate::cluster::Cluster;
use crate::error::Result;
use crate::report::FailureClass;

#[derive(Debug, Clone, Copy, Default)]
pub struct DaemonSetHealth;

#[derive(Default)]
struct Scheduled {
    desired: i32,
    current: i32,
    ready: i32,
    updated: i32,
    available: i32,
}

impl Scheduled {
    fn of(item: &DaemonSet) -> Self {
        item.status
            .as_ref()
            .map(|s| Self {
                desired: s.desired_number_scheduled,
                current: s.current_number_scheduled,
                ready: s.number_ready,
                updated: count(s.updated_number_scheduled),
                available: count(s.number_available),
            })
            .unwrap_or_default()
    }
}

#[async_trait]
impl HealthCheck for DaemonSetHealth {
    type Item = DaemonSet;

    fn name(&self) -> &'static str {
        "daemonsets"
    }

    fn noun(&self) -> &'static str {
        "daemonsets"
    }

    fn header(&self) -> &'static [&'static str] {
        &["Daemonset", "Namespace", "Scheduled", "Current", "Ready", "Up-to-date", "Available"]
    }

    async fn snapshot(&self, cluster: &dyn Cluster) -> Result<Vec<DaemonSet>> {
        cluster.daemon_sets().await
    }

    fn namespace<'a>(&self, item: &'a DaemonSet) -> Option<&'a str> {
        item.metadata.namespace.as_deref()
    }

    fn assess(&self, item: &DaemonSet) -> Assessment {
        let s = Scheduled::of(item);
        if [s.current, s.ready, s.updated, s.available]
            .iter()
            .all(|n| *n == s.desired)
        {
            Assessment::Healthy
        } else {
            Assessment::Failing(FailureClass::DaemonSet)
        }
    }

    fn row(&self, item: &DaemonSet, _failure: FailureClass) -> Vec<String> {
        let s = Scheduled::of(item);
        vec![
            item.name_any(),
            text(self.namespace(item)),
            s.desired.to_string(),
            s.current.to_string(),
            s.ready.to_string(),
            s.updated.to_string(),
            s.available.to_string(),
        ]
    }
}
