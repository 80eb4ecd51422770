//! Pod container readiness.

use async_trait::async_trait;
use k8s_openapi::api::core::v1::Pod;
use kube::ResourceExt;

use super::{text, Assessment, HealthCheck};
use crate::cluster::Cluster;
use crate::error::Result;
use crate::report::FailureClass;

/// A pod is healthy when every declared container reports ready.
///
/// Pods in phase `Succeeded` are finished one-shot workloads and are left
/// out of the total entirely.
#[derive(Debug, Clone, Copy, Default)]
pub struct PodHealth;

fn phase(item: &Pod) -> Option<&str> {
    item.status.as_ref().and_then(|s| s.phase.as_deref())
}

fn ready_containers(item: &Pod) -> usize {
    item.status
        .as_ref()
        .and_then(|s| s.container_statuses.as_ref())
        .map_or(0, |statuses| statuses.iter().filter(|c| c.ready).count())
}

fn declared_containers(item: &Pod) -> usize {
    item.spec.as_ref().map_or(0, |s| s.containers.len())
}

#[async_trait]
impl HealthCheck for PodHealth {
    type Item = Pod;

    fn name(&self) -> &'static str {
        "pods"
    }

    fn noun(&self) -> &'static str {
        "pods"
    }

    fn header(&self) -> &'static [&'static str] {
        &["Pod", "Namespace", "Phase", "Containers Ready", "Containers Expected"]
    }

    async fn snapshot(&self, cluster: &dyn Cluster) -> Result<Vec<Pod>> {
        cluster.pods().await
    }

    fn in_scope(&self, item: &Pod) -> bool {
        phase(item) != Some("Succeeded")
    }

    fn namespace<'a>(&self, item: &'a Pod) -> Option<&'a str> {
        item.metadata.namespace.as_deref()
    }

    fn assess(&self, item: &Pod) -> Assessment {
        if ready_containers(item) == declared_containers(item) {
            Assessment::Healthy
        } else {
            Assessment::Failing(FailureClass::Pod)
        }
    }

    fn row(&self, item: &Pod, _failure: FailureClass) -> Vec<String> {
        vec![
            item.name_any(),
            text(self.namespace(item)),
            text(phase(item)),
            ready_containers(item).to_string(),
            declared_containers(item).to_string(),
        ]
    }
}
