//! Persistent volume phase.

use async_trait::async_trait;
use k8s_openapi::api::core::v1::PersistentVolume;
use kube::ResourceExt;

use super::{text, Assessment, HealthCheck};
use crate::cluster::Cluster;
use crate::error::Result;
use crate::report::FailureClass;

#[derive(Debug, Clone, Copy, Default)]
pub struct VolumeHealth;

fn phase(item: &PersistentVolume) -> Option<&str> {
    item.status.as_ref().and_then(|s| s.phase.as_deref())
}

#[async_trait]
impl HealthCheck for VolumeHealth {
    type Item = PersistentVolume;

    fn name(&self) -> &'static str {
        "volumes"
    }

    fn noun(&self) -> &'static str {
        "volumes"
    }

    fn predicate(&self) -> &'static str {
        "are bound or available"
    }

    fn header(&self) -> &'static [&'static str] {
        &["Volume", "Namespace", "Phase"]
    }

    async fn snapshot(&self, cluster: &dyn Cluster) -> Result<Vec<PersistentVolume>> {
        cluster.persistent_volumes().await
    }

    // Volumes are cluster-scoped; they belong to the namespace of their claim.
    fn namespace<'a>(&self, item: &'a PersistentVolume) -> Option<&'a str> {
        item.spec
            .as_ref()
            .and_then(|s| s.claim_ref.as_ref())
            .and_then(|c| c.namespace.as_deref())
    }

    fn assess(&self, item: &PersistentVolume) -> Assessment {
        match phase(item) {
            Some("Bound" | "Available") => Assessment::Healthy,
            _ => Assessment::Failing(FailureClass::Volume),
        }
    }

    fn row(&self, item: &PersistentVolume, _failure: FailureClass) -> Vec<String> {
        vec![item.name_any(), text(self.namespace(item)), text(phase(item))]
    }
}
