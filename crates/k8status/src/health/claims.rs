//! Persistent volume claim phase.

use async_trait::async_trait;
use k8s_openapi::api::core::v1::PersistentVolumeClaim;
use kube::ResourceExt;

use super::{text, Assessment, HealthCheck};
use crate::cluster::Cluster;
use crate::error::Result;
use crate::report::FailureClass;

#[derive(Debug, Clone, Copy, Default)]
pub struct VolumeClaimHealth;

fn phase(item: &PersistentVolumeClaim) -> Option<&str> {
    item.status.as_ref().and_then(|s| s.phase.as_deref())
}

#[async_trait]
impl HealthCheck for VolumeClaimHealth {
    type Item = PersistentVolumeClaim;

    fn name(&self) -> &'static str {
        "volumeclaims"
    }

    fn noun(&self) -> &'static str {
        "volume claims"
    }

    fn predicate(&self) -> &'static str {
        "are bound"
    }

    fn header(&self) -> &'static [&'static str] {
        &["Volume Claim", "Namespace", "Phase"]
    }

    async fn snapshot(&self, cluster: &dyn Cluster) -> Result<Vec<PersistentVolumeClaim>> {
        cluster.persistent_volume_claims().await
    }

    fn namespace<'a>(&self, item: &'a PersistentVolumeClaim) -> Option<&'a str> {
        item.metadata.namespace.as_deref()
    }

    fn assess(&self, item: &PersistentVolumeClaim) -> Assessment {
        if phase(item) == Some("Bound") {
            Assessment::Healthy
        } else {
            Assessment::Failing(FailureClass::VolumeClaim)
        }
    }

    fn row(&self, item: &PersistentVolumeClaim, _failure: FailureClass) -> Vec<String> {
        vec![item.name_any(), text(self.namespace(item)), text(phase(item))]
    }
}
