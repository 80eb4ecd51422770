//! Namespace phase.

use async_trait::async_trait;
use k8s_openapi::api::core::v1::Namespace;
use kube::ResourceExt;

use super::{text, Assessment, HealthCheck};
use crate::cluster::Cluster;
use crate::error::Result;
use crate::report::FailureClass;

#[derive(Debug, Clone, Copy, Default)]
pub struct NamespaceHealth;

fn phase(item: &Namespace) -> Option<&str> {
    item.status.as_ref().and_then(|s| s.phase.as_deref())
}

#[async_trait]
impl HealthCheck for NamespaceHealth {
    type Item = Namespace;

    fn name(&self) -> &'static str {
        "namespaces"
    }

    fn noun(&self) -> &'static str {
        "namespaces"
    }

    fn header(&self) -> &'static [&'static str] {
        &["Namespace", "Phase"]
    }

    async fn snapshot(&self, cluster: &dyn Cluster) -> Result<Vec<Namespace>> {
        cluster.namespaces().await
    }

    // A namespace is suppressed by its own name.
    fn namespace<'a>(&self, item: &'a Namespace) -> Option<&'a str> {
        item.metadata.name.as_deref()
    }

    fn assess(&self, item: &Namespace) -> Assessment {
        if phase(item) == Some("Active") {
            Assessment::Healthy
        } else {
            Assessment::Failing(FailureClass::Namespace)
        }
    }

    fn row(&self, item: &Namespace, _failure: FailureClass) -> Vec<String> {
        vec![item.name_any(), text(phase(item))]
    }
}
