//! Deployment rollout state.

use async_trait::async_trait;
use k8s_openapi::api::apps::v1::Deployment;
use kube::ResourceExt;

use super::{count, text, Assessment, HealthCheck};
use crate::cluster::Cluster;
use crate::error::Result;
use crate::report::FailureClass;

#[derive(Debug, Clone, Copy, Default)]
pub struct DeploymentHealth;

struct Replicas {
    desired: i32,
    current: i32,
    ready: i32,
    updated: i32,
    available: i32,
}

impl Replicas {
    fn of(item: &Deployment) -> Self {
        let status = item.status.as_ref();
        Self {
            desired: item.spec.as_ref().and_then(|s| s.replicas).unwrap_or(1),
            current: count(status.and_then(|s| s.replicas)),
            ready: count(status.and_then(|s| s.ready_replicas)),
            updated: count(status.and_then(|s| s.updated_replicas)),
            available: count(status.and_then(|s| s.available_replicas)),
        }
    }
}

#[async_trait]
impl HealthCheck for DeploymentHealth {
    type Item = Deployment;

    fn name(&self) -> &'static str {
        "deployments"
    }

    fn noun(&self) -> &'static str {
        "deployments"
    }

    fn header(&self) -> &'static [&'static str] {
        &["Deployment", "Namespace", "Replicas", "Available", "Up-to-date", "Ready"]
    }

    async fn snapshot(&self, cluster: &dyn Cluster) -> Result<Vec<Deployment>> {
        cluster.deployments().await
    }

    fn namespace<'a>(&self, item: &'a Deployment) -> Option<&'a str> {
        item.metadata.namespace.as_deref()
    }

    fn assess(&self, item: &Deployment) -> Assessment {
        let r = Replicas::of(item);
        if [r.current, r.ready, r.updated, r.available]
            .iter()
            .all(|n| *n == r.desired)
        {
            Assessment::Healthy
        } else {
            Assessment::Failing(FailureClass::Deployment)
        }
    }

    fn row(&self, item: &Deployment, _failure: FailureClass) -> Vec<String> {
        let r = Replicas::of(item);
        vec![
            item.name_any(),
            text(self.namespace(item)),
            r.current.to_string(),
            r.available.to_string(),
            r.updated.to_string(),
            r.ready.to_string(),
        ]
    }
}
