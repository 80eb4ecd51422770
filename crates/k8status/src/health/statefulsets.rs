//! Statefulset replica state.

use async_trait::async_trait;
use k8s_openapi::api::apps::v1::StatefulSet;
use kube::ResourceExt;

use super::{count, text, Assessment, HealthCheck};
use crate::cluster::Cluster;
use crate::error::Result;
use crate::report::FailureClass;

/// Update strategy under which `currentReplicas` is not maintained.
///
/// See kubernetes/kubernetes#106055: with `OnDelete` the controller never
/// moves `currentReplicas` to the new revision, so it stays behind forever.
const ON_DELETE: &str = "OnDelete";

#[derive(Debug, Clone, Copy, Default)]
pub struct StatefulSetHealth;

struct Replicas {
    desired: i32,
    current_is_reliable: bool,
    replicas: i32,
    ready: i32,
    current: i32,
    updated: i32,
}

impl Replicas {
    fn of(item: &StatefulSet) -> Self {
        let spec = item.spec.as_ref();
        let status = item.status.as_ref();
        let strategy = spec
            .and_then(|s| s.update_strategy.as_ref())
            .and_then(|u| u.type_.as_deref());

        Self {
            desired: spec.and_then(|s| s.replicas).unwrap_or(1),
            current_is_reliable: strategy != Some(ON_DELETE),
            replicas: status.map_or(0, |s| s.replicas),
            ready: count(status.and_then(|s| s.ready_replicas)),
            current: count(status.and_then(|s| s.current_replicas)),
            updated: count(status.and_then(|s| s.updated_replicas)),
        }
    }

    fn settled(&self) -> bool {
        let base = [self.replicas, self.ready, self.updated]
            .iter()
            .all(|n| *n == self.desired);
        base && (!self.current_is_reliable || self.current == self.desired)
    }
}

#[async_trait]
impl HealthCheck for StatefulSetHealth {
    type Item = StatefulSet;

    fn name(&self) -> &'static str {
        "statefulsets"
    }

    fn noun(&self) -> &'static str {
        "statefulsets"
    }

    fn header(&self) -> &'static [&'static str] {
        &["Statefulset", "Namespace", "Replicas", "Ready", "Current", "Updated"]
    }

    async fn snapshot(&self, cluster: &dyn Cluster) -> Result<Vec<StatefulSet>> {
        cluster.stateful_sets().await
    }

    fn namespace<'a>(&self, item: &'a StatefulSet) -> Option<&'a str> {
        item.metadata.namespace.as_deref()
    }

    fn assess(&self, item: &StatefulSet) -> Assessment {
        if Replicas::of(item).settled() {
            Assessment::Healthy
        } else {
            Assessment::Failing(FailureClass::StatefulSet)
        }
    }

    fn row(&self, item: &StatefulSet, _failure: FailureClass) -> Vec<String> {
        let r = Replicas::of(item);
        vec![
            item.name_any(),
            text(self.namespace(item)),
            r.replicas.to_string(),
            r.ready.to_string(),
            r.current.to_string(),
            r.updated.to_string(),
        ]
    }
}
