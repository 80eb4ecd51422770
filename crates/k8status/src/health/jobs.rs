//! Job completion.

use async_trait::async_trait;
use k8s_openapi::api::batch::v1::Job;
use kube::ResourceExt;

use super::{count, text, Assessment, HealthCheck};
use crate::cluster::Cluster;
use crate::error::Result;
use crate::report::FailureClass;

/// A job is healthy while it still has active pods or once it reached its
/// declared completions.
#[derive(Debug, Clone, Copy, Default)]
pub struct JobHealth;

struct JobCounts {
    active: i32,
    completions: i32,
    succeeded: i32,
    failed: i32,
}

impl JobCounts {
    fn of(item: &Job) -> Self {
        let status = item.status.as_ref();
        Self {
            active: count(status.and_then(|s| s.active)),
            // The API server defaults completions to 1 for non-indexed jobs.
            completions: item.spec.as_ref().and_then(|s| s.completions).unwrap_or(1),
            succeeded: count(status.and_then(|s| s.succeeded)),
            failed: count(status.and_then(|s| s.failed)),
        }
    }
}

#[async_trait]
impl HealthCheck for JobHealth {
    type Item = Job;

    fn name(&self) -> &'static str {
        "jobs"
    }

    fn noun(&self) -> &'static str {
        "jobs"
    }

    fn header(&self) -> &'static [&'static str] {
        &["Job", "Namespace", "Active", "Completions", "Succeeded", "Failed"]
    }

    async fn snapshot(&self, cluster: &dyn Cluster) -> Result<Vec<Job>> {
        cluster.jobs().await
    }

    fn namespace<'a>(&self, item: &'a Job) -> Option<&'a str> {
        item.metadata.namespace.as_deref()
    }

    fn assess(&self, item: &Job) -> Assessment {
        let counts = JobCounts::of(item);
        if counts.active > 0 || counts.succeeded == counts.completions {
            Assessment::Healthy
        } else {
            Assessment::Failing(FailureClass::Job)
        }
    }

    fn row(&self, item: &Job, _failure: FailureClass) -> Vec<String> {
        let counts = JobCounts::of(item);
        vec![
            item.name_any(),
            text(self.namespace(item)),
            counts.active.to_string(),
            counts.completions.to_string(),
            counts.succeeded.to_string(),
            counts.failed.to_string(),
        ]
    }
}
