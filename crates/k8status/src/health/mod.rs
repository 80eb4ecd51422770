//! Health classification engine.
//!
//! Every resource kind implements [`HealthCheck`]: a pure predicate over one
//! item plus the table row describing it. [`ResourceCheck`] binds a
//! `HealthCheck` to the cluster snapshot of its kind and folds the items
//! into a [`CheckReport`] in a single pass. The two subsystem diagnostics
//! in [`crate::diagnostics`] implement [`Check`] directly.

pub mod claims;
pub mod cronjobs;
pub mod daemonsets;
pub mod deployments;
pub mod jobs;
pub mod namespaces;
pub mod nodes;
pub mod pods;
pub mod statefulsets;
pub mod volumes;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::cluster::Cluster;
use crate::error::Result;
use crate::report::{CheckReport, FailureClass};

pub use claims::VolumeClaimHealth;
pub use cronjobs::CronJobHealth;
pub use daemonsets::DaemonSetHealth;
pub use deployments::DeploymentHealth;
pub use jobs::JobHealth;
pub use namespaces::NamespaceHealth;
pub use nodes::NodeHealth;
pub use pods::PodHealth;
pub use statefulsets::StatefulSetHealth;
pub use volumes::VolumeHealth;

/// Classification of one inspected item.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Verdict {
    Healthy,
    /// Failing and counted toward the exit code.
    Unhealthy,
    /// Failing, but in a non-production namespace.
    Ignored,
}

/// What a [`HealthCheck`] predicate says about one item, before namespace
/// suppression is applied.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Assessment {
    Healthy,
    Failing(FailureClass),
}

/// Matches namespaces that carry a non-production token as a prefix
/// (`ci-x`), infix (`x-ci-y`) or suffix (`x-ci`) segment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NamespaceFilter {
    tokens: Vec<String>,
}

impl NamespaceFilter {
    pub fn new<I, S>(tokens: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            tokens: tokens.into_iter().map(Into::into).collect(),
        }
    }

    /// Check if `namespace` is a non-production namespace.
    #[must_use]
    pub fn matches(&self, namespace: &str) -> bool {
        self.tokens.iter().any(|token| {
            namespace.starts_with(&format!("{token}-"))
                || namespace.contains(&format!("-{token}-"))
                || namespace.ends_with(&format!("-{token}"))
        })
    }
}

impl Default for NamespaceFilter {
    fn default() -> Self {
        Self::new(["ci", "lab"])
    }
}

/// Health predicate and presentation for one resource kind.
#[async_trait]
pub trait HealthCheck: Send + Sync + 'static {
    type Item: Send + Sync + 'static;

    /// Check name used on error lines and table titles.
    fn name(&self) -> &'static str;

    /// Plural noun used in the summary line.
    fn noun(&self) -> &'static str;

    /// What a healthy item "is", e.g. `are bound`.
    fn predicate(&self) -> &'static str {
        "are healthy"
    }

    /// Whether items of this kind can live in a non-production namespace.
    fn suppressible(&self) -> bool {
        true
    }

    fn header(&self) -> &'static [&'static str];

    /// Fetch the snapshot of this kind.
    async fn snapshot(&self, cluster: &dyn Cluster) -> Result<Vec<Self::Item>>;

    /// Items outside the scope of the check are not counted at all.
    fn in_scope(&self, _item: &Self::Item) -> bool {
        true
    }

    /// Namespace matched against the non-production pattern.
    fn namespace<'a>(&self, item: &'a Self::Item) -> Option<&'a str>;

    fn assess(&self, item: &Self::Item) -> Assessment;

    /// Detail row for a failing item.
    fn row(&self, item: &Self::Item, failure: FailureClass) -> Vec<String>;
}

/// Verdict for one item together with its failure class, if any.
pub fn classify<H: HealthCheck>(
    check: &H,
    filter: &NamespaceFilter,
    item: &H::Item,
) -> (Verdict, Option<FailureClass>) {
    match check.assess(item) {
        Assessment::Healthy => (Verdict::Healthy, None),
        Assessment::Failing(class) => {
            let ignored = check.namespace(item).is_some_and(|ns| filter.matches(ns));
            if ignored {
                (Verdict::Ignored, Some(class))
            } else {
                (Verdict::Unhealthy, Some(class))
            }
        }
    }
}

/// Fold a snapshot into a report. Rows keep input order; the failure class
/// is the most significant one among unhealthy items, so it does not
/// depend on input order.
pub fn evaluate<H: HealthCheck>(check: &H, filter: &NamespaceFilter, items: &[H::Item]) -> CheckReport {
    let mut total = 0;
    let mut healthy = 0;
    let mut ignored = 0;
    let mut unhealthy = 0;
    let mut rows = Vec::new();
    let mut failure: Option<FailureClass> = None;

    for item in items.iter().filter(|item| check.in_scope(item)) {
        total += 1;

        let (verdict, class) = classify(check, filter, item);
        match verdict {
            Verdict::Healthy => healthy += 1,
            Verdict::Ignored => ignored += 1,
            Verdict::Unhealthy => {
                unhealthy += 1;
                failure = [failure, class].into_iter().flatten().min();
            }
        }

        if let Some(class) = class {
            rows.push(check.row(item, class));
        }
    }

    let mut summary = format!("{healthy} of {total} {} {}", check.noun(), check.predicate());
    if check.suppressible() {
        summary.push_str(&format!(" ({ignored} ignored)"));
    }
    summary.push('.');

    CheckReport {
        summary,
        header: check.header().iter().map(ToString::to_string).collect(),
        total,
        healthy,
        ignored,
        unhealthy,
        rows,
        failure,
    }
}

/// One unit of work for the orchestrator.
#[async_trait]
pub trait Check: Send + Sync {
    fn name(&self) -> &'static str;

    async fn run(&self, cluster: &dyn Cluster) -> Result<CheckReport>;
}

/// A [`HealthCheck`] bound to its cluster snapshot.
pub struct ResourceCheck<H> {
    health: H,
    filter: NamespaceFilter,
}

impl<H: HealthCheck> ResourceCheck<H> {
    pub fn new(health: H, filter: NamespaceFilter) -> Self {
        Self { health, filter }
    }
}

#[async_trait]
impl<H: HealthCheck> Check for ResourceCheck<H> {
    fn name(&self) -> &'static str {
        self.health.name()
    }

    async fn run(&self, cluster: &dyn Cluster) -> Result<CheckReport> {
        let items = self.health.snapshot(cluster).await?;
        let report = evaluate(&self.health, &self.filter, &items);

        debug!(
            check = self.health.name(),
            total = report.total,
            healthy = report.healthy,
            ignored = report.ignored,
            unhealthy = report.unhealthy,
            "Evaluated snapshot"
        );

        Ok(report)
    }
}

/// Shared helpers for the per-kind modules.
pub(crate) fn count(value: Option<i32>) -> i32 {
    value.unwrap_or_default()
}

pub(crate) fn text(value: Option<&str>) -> String {
    value.unwrap_or_default().to_string()
}
