//! Read-only access to the cluster.
//!
//! Checks never talk to the API server directly. They go through
//! [`ClusterQuery`] for object snapshots and [`PodExec`] for remote
//! commands, so the classification engine can be driven by in-memory
//! fakes in tests.

use std::collections::BTreeMap;
use std::fmt::Debug;

use async_trait::async_trait;
use k8s_openapi::api::apps::v1::{DaemonSet, Deployment, StatefulSet};
use k8s_openapi::api::batch::v1::{CronJob, Job};
use k8s_openapi::api::core::v1::{
    Namespace, Node, PersistentVolume, PersistentVolumeClaim, Pod, Secret,
};
use kube::api::{AttachParams, ListParams};
use kube::{Api, Client};
use serde::de::DeserializeOwned;
use tokio::io::AsyncReadExt;
use tracing::debug;

use crate::error::{Result, StatusError};

/// Snapshot queries against the control plane.
#[async_trait]
pub trait ClusterQuery: Send + Sync {
    async fn nodes(&self) -> Result<Vec<Node>>;
    async fn namespaces(&self) -> Result<Vec<Namespace>>;
    async fn persistent_volumes(&self) -> Result<Vec<PersistentVolume>>;
    async fn persistent_volume_claims(&self) -> Result<Vec<PersistentVolumeClaim>>;
    async fn pods(&self) -> Result<Vec<Pod>>;
    async fn jobs(&self) -> Result<Vec<Job>>;
    async fn cron_jobs(&self) -> Result<Vec<CronJob>>;
    async fn deployments(&self) -> Result<Vec<Deployment>>;
    async fn daemon_sets(&self) -> Result<Vec<DaemonSet>>;
    async fn stateful_sets(&self) -> Result<Vec<StatefulSet>>;

    /// Pods in `namespace` matching a label selector such as `app=foo`.
    async fn labelled_pods(&self, namespace: &str, selector: &str) -> Result<Vec<Pod>>;

    /// `Ok(false)` only when the API reports the namespace as not found.
    async fn namespace_exists(&self, name: &str) -> Result<bool>;

    /// Decoded string values of a secret.
    async fn secret_data(&self, namespace: &str, name: &str) -> Result<BTreeMap<String, String>>;
}

/// The container a remote command runs in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExecTarget<'a> {
    pub namespace: &'a str,
    pub pod: &'a str,
    /// `None` uses the pod's default container.
    pub container: Option<&'a str>,
}

/// Remote command execution inside a running pod.
#[async_trait]
pub trait PodExec: Send + Sync {
    /// Run `command` through `/bin/sh -c` and return everything written to stdout.
    async fn exec(&self, target: ExecTarget<'_>, command: &str) -> Result<String>;
}

/// Everything a check may ask of the cluster.
pub trait Cluster: ClusterQuery + PodExec {}

impl<T: ClusterQuery + PodExec> Cluster for T {}

/// [`Cluster`] backed by a live `kube` client.
#[derive(Clone)]
pub struct KubeCluster {
    client: Client,
}

impl KubeCluster {
    #[must_use]
    pub fn new(client: Client) -> Self {
        Self { client }
    }

    async fn list_all<K>(&self) -> Result<Vec<K>>
    where
        K: kube::Resource + Clone + DeserializeOwned + Debug,
        K::DynamicType: Default,
    {
        let api: Api<K> = Api::all(self.client.clone());
        let list = api.list(&ListParams::default()).await?;
        debug!(
            kind = %K::kind(&K::DynamicType::default()),
            count = list.items.len(),
            "Listed resources"
        );
        Ok(list.items)
    }
}

#[async_trait]
impl ClusterQuery for KubeCluster {
    async fn nodes(&self) -> Result<Vec<Node>> {
        self.list_all().await
    }

    async fn namespaces(&self) -> Result<Vec<Namespace>> {
        self.list_all().await
    }

    async fn persistent_volumes(&self) -> Result<Vec<PersistentVolume>> {
        self.list_all().await
    }

    async fn persistent_volume_claims(&self) -> Result<Vec<PersistentVolumeClaim>> {
        self.list_all().await
    }

    async fn pods(&self) -> Result<Vec<Pod>> {
        self.list_all().await
    }

    async fn jobs(&self) -> Result<Vec<Job>> {
        self.list_all().await
    }

    async fn cron_jobs(&self) -> Result<Vec<CronJob>> {
        self.list_all().await
    }

    async fn deployments(&self) -> Result<Vec<Deployment>> {
        self.list_all().await
    }

    async fn daemon_sets(&self) -> Result<Vec<DaemonSet>> {
        self.list_all().await
    }

    async fn stateful_sets(&self) -> Result<Vec<StatefulSet>> {
        self.list_all().await
    }

    async fn labelled_pods(&self, namespace: &str, selector: &str) -> Result<Vec<Pod>> {
        let pods: Api<Pod> = Api::namespaced(self.client.clone(), namespace);
        let list = pods.list(&ListParams::default().labels(selector)).await?;
        Ok(list.items)
    }

    async fn namespace_exists(&self, name: &str) -> Result<bool> {
        let namespaces: Api<Namespace> = Api::all(self.client.clone());
        Ok(namespaces.get_opt(name).await?.is_some())
    }

    async fn secret_data(&self, namespace: &str, name: &str) -> Result<BTreeMap<String, String>> {
        let secrets: Api<Secret> = Api::namespaced(self.client.clone(), namespace);
        let secret = secrets.get(name).await?;

        Ok(secret
            .data
            .unwrap_or_default()
            .into_iter()
            .map(|(key, value)| (key, String::from_utf8_lossy(&value.0).into_owned()))
            .collect())
    }
}

#[async_trait]
impl PodExec for KubeCluster {
    async fn exec(&self, target: ExecTarget<'_>, command: &str) -> Result<String> {
        let exec_error = |message: String| StatusError::Exec {
            namespace: target.namespace.to_string(),
            pod: target.pod.to_string(),
            message,
        };

        let pods: Api<Pod> = Api::namespaced(self.client.clone(), target.namespace);
        let mut params = AttachParams::default().stderr(false);
        if let Some(container) = target.container {
            params = params.container(container);
        }

        let mut attached = pods
            .exec(target.pod, ["/bin/sh", "-c", command], &params)
            .await?;

        let status = attached.take_status();

        let mut output = String::new();
        {
            let mut stdout = attached
                .stdout()
                .ok_or_else(|| exec_error("stdout stream not attached".to_string()))?;
            stdout
                .read_to_string(&mut output)
                .await
                .map_err(|e| exec_error(format!("reading stdout: {e}")))?;
        }

        if let Some(status) = status {
            if let Some(status) = status.await {
                if status.status.as_deref() == Some("Failure") {
                    return Err(exec_error(
                        status.message.unwrap_or_else(|| "non-zero exit".to_string()),
                    ));
                }
            }
        }

        attached
            .join()
            .await
            .map_err(|e| exec_error(e.to_string()))?;

        debug!(
            namespace = target.namespace,
            pod = target.pod,
            bytes = output.len(),
            "Remote command finished"
        );

        Ok(output)
    }
}
