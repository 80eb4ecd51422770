//! Cluster connection discovery.
//!
//! Resolution order: an explicit `--kubeconfig`, then the in-cluster
//! service account when running inside a pod, then the first entry of
//! `$KUBECONFIG`, then `~/.kube/config`.

use std::ffi::OsStr;
use std::path::{Path, PathBuf};

use kube::config::{KubeConfigOptions, Kubeconfig};
use kube::{Client, Config};
use tracing::info;

use crate::error::{Result, StatusError};

/// Token mounted into every pod with a service account.
pub const SERVICE_ACCOUNT_TOKEN: &str = "/var/run/secrets/kubernetes.io/serviceaccount/token";

/// Where the client configuration comes from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigSource {
    File(PathBuf),
    InCluster,
}

/// Get the default kubeconfig path (~/.kube/config).
#[must_use]
pub fn default_kubeconfig_path() -> Option<PathBuf> {
    dirs::home_dir().map(|h| h.join(".kube").join("config"))
}

/// Pick the configuration source from the given environment facts.
pub fn resolve_source(
    explicit: Option<&Path>,
    kubeconfig_env: Option<&OsStr>,
    in_cluster: bool,
    home_config: Option<PathBuf>,
) -> Result<ConfigSource> {
    if let Some(path) = explicit {
        return Ok(ConfigSource::File(path.to_path_buf()));
    }
    if in_cluster {
        return Ok(ConfigSource::InCluster);
    }

    kubeconfig_env
        .and_then(|value| std::env::split_paths(value).find(|p| !p.as_os_str().is_empty()))
        .or(home_config)
        .map(ConfigSource::File)
        .ok_or_else(|| {
            StatusError::ClientConfig("no kubeconfig found and home directory is unknown".to_string())
        })
}

/// Build a client for the cluster selected by [`resolve_source`].
pub async fn connect(explicit: Option<&Path>) -> Result<Client> {
    let source = resolve_source(
        explicit,
        std::env::var_os("KUBECONFIG").as_deref(),
        Path::new(SERVICE_ACCOUNT_TOKEN).exists(),
        default_kubeconfig_path(),
    )?;

    let config = match &source {
        ConfigSource::InCluster => {
            info!("Using in-cluster service account");
            Config::incluster().map_err(|e| StatusError::ClientConfig(e.to_string()))?
        }
        ConfigSource::File(path) => {
            info!(path = %path.display(), "Using kubeconfig");
            let kubeconfig = Kubeconfig::read_from(path).map_err(|e| {
                StatusError::ClientConfig(format!("reading {}: {e}", path.display()))
            })?;
            Config::from_custom_kubeconfig(kubeconfig, &KubeConfigOptions::default())
                .await
                .map_err(|e| StatusError::ClientConfig(e.to_string()))?
        }
    };

    Client::try_from(config).map_err(|e| StatusError::ClientConfig(e.to_string()))
}
