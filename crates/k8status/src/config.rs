//! Run configuration.
//!
//! Everything a run needs is collected into one [`StatusConfig`] value at
//! startup and passed by reference to the orchestrator and renderer.

use std::io::IsTerminal;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/// When to emit ANSI colors.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum ColorMode {
    /// Color when stdout is a terminal and `NO_COLOR` is unset.
    #[default]
    Auto,
    /// Always color.
    Always,
    /// Never color.
    Never,
}

impl ColorMode {
    /// Resolve the mode against the current process environment.
    #[must_use]
    pub fn enabled(self) -> bool {
        match self {
            Self::Always => true,
            Self::Never => false,
            Self::Auto => std::env::var_os("NO_COLOR").is_none() && std::io::stdout().is_terminal(),
        }
    }
}

impl std::fmt::Display for ColorMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Auto => write!(f, "auto"),
            Self::Always => write!(f, "always"),
            Self::Never => write!(f, "never"),
        }
    }
}

/// Immutable rendering settings handed to the reporter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct RenderOptions {
    /// Emit ANSI colors.
    pub color: bool,
    /// Print the detail table of every check with offending items.
    pub verbose: bool,
}

/// Where the Rook-Ceph toolbox lives and how to query it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StorageConfig {
    pub namespace: String,
    pub tools_selector: String,
    pub status_command: String,
    /// Health status reported by a fully healthy cluster.
    pub healthy_status: String,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            namespace: "rook-ceph".to_string(),
            tools_selector: "app=rook-ceph-tools".to_string(),
            status_command: "ceph status --format json".to_string(),
            healthy_status: "HEALTH_OK".to_string(),
        }
    }
}

/// Where the Cassandra ring lives and which credentials unlock `nodetool`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DatabaseConfig {
    pub namespace: String,
    pub superuser_secret: String,
    pub pod: String,
    pub container: String,
    pub host: String,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            namespace: "cassandra".to_string(),
            superuser_secret: "k8ssandra-superuser".to_string(),
            pod: "k8ssandra-dc1-default-sts-0".to_string(),
            container: "cassandra".to_string(),
            host: "::FFFF:127.0.0.1".to_string(),
        }
    }
}

/// Full configuration of one inspection run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusConfig {
    /// Explicit kubeconfig; `None` falls back to in-cluster or default discovery.
    pub kubeconfig: Option<PathBuf>,
    pub render: RenderOptions,
    /// Tokens marking non-production namespaces (`ci-x`, `x-ci-y`, `x-ci`).
    pub ignored_namespace_tokens: Vec<String>,
    pub storage: StorageConfig,
    pub database: DatabaseConfig,
}

impl Default for StatusConfig {
    fn default() -> Self {
        Self {
            kubeconfig: None,
            render: RenderOptions::default(),
            ignored_namespace_tokens: vec!["ci".to_string(), "lab".to_string()],
            storage: StorageConfig::default(),
            database: DatabaseConfig::default(),
        }
    }
}
