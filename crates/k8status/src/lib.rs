//! Kubernetes cluster health report.
//!
//! Inspects the objects of a cluster in one pass, classifies each as
//! healthy, unhealthy or ignored, and condenses the result into summary
//! lines, optional detail tables and a process exit code naming the most
//! significant failure class.

pub mod cluster;
pub mod config;
pub mod diagnostics;
pub mod error;
pub mod health;
pub mod kubeconfig;
pub mod orchestrator;
pub mod render;
pub mod report;

pub use cluster::{Cluster, ClusterQuery, ExecTarget, KubeCluster, PodExec};
pub use config::{ColorMode, RenderOptions, StatusConfig};
pub use error::{Result, StatusError};
pub use health::{Check, NamespaceFilter, Verdict};
pub use orchestrator::{default_checks, run_checks};
pub use report::{AggregateReport, CheckOutcome, CheckReport, FailureClass};
