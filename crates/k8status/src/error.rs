//! Error types for cluster inspection.

use thiserror::Error;

/// Errors that stop a single check from producing a report.
///
/// These are execution failures, not unhealthy verdicts: a check that
/// returns one of these is reported on an `error:` line and forces a
/// non-zero exit code without cancelling any sibling check.
#[derive(Debug, Error)]
pub enum StatusError {
    /// Kubernetes API request failed
    #[error("Kubernetes API request failed: {0}")]
    Kube(#[from] kube::Error),

    /// Client configuration could not be loaded
    #[error("Failed to load cluster configuration: {0}")]
    ClientConfig(String),

    /// Remote command inside a pod failed
    #[error("Remote command in {namespace}/{pod} failed: {message}")]
    Exec {
        namespace: String,
        pod: String,
        message: String,
    },

    /// No pod matched the selector used to find a diagnostic tool
    #[error("No pod labelled {selector} found in namespace {namespace}")]
    PodNotFound { namespace: String, selector: String },

    /// A secret exists but lacks a required key
    #[error("Secret {namespace}/{name} has no key {key}")]
    MissingSecretKey {
        namespace: String,
        name: String,
        key: String,
    },

    /// Diagnostic output could not be decoded
    #[error("Invalid diagnostic payload: {0}")]
    Payload(#[from] serde_json::Error),

    /// `nodetool status` printed no ring member lines
    #[error("nodetool status reported no ring members")]
    EmptyRing,
}

pub type Result<T, E = StatusError> = std::result::Result<T, E>;
