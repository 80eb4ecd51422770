//! Per-check and aggregate report types.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Exit code used when a check failed to execute and no check reported a
/// more specific failure class.
pub const EXECUTION_ERROR_EXIT_CODE: u8 = 1;

/// Failure class of an offending item. Each class maps to one process exit code.
///
/// Variants are declared in precedence order inside a single check: when a
/// report holds several classes, the first declared wins.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum FailureClass {
    Volume,
    Namespace,
    VolumeClaim,
    Node,
    Pod,
    Database,
    Storage,
    Deployment,
    Job,
    StatefulSet,
    DaemonSet,
    CronJobNeverSucceeded,
    CronJobMissedSchedules,
    CronJobInvalidSchedule,
}

impl FailureClass {
    /// Process exit code signalling this class.
    #[must_use]
    pub fn exit_code(self) -> u8 {
        match self {
            Self::Volume => 42,
            Self::Namespace | Self::VolumeClaim => 43,
            Self::Node | Self::Pod => 45,
            Self::Database => 46,
            Self::Storage => 47,
            Self::Deployment => 48,
            Self::Job => 49,
            Self::StatefulSet => 50,
            Self::DaemonSet => 51,
            Self::CronJobNeverSucceeded => 52,
            Self::CronJobMissedSchedules | Self::CronJobInvalidSchedule => 53,
        }
    }
}

impl fmt::Display for FailureClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Volume => write!(f, "volume not bound or available"),
            Self::Namespace => write!(f, "namespace not active"),
            Self::VolumeClaim => write!(f, "volume claim not bound"),
            Self::Node => write!(f, "node not ready or cordoned"),
            Self::Pod => write!(f, "pod containers not ready"),
            Self::Database => write!(f, "database node down"),
            Self::Storage => write!(f, "storage cluster unhealthy"),
            Self::Deployment => write!(f, "deployment replicas not ready"),
            Self::Job => write!(f, "job not completed"),
            Self::StatefulSet => write!(f, "statefulset replicas not ready"),
            Self::DaemonSet => write!(f, "daemonset pods not ready"),
            Self::CronJobNeverSucceeded => write!(f, "Never successful"),
            Self::CronJobMissedSchedules => write!(f, "Too many missed start times (> 100)"),
            Self::CronJobInvalidSchedule => write!(f, "Invalid schedule"),
        }
    }
}

/// Outcome of inspecting one resource kind.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CheckReport {
    /// One-line human summary, e.g. `2 of 3 Nodes are up and healthy.`
    pub summary: String,
    /// Column names of the detail table.
    pub header: Vec<String>,
    /// Items considered.
    pub total: usize,
    pub healthy: usize,
    /// Failing items in non-production namespaces.
    pub ignored: usize,
    /// Failing items that count toward the exit code.
    pub unhealthy: usize,
    /// One row per non-healthy item, ignored or not, in input order.
    pub rows: Vec<Vec<String>>,
    /// Most significant failure class among unhealthy items.
    pub failure: Option<FailureClass>,
}

impl CheckReport {
    /// Report for an optional subsystem that is not deployed.
    #[must_use]
    pub fn not_applicable(summary: impl Into<String>) -> Self {
        Self {
            summary: summary.into(),
            header: Vec::new(),
            total: 0,
            healthy: 0,
            ignored: 0,
            unhealthy: 0,
            rows: Vec::new(),
            failure: None,
        }
    }

    /// `0` when no unhealthy item was found.
    #[must_use]
    pub fn exit_code(&self) -> u8 {
        self.failure.map_or(0, FailureClass::exit_code)
    }

    #[must_use]
    pub fn is_healthy(&self) -> bool {
        self.failure.is_none()
    }
}

/// Result of one check as seen by the orchestrator.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CheckOutcome {
    pub name: String,
    /// Execution errors are kept as their display text.
    pub result: Result<CheckReport, String>,
}

impl CheckOutcome {
    #[must_use]
    pub fn report(&self) -> Option<&CheckReport> {
        self.result.as_ref().ok()
    }

    #[must_use]
    pub fn error(&self) -> Option<&str> {
        self.result.as_ref().err().map(String::as_str)
    }
}

/// All check outcomes of a run, in configuration order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AggregateReport {
    /// Local time the run started, `%Y-%m-%d %H:%M:%S`.
    pub generated_at: String,
    pub outcomes: Vec<CheckOutcome>,
}

impl AggregateReport {
    #[must_use]
    pub fn new(generated_at: impl Into<String>, outcomes: Vec<CheckOutcome>) -> Self {
        Self {
            generated_at: generated_at.into(),
            outcomes,
        }
    }

    /// Exit code of the first report (in configuration order) with a
    /// failure; otherwise [`EXECUTION_ERROR_EXIT_CODE`] if any check
    /// errored; otherwise `0`.
    #[must_use]
    pub fn exit_code(&self) -> u8 {
        let first_failure = self
            .outcomes
            .iter()
            .filter_map(CheckOutcome::report)
            .map(CheckReport::exit_code)
            .find(|code| *code != 0);

        match first_failure {
            Some(code) => code,
            None if self.outcomes.iter().any(|o| o.error().is_some()) => {
                EXECUTION_ERROR_EXIT_CODE
            }
            None => 0,
        }
    }

    /// Checks that failed to execute, in configuration order.
    pub fn errors(&self) -> impl Iterator<Item = (&str, &str)> {
        self.outcomes
            .iter()
            .filter_map(|o| o.error().map(|e| (o.name.as_str(), e)))
    }

    /// Check if every check ran and found nothing unhealthy.
    #[must_use]
    pub fn all_passed(&self) -> bool {
        self.exit_code() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn report(failure: Option<FailureClass>) -> CheckReport {
        CheckReport {
            failure,
            unhealthy: usize::from(failure.is_some()),
            ..CheckReport::not_applicable("summary")
        }
    }

    fn outcome(name: &str, result: Result<CheckReport, String>) -> CheckOutcome {
        CheckOutcome {
            name: name.to_string(),
            result,
        }
    }

    #[test]
    fn test_exit_codes_match_failure_classes() {
        assert_eq!(FailureClass::Volume.exit_code(), 42);
        assert_eq!(FailureClass::Namespace.exit_code(), 43);
        assert_eq!(FailureClass::VolumeClaim.exit_code(), 43);
        assert_eq!(FailureClass::Node.exit_code(), 45);
        assert_eq!(FailureClass::Pod.exit_code(), 45);
        assert_eq!(FailureClass::Database.exit_code(), 46);
        assert_eq!(FailureClass::Storage.exit_code(), 47);
        assert_eq!(FailureClass::Deployment.exit_code(), 48);
        assert_eq!(FailureClass::Job.exit_code(), 49);
        assert_eq!(FailureClass::StatefulSet.exit_code(), 50);
        assert_eq!(FailureClass::DaemonSet.exit_code(), 51);
        assert_eq!(FailureClass::CronJobNeverSucceeded.exit_code(), 52);
        assert_eq!(FailureClass::CronJobMissedSchedules.exit_code(), 53);
    }

    #[test]
    fn test_aggregate_takes_first_failure_in_order() {
        let aggregate = AggregateReport::new(
            "now",
            vec![
                outcome("nodes", Ok(report(None))),
                outcome("jobs", Ok(report(Some(FailureClass::Job)))),
                outcome("volumes", Ok(report(Some(FailureClass::Volume)))),
            ],
        );
        assert_eq!(aggregate.exit_code(), 49);
    }

    #[test]
    fn test_failure_code_beats_execution_error() {
        let aggregate = AggregateReport::new(
            "now",
            vec![
                outcome("nodes", Err("connection refused".to_string())),
                outcome("pods", Ok(report(Some(FailureClass::Pod)))),
            ],
        );
        assert_eq!(aggregate.exit_code(), 45);
        assert_eq!(aggregate.errors().count(), 1);
    }

    #[test]
    fn test_execution_error_alone_is_generic_failure() {
        let aggregate = AggregateReport::new(
            "now",
            vec![
                outcome("nodes", Ok(report(None))),
                outcome("pods", Err("forbidden".to_string())),
            ],
        );
        assert_eq!(aggregate.exit_code(), EXECUTION_ERROR_EXIT_CODE);
        assert!(!aggregate.all_passed());
    }

    #[test]
    fn test_all_healthy_is_zero() {
        let aggregate = AggregateReport::new("now", vec![outcome("nodes", Ok(report(None)))]);
        assert_eq!(aggregate.exit_code(), 0);
        assert!(aggregate.all_passed());
    }
}
