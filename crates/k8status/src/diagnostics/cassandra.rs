//! Cassandra ring state via `nodetool status`.

use std::collections::BTreeMap;
use std::sync::LazyLock;

use async_trait::async_trait;
use regex::Regex;
use tracing::{debug, info};

use crate::cluster::{Cluster, ExecTarget};
use crate::config::DatabaseConfig;
use crate::error::{Result, StatusError};
use crate::health::Check;
use crate::report::{CheckReport, FailureClass};

/// Lines of `nodetool status` describing a ring member.
static NODE_LINE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[UD][NLJM]\s+").expect("valid nodetool status pattern"));

/// One ring member as printed by `nodetool status`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RingMember {
    /// Two-letter code such as `UN` or `DN`.
    pub state: String,
    pub address: String,
    pub host_id: String,
}

impl RingMember {
    /// Up and Normal.
    #[must_use]
    pub fn is_up_and_normal(&self) -> bool {
        self.state == "UN"
    }

    /// `DN` becomes `Down/Normal`.
    #[must_use]
    pub fn describe_state(&self) -> String {
        let mut codes = self.state.chars();
        let status = match codes.next() {
            Some('U') => "Up",
            Some('D') => "Down",
            _ => "Unknown",
        };
        let state = match codes.next() {
            Some('N') => "Normal",
            Some('L') => "Leaving",
            Some('J') => "Joining",
            Some('M') => "Moving",
            _ => "Unknown",
        };
        format!("{status}/{state}")
    }
}

/// Extract ring members from `nodetool status` output.
///
/// Columns are `State Address Load Tokens Owns HostID Rack`; the load
/// carries a unit and may be one or two tokens, so the host id is taken
/// from the end of the line.
pub fn parse_ring(output: &str) -> Result<Vec<RingMember>> {
    let members: Vec<RingMember> = output
        .lines()
        .filter(|line| NODE_LINE.is_match(line))
        .map(|line| {
            let fields: Vec<&str> = line.split_whitespace().collect();
            let host_id = if fields.len() >= 7 {
                fields[fields.len() - 2]
            } else {
                fields.last().copied().unwrap_or_default()
            };
            RingMember {
                state: fields[0].to_string(),
                address: fields.get(1).copied().unwrap_or_default().to_string(),
                host_id: host_id.to_string(),
            }
        })
        .collect();

    if members.is_empty() {
        return Err(StatusError::EmptyRing);
    }
    Ok(members)
}

/// Fold ring members into a report.
#[must_use]
pub fn ring_report(members: &[RingMember]) -> CheckReport {
    let total = members.len();
    let healthy = members.iter().filter(|m| m.is_up_and_normal()).count();
    let rows: Vec<Vec<String>> = members
        .iter()
        .filter(|m| !m.is_up_and_normal())
        .map(|m| vec![m.describe_state(), m.address.clone(), m.host_id.clone()])
        .collect();

    CheckReport {
        summary: format!("{healthy} of {total} cassandra nodes are up and normal."),
        header: ["State", "Address", "Host ID"].map(String::from).to_vec(),
        total,
        healthy,
        ignored: 0,
        unhealthy: rows.len(),
        failure: (!rows.is_empty()).then_some(FailureClass::Database),
        rows,
    }
}

/// Exec failure with every secret value masked out of the message.
fn redacted(error: &StatusError, secrets: &[&str], config: &DatabaseConfig) -> StatusError {
    let message = secrets
        .iter()
        .filter(|secret| !secret.is_empty())
        .fold(error.to_string(), |message, secret| message.replace(secret, "***"));

    StatusError::Exec {
        namespace: config.namespace.clone(),
        pod: config.pod.clone(),
        message,
    }
}

/// Asks one Cassandra node for the state of the whole ring.
pub struct DatabaseHealthCheck {
    config: DatabaseConfig,
}

impl DatabaseHealthCheck {
    #[must_use]
    pub fn new(config: DatabaseConfig) -> Self {
        Self { config }
    }

    fn credential(
        &self,
        secret: &BTreeMap<String, String>,
        key: &str,
    ) -> Result<String> {
        secret
            .get(key)
            .map(|value| value.trim().to_string())
            .ok_or_else(|| StatusError::MissingSecretKey {
                namespace: self.config.namespace.clone(),
                name: self.config.superuser_secret.clone(),
                key: key.to_string(),
            })
    }
}

#[async_trait]
impl Check for DatabaseHealthCheck {
    fn name(&self) -> &'static str {
        "cassandra"
    }

    async fn run(&self, cluster: &dyn Cluster) -> Result<CheckReport> {
        let config = &self.config;
        if !cluster.namespace_exists(&config.namespace).await? {
            info!(namespace = %config.namespace, "Database namespace not present, skipping");
            return Ok(CheckReport::not_applicable("Cassandra was not found."));
        }

        let secret = cluster
            .secret_data(&config.namespace, &config.superuser_secret)
            .await?;
        let username = self.credential(&secret, "username")?;
        let password = self.credential(&secret, "password")?;

        debug!(
            namespace = %config.namespace,
            pod = %config.pod,
            "Querying nodetool status"
        );
        let command = format!(
            "nodetool -u '{username}' -pw '{password}' --host {} status",
            config.host
        );
        let target = ExecTarget {
            namespace: &config.namespace,
            pod: &config.pod,
            container: Some(&config.container),
        };
        let output = cluster
            .exec(target, &command)
            .await
            .map_err(|e| redacted(&e, &[username.as_str(), password.as_str()], config))?;

        Ok(ring_report(&parse_ring(&output)?))
    }
}
