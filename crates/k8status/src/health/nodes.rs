//! Node readiness.

use async_trait::async_trait;
use k8s_openapi::api::core::v1::Node;
use kube::ResourceExt;

use super::{Assessment, HealthCheck};
use crate::cluster::Cluster;
use crate::error::Result;
use crate::report::FailureClass;

/// A node is healthy when its `Ready` condition is true and it is not cordoned.
#[derive(Debug, Clone, Copy, Default)]
pub struct NodeHealth;

/// Readiness facts extracted from a node's conditions.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct NodeConditions {
    pub ready: bool,
    pub cordoned: bool,
    /// Messages of every non-Ready condition that is currently true
    /// (`MemoryPressure`, `DiskPressure`, ...).
    pub messages: Vec<String>,
}

impl NodeConditions {
    #[must_use]
    pub fn of(node: &Node) -> Self {
        let mut conditions = Self {
            cordoned: node
                .spec
                .as_ref()
                .and_then(|s| s.unschedulable)
                .unwrap_or(false),
            ..Self::default()
        };

        let all = node
            .status
            .as_ref()
            .and_then(|s| s.conditions.as_deref())
            .unwrap_or_default();

        for condition in all {
            if condition.type_ == "Ready" {
                conditions.ready = condition.status == "True";
            } else if condition.status == "True" {
                conditions
                    .messages
                    .push(condition.message.clone().unwrap_or_default());
            }
        }

        conditions
    }

    /// `Ready`/`NotReady`, plus `Cordoned` when unschedulable.
    #[must_use]
    pub fn status(&self) -> String {
        let mut statuses = vec![if self.ready { "Ready" } else { "NotReady" }];
        if self.cordoned {
            statuses.push("Cordoned");
        }
        statuses.join(",")
    }
}

#[async_trait]
impl HealthCheck for NodeHealth {
    type Item = Node;

    fn name(&self) -> &'static str {
        "nodes"
    }

    fn noun(&self) -> &'static str {
        "Nodes"
    }

    fn predicate(&self) -> &'static str {
        "are up and healthy"
    }

    fn suppressible(&self) -> bool {
        false
    }

    fn header(&self) -> &'static [&'static str] {
        &["Node", "Status", "Messages"]
    }

    async fn snapshot(&self, cluster: &dyn Cluster) -> Result<Vec<Node>> {
        cluster.nodes().await
    }

    fn namespace<'a>(&self, _item: &'a Node) -> Option<&'a str> {
        None
    }

    fn assess(&self, item: &Node) -> Assessment {
        let conditions = NodeConditions::of(item);
        if conditions.ready && !conditions.cordoned {
            Assessment::Healthy
        } else {
            Assessment::Failing(FailureClass::Node)
        }
    }

    fn row(&self, item: &Node, _failure: FailureClass) -> Vec<String> {
        let conditions = NodeConditions::of(item);
        vec![
            item.name_any(),
            conditions.status(),
            conditions.messages.join("; "),
        ]
    }
}

#[cfg(test)]
mod tests {
    use k8s_openapi::api::core::v1::{NodeCondition, NodeSpec, NodeStatus};
    use kube::api::ObjectMeta;

    use super::*;
    use crate::health::{evaluate, NamespaceFilter};

    fn condition(type_: &str, status: &str, message: &str) -> NodeCondition {
        NodeCondition {
            type_: type_.to_string(),
            status: status.to_string(),
            message: Some(message.to_string()),
            ..Default::default()
        }
    }

    fn node(name: &str, conditions: Vec<NodeCondition>, unschedulable: bool) -> Node {
        Node {
            metadata: ObjectMeta {
                name: Some(name.to_string()),
                ..Default::default()
            },
            spec: Some(NodeSpec {
                unschedulable: Some(unschedulable),
                ..Default::default()
            }),
            status: Some(NodeStatus {
                conditions: Some(conditions),
                ..Default::default()
            }),
        }
    }

    #[test]
    fn test_empty_node_is_not_ready() {
        let conditions = NodeConditions::of(&Node::default());
        assert_eq!(conditions, NodeConditions::default());
        assert_eq!(conditions.status(), "NotReady");
    }

    #[test]
    fn test_cordoned_node() {
        let conditions = NodeConditions::of(&node("a", vec![], true));
        assert!(conditions.cordoned);
        assert!(!conditions.ready);
        assert_eq!(conditions.status(), "NotReady,Cordoned");
    }

    #[test]
    fn test_pressure_messages_are_collected() {
        let conditions = NodeConditions::of(&node(
            "a",
            vec![
                condition("Ready", "True", "kubelet is posting ready status"),
                condition("DiskPressure", "True", "disk is almost full"),
                condition("MemoryPressure", "False", "enough memory"),
            ],
            false,
        ));
        assert!(conditions.ready);
        assert_eq!(conditions.messages, vec!["disk is almost full"]);
    }

    #[test]
    fn test_ready_but_cordoned_is_unhealthy() {
        let item = node("a", vec![condition("Ready", "True", "")], true);
        assert_eq!(
            NodeHealth.assess(&item),
            Assessment::Failing(FailureClass::Node)
        );
    }

    #[test]
    fn test_two_of_three_nodes_healthy() {
        let nodes = vec![
            node("node-1", vec![condition("Ready", "True", "")], false),
            node("node-2", vec![condition("Ready", "True", "")], false),
            node(
                "node-3",
                vec![
                    condition("Ready", "False", "kubelet stopped posting"),
                    condition("NetworkUnavailable", "True", "no route"),
                ],
                false,
            ),
        ];

        let report = evaluate(&NodeHealth, &NamespaceFilter::default(), &nodes);

        assert_eq!(report.summary, "2 of 3 Nodes are up and healthy.");
        assert_eq!(report.exit_code(), 45);
        assert_eq!(report.unhealthy, 1);
        assert_eq!(
            report.rows,
            vec![vec![
                "node-3".to_string(),
                "NotReady".to_string(),
                "no route".to_string()
            ]]
        );
    }
}
